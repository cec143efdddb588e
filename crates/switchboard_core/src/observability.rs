//! Tracing subscriber and OpenTelemetry metrics initialization.

#[cfg(feature = "metrics")]
use opentelemetry::{KeyValue, global};
#[cfg(feature = "metrics")]
use opentelemetry_otlp::{MetricExporter as OtlpExporter, WithExportConfig};
#[cfg(feature = "metrics")]
use opentelemetry_sdk::{
    Resource,
    metrics::{PeriodicReader, SdkMeterProvider},
};
#[cfg(feature = "metrics")]
use opentelemetry_stdout::MetricExporter as StdoutExporter;
#[cfg(feature = "metrics")]
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global tracing subscriber.
///
/// The filter comes from `RUST_LOG` and defaults to `info`. With `json` set,
/// events are written as JSON lines; otherwise the compact fmt layer is used.
/// Installing twice is not an error; the second call is ignored.
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    let result = if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(false))
            .try_init()
    };

    if let Err(e) = result {
        warn!(error = %e, "Tracing subscriber already installed");
    }
}

/// Exporter used when `OTEL_EXPORTER` is unset.
#[cfg(feature = "metrics")]
const DEFAULT_EXPORTER: &str = "stdout";

/// Collector endpoint used when `OTEL_EXPORTER_OTLP_ENDPOINT` is unset.
#[cfg(feature = "metrics")]
const DEFAULT_OTLP_ENDPOINT: &str = "http://localhost:4318";

/// Registers the global meter provider for orchestration metrics.
///
/// `OTEL_EXPORTER=otlp` pushes to `OTEL_EXPORTER_OTLP_ENDPOINT` over HTTP;
/// anything else prints to stdout. Readers flush every `export_interval_secs`.
/// Without the `metrics` feature this only logs and returns `Ok(())`.
#[instrument(skip_all, fields(service_name = service_name))]
pub fn init_observability(
    service_name: &'static str,
    export_interval_secs: u64,
) -> Result<(), String> {
    #[cfg(not(feature = "metrics"))]
    {
        let _ = export_interval_secs;
        info!(service_name, "Built without metrics, skipping meter provider");
        Ok(())
    }

    #[cfg(feature = "metrics")]
    {
        let interval = Duration::from_secs(export_interval_secs);
        let resource = Resource::builder_empty()
            .with_attributes([KeyValue::new("service.name", service_name)])
            .build();

        let exporter =
            std::env::var("OTEL_EXPORTER").unwrap_or_else(|_| DEFAULT_EXPORTER.to_string());
        let provider = SdkMeterProvider::builder().with_resource(resource);
        let provider = if exporter == "otlp" {
            let endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
                .unwrap_or_else(|_| DEFAULT_OTLP_ENDPOINT.to_string());
            let otlp = OtlpExporter::builder()
                .with_http()
                .with_endpoint(&endpoint)
                .with_timeout(Duration::from_secs(10))
                .build()
                .map_err(|e| format!("Failed to create OTLP exporter: {}", e))?;
            info!(service_name, endpoint = %endpoint, "Exporting metrics over OTLP");
            provider.with_reader(PeriodicReader::builder(otlp).with_interval(interval).build())
        } else {
            info!(service_name, "Exporting metrics to stdout");
            provider.with_reader(
                PeriodicReader::builder(StdoutExporter::default())
                    .with_interval(interval)
                    .build(),
            )
        };

        global::set_meter_provider(provider.build());
        debug!(export_interval_secs, "Meter provider installed");
        Ok(())
    }
}

/// Marks the end of metric collection.
///
/// The global provider flushes its readers when it is dropped at exit.
pub fn shutdown_observability() {
    debug!("Metric collection finished");
}
