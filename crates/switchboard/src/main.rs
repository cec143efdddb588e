//! Switchboard command-line entry point.

mod cli;

use clap::Parser;
use cli::{Cli, Commands, Gateway};
use switchboard_core::{TemplateKind, init_observability, init_tracing, shutdown_observability};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before reading any SWITCHBOARD_* settings
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.json_logs);
    if let Err(e) = init_observability("switchboard", 60) {
        tracing::warn!(error = %e, "Metrics disabled");
    }

    let gateway = Gateway::load(&cli)?;

    let result = match &cli.command {
        Commands::Complete(args) => {
            cli::handle_prompt_command(&gateway, TemplateKind::Completion, args).await
        }
        Commands::Edit(args) => cli::handle_prompt_command(&gateway, TemplateKind::Edit, args).await,
        Commands::Chat(args) => cli::handle_chat_command(&gateway, args).await,
        Commands::Models => {
            cli::handle_models_command(&gateway);
            Ok(())
        }
    };

    shutdown_observability();
    result
}
