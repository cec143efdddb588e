//! Interleaving fan-in.

use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Forwards every item from `sources` into `dest`.
///
/// One forwarding task runs per source, so items from different sources
/// interleave in whatever order they are produced while each source's own
/// order is kept.
///
/// The returned handle resolves once every source has closed. With
/// `close_dest_on_done` the coordinator drops its sender and yields `None`;
/// otherwise it hands the sender back so the caller can keep writing.
///
/// Must be called from within a Tokio runtime.
pub fn merge<T>(
    sources: Vec<mpsc::Receiver<T>>,
    dest: mpsc::Sender<T>,
    close_dest_on_done: bool,
) -> JoinHandle<Option<mpsc::Sender<T>>>
where
    T: Send + 'static,
{
    merge_cancellable(sources, dest, close_dest_on_done, CancellationToken::new())
}

/// Like [`merge`], but stops forwarding once `cancel` fires.
///
/// Cancellation is cooperative. Sources are still drained to completion so
/// their producers never block on a full channel, but nothing more reaches
/// `dest`. The destination is closed through the ordinary completion path,
/// never out-of-band.
pub fn merge_cancellable<T>(
    sources: Vec<mpsc::Receiver<T>>,
    dest: mpsc::Sender<T>,
    close_dest_on_done: bool,
    cancel: CancellationToken,
) -> JoinHandle<Option<mpsc::Sender<T>>>
where
    T: Send + 'static,
{
    let source_count = sources.len();
    let mut forwarders = JoinSet::new();

    for (source_index, source) in sources.into_iter().enumerate() {
        forwarders.spawn(forward(source_index, source, dest.clone(), cancel.clone()));
    }

    tokio::spawn(async move {
        while forwarders.join_next().await.is_some() {}
        debug!(source_count, close_dest_on_done, "All merge sources closed");

        if close_dest_on_done {
            drop(dest);
            None
        } else {
            Some(dest)
        }
    })
}

async fn forward<T>(
    source_index: usize,
    mut source: mpsc::Receiver<T>,
    dest: mpsc::Sender<T>,
    cancel: CancellationToken,
) {
    let mut forwarding = true;
    let mut forwarded = 0usize;

    while let Some(item) = source.recv().await {
        if !forwarding || cancel.is_cancelled() {
            forwarding = false;
            continue;
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(source_index, forwarded, "Merge cancelled, draining source");
                forwarding = false;
            }
            sent = dest.send(item) => {
                if sent.is_err() {
                    debug!(source_index, forwarded, "Merge destination closed, draining source");
                    forwarding = false;
                } else {
                    forwarded += 1;
                }
            }
        }
    }

    trace!(source_index, forwarded, "Merge source closed");
}
