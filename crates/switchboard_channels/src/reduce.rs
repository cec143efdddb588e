//! Folding fan-in.

use crate::{ResultReceiver, ResultSender};
use futures_util::StreamExt;
use switchboard_core::GenerationResult;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, warn};

/// Folds every item from `sources` into one accumulator.
///
/// A single coordinating task polls all sources, so `fold` is never called
/// concurrently, but it sees items in arrival order and must not depend on
/// which source they came from. Exactly one value is sent to `dest`, after
/// the last source closes; with no sources that value is `initial`.
///
/// The handle yields the sender back unless `close_dest_on_done` is set.
///
/// Must be called from within a Tokio runtime.
pub fn reduce<T, A, F>(
    sources: Vec<mpsc::Receiver<T>>,
    dest: mpsc::Sender<A>,
    mut fold: F,
    initial: A,
    close_dest_on_done: bool,
) -> JoinHandle<Option<mpsc::Sender<A>>>
where
    T: Send + 'static,
    A: Send + 'static,
    F: FnMut(A, T) -> A + Send + 'static,
{
    tokio::spawn(async move {
        let source_count = sources.len();
        let mut items = futures_util::stream::select_all(
            sources.into_iter().map(ReceiverStream::new),
        );

        let mut accumulator = initial;
        let mut folded = 0usize;
        while let Some(item) = items.next().await {
            accumulator = fold(accumulator, item);
            folded += 1;
        }
        debug!(source_count, folded, "All reduce sources closed");

        if dest.send(accumulator).await.is_err() {
            warn!("Reduce destination closed before the final value was sent");
        }

        if close_dest_on_done {
            drop(dest);
            None
        } else {
            Some(dest)
        }
    })
}

/// [`reduce`] over result channels.
///
/// `fold` only sees `Ok` items. The first `Err` becomes the terminal value
/// and no later `Ok` replaces it; the remaining sources are still drained so
/// their producers can finish.
pub fn reduce_results<T, A, F>(
    sources: Vec<ResultReceiver<T>>,
    dest: ResultSender<A>,
    mut fold: F,
    initial: A,
    close_dest_on_done: bool,
) -> JoinHandle<Option<ResultSender<A>>>
where
    T: Send + 'static,
    A: Send + 'static,
    F: FnMut(A, T) -> A + Send + 'static,
{
    reduce(
        sources,
        dest,
        move |accumulator: GenerationResult<A>, item: GenerationResult<T>| match (accumulator, item) {
            (Err(e), _) => Err(e),
            (Ok(_), Err(e)) => {
                debug!(error = %e, "Reduce source yielded an error");
                Err(e)
            }
            (Ok(acc), Ok(value)) => Ok(fold(acc, value)),
        },
        Ok(initial),
        close_dest_on_done,
    )
}
