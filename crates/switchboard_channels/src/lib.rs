//! Result channels and fan-in combinators.
//!
//! Every orchestration channel carries [`GenerationResult`] items. Two
//! combinators join concurrent producers:
//!
//! - [`merge`] interleaves items from many sources into one destination,
//!   keeping the order within each source.
//! - [`reduce`] folds every item from many sources into one accumulator and
//!   emits it once, after all sources have closed.
//!
//! Channels have a capacity of one, so a producer can run at most one item
//! ahead of its consumer. Backpressure is the only flow control the pipeline
//! has.

mod merge;
mod reduce;

pub use merge::{merge, merge_cancellable};
pub use reduce::{reduce, reduce_results};

use switchboard_core::GenerationResult;
use tokio::sync::mpsc;

/// Capacity of every result channel.
pub const RESULT_CHANNEL_CAPACITY: usize = 1;

/// Sending half of a result channel.
pub type ResultSender<T> = mpsc::Sender<GenerationResult<T>>;

/// Receiving half of a result channel.
pub type ResultReceiver<T> = mpsc::Receiver<GenerationResult<T>>;

/// Creates a result channel.
///
/// # Examples
///
/// ```
/// # #[tokio::main]
/// # async fn main() {
/// let (tx, mut rx) = switchboard_channels::result_channel::<u32>();
/// tx.send(Ok(7)).await.unwrap();
/// drop(tx);
///
/// assert_eq!(rx.recv().await.unwrap().unwrap(), 7);
/// assert!(rx.recv().await.is_none());
/// # }
/// ```
pub fn result_channel<T>() -> (ResultSender<T>, ResultReceiver<T>) {
    mpsc::channel(RESULT_CHANNEL_CAPACITY)
}
