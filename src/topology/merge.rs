//! Fan-in: merge many streams into one.

use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::group::WorkerGroup;
use crate::stream::{self, Stream};
use crate::telemetry::Primitive;

use super::relay;

/// Merge `streams` into a single stream.
///
/// One relay task per input forwards items into the output; the output closes
/// once every input has closed and every item has been forwarded, or once the
/// token fires and the relays have unwound. Items from different inputs
/// interleave in arrival order. With no inputs the output is closed at once.
///
/// An input that never closes keeps its relay, and therefore the output, open
/// until `token` is cancelled.
///
/// ```rust
/// use fanweld::prelude::*;
///
/// # #[tokio::main] async fn main() {
/// let token = CancellationToken::new();
/// let a = from_iter(&token, vec![1, 2, 3], 1);
/// let b = from_iter(&token, vec![4, 5], 1);
///
/// let mut merged = merge(&token, vec![a, b]).collect().await;
/// merged.sort();
/// assert_eq!(merged, vec![1, 2, 3, 4, 5]);
/// # }
/// ```
pub fn merge<T, I>(token: &CancellationToken, streams: I) -> Stream<T>
where
    T: Send + 'static,
    I: IntoIterator<Item = Stream<T>>,
{
    merge_with_capacity(token, streams, 1)
}

/// [`merge`] with an explicit output buffer size.
pub fn merge_with_capacity<T, I>(token: &CancellationToken, streams: I, capacity: usize) -> Stream<T>
where
    T: Send + 'static,
    I: IntoIterator<Item = Stream<T>>,
{
    let (writer, output) = stream::bounded(capacity);
    let group = WorkerGroup::new();

    for (input_id, input) in streams.into_iter().enumerate() {
        let token = token.clone();
        let share = writer.share();
        group.spawn(
            async move {
                relay(&token, input, share, Primitive::Merge).await;
            }
            .instrument(tracing::debug_span!("merge_relay", input = input_id)),
        );
    }

    group.close_after(vec![writer]);
    output
}
