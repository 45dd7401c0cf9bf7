//! Tee: copy every item of one stream to several sinks.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::error::{Error, Result};
use crate::group::WorkerGroup;
use crate::stream::{self, Stream, StreamWriter};
use crate::telemetry::{self, Primitive};

use super::relay;

/// Deliver every item of `source` to every sink in `sinks`.
///
/// Each sink gets its own delivery task fed through an unbounded queue, so a
/// slow sink only holds up its own deliveries. Within a sink, items arrive in
/// source order. The sinks are closed together by one finalizer, after the
/// source is exhausted and every delivery task has returned. No sink closes
/// while a sibling still has items in flight.
///
/// A sink whose reader stops reading blocks its delivery task forever, and
/// with it the close of every sink; cancel `token` to recover. A sink whose
/// readers were all dropped is skipped from then on.
///
/// With no sinks the source is drained and nothing is closed.
///
/// The returned handle resolves to the number of items read from `source`
/// once the sinks are closed.
pub fn tee<T>(
    token: &CancellationToken,
    source: Stream<T>,
    sinks: Vec<StreamWriter<T>>,
) -> JoinHandle<u64>
where
    T: Clone + Send + 'static,
{
    let token = token.clone();
    tokio::spawn(
        async move {
            if sinks.is_empty() {
                return drain(&token, source).await;
            }

            let group = WorkerGroup::new();
            let mut queues = Vec::with_capacity(sinks.len());
            for (sink_id, sink) in sinks.iter().enumerate() {
                let (queue_tx, queue_rx) = stream::unbounded();
                let token = token.clone();
                let share = sink.share();
                group.spawn(
                    async move {
                        relay(&token, queue_rx, share, Primitive::Tee).await;
                    }
                    .instrument(tracing::debug_span!("tee_delivery", sink = sink_id)),
                );
                queues.push(Some(queue_tx));
            }

            let read = dispatch(&token, source, &mut queues).await;

            // Closing the queues lets each delivery task finish its backlog.
            drop(queues);
            let finalizer = group.close_after(sinks);
            if let Err(e) = finalizer.await {
                tracing::warn!(error = %e, "tee finalizer failed");
            }
            read
        }
        .instrument(tracing::debug_span!("tee")),
    )
}

/// Create `count` sinks with `capacity` buffering each and tee `source` into
/// them. Returns the sink readers and the tee's handle.
pub fn tee_streams<T>(
    token: &CancellationToken,
    source: Stream<T>,
    count: usize,
    capacity: usize,
) -> (Vec<Stream<T>>, JoinHandle<u64>)
where
    T: Clone + Send + 'static,
{
    let (writers, readers): (Vec<_>, Vec<_>) =
        (0..count).map(|_| stream::bounded(capacity)).unzip();
    let handle = tee(token, source, writers);
    (readers, handle)
}

async fn dispatch<T: Clone>(
    token: &CancellationToken,
    source: Stream<T>,
    queues: &mut [Option<StreamWriter<T>>],
) -> u64 {
    let mut read = 0u64;
    let outcome: Result<()> = async {
        while let Some(item) = source.recv_or_cancel(token).await? {
            read += 1;
            for slot in queues.iter_mut() {
                // Unbounded: this only fails when the delivery task is gone.
                let delivered = match slot.as_ref() {
                    Some(queue) => queue.send(item.clone()).await.is_ok(),
                    None => continue,
                };
                if !delivered {
                    *slot = None;
                }
            }
        }
        Ok(())
    }
    .await;

    telemetry::task_finished(
        Primitive::Tee,
        read,
        matches!(outcome, Err(Error::Cancelled)),
    );
    read
}

async fn drain<T>(token: &CancellationToken, source: Stream<T>) -> u64 {
    let mut read = 0u64;
    while let Ok(Some(_)) = source.recv_or_cancel(token).await {
        read += 1;
    }
    read
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::from_iter;
    use std::time::Duration;

    #[tokio::test]
    async fn every_sink_sees_every_item_in_order() {
        let token = CancellationToken::new();
        let source = from_iter(&token, vec!["a", "b", "c", "d"], 1);
        let (sinks, handle) = tee_streams(&token, source, 2, 1);

        let mut drained = Vec::new();
        for sink in sinks {
            drained.push(tokio::spawn(sink.collect()));
        }
        for task in drained {
            assert_eq!(task.await.unwrap(), vec!["a", "b", "c", "d"]);
        }
        assert_eq!(handle.await.unwrap(), 4);
    }

    #[tokio::test]
    async fn zero_sinks_drains_source() {
        let token = CancellationToken::new();
        let (tx, rx) = stream::unbounded();
        for i in 0..3 {
            tx.send(i).await.unwrap();
        }
        tx.close();

        let read = tee::<i32>(&token, rx.clone(), Vec::new()).await.unwrap();
        assert_eq!(read, 3);
        assert!(rx.is_terminated());
    }

    #[tokio::test]
    async fn dropped_sink_does_not_stop_siblings() {
        let token = CancellationToken::new();
        let source = from_iter(&token, 0..5, 1);
        let (mut sinks, handle) = tee_streams(&token, source, 2, 1);

        drop(sinks.remove(1));
        let kept = sinks.remove(0).collect().await;
        assert_eq!(kept, vec![0, 1, 2, 3, 4]);
        assert_eq!(handle.await.unwrap(), 5);
    }

    #[tokio::test]
    async fn cancellation_closes_blocked_sinks() {
        let token = CancellationToken::new();
        let source = from_iter(&token, 0..100, 1);
        let (sinks, handle) = tee_streams(&token, source, 2, 1);

        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
        for sink in sinks {
            assert!(sink.is_closed());
        }
    }
}
