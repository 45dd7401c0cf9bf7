//! Closeable streams connecting concurrent pipeline tasks.
//!
//! A stream is a pair of endpoints over one async MPMC queue:
//!
//! - [`StreamWriter`] is the write endpoint. It is not `Clone`: the task that
//!   holds it owns the close. [`StreamWriter::close`] consumes the writer, so
//!   closing twice or writing after a close does not compile. Dropping the
//!   writer closes the stream as well.
//! - [`Stream`] is the read endpoint. It is `Clone`, and every clone competes
//!   for the same items, so each item is observed by exactly one reader. Once
//!   the stream is closed and drained, every read returns `None`.
//!
//! Several producers may feed one stream only through the crate's join
//! barrier (see [`crate::group::WorkerGroup`]), which hands out crate-private
//! writer shares and performs the single close once every producer returned.

use futures::stream::BoxStream;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};

/// Create a stream that holds at most `capacity` unread items.
///
/// Writers suspend while the stream is full. A capacity of zero is treated as
/// one, which gives a near-rendezvous handoff.
pub fn bounded<T>(capacity: usize) -> (StreamWriter<T>, Stream<T>) {
    let (tx, rx) = async_channel::bounded(capacity.max(1));
    (StreamWriter { tx }, Stream { rx })
}

/// Create a stream with no capacity limit. Writes never suspend.
pub fn unbounded<T>() -> (StreamWriter<T>, Stream<T>) {
    let (tx, rx) = async_channel::unbounded();
    (StreamWriter { tx }, Stream { rx })
}

/// Read endpoint of a stream.
#[derive(Debug)]
pub struct Stream<T> {
    rx: async_channel::Receiver<T>,
}

impl<T> Clone for Stream<T> {
    fn clone(&self) -> Self {
        Self {
            rx: self.rx.clone(),
        }
    }
}

impl<T> Stream<T> {
    /// Receive the next item, or `None` once the stream is closed and drained.
    pub async fn recv(&self) -> Option<T> {
        self.rx.recv().await.ok()
    }

    /// Receive the next item unless the cancellation scope fires first.
    ///
    /// Returns `Ok(None)` at end of stream and `Err(Error::Cancelled)` when
    /// the token was cancelled while waiting.
    pub async fn recv_or_cancel(&self, token: &CancellationToken) -> Result<Option<T>> {
        tokio::select! {
            biased;
            _ = token.cancelled() => Err(Error::Cancelled),
            item = self.rx.recv() => Ok(item.ok()),
        }
    }

    /// Receive an item that is already buffered without waiting.
    pub fn try_recv(&self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    /// Whether the write side has closed. Buffered items may still be readable.
    pub fn is_closed(&self) -> bool {
        self.rx.is_closed()
    }

    /// Whether the stream is closed and every item has been read.
    pub fn is_terminated(&self) -> bool {
        self.rx.is_closed() && self.rx.is_empty()
    }

    /// Number of buffered, unread items
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// Whether no items are currently buffered
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Drain the stream to completion and return every item in read order.
    pub async fn collect(self) -> Vec<T> {
        let mut items = Vec::new();
        while let Some(item) = self.recv().await {
            items.push(item);
        }
        items
    }

    /// Adapt the read endpoint into a [`futures::Stream`].
    pub fn into_stream(self) -> BoxStream<'static, T>
    where
        T: Send + 'static,
    {
        futures::stream::unfold(self, |stream| async move {
            let item = stream.recv().await?;
            Some((item, stream))
        })
        .boxed()
    }
}

/// Write endpoint of a stream.
#[derive(Debug)]
pub struct StreamWriter<T> {
    tx: async_channel::Sender<T>,
}

impl<T> StreamWriter<T> {
    /// Write an item, suspending while the stream is full.
    ///
    /// Fails with [`Error::ChannelClosed`] once every reader has been dropped.
    pub async fn send(&self, item: T) -> Result<()> {
        self.tx.send(item).await.map_err(Error::from)
    }

    /// Write an item unless the cancellation scope fires first.
    pub async fn send_or_cancel(&self, item: T, token: &CancellationToken) -> Result<()> {
        tokio::select! {
            biased;
            _ = token.cancelled() => Err(Error::Cancelled),
            sent = self.tx.send(item) => sent.map_err(Error::from),
        }
    }

    /// Whether every reader has gone away or the stream was closed.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Close the stream. Pending items stay readable; later reads see the end.
    pub fn close(self) {
        self.tx.close();
    }

    /// A second handle onto the same write endpoint for a tracked producer.
    ///
    /// Only the join barrier hands these out; the original writer stays with
    /// the finalizer, which closes the stream after every share is done.
    pub(crate) fn share(&self) -> StreamWriter<T> {
        StreamWriter {
            tx: self.tx.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn closed_drained_stream_reports_end() {
        let (tx, rx) = bounded(4);
        tx.send(1).await.unwrap();
        tx.send(2).await.unwrap();
        tx.close();

        assert!(rx.is_closed());
        assert_eq!(rx.recv().await, Some(1));
        assert_eq!(rx.recv().await, Some(2));
        assert_eq!(rx.recv().await, None);
        assert_eq!(rx.recv().await, None);
        assert!(rx.is_terminated());
    }

    #[tokio::test]
    async fn dropping_writer_closes_stream() {
        let (tx, rx) = bounded::<u8>(1);
        drop(tx);
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn cloned_readers_split_items() {
        let (tx, rx) = unbounded();
        for i in 0..10 {
            tx.send(i).await.unwrap();
        }
        tx.close();

        let other = rx.clone();
        let mut seen = Vec::new();
        while let Some(a) = rx.recv().await {
            seen.push(a);
            if let Some(b) = other.recv().await {
                seen.push(b);
            }
        }
        seen.sort();
        assert_eq!(seen, (0..10).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn send_fails_once_readers_are_gone() {
        let (tx, rx) = bounded(1);
        drop(rx);
        assert!(matches!(tx.send(1).await, Err(Error::ChannelClosed)));
    }

    #[tokio::test]
    async fn recv_observes_cancellation() {
        let (_tx, rx) = bounded::<u8>(1);
        let token = CancellationToken::new();
        let waiter = {
            let token = token.clone();
            tokio::spawn(async move { rx.recv_or_cancel(&token).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        token.cancel();

        let result = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(result, Err(Error::Cancelled)));
    }

    #[tokio::test]
    async fn full_stream_send_observes_cancellation() {
        let (tx, _rx) = bounded(1);
        let token = CancellationToken::new();
        tx.send(1).await.unwrap();
        token.cancel();
        assert!(matches!(
            tx.send_or_cancel(2, &token).await,
            Err(Error::Cancelled)
        ));
    }

    #[tokio::test]
    async fn into_stream_yields_all_items() {
        let (tx, rx) = unbounded();
        for i in 0..3 {
            tx.send(i).await.unwrap();
        }
        tx.close();

        let items: Vec<i32> = rx.into_stream().collect().await;
        assert_eq!(items, vec![0, 1, 2]);
    }
}
