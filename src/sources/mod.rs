//! Generators that feed items into a new stream.
//!
//! Every generator runs as its own task, writes its items in order, and
//! closes the stream when it runs out or the token fires.

use std::future::Future;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::stream::{self, Stream};
use crate::telemetry::{self, Primitive};

/// A stream that yields the items of `items`.
pub fn from_iter<I>(token: &CancellationToken, items: I, capacity: usize) -> Stream<I::Item>
where
    I: IntoIterator,
    I::IntoIter: Send + 'static,
    I::Item: Send + 'static,
{
    let items = items.into_iter();
    let (writer, output) = stream::bounded(capacity);
    let token = token.clone();
    tokio::spawn(async move {
        let mut sent = 0u64;
        let mut cancelled = false;
        for item in items {
            if let Err(e) = writer.send_or_cancel(item, &token).await {
                cancelled = e.is_cancelled();
                break;
            }
            sent += 1;
        }
        telemetry::task_finished(Primitive::Source, sent, cancelled);
        writer.close();
    });
    output
}

/// A stream fed by calling `f` until it returns `None`.
pub fn from_fn<F, Fut, T>(token: &CancellationToken, capacity: usize, mut f: F) -> Stream<T>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Option<T>> + Send + 'static,
    T: Send + 'static,
{
    let (writer, output) = stream::bounded(capacity);
    let token = token.clone();
    tokio::spawn(async move {
        let mut sent = 0u64;
        let outcome: Result<()> = async {
            while let Some(item) = crate::cancel::cancellable(&token, f()).await? {
                writer.send_or_cancel(item, &token).await?;
                sent += 1;
            }
            Ok(())
        }
        .await;
        telemetry::task_finished(
            Primitive::Source,
            sent,
            outcome.as_ref().is_err_and(|e| e.is_cancelled()),
        );
        writer.close();
    });
    output
}

/// A stream that yields one item of `items` per `period`, starting at once.
pub fn interval<I>(token: &CancellationToken, period: Duration, items: I) -> Stream<I::Item>
where
    I: IntoIterator,
    I::IntoIter: Send + 'static,
    I::Item: Send + 'static,
{
    let mut items = items.into_iter();
    let (writer, output) = stream::bounded(1);
    let token = token.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut sent = 0u64;
        let outcome: Result<()> = async {
            loop {
                crate::cancel::cancellable(&token, ticker.tick()).await?;
                let Some(item) = items.next() else {
                    return Ok(());
                };
                writer.send_or_cancel(item, &token).await?;
                sent += 1;
            }
        }
        .await;
        telemetry::task_finished(
            Primitive::Source,
            sent,
            outcome.as_ref().is_err_and(|e| e.is_cancelled()),
        );
        writer.close();
    });
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn from_iter_yields_in_order() {
        let token = CancellationToken::new();
        let out = from_iter(&token, vec!["a", "b", "c"], 1);
        assert_eq!(out.collect().await, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn from_iter_stops_on_cancellation() {
        let token = CancellationToken::new();
        let out = from_iter(&token, 0.., 1);
        assert_eq!(out.recv().await, Some(0));
        token.cancel();

        let rest = tokio::time::timeout(Duration::from_secs(1), out.collect()).await;
        assert!(rest.unwrap().len() <= 2);
    }

    #[tokio::test]
    async fn from_fn_runs_until_none() {
        let token = CancellationToken::new();
        let mut left = 3;
        let out = from_fn(&token, 1, move || {
            let item = (left > 0).then_some(left);
            left -= 1;
            async move { item }
        });
        assert_eq!(out.collect().await, vec![3, 2, 1]);
    }

    #[tokio::test(start_paused = true)]
    async fn interval_paces_items() {
        let token = CancellationToken::new();
        let start = tokio::time::Instant::now();
        let out = interval(&token, Duration::from_millis(100), vec![1, 2, 3]);

        assert_eq!(out.collect().await, vec![1, 2, 3]);
        assert!(start.elapsed() >= Duration::from_millis(200));
    }
}
