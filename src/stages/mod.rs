//! Stage implementations for per-item transforms.
//!
//! Each stage spawns one task per [`Stage::execute`] call. The task reads
//! from its input, applies the transform and writes the result, racing every
//! read, transform and write against the cancellation token, and closes its
//! output when the input ends or the token fires.

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::cancel::cancellable;
use crate::error::{Error, Result};
use crate::stream::{self, Stream};
use crate::telemetry::{self, Primitive};
use crate::traits::Stage;

/// Output buffer of a single stage task.
const STAGE_BUFFER: usize = 1;

/// Spawn the task behind a stage: `f` maps each item to zero or one outputs.
pub(crate) fn drive<I, O, F, Fut>(token: &CancellationToken, input: Stream<I>, mut f: F) -> Stream<O>
where
    I: Send + 'static,
    O: Send + 'static,
    F: FnMut(I) -> Fut + Send + 'static,
    Fut: Future<Output = Option<O>> + Send + 'static,
{
    let (writer, output) = stream::bounded(STAGE_BUFFER);
    let token = token.clone();
    tokio::spawn(async move {
        let mut forwarded = 0u64;
        let outcome: Result<()> = async {
            while let Some(item) = input.recv_or_cancel(&token).await? {
                let Some(out) = cancellable(&token, f(item)).await? else {
                    continue;
                };
                writer.send_or_cancel(out, &token).await?;
                forwarded += 1;
            }
            Ok(())
        }
        .await;

        if let Err(ref e) = outcome {
            if !e.is_cancelled() {
                tracing::debug!(error = %e, "stage output dropped");
            }
        }
        telemetry::task_finished(
            Primitive::Stage,
            forwarded,
            matches!(outcome, Err(Error::Cancelled)),
        );
        writer.close();
    });
    output
}

/// A stage that maps items using a function.
pub struct MapStage<F> {
    f: Arc<F>,
}

impl<F> MapStage<F> {
    /// Create a new map stage
    pub fn new(f: F) -> Self {
        Self { f: Arc::new(f) }
    }
}

impl<F, I, O> Stage<I, O> for MapStage<F>
where
    F: Fn(I) -> O + Send + Sync + 'static,
    I: Send + 'static,
    O: Send + 'static,
{
    fn execute(&self, token: &CancellationToken, input: Stream<I>) -> Stream<O> {
        let f = self.f.clone();
        drive(token, input, move |item| {
            let out = f(item);
            async move { Some(out) }
        })
    }
}

/// A stage that maps items through an async function.
///
/// Useful for I/O-bound work such as fetching a resource per item; the
/// returned future is abandoned if the token fires while it runs.
pub struct ThenStage<F> {
    f: Arc<F>,
}

impl<F> ThenStage<F> {
    /// Create a new async map stage
    pub fn new(f: F) -> Self {
        Self { f: Arc::new(f) }
    }
}

impl<F, Fut, I, O> Stage<I, O> for ThenStage<F>
where
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = O> + Send + 'static,
    I: Send + 'static,
    O: Send + 'static,
{
    fn execute(&self, token: &CancellationToken, input: Stream<I>) -> Stream<O> {
        let f = self.f.clone();
        drive(token, input, move |item| {
            let fut = f(item);
            async move { Some(fut.await) }
        })
    }
}

/// A stage whose async transform may fail for an individual item.
///
/// Failures do not stop the stage: each outcome, success or error, is emitted
/// as a `Result` item for the terminal consumer to report.
pub struct TryThenStage<F> {
    f: Arc<F>,
}

impl<F> TryThenStage<F> {
    /// Create a new fallible async map stage
    pub fn new(f: F) -> Self {
        Self { f: Arc::new(f) }
    }
}

impl<F, Fut, I, O> Stage<I, Result<O>> for TryThenStage<F>
where
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<O>> + Send + 'static,
    I: Send + 'static,
    O: Send + 'static,
{
    fn execute(&self, token: &CancellationToken, input: Stream<I>) -> Stream<Result<O>> {
        let f = self.f.clone();
        drive(token, input, move |item| {
            let fut = f(item);
            async move { Some(fut.await) }
        })
    }
}

/// A stage that applies a fallible async transform to successful items and
/// passes earlier failures through untouched.
///
/// This lets several fallible stages sit in one `Pipeline<Result<T>>`.
pub struct AndThenStage<F> {
    f: Arc<F>,
}

impl<F> AndThenStage<F> {
    /// Create a new pass-through fallible stage
    pub fn new(f: F) -> Self {
        Self { f: Arc::new(f) }
    }
}

impl<F, Fut, I, O> Stage<Result<I>, Result<O>> for AndThenStage<F>
where
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<O>> + Send + 'static,
    I: Send + 'static,
    O: Send + 'static,
{
    fn execute(&self, token: &CancellationToken, input: Stream<Result<I>>) -> Stream<Result<O>> {
        let f = self.f.clone();
        drive(token, input, move |item: Result<I>| {
            let fut = item.map(|value| f(value));
            async move {
                Some(match fut {
                    Ok(fut) => fut.await,
                    Err(e) => Err(e),
                })
            }
        })
    }
}

/// A stage that only passes items satisfying a predicate.
pub struct FilterStage<F> {
    predicate: Arc<F>,
}

impl<F> FilterStage<F> {
    /// Create a new filter stage
    pub fn new(predicate: F) -> Self {
        Self {
            predicate: Arc::new(predicate),
        }
    }
}

impl<F, T> Stage<T> for FilterStage<F>
where
    F: Fn(&T) -> bool + Send + Sync + 'static,
    T: Send + 'static,
{
    fn execute(&self, token: &CancellationToken, input: Stream<T>) -> Stream<T> {
        let predicate = self.predicate.clone();
        drive(token, input, move |item| {
            let keep = predicate(&item);
            async move { keep.then_some(item) }
        })
    }
}

/// A stage that holds each item for a fixed delay before passing it on.
pub struct DelayStage<T> {
    delay: Duration,
    _phantom: PhantomData<fn(T) -> T>,
}

impl<T> DelayStage<T> {
    /// Create a new delay stage
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            _phantom: PhantomData,
        }
    }
}

impl<T: Send + 'static> Stage<T> for DelayStage<T> {
    fn execute(&self, token: &CancellationToken, input: Stream<T>) -> Stream<T> {
        let delay = self.delay;
        drive(token, input, move |item| async move {
            tokio::time::sleep(delay).await;
            Some(item)
        })
    }
}

/// A stage built from a closure over the token and the input stream.
pub struct FnStage<F> {
    f: F,
}

/// Helper function to create a stage from a function
pub fn from_fn<F>(f: F) -> FnStage<F> {
    FnStage { f }
}

impl<F, I, O> Stage<I, O> for FnStage<F>
where
    F: Fn(&CancellationToken, Stream<I>) -> Stream<O> + Send + Sync,
{
    fn execute(&self, token: &CancellationToken, input: Stream<I>) -> Stream<O> {
        (self.f)(token, input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::from_iter;

    #[tokio::test]
    async fn map_stage_transforms_in_order() {
        let token = CancellationToken::new();
        let input = from_iter(&token, 1..=4, 1);
        let out = MapStage::new(|x: i32| x * 10).execute(&token, input);
        assert_eq!(out.collect().await, vec![10, 20, 30, 40]);
    }

    #[tokio::test]
    async fn filter_stage_drops_items() {
        let token = CancellationToken::new();
        let input = from_iter(&token, 1..=10, 1);
        let out = FilterStage::new(|x: &i32| x % 2 == 0).execute(&token, input);
        assert_eq!(out.collect().await, vec![2, 4, 6, 8, 10]);
    }

    #[tokio::test]
    async fn try_then_stage_carries_failures_as_items() {
        let token = CancellationToken::new();
        let input = from_iter(&token, vec!["1", "x", "3"], 1);
        let stage = TryThenStage::new(|s: &'static str| async move {
            s.parse::<i32>().map_err(Error::stage)
        });

        let out = stage.execute(&token, input).collect().await;
        assert_eq!(out.len(), 3);
        assert_eq!(*out[0].as_ref().unwrap(), 1);
        assert!(out[1].is_err());
        assert_eq!(*out[2].as_ref().unwrap(), 3);
    }

    #[tokio::test]
    async fn and_then_stage_passes_errors_through() {
        let token = CancellationToken::new();
        let input = from_iter(&token, vec![Ok(2), Err(Error::custom("upstream")), Ok(5)], 1);
        let stage = AndThenStage::new(|x: i32| async move { Ok::<_, Error>(x + 1) });

        let out = stage.execute(&token, input).collect().await;
        assert_eq!(*out[0].as_ref().unwrap(), 3);
        assert_eq!(out[1].as_ref().unwrap_err().to_string(), "upstream");
        assert_eq!(*out[2].as_ref().unwrap(), 6);
    }

    #[tokio::test]
    async fn delay_stage_is_interrupted_by_cancellation() {
        let token = CancellationToken::new();
        let input = from_iter(&token, vec![1], 1);
        let out = DelayStage::new(Duration::from_secs(60)).execute(&token, input);

        token.cancel();
        let end = tokio::time::timeout(Duration::from_secs(1), out.recv()).await;
        assert_eq!(end.unwrap(), None);
    }

    #[tokio::test]
    async fn fn_stage_wraps_closure() {
        let token = CancellationToken::new();
        let stage = from_fn(|token: &CancellationToken, input: Stream<u8>| {
            MapStage::new(|x: u8| x + 1).execute(token, input)
        });
        let out = stage.execute(&token, from_iter(&token, vec![1u8, 2], 1));
        assert_eq!(out.collect().await, vec![2, 3]);
    }
}
