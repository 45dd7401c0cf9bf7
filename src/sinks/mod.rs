//! Terminal consumers and the drain loop that feeds them.
//!
//! [`drain`] is the range-style consumption loop: it reads until the stream
//! reports its end, handing each item to a [`Consumer`].

use async_trait::async_trait;
use std::fmt::Display;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio::sync::Mutex as TokioMutex;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::stream::Stream;
use crate::traits::Consumer;

/// Feed every item of `stream` to `consumer`, then call its `finish`.
///
/// Returns the number of items consumed. Stops early with
/// [`Error::Cancelled`] when the token fires, or with the consumer's own
/// error if `consume` fails; `finish` is not called in either case.
pub async fn drain<C>(
    token: &CancellationToken,
    stream: Stream<C::Item>,
    consumer: &mut C,
) -> Result<u64>
where
    C: Consumer + Send + ?Sized,
{
    let mut consumed = 0u64;
    while let Some(item) = stream.recv_or_cancel(token).await? {
        consumer.consume(item).await?;
        consumed += 1;
    }
    consumer.finish().await?;
    Ok(consumed)
}

/// A sink that prints items to stdout.
pub struct PrintSink<T> {
    /// The prefix to print before each item
    prefix: Option<String>,
    _phantom: PhantomData<fn(T)>,
}

impl<T> PrintSink<T> {
    /// Create a new print sink
    pub fn new() -> Self {
        Self {
            prefix: None,
            _phantom: PhantomData,
        }
    }

    /// Create a new print sink with a prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
            _phantom: PhantomData,
        }
    }
}

#[async_trait]
impl<T: Send + 'static + Display> Consumer for PrintSink<T> {
    type Item = T;

    async fn consume(&mut self, item: Self::Item) -> Result<()> {
        match &self.prefix {
            Some(prefix) => println!("{} {}", prefix, item),
            None => println!("{}", item),
        }
        Ok(())
    }
}

impl<T> Default for PrintSink<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A sink that collects items into a vector.
pub struct CollectSink<T> {
    /// The vector to collect items into
    items: Arc<TokioMutex<Vec<T>>>,
}

impl<T: Send + 'static + Clone> CollectSink<T> {
    /// Create a new collect sink
    pub fn new() -> Self {
        Self {
            items: Arc::new(TokioMutex::new(Vec::new())),
        }
    }

    /// Get the collected items
    pub async fn into_items(self) -> Vec<T> {
        self.items.lock().await.clone()
    }

    /// Get a clone of the items Arc for external access
    pub fn items(&self) -> Arc<TokioMutex<Vec<T>>> {
        self.items.clone()
    }
}

#[async_trait]
impl<T: Send + 'static + Clone> Consumer for CollectSink<T> {
    type Item = T;

    async fn consume(&mut self, item: Self::Item) -> Result<()> {
        self.items.lock().await.push(item);
        Ok(())
    }
}

impl<T: Send + 'static + Clone> Default for CollectSink<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for CollectSink<T> {
    fn clone(&self) -> Self {
        Self {
            items: self.items.clone(),
        }
    }
}

/// A sink that counts items
pub struct CountSink<T> {
    count: Arc<TokioMutex<u64>>,
    _phantom: PhantomData<fn(T)>,
}

impl<T> CountSink<T> {
    /// Create a new count sink
    pub fn new() -> Self {
        Self {
            count: Arc::new(TokioMutex::new(0)),
            _phantom: PhantomData,
        }
    }

    /// Get the current count
    pub async fn count(&self) -> u64 {
        *self.count.lock().await
    }
}

#[async_trait]
impl<T: Send + 'static> Consumer for CountSink<T> {
    type Item = T;

    async fn consume(&mut self, _item: Self::Item) -> Result<()> {
        *self.count.lock().await += 1;
        Ok(())
    }
}

impl<T> Default for CountSink<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for CountSink<T> {
    fn clone(&self) -> Self {
        Self {
            count: self.count.clone(),
            _phantom: PhantomData,
        }
    }
}

/// Tally of a [`ReportSink`] run.
#[derive(Debug, Clone, Default)]
pub struct Report {
    pub succeeded: u64,
    pub failed: u64,
    pub errors: Vec<Error>,
}

/// A sink for `Result` items that reports failures without stopping.
///
/// Successes are passed to the callback; failures are logged at `warn` and
/// kept in the [`Report`].
pub struct ReportSink<T, F> {
    on_success: F,
    report: Report,
    _phantom: PhantomData<fn(T)>,
}

impl<T, F> ReportSink<T, F>
where
    F: FnMut(T) + Send,
{
    /// Create a new report sink
    pub fn new(on_success: F) -> Self {
        Self {
            on_success,
            report: Report::default(),
            _phantom: PhantomData,
        }
    }

    pub fn report(&self) -> &Report {
        &self.report
    }

    pub fn into_report(self) -> Report {
        self.report
    }
}

#[async_trait]
impl<T, F> Consumer for ReportSink<T, F>
where
    T: Send + 'static,
    F: FnMut(T) + Send,
{
    type Item = Result<T>;

    async fn consume(&mut self, item: Self::Item) -> Result<()> {
        match item {
            Ok(value) => {
                self.report.succeeded += 1;
                (self.on_success)(value);
            }
            Err(e) => {
                tracing::warn!(error = %e, "item failed");
                self.report.failed += 1;
                self.report.errors.push(e);
            }
        }
        Ok(())
    }

    async fn finish(&mut self) -> Result<()> {
        tracing::info!(
            succeeded = self.report.succeeded,
            failed = self.report.failed,
            "stream drained"
        );
        Ok(())
    }
}
