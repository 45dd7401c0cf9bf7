//! Core traits for stages and terminal consumers.
//!
//! A [`Stage`] turns one stream into another and is the unit a
//! [`Pipeline`](crate::pipeline::Pipeline) fans out over its workers. A
//! [`Consumer`] sits at the end of a pipeline and is fed by
//! [`drain`](crate::sinks::drain).

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::stream::Stream;

/// A stage consumes a stream and produces a transformed stream.
///
/// `execute` may be called any number of times, once per fan-out worker. Each
/// call must spawn whatever tasks it needs and return immediately; those
/// tasks must drain `input` until it ends or `token` fires, and then close the
/// returned stream. Several calls may share one input reader, in which case
/// they compete for its items.
///
/// # Examples
///
/// ```rust
/// use fanweld::prelude::*;
/// use fanweld::stream;
///
/// struct Upper;
///
/// impl Stage<String> for Upper {
///     fn execute(&self, token: &CancellationToken, input: Stream<String>) -> Stream<String> {
///         let (writer, output) = stream::bounded(1);
///         let token = token.clone();
///         tokio::spawn(async move {
///             while let Ok(Some(line)) = input.recv_or_cancel(&token).await {
///                 if writer.send_or_cancel(line.to_uppercase(), &token).await.is_err() {
///                     break;
///                 }
///             }
///             writer.close();
///         });
///         output
///     }
/// }
/// ```
pub trait Stage<I, O = I>: Send + Sync {
    /// Start transforming `input`; the returned stream closes once `input`
    /// is exhausted or `token` is cancelled.
    fn execute(&self, token: &CancellationToken, input: Stream<I>) -> Stream<O>;
}

impl<I, O, S> Stage<I, O> for Arc<S>
where
    S: Stage<I, O> + ?Sized,
{
    fn execute(&self, token: &CancellationToken, input: Stream<I>) -> Stream<O> {
        (**self).execute(token, input)
    }
}

impl<I, O, S> Stage<I, O> for Box<S>
where
    S: Stage<I, O> + ?Sized,
{
    fn execute(&self, token: &CancellationToken, input: Stream<I>) -> Stream<O> {
        (**self).execute(token, input)
    }
}

/// A consumer processes the items at the end of a pipeline.
///
/// # Examples
///
/// ```rust
/// use async_trait::async_trait;
/// use fanweld::error::Result;
/// use fanweld::traits::Consumer;
///
/// struct LogConsumer;
///
/// #[async_trait]
/// impl Consumer for LogConsumer {
///     type Item = String;
///
///     async fn consume(&mut self, item: Self::Item) -> Result<()> {
///         println!("Consumed: {}", item);
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Consumer {
    /// The type of items this consumer accepts
    type Item: Send + 'static;

    /// Process a single item.
    ///
    /// An `Err` here aborts the drain loop; per-item failures that should
    /// not stop the pipeline belong in the item itself.
    async fn consume(&mut self, item: Self::Item) -> Result<()>;

    /// Called when the upstream stream has closed and been drained.
    async fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}
