//! Fan-out: run one stage on several workers that share an input stream.

use std::num::NonZeroUsize;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::error::{Error, Result};
use crate::group::WorkerGroup;
use crate::stream::{self, Stream};
use crate::telemetry::Primitive;
use crate::traits::Stage;

use super::relay;

/// Number of concurrent workers in a fan-out. Never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "usize", into = "usize")
)]
pub struct WorkerCount(NonZeroUsize);

impl WorkerCount {
    /// A worker count of `count`; zero is rejected.
    pub fn new(count: usize) -> Result<Self> {
        NonZeroUsize::new(count)
            .map(WorkerCount)
            .ok_or(Error::InvalidWorkerCount(count))
    }

    /// One worker per available parallel execution unit.
    pub fn available() -> Self {
        WorkerCount(std::thread::available_parallelism().unwrap_or(NonZeroUsize::MIN))
    }

    pub fn get(self) -> usize {
        self.0.get()
    }
}

impl Default for WorkerCount {
    fn default() -> Self {
        Self::available()
    }
}

impl TryFrom<usize> for WorkerCount {
    type Error = Error;

    fn try_from(count: usize) -> Result<Self> {
        Self::new(count)
    }
}

impl From<WorkerCount> for usize {
    fn from(count: WorkerCount) -> usize {
        count.get()
    }
}

impl std::fmt::Display for WorkerCount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fan `input` out over `workers` copies of `stage` and merge their outputs.
///
/// Each worker calls [`Stage::execute`] on its own clone of the input reader,
/// so every input item is taken by exactly one worker. The output buffers up
/// to `workers` items and closes after every worker's sub-stream has ended
/// and been relayed, or after cancellation has unwound them.
pub fn split<I, O, S>(
    token: &CancellationToken,
    stage: Arc<S>,
    input: Stream<I>,
    workers: WorkerCount,
) -> Stream<O>
where
    I: Send + 'static,
    O: Send + 'static,
    S: Stage<I, O> + ?Sized + 'static,
{
    split_with_capacity(token, stage, input, workers, workers.get())
}

/// [`split`] with an explicit output buffer size.
pub fn split_with_capacity<I, O, S>(
    token: &CancellationToken,
    stage: Arc<S>,
    input: Stream<I>,
    workers: WorkerCount,
    capacity: usize,
) -> Stream<O>
where
    I: Send + 'static,
    O: Send + 'static,
    S: Stage<I, O> + ?Sized + 'static,
{
    let (writer, output) = stream::bounded(capacity);
    let group = WorkerGroup::new();

    for worker_id in 0..workers.get() {
        let results = stage.execute(token, input.clone());
        let token = token.clone();
        let share = writer.share();
        group.spawn(
            async move {
                relay(&token, results, share, Primitive::Split).await;
            }
            .instrument(tracing::debug_span!("split_worker", worker = worker_id)),
        );
    }

    group.close_after(vec![writer]);
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::from_iter;
    use crate::stages::MapStage;
    use std::time::Duration;

    #[test]
    fn zero_workers_rejected() {
        assert!(matches!(
            WorkerCount::new(0),
            Err(Error::InvalidWorkerCount(0))
        ));
        assert_eq!(WorkerCount::new(3).unwrap().get(), 3);
        assert!(WorkerCount::available().get() >= 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn every_item_transformed_exactly_once() {
        let token = CancellationToken::new();
        let input = from_iter(&token, 0..100u32, 4);
        let stage = Arc::new(MapStage::new(|x: u32| x * 2));

        let mut out = split(&token, stage, input, WorkerCount::new(4).unwrap())
            .collect()
            .await;
        out.sort();
        assert_eq!(out, (0..100u32).map(|x| x * 2).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn cancellation_unwinds_workers() {
        let token = CancellationToken::new();
        let (_held, input) = stream::bounded::<u32>(1);
        let stage = Arc::new(MapStage::new(|x: u32| x + 1));
        let out = split(&token, stage, input, WorkerCount::new(3).unwrap());

        token.cancel();
        let end = tokio::time::timeout(Duration::from_secs(1), out.recv()).await;
        assert_eq!(end.unwrap(), None);
    }
}
