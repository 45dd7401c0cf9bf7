//! Join barrier for a group of tasks producing into shared streams.

use std::future::Future;

use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;

use crate::stream::StreamWriter;

/// A set of concurrently running tasks that jointly feed downstream streams.
///
/// The group counts its tasks; the count drops when a task returns, whether it
/// finished its input, hit an error, was cancelled or panicked. Once the group
/// is sealed with [`WorkerGroup::close_after`], a finalizer waits for the
/// count to reach zero and then closes the downstream writers, which is the
/// only place those streams are ever closed.
#[derive(Debug, Clone, Default)]
pub struct WorkerGroup {
    tracker: TaskTracker,
}

impl WorkerGroup {
    /// Create an empty group
    pub fn new() -> Self {
        Self {
            tracker: TaskTracker::new(),
        }
    }

    /// Spawn a task counted by the barrier
    pub fn spawn<F>(&self, task: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.tracker.spawn(task)
    }

    /// Number of tasks that have not yet returned
    pub fn len(&self) -> usize {
        self.tracker.len()
    }

    /// Whether every spawned task has returned
    pub fn is_empty(&self) -> bool {
        self.tracker.is_empty()
    }

    /// Wait until the group is sealed and every task has returned.
    pub async fn wait(&self) {
        self.tracker.wait().await
    }

    /// Seal the group and close `writers` once every task has returned.
    ///
    /// All writers are closed back to back by the same finalizer, after the
    /// last task is gone. Returns the finalizer's handle.
    pub fn close_after<T>(self, writers: Vec<StreamWriter<T>>) -> JoinHandle<()>
    where
        T: Send + 'static,
    {
        self.tracker.close();
        tokio::spawn(async move {
            self.tracker.wait().await;
            for writer in writers {
                writer.close();
            }
        })
    }
}
