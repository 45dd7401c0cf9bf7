//! Pipeline orchestration and execution.
//!
//! A pipeline is an ordered list of stages. Executing it wraps every stage in
//! a fan-out ([`split`]) and chains them, so each stage runs on its own group
//! of workers and items flow to the next stage as soon as they are ready.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::stream::Stream;
use crate::topology::split::{split_with_capacity, WorkerCount};
use crate::traits::Stage;

/// Configuration for pipeline execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PipelineConfig {
    /// Workers fanned out per stage
    pub workers: WorkerCount,
    /// Output buffer of each stage's fan-out; `None` matches the worker count
    pub buffer_size: Option<usize>,
}

impl PipelineConfig {
    /// Effective output buffer of each stage
    pub fn stage_buffer(&self) -> usize {
        self.buffer_size.unwrap_or(self.workers.get())
    }
}

/// An ordered sequence of stages over items of type `T`.
///
/// # Examples
///
/// ```rust
/// use fanweld::prelude::*;
///
/// # #[tokio::main] async fn main() {
/// let token = CancellationToken::new();
/// let mut pipeline = Pipeline::new();
/// pipeline
///     .add_stage(MapStage::new(|s: String| s + " -> Stage1"))
///     .add_stage(MapStage::new(|s: String| s + " -> Stage2"));
///
/// let input = from_iter(&token, vec!["file1".to_string()], 1);
/// let out = pipeline.execute(&token, input).collect().await;
/// assert_eq!(out, vec!["file1 -> Stage1 -> Stage2".to_string()]);
/// # }
/// ```
pub struct Pipeline<T> {
    stages: Vec<Arc<dyn Stage<T>>>,
    config: PipelineConfig,
}

impl<T> Pipeline<T>
where
    T: Send + 'static,
{
    /// Create an empty pipeline using every available CPU per stage
    pub fn new() -> Self {
        Self::with_config(PipelineConfig::default())
    }

    /// Create an empty pipeline with an explicit configuration
    pub fn with_config(config: PipelineConfig) -> Self {
        Self {
            stages: Vec::new(),
            config,
        }
    }

    /// Append a stage and return the same pipeline for chaining
    pub fn add_stage<S>(&mut self, stage: S) -> &mut Self
    where
        S: Stage<T> + 'static,
    {
        self.stages.push(Arc::new(stage));
        self
    }

    /// Append a stage that is already shared elsewhere
    pub fn add_shared_stage(&mut self, stage: Arc<dyn Stage<T>>) -> &mut Self {
        self.stages.push(stage);
        self
    }

    /// Set the number of workers fanned out per stage
    pub fn workers(&mut self, workers: WorkerCount) -> &mut Self {
        self.config.workers = workers;
        self
    }

    /// Set the output buffer of each stage's fan-out
    pub fn buffer_size(&mut self, size: usize) -> &mut Self {
        self.config.buffer_size = Some(size);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Number of stages
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Run every stage over `input` and return the final stream.
    ///
    /// Each stage is fanned out over the configured workers; stage `i + 1`
    /// starts consuming as soon as stage `i` emits. An item always visits the
    /// stages in the order they were added, but items may overtake each
    /// other. With no stages the input is returned unchanged.
    pub fn execute(&self, token: &CancellationToken, input: Stream<T>) -> Stream<T> {
        let workers = self.config.workers;
        let buffer = self.config.stage_buffer();
        tracing::debug!(
            stages = self.stages.len(),
            workers = workers.get(),
            "executing pipeline"
        );

        self.stages.iter().fold(input, |previous, stage| {
            split_with_capacity(token, stage.clone(), previous, workers, buffer)
        })
    }
}

impl<T: Send + 'static> Default for Pipeline<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for Pipeline<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stages.len())
            .field("config", &self.config)
            .finish()
    }
}
