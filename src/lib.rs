//! # Fan-out, fan-in and tee pipelines for Rust
//!
//! This crate provides the synchronization core for composing concurrent,
//! multi-stage pipelines out of three primitives, built on tokio tasks and
//! closeable streams.
//!
//! ## Core Concepts
//!
//! - **Stream**: a closeable channel; reads return `None` once it is closed and drained
//! - **Merge** (fan-in): many streams into one, closed after every input closed
//! - **Split** (fan-out): one stream worked by several copies of a stage
//! - **Tee**: every item of one stream delivered to several sinks
//! - **Stage**: consumes a stream and produces a transformed stream
//! - **Pipeline**: an ordered list of stages, each one fanned out
//! - **Cancellation**: one `CancellationToken` threads through everything
//!
//! Whenever several tasks write into one stream, a join barrier counts them
//! and a single finalizer closes the stream once the last one returns, so a
//! stream is never closed early, twice, or under a live writer.
//!
//! ## Example
//!
//! ```rust
//! use fanweld::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let token = CancellationToken::new();
//!
//!     let first = from_iter(&token, 0..50, 10);
//!     let second = from_iter(&token, 50..100, 10);
//!     let input = merge(&token, vec![first, second]);
//!
//!     let mut pipeline = Pipeline::new();
//!     pipeline
//!         .add_stage(MapStage::new(|x: i64| x * 2))
//!         .add_stage(FilterStage::new(|x: &i64| x % 3 == 0));
//!
//!     let mut sink = CountSink::new();
//!     drain(&token, pipeline.execute(&token, input), &mut sink).await?;
//!     assert_eq!(sink.count().await, 34);
//!     Ok(())
//! }
//! ```

pub mod cancel;
pub mod error;
pub mod group;
pub mod pipeline;
pub mod sinks;
pub mod sources;
pub mod stages;
pub mod stream;
pub mod topology;
pub mod traits;

mod telemetry;

// Re-export commonly used items
pub mod prelude {
    pub use crate::cancel::{cancellable, CancellationToken};
    pub use crate::error::{Error, Result};
    pub use crate::pipeline::{Pipeline, PipelineConfig};
    pub use crate::sinks::{
        drain, CollectSink, CountSink, PrintSink, Report, ReportSink,
    };
    pub use crate::sources::{from_iter, interval};
    pub use crate::stages::{
        AndThenStage, DelayStage, FilterStage, MapStage, ThenStage, TryThenStage,
    };
    pub use crate::stream::{Stream, StreamWriter};
    pub use crate::topology::{merge, split, tee, tee_streams, WorkerCount};
    pub use crate::traits::{Consumer, Stage};
}

// Re-export main error type
pub use error::{Error, Result};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
