//! Fan-in, fan-out and tee topologies over [`Stream`]s.
//!
//! Every primitive follows the same shape: spawn tracked tasks that relay
//! items into a shared output, then let a finalizer close the output once the
//! join barrier reaches zero. Each blocking read and write races the
//! cancellation token, so a fired token drains the barrier and the outputs
//! still close.

pub mod merge;
pub mod split;
pub mod tee;

pub use merge::{merge, merge_with_capacity};
pub use split::{split, split_with_capacity, WorkerCount};
pub use tee::{tee, tee_streams};

use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::stream::{Stream, StreamWriter};
use crate::telemetry::{self, Primitive};

/// Forward every item of `input` into `output` until the input ends, the
/// token fires or every reader of `output` has gone.
pub(crate) async fn relay<T>(
    token: &CancellationToken,
    input: Stream<T>,
    output: StreamWriter<T>,
    primitive: Primitive,
) -> u64 {
    let mut forwarded = 0u64;
    let outcome: Result<()> = async {
        while let Some(item) = input.recv_or_cancel(token).await? {
            output.send_or_cancel(item, token).await?;
            forwarded += 1;
        }
        Ok(())
    }
    .await;

    match outcome {
        Ok(()) => telemetry::task_finished(primitive, forwarded, false),
        Err(Error::Cancelled) => telemetry::task_finished(primitive, forwarded, true),
        Err(e) => {
            tracing::debug!(primitive = primitive.as_str(), error = %e, "downstream dropped");
            telemetry::task_finished(primitive, forwarded, false);
        }
    }
    forwarded
}
