//! Cancellation scope helpers.
//!
//! The cancellation scope is a [`CancellationToken`]. Callers create one at
//! the top level, pass clones into every primitive, and fire it once; there
//! is no way to reset it. Child tokens (`token.child_token()`) give a nested
//! scope that the parent can still cancel.

use std::future::Future;

pub use tokio_util::sync::{CancellationToken, DropGuard};

use crate::error::{Error, Result};

/// Race `future` against the cancellation scope.
///
/// Returns `Err(Error::Cancelled)` if the token fires first; the future is
/// dropped at that point.
pub async fn cancellable<F>(token: &CancellationToken, future: F) -> Result<F::Output>
where
    F: Future,
{
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(Error::Cancelled),
        output = future => Ok(output),
    }
}

/// Fire `token` when the process receives Ctrl-C.
///
/// Returns the handle of the listening task. The task exits without
/// cancelling if the token is cancelled by someone else first.
pub fn cancel_on_ctrl_c(token: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = token.cancelled() => {}
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    tracing::warn!(error = %e, "failed to listen for ctrl-c");
                    return;
                }
                tracing::info!("ctrl-c received, cancelling pipeline");
                token.cancel();
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn completes_when_not_cancelled() {
        let token = CancellationToken::new();
        let out = cancellable(&token, async { 7 }).await;
        assert_eq!(out.unwrap(), 7);
    }

    #[tokio::test]
    async fn cancelled_future_is_abandoned() {
        let token = CancellationToken::new();
        token.cancel();
        let out = cancellable(&token, tokio::time::sleep(Duration::from_secs(60))).await;
        assert!(matches!(out, Err(Error::Cancelled)));
    }

    #[tokio::test]
    async fn drop_guard_cancels_scope_on_exit() {
        let token = CancellationToken::new();
        {
            let _guard: DropGuard = token.clone().drop_guard();
        }
        assert!(token.is_cancelled());
    }
}
