//! Cancellation helper shared by every suspension point.

use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::error::AgentError;

/// Runs `fut` unless `cancel` fires first.
///
/// # Errors
///
/// Returns [`AgentError::Cancelled`] if the token is (or becomes) cancelled
/// before `fut` completes, otherwise whatever `fut` returns.
pub async fn cancellable<T, F>(cancel: &CancellationToken, fut: F) -> Result<T, AgentError>
where
    F: Future<Output = Result<T, AgentError>>,
{
    if cancel.is_cancelled() {
        return Err(AgentError::Cancelled);
    }
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(AgentError::Cancelled),
        result = fut => result,
    }
}
