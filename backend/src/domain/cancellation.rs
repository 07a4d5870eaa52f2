//! Racing suspension points against the shared cancellation token.

use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::domain::Cancelled;

/// Drive `fut` to completion unless `cancel` fires first.
///
/// Cancellation is polled first, so an already-cancelled token wins even when
/// `fut` is immediately ready.
pub(crate) async fn until_cancelled<F>(
    cancel: &CancellationToken,
    fut: F,
) -> Result<F::Output, Cancelled>
where
    F: Future,
{
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(Cancelled),
        output = fut => Ok(output),
    }
}
