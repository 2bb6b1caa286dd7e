//! Fail-open utilities for side work that must never decide a run
//!
//! Screenshots and similar artifacts are best-effort. A failure there is
//! logged and swallowed so the verdict still gets reported.
//!
//! DO NOT use fail-open for:
//! - Navigation (a fault there is a NavigationError)
//! - The page snapshot (the verdict depends on it)

use std::future::Future;
use tracing::warn;

use crate::Result;

/// Execute an operation that should fail open
///
/// Logs the error via `tracing::warn!` on failure and returns `None`.
///
/// # Usage
///
/// ```no_run
/// use viewcheck_core::fail_open::fail_open;
/// use viewcheck_core::Result;
///
/// async fn save_capture() -> Result<()> {
///     Ok(())
/// }
///
/// async fn example() {
///     let saved = fail_open("screenshot", || save_capture()).await;
///     // saved is None if save_capture() failed
/// }
/// ```
pub async fn fail_open<F, Fut, T>(operation_name: &str, f: F) -> Option<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    match f().await {
        Ok(val) => Some(val),
        Err(e) => {
            warn!("{} failed (fail-open): {}", operation_name, e);
            None
        }
    }
}
