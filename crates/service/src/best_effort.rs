//! Wrappers for operations whose failure must never reach the caller.
//!
//! Favicon version lookups, orphan deletion and cache writes are enrichments:
//! a failure is logged and counted, and the caller gets `None`.

use std::fmt::Display;
use std::future::Future;

use tracing::warn;

use crate::metrics;

/// Run `fut`, returning `Some` on success; on error log at `warn` and return `None`.
pub async fn best_effort<T, E, Fut>(operation: &'static str, fut: Fut) -> Option<T>
where
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    match fut.await {
        Ok(v) => Some(v),
        Err(e) => {
            metrics::BEST_EFFORT_FAILURES_TOTAL.with_label_values(&[operation]).inc();
            warn!(operation, error = %e, "best-effort operation failed");
            None
        }
    }
}
