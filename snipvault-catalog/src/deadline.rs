//! Per-call deadlines and the shared backend handles.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use snipvault_core::{CatalogError, CatalogResult};
use snipvault_storage::{CatalogStore, ResponseCache, SearchIndex};

/// Run one backend call under a deadline.
///
/// An elapsed deadline drops the call and surfaces `CatalogError::Timeout`
/// naming the operation.
pub async fn with_deadline<T, F>(timeout: Duration, operation: &str, call: F) -> CatalogResult<T>
where
    F: Future<Output = CatalogResult<T>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(operation, timeout_ms = timeout.as_millis() as u64, "backend call timed out");
            Err(CatalogError::Timeout {
                operation: operation.to_string(),
                after: timeout,
            })
        }
    }
}

/// The three backing services plus the deadline applied to each call.
#[derive(Clone)]
pub struct Backends {
    pub store: Arc<dyn CatalogStore>,
    pub index: Arc<dyn SearchIndex>,
    pub cache: ResponseCache,
    pub timeout: Duration,
}

impl std::fmt::Debug for Backends {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backends")
            .field("cache", &self.cache)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl Backends {
    /// Shorthand for [`with_deadline`] with the configured timeout.
    pub async fn call<T, F>(&self, operation: &str, call: F) -> CatalogResult<T>
    where
        F: Future<Output = CatalogResult<T>>,
    {
        with_deadline(self.timeout, operation, call).await
    }
}
