use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

use super::api::{ClientError, WorkspaceApi};
use crate::usage::UsageSummary;

pub const CACHE_TTL: Duration = Duration::from_secs(30);

/// Cached view of `GET /api/usage` for the usage meter.
pub struct UsageTracker {
    api: Arc<dyn WorkspaceApi>,
    ttl: Duration,
    cached: Mutex<Option<(Instant, UsageSummary)>>,
    fetching: AtomicBool,
}

struct FetchGuard<'a>(&'a AtomicBool);

impl Drop for FetchGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl UsageTracker {
    pub fn new(api: Arc<dyn WorkspaceApi>) -> Self {
        Self::with_ttl(api, CACHE_TTL)
    }

    pub fn with_ttl(api: Arc<dyn WorkspaceApi>, ttl: Duration) -> Self {
        Self {
            api,
            ttl,
            cached: Mutex::new(None),
            fetching: AtomicBool::new(false),
        }
    }

    pub async fn current(&self) -> Option<UsageSummary> {
        self.cached.lock().await.as_ref().map(|(_, summary)| summary.clone())
    }

    async fn is_fresh(&self) -> bool {
        matches!(&*self.cached.lock().await, Some((at, _)) if at.elapsed() < self.ttl)
    }

    /// Window focus or tab visibility: refetch only when the cache is stale.
    pub async fn on_focus(&self) -> Result<Option<UsageSummary>, ClientError> {
        if self.is_fresh().await {
            return Ok(self.current().await);
        }
        self.fetch().await
    }

    /// Explicit refresh ignores the cache.
    pub async fn refresh(&self) -> Result<Option<UsageSummary>, ClientError> {
        self.fetch().await
    }

    async fn fetch(&self) -> Result<Option<UsageSummary>, ClientError> {
        if self.fetching.swap(true, Ordering::AcqRel) {
            tracing::debug!("Usage fetch already in flight");
            return Ok(self.current().await);
        }
        let _guard = FetchGuard(&self.fetching);

        let summary = self.api.fetch_usage().await?;
        *self.cached.lock().await = Some((Instant::now(), summary.clone()));
        Ok(Some(summary))
    }
}
