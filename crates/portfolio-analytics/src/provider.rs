//! Price Series Provider
//!
//! Cached access to per-asset price series.
//!
//! ```text
//! get(asset)
//!     │
//!     ▼
//! fresh entry? ── yes ──▶ return Arc<PriceSeries>
//!     │ no
//!     ▼
//! per-asset fetch lock   ← concurrent misses queue here
//!     │
//!     ▼
//! fresh entry now? ── yes ──▶ return (another caller fetched it)
//!     │ no
//!     ▼
//! failed while we waited? ── yes ──▶ return the same DataSourceUnavailable
//!     │ no
//!     ▼
//! fetch with timeout, retry up to max_retries
//!     │
//!     ▼
//! normalize, store, return
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::config::AnalyticsConfig;
use crate::error::{AnalyticsError, Result};
use crate::model::{AssetId, PricePoint, PriceSeries};
use crate::source::PriceSource;

/// A cached series and when it was fetched
#[derive(Clone, Debug)]
struct CacheEntry {
    series: Arc<PriceSeries>,
    fetched_at: Instant,
}

/// Outcome of the last fetch for an asset that exhausted its attempts
#[derive(Clone, Debug)]
struct FailedFetch {
    finished_at: Instant,
    attempts: u32,
    reason: String,
}

impl FailedFetch {
    fn to_error(&self, asset: AssetId) -> AnalyticsError {
        AnalyticsError::DataSourceUnavailable {
            asset,
            attempts: self.attempts,
            reason: self.reason.clone(),
        }
    }
}

/// Per-asset fetch lock; the guarded value is the last failure
type FetchSlot = Arc<Mutex<Option<FailedFetch>>>;

/// Fetch and retry policy
#[derive(Clone, Copy, Debug)]
pub struct FetchPolicy {
    pub ttl: Duration,
    pub timeout: Duration,
    pub max_retries: u32,
    pub backoff: Duration,
}

impl From<&AnalyticsConfig> for FetchPolicy {
    fn from(config: &AnalyticsConfig) -> Self {
        Self {
            ttl: config.cache_ttl,
            timeout: config.fetch_timeout,
            max_retries: config.max_retries,
            backoff: config.retry_backoff,
        }
    }
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self::from(&AnalyticsConfig::default())
    }
}

/// Cache of price series keyed by asset
pub struct PriceSeriesProvider {
    source: Arc<dyn PriceSource>,
    policy: FetchPolicy,
    entries: RwLock<HashMap<AssetId, CacheEntry>>,
    fetch_slots: Mutex<HashMap<AssetId, FetchSlot>>,
}

impl PriceSeriesProvider {
    pub fn new(source: Arc<dyn PriceSource>, policy: FetchPolicy) -> Self {
        Self {
            source,
            policy,
            entries: RwLock::new(HashMap::new()),
            fetch_slots: Mutex::new(HashMap::new()),
        }
    }

    pub fn policy(&self) -> FetchPolicy {
        self.policy
    }

    /// Series for an asset, served from cache while fresh.
    ///
    /// Concurrent misses share one upstream fetch: callers queued behind an
    /// in-flight fetch get its series, or its `DataSourceUnavailable`.
    #[instrument(skip(self))]
    pub async fn get(&self, asset: AssetId) -> Result<Arc<PriceSeries>> {
        if let Some(series) = self.fresh(asset).await {
            debug!(%asset, "Price cache hit");
            return Ok(series);
        }

        let waiting_since = Instant::now();
        let slot = self.fetch_slot(asset).await;
        let mut last_failure = slot.lock().await;

        // a concurrent miss may have filled the entry while we waited
        if let Some(series) = self.fresh(asset).await {
            debug!(%asset, "Price cache filled by concurrent fetch");
            return Ok(series);
        }

        if let Some(failed) = last_failure
            .as_ref()
            .filter(|failed| failed.finished_at >= waiting_since)
        {
            debug!(%asset, "Concurrent fetch failed, sharing its error");
            return Err(failed.to_error(asset));
        }

        self.fetch_and_store(asset, &mut last_failure).await
    }

    /// Fetch now regardless of freshness and replace the entry
    pub async fn refresh(&self, asset: AssetId) -> Result<Arc<PriceSeries>> {
        let slot = self.fetch_slot(asset).await;
        let mut last_failure = slot.lock().await;
        self.fetch_and_store(asset, &mut last_failure).await
    }

    /// Drop the cached entry for an asset
    pub async fn invalidate(&self, asset: AssetId) {
        self.entries.write().await.remove(&asset);
    }

    pub async fn invalidate_all(&self) {
        self.entries.write().await.clear();
    }

    /// Number of cached entries, fresh or stale
    pub async fn cached_len(&self) -> usize {
        self.entries.read().await.len()
    }

    async fn fresh(&self, asset: AssetId) -> Option<Arc<PriceSeries>> {
        let entries = self.entries.read().await;
        entries
            .get(&asset)
            .filter(|entry| entry.fetched_at.elapsed() < self.policy.ttl)
            .map(|entry| Arc::clone(&entry.series))
    }

    async fn fetch_slot(&self, asset: AssetId) -> FetchSlot {
        let mut slots = self.fetch_slots.lock().await;
        Arc::clone(slots.entry(asset).or_default())
    }

    async fn fetch_and_store(
        &self,
        asset: AssetId,
        last_failure: &mut Option<FailedFetch>,
    ) -> Result<Arc<PriceSeries>> {
        let points = match self.fetch_with_retry(asset).await {
            Ok(points) => {
                *last_failure = None;
                points
            }
            Err(failed) => {
                let err = failed.to_error(asset);
                *last_failure = Some(failed);
                return Err(err);
            }
        };
        let series = Arc::new(PriceSeries::from_unsorted(points)?);

        info!(
            %asset,
            source = self.source.name(),
            points = series.len(),
            "Price series cached"
        );

        self.entries.write().await.insert(
            asset,
            CacheEntry {
                series: Arc::clone(&series),
                fetched_at: Instant::now(),
            },
        );
        Ok(series)
    }

    async fn fetch_with_retry(
        &self,
        asset: AssetId,
    ) -> std::result::Result<Vec<PricePoint>, FailedFetch> {
        let max_attempts = self.policy.max_retries.saturating_add(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let outcome =
                match tokio::time::timeout(self.policy.timeout, self.source.fetch_history(asset))
                    .await
                {
                    Ok(result) => result,
                    Err(_) => Err(AnalyticsError::Timeout),
                };

            match outcome {
                Ok(points) => return Ok(points),
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    warn!(%asset, attempt, error = %e, "Price fetch failed, retrying");
                    tokio::time::sleep(self.policy.backoff).await;
                }
                Err(e) => {
                    warn!(%asset, attempt, error = %e, "Price fetch failed");
                    return Err(FailedFetch {
                        finished_at: Instant::now(),
                        attempts: attempt,
                        reason: e.to_string(),
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::InMemoryPriceSource;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn policy(ttl_secs: u64) -> FetchPolicy {
        FetchPolicy {
            ttl: Duration::from_secs(ttl_secs),
            timeout: Duration::from_secs(1),
            max_retries: 2,
            backoff: Duration::from_millis(10),
        }
    }

    /// Counts fetches; fails the first `failures` calls, sleeps `delay` per call
    struct CountingSource {
        calls: AtomicU32,
        failures: u32,
        delay: Duration,
        retryable: bool,
    }

    impl CountingSource {
        fn new(failures: u32, delay: Duration) -> Self {
            Self {
                calls: AtomicU32::new(0),
                failures,
                delay,
                retryable: true,
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PriceSource for CountingSource {
        async fn fetch_history(&self, _asset: AssetId) -> Result<Vec<PricePoint>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            tokio::time::sleep(self.delay).await;
            if call <= self.failures {
                return if self.retryable {
                    Err(AnalyticsError::Fetch(format!("upstream 503 on call {call}")))
                } else {
                    Err(AnalyticsError::Config("bad symbol".into()))
                };
            }
            let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
            Ok(vec![
                PricePoint::new(day.succ_opt().unwrap(), 11.0),
                PricePoint::new(day, 10.0),
            ])
        }

        fn name(&self) -> &str {
            "Counting"
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_hit_within_ttl() {
        let source = Arc::new(CountingSource::new(0, Duration::ZERO));
        let provider = PriceSeriesProvider::new(source.clone(), policy(60));

        let first = provider.get(AssetId::Btcusd).await.unwrap();
        let second = provider.get(AssetId::Btcusd).await.unwrap();

        assert_eq!(source.calls(), 1);
        assert!(Arc::ptr_eq(&first, &second));
        // normalized into ascending order
        assert_eq!(first.first().price, 10.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entry_refetched() {
        let source = Arc::new(CountingSource::new(0, Duration::ZERO));
        let provider = PriceSeriesProvider::new(source.clone(), policy(60));

        provider.get(AssetId::Vn30).await.unwrap();
        tokio::time::advance(Duration::from_secs(61)).await;
        provider.get(AssetId::Vn30).await.unwrap();

        assert_eq!(source.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_misses_coalesce() {
        let source = Arc::new(CountingSource::new(0, Duration::from_millis(200)));
        let provider = Arc::new(PriceSeriesProvider::new(source.clone(), policy(60)));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let provider = Arc::clone(&provider);
                tokio::spawn(async move { provider.get(AssetId::Xautusd).await })
            })
            .collect();

        for task in tasks {
            task.await.unwrap().unwrap();
        }
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_misses_share_failure() {
        let source = Arc::new(CountingSource::new(1000, Duration::from_millis(100)));
        let provider = Arc::new(PriceSeriesProvider::new(source.clone(), policy(60)));

        let started = Instant::now();
        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let provider = Arc::clone(&provider);
                tokio::spawn(async move { provider.get(AssetId::Xautusd).await })
            })
            .collect();

        for task in tasks {
            let err = task.await.unwrap().unwrap_err();
            assert!(matches!(
                err,
                AnalyticsError::DataSourceUnavailable { attempts: 3, .. }
            ));
        }
        // one retry budget in total, not one per caller
        assert_eq!(source.calls(), 3);
        assert!(started.elapsed() < Duration::from_secs(1));

        // a miss arriving after the failure tries upstream again
        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(provider.get(AssetId::Xautusd).await.is_err());
        assert_eq!(source.calls(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_then_succeeds() {
        let source = Arc::new(CountingSource::new(2, Duration::ZERO));
        let provider = PriceSeriesProvider::new(source.clone(), policy(60));

        let series = provider.get(AssetId::Btcusd).await.unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_surface_unavailable() {
        let source = Arc::new(CountingSource::new(10, Duration::ZERO));
        let provider = PriceSeriesProvider::new(source.clone(), policy(60));

        let err = provider.get(AssetId::Btcusd).await.unwrap_err();
        assert!(matches!(
            err,
            AnalyticsError::DataSourceUnavailable { asset: AssetId::Btcusd, attempts: 3, .. }
        ));
        assert_eq!(source.calls(), 3);
        assert_eq!(provider.cached_len().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_counts_as_failed_attempt() {
        let source = Arc::new(CountingSource::new(0, Duration::from_secs(5)));
        let provider = PriceSeriesProvider::new(source.clone(), policy(60));

        let err = provider.get(AssetId::Vn30).await.unwrap_err();
        match err {
            AnalyticsError::DataSourceUnavailable { attempts, reason, .. } => {
                assert_eq!(attempts, 3);
                assert!(reason.contains("timed out"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_fails_fast() {
        let mut source = CountingSource::new(10, Duration::ZERO);
        source.retryable = false;
        let source = Arc::new(source);
        let provider = PriceSeriesProvider::new(source.clone(), policy(60));

        let err = provider.get(AssetId::Vn30).await.unwrap_err();
        assert!(matches!(err, AnalyticsError::DataSourceUnavailable { attempts: 1, .. }));
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_invalidate_and_refresh() {
        let source = Arc::new(InMemoryPriceSource::sample());
        let provider = PriceSeriesProvider::new(source, policy(3600));

        for asset in AssetId::ALL {
            provider.get(asset).await.unwrap();
        }
        assert_eq!(provider.cached_len().await, 3);

        provider.invalidate(AssetId::Vn30).await;
        assert_eq!(provider.cached_len().await, 2);

        let refreshed = provider.refresh(AssetId::Vn30).await.unwrap();
        assert_eq!(refreshed.len(), 180);
        assert_eq!(provider.cached_len().await, 3);

        provider.invalidate_all().await;
        assert_eq!(provider.cached_len().await, 0);
    }
}
