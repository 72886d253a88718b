//! TTL cache in front of the market-data fetcher

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::snapshot::{MarketContext, MarketSnapshot};
use crate::common::traits::MarketDataSource;

struct CachedSnapshot {
    fetched_at: Instant,
    snapshot: MarketSnapshot,
}

/// Serves the last good snapshot within its TTL and falls back to it on
/// upstream failure. Refreshes run under the slot lock, so callers that
/// arrive during a refresh wait for it instead of fetching again.
pub struct MarketContextCache {
    source: Arc<dyn MarketDataSource>,
    ttl: Duration,
    fetch_timeout: Duration,
    enabled: bool,
    slot: Mutex<Option<CachedSnapshot>>,
}

impl MarketContextCache {
    pub fn new(
        source: Arc<dyn MarketDataSource>,
        ttl: Duration,
        fetch_timeout: Duration,
        enabled: bool,
    ) -> Self {
        Self {
            source,
            ttl,
            fetch_timeout,
            enabled,
            slot: Mutex::new(None),
        }
    }

    /// A cache that never fetches and always yields `None`
    pub fn disabled(source: Arc<dyn MarketDataSource>) -> Self {
        Self::new(source, Duration::ZERO, Duration::from_secs(1), false)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Current context with basis computed against `current_price`
    pub async fn get(&self, current_price: Option<f64>) -> Option<MarketContext> {
        if !self.enabled {
            return None;
        }

        let mut slot = self.slot.lock().await;
        if let Some(cached) = slot.as_ref() {
            if cached.fetched_at.elapsed() < self.ttl {
                debug!("Market context served from cache");
                return Some(cached.snapshot.with_reference(current_price));
            }
        }

        match tokio::time::timeout(self.fetch_timeout, self.source.fetch_snapshot()).await {
            Ok(Ok(snapshot)) => {
                let context = snapshot.with_reference(current_price);
                *slot = Some(CachedSnapshot {
                    fetched_at: Instant::now(),
                    snapshot,
                });
                Some(context)
            }
            Ok(Err(e)) => {
                warn!("Market context refresh failed: {}", e);
                slot.as_ref()
                    .map(|cached| cached.snapshot.with_reference(current_price))
            }
            Err(_) => {
                warn!(
                    "Market context refresh timed out after {:?}",
                    self.fetch_timeout
                );
                slot.as_ref()
                    .map(|cached| cached.snapshot.with_reference(current_price))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::errors::TraderError;
    use crate::common::traits::MockMarketDataSource;
    use crate::market::snapshot::{FuturesSnapshot, Momentum, SpotTicker};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn snapshot(last_price: f64) -> MarketSnapshot {
        MarketSnapshot {
            source: "binance".to_string(),
            symbol: "ETHUSDT".to_string(),
            fetched_at: chrono::Utc::now(),
            spot: SpotTicker {
                last_price: Some(last_price),
                ..Default::default()
            },
            momentum: Momentum::default(),
            futures: FuturesSnapshot::default(),
        }
    }

    fn cache(source: MockMarketDataSource, ttl_secs: u64) -> MarketContextCache {
        MarketContextCache::new(
            Arc::new(source),
            Duration::from_secs(ttl_secs),
            Duration::from_secs(5),
            true,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_serves_cached_within_ttl() {
        let mut source = MockMarketDataSource::new();
        source
            .expect_fetch_snapshot()
            .times(1)
            .returning(|| Ok(snapshot(2500.0)));
        let cache = cache(source, 10);

        let first = cache.get(Some(2501.0)).await.unwrap();
        assert_eq!(first.relative.basis_vs_spot, Some(1.0));

        tokio::time::advance(Duration::from_secs(5)).await;
        let second = cache.get(Some(2498.0)).await.unwrap();
        // basis follows the new reference even on a cached read
        assert_eq!(second.relative.basis_vs_spot, Some(-2.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_returns_stale_copy_on_failure() {
        let mut source = MockMarketDataSource::new();
        let mut seq = mockall::Sequence::new();
        source
            .expect_fetch_snapshot()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(snapshot(2500.0)));
        source
            .expect_fetch_snapshot()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Err(TraderError::InvalidResponse("503".to_string())));
        let cache = cache(source, 10);

        cache.get(None).await.unwrap();
        tokio::time::advance(Duration::from_secs(11)).await;

        let stale = cache.get(None).await.unwrap();
        assert_eq!(stale.snapshot.spot.last_price, Some(2500.0));
    }

    #[tokio::test]
    async fn test_none_when_never_fetched() {
        let mut source = MockMarketDataSource::new();
        source
            .expect_fetch_snapshot()
            .returning(|| Err(TraderError::Timeout("upstream".to_string())));
        let cache = cache(source, 10);

        assert!(cache.get(Some(1.0)).await.is_none());
    }

    #[tokio::test]
    async fn test_disabled_never_fetches() {
        let mut source = MockMarketDataSource::new();
        source.expect_fetch_snapshot().never();
        let cache = MarketContextCache::disabled(Arc::new(source));

        assert!(!cache.is_enabled());
        assert!(cache.get(Some(1.0)).await.is_none());
    }

    struct SlowSource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl MarketDataSource for SlowSource {
        async fn fetch_snapshot(&self) -> crate::common::errors::Result<MarketSnapshot> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(snapshot(2500.0))
        }
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_fetch() {
        let source = Arc::new(SlowSource {
            calls: AtomicUsize::new(0),
        });
        let cache = Arc::new(MarketContextCache::new(
            source.clone(),
            Duration::from_secs(10),
            Duration::from_secs(5),
            true,
        ));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.get(Some(2500.0)).await })
            })
            .collect();
        for handle in handles {
            assert!(handle.await.unwrap().is_some());
        }

        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }
}
