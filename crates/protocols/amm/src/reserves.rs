//! Reserve Reader
//!
//! The only network-bound read in the quoting path. Each call returns an
//! independent snapshot; a short-lived cache may serve repeated reads.

use std::sync::Arc;
use std::time::Duration;

use bastion_core::{retry, ChainRead, PoolId, RetryPolicy, SnapshotCache};

use crate::state::{AmmError, PoolReserves};

pub struct ReserveReader {
    chain: Arc<dyn ChainRead>,
    cache: SnapshotCache<PoolId, PoolReserves>,
    retry: RetryPolicy,
}

impl ReserveReader {
    pub fn new(chain: Arc<dyn ChainRead>, retry: RetryPolicy) -> Self {
        Self::with_cache(chain, retry, SnapshotCache::disabled())
    }

    pub fn with_ttl(chain: Arc<dyn ChainRead>, retry: RetryPolicy, ttl: Duration) -> Self {
        Self::with_cache(chain, retry, SnapshotCache::new(ttl))
    }

    pub fn with_cache(
        chain: Arc<dyn ChainRead>,
        retry: RetryPolicy,
        cache: SnapshotCache<PoolId, PoolReserves>,
    ) -> Self {
        Self {
            chain,
            cache,
            retry,
        }
    }

    /// Reserves of `pool`, or `None` if it is not a pair or either side is empty.
    ///
    /// `force_refresh` bypasses the cache.
    pub async fn reserves(
        &self,
        pool: PoolId,
        force_refresh: bool,
    ) -> Result<Option<PoolReserves>, AmmError> {
        let snapshot = self
            .cache
            .get_or_fetch(pool, force_refresh, || async {
                let raw = retry(&self.retry, "getReserves", || self.chain.get_reserves(pool)).await?;
                Ok::<_, AmmError>(raw.and_then(|s| {
                    if s.reserve0.is_zero() || s.reserve1.is_zero() {
                        tracing::debug!(pool = %pool, "Pool has an empty reserve");
                        return None;
                    }
                    Some(PoolReserves {
                        pool,
                        token0: s.token0,
                        token1: s.token1,
                        reserve0: s.reserve0,
                        reserve1: s.reserve1,
                    })
                }))
            })
            .await?;
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockChain;
    use alloy_primitives::{Address, U256};
    use bastion_core::ManualClock;

    #[tokio::test]
    async fn test_reports_storage_order() {
        let chain = Arc::new(MockChain::new());
        let high = Address::repeat_byte(9);
        let low = Address::repeat_byte(1);
        // Added in request order (high, low); storage order is sorted
        let pool = chain.add_pool(high, low, U256::from(900), U256::from(100));

        let reader = ReserveReader::new(chain.clone(), RetryPolicy::none());
        let reserves = reader.reserves(pool, false).await.unwrap().unwrap();
        assert_eq!(reserves.token0, low);
        assert_eq!(reserves.reserve0, U256::from(100));
        assert_eq!(reserves.oriented(high).unwrap(), (U256::from(900), U256::from(100)));
    }

    #[tokio::test]
    async fn test_zero_reserve_is_absent() {
        let chain = Arc::new(MockChain::new());
        let pool = chain.add_pool(
            Address::repeat_byte(1),
            Address::repeat_byte(2),
            U256::ZERO,
            U256::from(100),
        );
        let reader = ReserveReader::new(chain.clone(), RetryPolicy::none());
        assert!(reader.reserves(pool, false).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unknown_pool_is_absent() {
        let chain = Arc::new(MockChain::new());
        let reader = ReserveReader::new(chain.clone(), RetryPolicy::none());
        let pool = PoolId::new(Address::repeat_byte(0x77));
        assert!(reader.reserves(pool, false).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cache_and_force_refresh() {
        let chain = Arc::new(MockChain::new());
        let a = Address::repeat_byte(1);
        let b = Address::repeat_byte(2);
        let pool = chain.add_pool(a, b, U256::from(1_000), U256::from(2_000));

        let clock = Arc::new(ManualClock::new(0));
        let cache = SnapshotCache::with_clock(Duration::from_secs(10), clock.clone());
        let reader = ReserveReader::with_cache(chain.clone(), RetryPolicy::none(), cache);

        let first = reader.reserves(pool, false).await.unwrap().unwrap();
        chain.set_reserves(a, b, U256::from(5_000), U256::from(6_000));

        // Stale but inside TTL
        let cached = reader.reserves(pool, false).await.unwrap().unwrap();
        assert_eq!(cached, first);

        let fresh = reader.reserves(pool, true).await.unwrap().unwrap();
        assert_eq!(fresh.reserve0, U256::from(5_000));

        chain.set_reserves(a, b, U256::from(7_000), U256::from(8_000));
        clock.advance(Duration::from_secs(10));
        let expired = reader.reserves(pool, false).await.unwrap().unwrap();
        assert_eq!(expired.reserve0, U256::from(7_000));
    }

    #[tokio::test]
    async fn test_transient_failure_escalates_after_retries() {
        let chain = Arc::new(MockChain::new());
        let pool = chain.add_pool(
            Address::repeat_byte(1),
            Address::repeat_byte(2),
            U256::from(1),
            U256::from(1),
        );
        chain.fail_next_reads(5);
        let reader = ReserveReader::new(chain.clone(), RetryPolicy::immediate(3));
        assert!(matches!(
            reader.reserves(pool, false).await,
            Err(AmmError::Node(_))
        ));
    }
}
