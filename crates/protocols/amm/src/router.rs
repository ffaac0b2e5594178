//! Router: Multi-Hop Path Search & Quoting
//!
//! Enumerates direct and hub-bridged paths between two assets, quotes each
//! one hop by hop against fresh reserves, and picks the path with the
//! greatest output.

use std::collections::HashSet;

use alloy_primitives::{Address, U256};
use bastion_core::constants::MAX_HOPS;
use bastion_core::Asset;
use futures::future::join_all;

use crate::calculator::{get_amount_out, get_amounts_in, price_impact_bps};
use crate::locator::PoolLocator;
use crate::normalizer::AssetNormalizer;
use crate::reserves::ReserveReader;
use crate::state::{AmmError, HopQuote, PoolReserves, Route, RouteResult};

// ---------------------------------------------------------------------------
// Step 1: Candidate Enumeration
// ---------------------------------------------------------------------------

/// Clamp a requested hop bound into `1..=3`
pub fn clamp_hops(max_hops: usize) -> usize {
    max_hops.clamp(1, MAX_HOPS)
}

/// Enumerate candidate paths in fixed order: direct, then one hub in hub
/// order, then ordered pairs of distinct hubs.
///
/// Hubs equal to either endpoint (after normalization) are skipped, and hubs
/// that normalize to the same address as an earlier hub are ignored.
pub fn candidate_paths(
    token_in: &Asset,
    token_out: &Asset,
    hubs: &[Asset],
    max_hops: usize,
    normalizer: &AssetNormalizer,
) -> Vec<Vec<Asset>> {
    let max_hops = clamp_hops(max_hops);
    let endpoint_in = normalizer.normalize(&token_in.id);
    let endpoint_out = normalizer.normalize(&token_out.id);

    let mut seen = HashSet::new();
    let hubs: Vec<&Asset> = hubs
        .iter()
        .filter(|h| {
            let addr = normalizer.normalize(&h.id);
            addr != endpoint_in && addr != endpoint_out && seen.insert(addr)
        })
        .collect();

    let mut paths = vec![vec![token_in.clone(), token_out.clone()]];

    if max_hops >= 2 {
        for hub in &hubs {
            paths.push(vec![token_in.clone(), (*hub).clone(), token_out.clone()]);
        }
    }

    if max_hops >= 3 {
        for (i, h1) in hubs.iter().enumerate() {
            for (j, h2) in hubs.iter().enumerate() {
                if i == j {
                    continue;
                }
                paths.push(vec![
                    token_in.clone(),
                    (*h1).clone(),
                    (*h2).clone(),
                    token_out.clone(),
                ]);
            }
        }
    }

    paths
}

// ---------------------------------------------------------------------------
// Step 2: Router
// ---------------------------------------------------------------------------

pub struct Router {
    normalizer: AssetNormalizer,
    locator: PoolLocator,
    reader: ReserveReader,
    hubs: Vec<Asset>,
}

impl Router {
    pub fn new(
        normalizer: AssetNormalizer,
        locator: PoolLocator,
        reader: ReserveReader,
        hubs: Vec<Asset>,
    ) -> Self {
        Self {
            normalizer,
            locator,
            reader,
            hubs,
        }
    }

    pub fn normalizer(&self) -> &AssetNormalizer {
        &self.normalizer
    }

    pub fn hubs(&self) -> &[Asset] {
        &self.hubs
    }

    /// Find the best route from `token_in` to `token_out`.
    ///
    /// Candidates that hit a missing pool, an empty reserve or arithmetic
    /// overflow are dropped; finding nothing is a normal result with
    /// `best_route: None`. Node failures that survive the retry policy abort
    /// the search.
    pub async fn find_routes(
        &self,
        token_in: &Asset,
        token_out: &Asset,
        amount_in: U256,
        max_hops: usize,
    ) -> Result<RouteResult, AmmError> {
        if amount_in.is_zero() {
            return Err(AmmError::InsufficientInput);
        }
        if self.normalizer.same_pool_asset(&token_in.id, &token_out.id) {
            return Err(AmmError::InvalidPath(format!(
                "{} and {} are the same pool asset",
                token_in, token_out
            )));
        }

        let candidates = candidate_paths(token_in, token_out, &self.hubs, max_hops, &self.normalizer);
        tracing::debug!(
            "Evaluating {} candidate paths {} -> {}",
            candidates.len(),
            token_in,
            token_out
        );

        // Candidates are independent; join_all keeps enumeration order
        let evaluations = join_all(
            candidates
                .iter()
                .map(|path| self.quote_path(path, amount_in, false)),
        )
        .await;

        let mut all_routes = Vec::new();
        for (path, evaluation) in candidates.iter().zip(evaluations) {
            match evaluation {
                Ok(route) => all_routes.push(route),
                Err(e) if e.prunes_candidate() => {
                    tracing::debug!("Pruned {}: {}", describe(path), e);
                }
                Err(e) => return Err(e),
            }
        }

        let best_route = select_best(&all_routes).cloned();
        match &best_route {
            Some(route) => tracing::info!(
                "Best route {} ({} of {} candidates quoted)",
                route,
                all_routes.len(),
                candidates.len()
            ),
            None => tracing::info!("No route {} -> {}", token_in, token_out),
        }

        Ok(RouteResult {
            best_route,
            all_routes,
        })
    }

    /// Quote a fixed path for an exact input, hop by hop.
    ///
    /// Per-hop impacts are summed into the route total.
    pub async fn quote_path(
        &self,
        path: &[Asset],
        amount_in: U256,
        force_refresh: bool,
    ) -> Result<Route, AmmError> {
        let tokens = self.normalizer.normalize_path(path)?;
        let mut hops = Vec::with_capacity(tokens.len() - 1);
        let mut current = amount_in;

        for pair in tokens.windows(2) {
            let (token_in, token_out) = (pair[0], pair[1]);
            let reserves = self.hop_reserves(token_in, token_out, force_refresh).await?;
            let (reserve_in, reserve_out) = reserves.oriented(token_in)?;

            let amount_out = get_amount_out(current, reserve_in, reserve_out)?;
            let impact = price_impact_bps(current, amount_out, reserve_in, reserve_out)?;
            hops.push(HopQuote {
                pool: reserves.pool,
                token_in,
                token_out,
                reserve_in,
                reserve_out,
                amount_in: current,
                amount_out,
                price_impact_bps: impact,
            });
            current = amount_out;
        }

        Route::from_hops(path.to_vec(), hops)
    }

    /// Quote a fixed path for an exact output: the input needed to receive
    /// at least `amount_out`.
    pub async fn quote_exact_out(&self, path: &[Asset], amount_out: U256) -> Result<Route, AmmError> {
        let tokens = self.normalizer.normalize_path(path)?;

        let mut snapshots = Vec::with_capacity(tokens.len() - 1);
        let mut oriented = Vec::with_capacity(tokens.len() - 1);
        for pair in tokens.windows(2) {
            let reserves = self.hop_reserves(pair[0], pair[1], false).await?;
            oriented.push(reserves.oriented(pair[0])?);
            snapshots.push(reserves);
        }

        let amounts = get_amounts_in(amount_out, &oriented)?;
        let mut hops = Vec::with_capacity(snapshots.len());
        for (i, reserves) in snapshots.iter().enumerate() {
            let (reserve_in, reserve_out) = oriented[i];
            hops.push(HopQuote {
                pool: reserves.pool,
                token_in: tokens[i],
                token_out: tokens[i + 1],
                reserve_in,
                reserve_out,
                amount_in: amounts[i],
                amount_out: amounts[i + 1],
                price_impact_bps: price_impact_bps(amounts[i], amounts[i + 1], reserve_in, reserve_out)?,
            });
        }

        Route::from_hops(path.to_vec(), hops)
    }

    /// Locate and read one hop's pool, mapping absence to the pruning errors
    async fn hop_reserves(
        &self,
        token_in: Address,
        token_out: Address,
        force_refresh: bool,
    ) -> Result<PoolReserves, AmmError> {
        let pool = self
            .locator
            .locate(token_in, token_out)
            .await?
            .ok_or(AmmError::NoPool {
                token_a: token_in,
                token_b: token_out,
            })?;
        let reserves = self
            .reader
            .reserves(pool, force_refresh)
            .await?
            .ok_or(AmmError::NoLiquidity { pool })?;
        if !reserves.contains(token_in) || !reserves.contains(token_out) {
            return Err(AmmError::NoPool {
                token_a: token_in,
                token_b: token_out,
            });
        }
        Ok(reserves)
    }
}

// ---------------------------------------------------------------------------
// Step 3: Selection
// ---------------------------------------------------------------------------

/// Route with the greatest output; on equal output the earlier candidate wins.
///
/// Candidates are enumerated by increasing hop count, so ties also resolve
/// toward fewer hops.
pub fn select_best(routes: &[Route]) -> Option<&Route> {
    let mut best: Option<&Route> = None;
    for route in routes {
        match best {
            Some(current) if route.amount_out() <= current.amount_out() => {}
            _ => best = Some(route),
        }
    }
    best
}

fn describe(path: &[Asset]) -> String {
    path.iter()
        .map(|a| a.symbol.as_str())
        .collect::<Vec<_>>()
        .join(" -> ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockChain, WETH};
    use bastion_core::{PoolSource, RetryPolicy};
    use std::sync::Arc;

    const A: Address = Address::repeat_byte(0x0a);
    const B: Address = Address::repeat_byte(0x0b);
    const HUB1: Address = Address::repeat_byte(0x01);
    const HUB2: Address = Address::repeat_byte(0x02);

    fn asset(addr: Address, symbol: &str) -> Asset {
        Asset::erc20(addr, symbol, 18)
    }

    fn u(v: u64) -> U256 {
        U256::from(v)
    }

    fn router(chain: &Arc<MockChain>, hubs: Vec<Asset>) -> Router {
        Router::new(
            AssetNormalizer::new(WETH),
            PoolLocator::new(chain.clone(), chain.factory(), PoolSource::Factory, RetryPolicy::none()),
            ReserveReader::new(chain.clone(), RetryPolicy::none()),
            hubs,
        )
    }

    fn hub_assets() -> Vec<Asset> {
        vec![asset(HUB1, "H1"), asset(HUB2, "H2")]
    }

    // -- Enumeration --

    #[test]
    fn test_candidate_order_and_counts() {
        let n = AssetNormalizer::new(WETH);
        let paths = candidate_paths(&asset(A, "A"), &asset(B, "B"), &hub_assets(), 3, &n);
        let shapes: Vec<Vec<&str>> = paths
            .iter()
            .map(|p| p.iter().map(|a| a.symbol.as_str()).collect())
            .collect();
        assert_eq!(
            shapes,
            vec![
                vec!["A", "B"],
                vec!["A", "H1", "B"],
                vec!["A", "H2", "B"],
                vec!["A", "H1", "H2", "B"],
                vec!["A", "H2", "H1", "B"],
            ]
        );
    }

    #[test]
    fn test_candidates_respect_max_hops() {
        let n = AssetNormalizer::new(WETH);
        assert_eq!(candidate_paths(&asset(A, "A"), &asset(B, "B"), &hub_assets(), 1, &n).len(), 1);
        assert_eq!(candidate_paths(&asset(A, "A"), &asset(B, "B"), &hub_assets(), 2, &n).len(), 3);
        // Clamped to 3
        assert_eq!(candidate_paths(&asset(A, "A"), &asset(B, "B"), &hub_assets(), 9, &n).len(), 5);
        assert_eq!(candidate_paths(&asset(A, "A"), &asset(B, "B"), &hub_assets(), 0, &n).len(), 1);
    }

    #[test]
    fn test_candidates_skip_endpoint_hubs() {
        let n = AssetNormalizer::new(WETH);
        let hubs = vec![asset(WETH, "WETH"), asset(HUB1, "H1"), asset(A, "A")];
        // Native input normalizes to WETH, so the WETH hub is excluded
        let paths = candidate_paths(&Asset::native("ETH", 18), &asset(B, "B"), &hubs, 3, &n);
        for path in &paths {
            let tokens = n.normalize_path(path).unwrap();
            assert_eq!(tokens.len(), path.len());
        }
        let middles: Vec<&str> = paths
            .iter()
            .filter(|p| p.len() == 3)
            .map(|p| p[1].symbol.as_str())
            .collect();
        assert_eq!(middles, vec!["H1", "A"]);
    }

    #[test]
    fn test_candidates_dedupe_hubs() {
        let n = AssetNormalizer::new(WETH);
        let hubs = vec![asset(HUB1, "H1"), asset(HUB1, "H1-again")];
        let paths = candidate_paths(&asset(A, "A"), &asset(B, "B"), &hubs, 3, &n);
        assert_eq!(paths.len(), 2);
    }

    // -- Selection --

    #[tokio::test]
    async fn test_direct_route() {
        let chain = Arc::new(MockChain::new());
        chain.add_pool(A, B, u(1_000_000), u(2_000_000));

        let result = router(&chain, vec![])
            .find_routes(&asset(A, "A"), &asset(B, "B"), u(1_000), 3)
            .await
            .unwrap();
        let best = result.best_route.unwrap();
        assert_eq!(best.amount_out(), u(1_992));
        assert_eq!(best.amounts, vec![u(1_000), u(1_992)]);
        assert_eq!(best.pairs.len(), 1);
    }

    #[tokio::test]
    async fn test_reserves_reordered_by_identity() {
        let chain = Arc::new(MockChain::new());
        // A sorts first, so B -> A reads the pair against its storage order
        chain.add_pool(A, B, u(1_000_000), u(2_000_000));
        let result = router(&chain, vec![])
            .find_routes(&asset(B, "B"), &asset(A, "A"), u(2_000), 1)
            .await
            .unwrap();
        let best = result.best_route.unwrap();
        assert_eq!(best.hops[0].reserve_in, u(2_000_000));
        assert_eq!(best.amount_out(), get_amount_out(u(2_000), u(2_000_000), u(1_000_000)).unwrap());
    }

    #[tokio::test]
    async fn test_two_hop_when_no_direct_pool() {
        let chain = Arc::new(MockChain::new());
        chain.add_pool(A, HUB1, u(1_000_000), u(1_000_000));
        chain.add_pool(HUB1, B, u(1_000_000), u(1_000_000));

        let result = router(&chain, hub_assets())
            .find_routes(&asset(A, "A"), &asset(B, "B"), u(10_000), 3)
            .await
            .unwrap();

        assert!(result.all_routes.iter().all(|r| r.hop_count() > 1));
        let best = result.best_route.unwrap();
        assert_eq!(best.hop_count(), 2);
        assert_eq!(best.path[1].symbol, "H1");
        assert_eq!(best.pairs.len(), best.path.len() - 1);
        assert_eq!(best.amounts.len(), best.path.len());
        // Additive impact
        assert_eq!(
            best.price_impact_bps,
            best.hops[0].price_impact_bps + best.hops[1].price_impact_bps
        );
    }

    #[tokio::test]
    async fn test_picks_greatest_output() {
        let chain = Arc::new(MockChain::new());
        // Shallow direct pool
        chain.add_pool(A, B, u(20_000), u(20_000));
        // Deep two-hop path
        chain.add_pool(A, HUB1, u(10_000_000), u(10_000_000));
        chain.add_pool(HUB1, B, u(10_000_000), u(10_000_000));

        let result = router(&chain, hub_assets())
            .find_routes(&asset(A, "A"), &asset(B, "B"), u(10_000), 2)
            .await
            .unwrap();
        assert_eq!(result.all_routes.len(), 2);
        assert_eq!(result.best_route.unwrap().hop_count(), 2);
    }

    #[test]
    fn test_tie_prefers_fewer_hops() {
        let a = asset(A, "A");
        let b = asset(B, "B");
        let h = asset(HUB1, "H1");
        let make = |path: Vec<Asset>, out: u64| {
            let hops = path
                .windows(2)
                .enumerate()
                .map(|(i, w)| HopQuote {
                    pool: bastion_core::PoolId::new(Address::repeat_byte(0x40 + i as u8)),
                    token_in: w[0].id.address().unwrap_or_default(),
                    token_out: w[1].id.address().unwrap_or_default(),
                    reserve_in: u(1),
                    reserve_out: u(1),
                    amount_in: u(100),
                    amount_out: u(out),
                    price_impact_bps: 0,
                })
                .collect();
            Route::from_hops(path, hops).unwrap()
        };
        let direct = make(vec![a.clone(), b.clone()], 90);
        let via_hub = make(vec![a, h, b], 90);
        let routes = vec![direct.clone(), via_hub];
        assert_eq!(select_best(&routes), Some(&direct));
    }

    #[tokio::test]
    async fn test_no_route_is_not_an_error() {
        let chain = Arc::new(MockChain::new());
        let result = router(&chain, hub_assets())
            .find_routes(&asset(A, "A"), &asset(B, "B"), u(1_000), 3)
            .await
            .unwrap();
        assert!(result.is_empty());
        assert!(result.all_routes.is_empty());
    }

    #[tokio::test]
    async fn test_empty_pool_prunes_candidate() {
        let chain = Arc::new(MockChain::new());
        chain.add_pool(A, B, U256::ZERO, u(1_000));
        chain.add_pool(A, HUB1, u(1_000_000), u(1_000_000));
        chain.add_pool(HUB1, B, u(1_000_000), u(1_000_000));

        let result = router(&chain, hub_assets())
            .find_routes(&asset(A, "A"), &asset(B, "B"), u(1_000), 2)
            .await
            .unwrap();
        assert_eq!(result.all_routes.len(), 1);
        assert_eq!(result.best_route.unwrap().hop_count(), 2);
    }

    #[tokio::test]
    async fn test_overflowing_candidate_is_pruned() {
        let chain = Arc::new(MockChain::new());
        // Direct pool so deep that the output math overflows
        chain.add_pool(A, B, u(1_000_000), U256::MAX >> 20);
        let deep = U256::from(10u64).pow(U256::from(30));
        chain.add_pool(A, HUB1, deep, deep);
        chain.add_pool(HUB1, B, deep, deep);

        let amount_in = U256::from(10u64).pow(U256::from(20));
        let result = router(&chain, hub_assets())
            .find_routes(&asset(A, "A"), &asset(B, "B"), amount_in, 2)
            .await
            .unwrap();
        assert_eq!(result.all_routes.len(), 1);
        assert_eq!(result.best_route.unwrap().path[1].symbol, "H1");
    }

    #[tokio::test]
    async fn test_routes_never_repeat_assets() {
        let chain = Arc::new(MockChain::new());
        for (x, y) in [(A, HUB1), (HUB1, HUB2), (HUB2, B), (A, HUB2), (HUB1, B), (A, B)] {
            chain.add_pool(x, y, u(5_000_000), u(5_000_000));
        }
        let r = router(&chain, hub_assets());
        let result = r
            .find_routes(&asset(A, "A"), &asset(B, "B"), u(50_000), 3)
            .await
            .unwrap();
        assert_eq!(result.all_routes.len(), 5);
        for route in &result.all_routes {
            let tokens = r.normalizer().normalize_path(&route.path).unwrap();
            assert_eq!(tokens.len(), route.path.len());
            assert_eq!(route.pairs.len(), route.path.len() - 1);
        }
    }

    #[tokio::test]
    async fn test_deterministic_for_same_state() {
        let chain = Arc::new(MockChain::new());
        chain.add_pool(A, HUB1, u(3_000_000), u(1_000_000));
        chain.add_pool(HUB1, B, u(1_000_000), u(3_000_000));
        chain.add_pool(A, HUB2, u(3_000_000), u(1_000_000));
        chain.add_pool(HUB2, B, u(1_000_000), u(3_000_000));
        let r = router(&chain, hub_assets());

        let first = r.find_routes(&asset(A, "A"), &asset(B, "B"), u(7_777), 3).await.unwrap();
        let second = r.find_routes(&asset(A, "A"), &asset(B, "B"), u(7_777), 3).await.unwrap();
        assert_eq!(first.best_route, second.best_route);
        // Identical pools: the first hub in hub order wins
        assert_eq!(first.best_route.unwrap().path[1].symbol, "H1");
    }

    #[tokio::test]
    async fn test_rejects_same_asset_and_zero_input() {
        let chain = Arc::new(MockChain::new());
        let r = router(&chain, vec![]);
        let eth = Asset::native("ETH", 18);
        let weth = asset(WETH, "WETH");
        assert!(matches!(
            r.find_routes(&eth, &weth, u(1), 3).await,
            Err(AmmError::InvalidPath(_))
        ));
        assert!(matches!(
            r.find_routes(&asset(A, "A"), &asset(B, "B"), U256::ZERO, 3).await,
            Err(AmmError::InsufficientInput)
        ));
    }

    #[tokio::test]
    async fn test_node_failure_escalates() {
        let chain = Arc::new(MockChain::new());
        chain.add_pool(A, B, u(1_000_000), u(1_000_000));
        chain.fail_next_reads(1);
        let result = router(&chain, vec![])
            .find_routes(&asset(A, "A"), &asset(B, "B"), u(1_000), 1)
            .await;
        assert!(matches!(result, Err(AmmError::Node(_))));
    }

    #[tokio::test]
    async fn test_native_endpoint_uses_wrapped_pool() {
        let chain = Arc::new(MockChain::new());
        chain.add_pool(WETH, B, u(1_000_000), u(2_000_000));
        let result = router(&chain, vec![])
            .find_routes(&Asset::native("ETH", 18), &asset(B, "B"), u(1_000), 1)
            .await
            .unwrap();
        let best = result.best_route.unwrap();
        assert!(best.path[0].is_native());
        assert_eq!(best.token_path(), vec![WETH, B]);
        assert_eq!(best.amount_out(), u(1_992));
    }

    // -- Exact output --

    #[tokio::test]
    async fn test_quote_exact_out() {
        let chain = Arc::new(MockChain::new());
        chain.add_pool(A, HUB1, u(1_000_000), u(2_000_000));
        chain.add_pool(HUB1, B, u(3_000_000), u(1_500_000));
        let r = router(&chain, vec![]);
        let path = vec![asset(A, "A"), asset(HUB1, "H1"), asset(B, "B")];

        let route = r.quote_exact_out(&path, u(900)).await.unwrap();
        assert_eq!(route.amount_out(), u(900));
        assert_eq!(route.amount_in(), u(908));

        let forward = r.quote_path(&path, route.amount_in(), false).await.unwrap();
        assert!(forward.amount_out() >= u(900));
    }

    #[tokio::test]
    async fn test_quote_exact_out_beyond_reserves() {
        let chain = Arc::new(MockChain::new());
        chain.add_pool(A, B, u(1_000), u(1_000));
        let r = router(&chain, vec![]);
        let path = vec![asset(A, "A"), asset(B, "B")];
        assert!(matches!(
            r.quote_exact_out(&path, u(1_000)).await,
            Err(AmmError::InsufficientLiquidity)
        ));
    }
}
