//! DEX service
//!
//! Wires the registry, router and executor from configuration and exposes
//! the two user-facing operations: quote a trade and confirm a swap.

use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::{Address, U256};
use bastion_core::{AppConfig, Asset, AssetId, ChainRead, ChainWrite, Error, SwapError};

use crate::assets::AssetRegistry;
use crate::executor::{ExecutorSettings, SwapExecutor};
use crate::locator::PoolLocator;
use crate::normalizer::AssetNormalizer;
use crate::reserves::ReserveReader;
use crate::router::{clamp_hops, Router};
use crate::state::{Route, RouteResult, TxHandle};

pub struct DexService {
    config: AppConfig,
    registry: AssetRegistry,
    router: Arc<Router>,
    executor: SwapExecutor,
    wallet: Arc<dyn ChainWrite>,
}

impl DexService {
    /// Build the engine for `config`.
    ///
    /// Every hub must be a known asset; unknown hubs are a configuration error.
    pub fn from_config(
        config: &AppConfig,
        chain: Arc<dyn ChainRead>,
        wallet: Arc<dyn ChainWrite>,
    ) -> Result<Self, Error> {
        config.validate()?;

        let registry = AssetRegistry::from_config(config, chain.clone());
        let hubs = config
            .hubs
            .iter()
            .map(|hub| {
                registry
                    .by_id(&AssetId::Erc20(*hub))
                    .cloned()
                    .ok_or_else(|| Error::Config(format!("hub {} is not a configured asset", hub)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let router = Arc::new(Router::new(
            AssetNormalizer::new(config.chain.wrapped_native),
            PoolLocator::new(
                chain.clone(),
                config.chain.factory,
                config.chain.pool_source,
                config.retry.clone(),
            ),
            ReserveReader::with_ttl(
                chain.clone(),
                config.retry.clone(),
                Duration::from_millis(config.cache.reserves_ttl_ms),
            ),
            hubs,
        ));
        let executor = SwapExecutor::new(
            chain,
            wallet.clone(),
            router.clone(),
            ExecutorSettings::from_config(config),
        );

        tracing::info!(
            "DEX service ready: chain {} ({}), {} known assets, {} hubs",
            config.chain.chain_id,
            config.chain.network,
            registry.all().len(),
            router.hubs().len()
        );

        Ok(Self {
            config: config.clone(),
            registry,
            router,
            executor,
            wallet,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn registry(&self) -> &AssetRegistry {
        &self.registry
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Best route for selling `amount_in` of `token_in`.
    ///
    /// `max_hops` defaults to the configured bound and is clamped to `1..=3`.
    pub async fn request_quote(
        &self,
        token_in: &AssetId,
        token_out: &AssetId,
        amount_in: U256,
        max_hops: Option<usize>,
    ) -> Result<RouteResult, SwapError> {
        let token_in = self.registry.resolve(token_in, false).await?;
        let token_out = self.registry.resolve(token_out, false).await?;
        let max_hops = clamp_hops(max_hops.unwrap_or(self.config.routing.max_hops));

        let result = self
            .router
            .find_routes(&token_in, &token_out, amount_in, max_hops)
            .await?;
        Ok(result)
    }

    /// Quote a caller-chosen path for an exact input
    pub async fn quote_path(&self, path: &[AssetId], amount_in: U256) -> Result<Route, SwapError> {
        let path = self.resolve_path(path).await?;
        Ok(self.router.quote_path(&path, amount_in, false).await?)
    }

    /// Input required to receive `amount_out` over `path`
    pub async fn quote_exact_out(&self, path: &[AssetId], amount_out: U256) -> Result<Route, SwapError> {
        let path = self.resolve_path(path).await?;
        Ok(self.router.quote_exact_out(&path, amount_out).await?)
    }

    /// Execute a previously quoted route.
    ///
    /// Slippage defaults to the configured tolerance and the recipient to
    /// the sending account.
    pub async fn confirm_swap(
        &self,
        route: &Route,
        amount_in: U256,
        min_amount_out: U256,
        slippage_bps: Option<u32>,
        recipient: Option<Address>,
    ) -> Result<TxHandle, SwapError> {
        self.execute(&route.path, amount_in, min_amount_out, slippage_bps, recipient)
            .await
    }

    /// Execute over a path of asset ids without an earlier quote. The
    /// executor's pre-flight re-quote is the only one taken.
    pub async fn confirm_path(
        &self,
        path: &[AssetId],
        amount_in: U256,
        min_amount_out: U256,
        slippage_bps: Option<u32>,
        recipient: Option<Address>,
    ) -> Result<TxHandle, SwapError> {
        let path = self.resolve_path(path).await?;
        self.execute(&path, amount_in, min_amount_out, slippage_bps, recipient)
            .await
    }

    async fn execute(
        &self,
        path: &[Asset],
        amount_in: U256,
        min_amount_out: U256,
        slippage_bps: Option<u32>,
        recipient: Option<Address>,
    ) -> Result<TxHandle, SwapError> {
        let slippage_bps = slippage_bps.unwrap_or(self.config.swap.default_slippage_bps);
        let recipient = match recipient {
            Some(r) => r,
            None => self.wallet.sender()?,
        };
        self.executor
            .execute_path(
                path,
                amount_in,
                min_amount_out,
                recipient,
                slippage_bps,
                self.config.swap.deadline_secs,
            )
            .await
    }

    async fn resolve_path(&self, path: &[AssetId]) -> Result<Vec<Asset>, SwapError> {
        let mut assets = Vec::with_capacity(path.len());
        for id in path {
            assets.push(self.registry.resolve(id, false).await?);
        }
        Ok(assets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{mock_config, MockChain, USER, WETH};
    use bastion_core::AssetConfig;

    const USDC: Address = Address::repeat_byte(0x0c);
    const DAI: Address = Address::repeat_byte(0x0d);

    fn u(v: u64) -> U256 {
        U256::from(v)
    }

    fn config() -> AppConfig {
        let mut config = mock_config();
        config.assets = vec![
            AssetConfig {
                address: USDC,
                symbol: "USDC".to_string(),
                decimals: 6,
            },
            AssetConfig {
                address: DAI,
                symbol: "DAI".to_string(),
                decimals: 18,
            },
        ];
        config.hubs = vec![WETH];
        config
    }

    fn service(chain: &Arc<MockChain>) -> DexService {
        DexService::from_config(&config(), chain.clone(), chain.clone()).unwrap()
    }

    #[tokio::test]
    async fn test_quote_bridges_through_hub() {
        let chain = Arc::new(MockChain::new());
        chain.add_pool(USDC, WETH, u(1_000_000), u(1_000_000));
        chain.add_pool(WETH, DAI, u(1_000_000), u(1_000_000));
        let svc = service(&chain);

        let result = svc
            .request_quote(&AssetId::Erc20(USDC), &AssetId::Erc20(DAI), u(1_000), None)
            .await
            .unwrap();
        let best = result.best_route.unwrap();
        assert_eq!(best.hop_count(), 2);
        let symbols: Vec<_> = best.path.iter().map(|a| a.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["USDC", "WETH", "DAI"]);
    }

    #[tokio::test]
    async fn test_hop_bound_limits_search() {
        let chain = Arc::new(MockChain::new());
        chain.add_pool(USDC, WETH, u(1_000_000), u(1_000_000));
        chain.add_pool(WETH, DAI, u(1_000_000), u(1_000_000));
        let svc = service(&chain);

        let result = svc
            .request_quote(&AssetId::Erc20(USDC), &AssetId::Erc20(DAI), u(1_000), Some(1))
            .await
            .unwrap();
        assert!(result.is_empty());

        // Zero is clamped up to a direct-only search rather than rejected
        let result = svc
            .request_quote(&AssetId::Erc20(USDC), &AssetId::Erc20(DAI), u(1_000), Some(0))
            .await
            .unwrap();
        assert!(result.best_route.is_none());
    }

    #[tokio::test]
    async fn test_unknown_token_without_pool_is_empty_result() {
        let chain = Arc::new(MockChain::new());
        let svc = service(&chain);
        let stranger = AssetId::Erc20(Address::repeat_byte(0x42));

        let result = svc
            .request_quote(&AssetId::Erc20(USDC), &stranger, u(1_000), None)
            .await
            .unwrap();
        assert!(result.best_route.is_none());
        assert!(result.all_routes.is_empty());
    }

    #[tokio::test]
    async fn test_zero_input_is_rejected() {
        let chain = Arc::new(MockChain::new());
        let svc = service(&chain);
        let err = svc
            .request_quote(&AssetId::Native, &AssetId::Erc20(DAI), U256::ZERO, None)
            .await
            .unwrap_err();
        assert!(matches!(err, SwapError::InsufficientInput));
    }

    #[tokio::test]
    async fn test_native_and_wrapped_are_the_same_pool_asset() {
        let chain = Arc::new(MockChain::new());
        let svc = service(&chain);
        let err = svc
            .request_quote(&AssetId::Native, &AssetId::Erc20(WETH), u(1_000), None)
            .await
            .unwrap_err();
        assert!(matches!(err, SwapError::InvalidPath { .. }));
    }

    #[tokio::test]
    async fn test_quote_then_confirm_native_to_token() {
        let chain = Arc::new(MockChain::new());
        chain.add_pool(WETH, DAI, u(1_000_000), u(2_000_000));
        chain.set_native_balance(USER, u(50_000));
        let svc = service(&chain);

        let result = svc
            .request_quote(&AssetId::Native, &AssetId::Erc20(DAI), u(1_000), None)
            .await
            .unwrap();
        let route = result.best_route.unwrap();
        assert_eq!(route.amount_out(), u(1_992));

        let handle = svc
            .confirm_swap(&route, u(1_000), route.amount_out(), None, None)
            .await
            .unwrap();
        // Default tolerance is 50 bps
        assert_eq!(handle.min_amount_out, u(1_982));
        assert_eq!(chain.token_balance_of(DAI, USER), u(1_992));
        assert_eq!(chain.native_balance_of(USER), u(49_000));
    }

    #[tokio::test]
    async fn test_confirm_path_swaps_through_hub() {
        let chain = Arc::new(MockChain::new());
        chain.add_pool(USDC, WETH, u(1_000_000), u(1_000_000));
        chain.add_pool(WETH, DAI, u(1_000_000), u(1_000_000));
        chain.set_token_balance(USDC, USER, u(5_000));
        let svc = service(&chain);

        let path = [AssetId::Erc20(USDC), AssetId::Erc20(WETH), AssetId::Erc20(DAI)];
        let expected = svc.quote_path(&path, u(1_000)).await.unwrap().amount_out();

        let handle = svc
            .confirm_path(&path, u(1_000), expected, Some(0), None)
            .await
            .unwrap();
        assert_eq!(handle.min_amount_out, expected);
        assert_eq!(chain.submitted_swaps().len(), 1);
        assert_eq!(chain.token_balance_of(DAI, USER), expected);
        assert_eq!(chain.token_balance_of(USDC, USER), u(4_000));
    }

    #[tokio::test]
    async fn test_exact_out_over_explicit_path() {
        let chain = Arc::new(MockChain::new());
        chain.add_pool(USDC, WETH, u(1_000_000), u(2_000_000));
        chain.add_pool(WETH, DAI, u(3_000_000), u(1_500_000));
        let svc = service(&chain);

        let path = [AssetId::Erc20(USDC), AssetId::Erc20(WETH), AssetId::Erc20(DAI)];
        let route = svc.quote_exact_out(&path, u(900)).await.unwrap();
        assert_eq!(route.amounts, vec![u(908), u(1_807), u(900)]);

        // Selling the computed input reaches the target
        let forward = svc.quote_path(&path, route.amount_in()).await.unwrap();
        assert!(forward.amount_out() >= u(900));
    }

    #[test]
    fn test_unknown_hub_is_a_config_error() {
        let chain = Arc::new(MockChain::new());
        let mut config = config();
        config.hubs.push(Address::repeat_byte(0x77));
        let result = DexService::from_config(&config, chain.clone(), chain.clone());
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_wrapped_native_hub_needs_no_asset_entry() {
        let chain = Arc::new(MockChain::new());
        let mut config = config();
        config.assets.clear();
        let svc = DexService::from_config(&config, chain.clone(), chain.clone()).unwrap();
        assert_eq!(svc.router().hubs().len(), 1);
        assert_eq!(svc.router().hubs()[0].symbol, "WETH");
    }
}
