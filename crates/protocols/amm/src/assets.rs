//! Known-asset registry
//!
//! Loaded once from configuration. Tokens outside the registry are still
//! routable; their decimals are read from the chain and cached.

use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::utils::{format_units, parse_units};
use alloy_primitives::{Address, U256};
use bastion_core::{
    retry, AppConfig, Asset, AssetId, ChainRead, NodeError, RetryPolicy, SnapshotCache, SwapError,
};

pub struct AssetRegistry {
    native: Asset,
    wrapped_native: Address,
    /// Native first, then the configured tokens in config order
    known: Vec<Asset>,
    chain: Arc<dyn ChainRead>,
    decimals: SnapshotCache<Address, u8>,
    retry: RetryPolicy,
}

impl AssetRegistry {
    pub fn from_config(config: &AppConfig, chain: Arc<dyn ChainRead>) -> Self {
        let ttl = Duration::from_secs(config.cache.decimals_ttl_secs);
        Self::with_cache(config, chain, SnapshotCache::new(ttl))
    }

    pub fn with_cache(
        config: &AppConfig,
        chain: Arc<dyn ChainRead>,
        decimals: SnapshotCache<Address, u8>,
    ) -> Self {
        let native = config.native_asset();
        let wrapped_native = config.chain.wrapped_native;

        let mut known = vec![native.clone()];
        for entry in &config.assets {
            let asset = Asset::from(entry);
            if !known.iter().any(|k| k.id == asset.id) {
                known.push(asset);
            }
        }
        if !known.iter().any(|k| k.id == AssetId::Erc20(wrapped_native)) {
            known.push(Asset::erc20(
                wrapped_native,
                format!("W{}", native.symbol),
                native.decimals,
            ));
        }

        Self {
            native,
            wrapped_native,
            known,
            chain,
            decimals,
            retry: config.retry.clone(),
        }
    }

    pub fn native(&self) -> &Asset {
        &self.native
    }

    pub fn wrapped_native(&self) -> Address {
        self.wrapped_native
    }

    pub fn all(&self) -> &[Asset] {
        &self.known
    }

    pub fn by_id(&self, id: &AssetId) -> Option<&Asset> {
        self.known.iter().find(|a| a.id == *id)
    }

    pub fn by_symbol(&self, symbol: &str) -> Option<&Asset> {
        self.known
            .iter()
            .find(|a| a.symbol.eq_ignore_ascii_case(symbol))
    }

    /// Parse a user-supplied asset reference: a known symbol, "native", or an address
    pub fn parse_id(&self, query: &str) -> Result<AssetId, SwapError> {
        if let Some(asset) = self.by_symbol(query.trim()) {
            return Ok(asset.id);
        }
        query
            .parse::<AssetId>()
            .map_err(|reason| SwapError::InvalidPath { reason })
    }

    /// Full asset metadata, reading decimals from the chain for unknown tokens
    pub async fn resolve(&self, id: &AssetId, force_refresh: bool) -> Result<Asset, SwapError> {
        if !force_refresh {
            if let Some(asset) = self.by_id(id) {
                return Ok(asset.clone());
            }
        }
        match id {
            AssetId::Native => Ok(self.native.clone()),
            AssetId::Erc20(token) => {
                let decimals = self.decimals(*token, force_refresh).await?;
                let symbol = self
                    .by_id(id)
                    .map(|a| a.symbol.clone())
                    .unwrap_or_else(|| short_symbol(*token));
                Ok(Asset::erc20(*token, symbol, decimals))
            }
        }
    }

    /// ERC-20 decimals, cached with the configured TTL
    pub async fn decimals(&self, token: Address, force_refresh: bool) -> Result<u8, NodeError> {
        let value = self
            .decimals
            .get_or_fetch(token, force_refresh, || async {
                retry(&self.retry, "decimals", || self.chain.decimals(token))
                    .await
                    .map(Some)
            })
            .await?;
        value.ok_or_else(|| NodeError::ParseError(format!("no decimals for {}", token)))
    }

    /// Decimal string in display units to base units (`"1.5"` -> `1500000` for 6 decimals)
    pub fn to_base_units(asset: &Asset, value: &str) -> Result<U256, SwapError> {
        let value = value.trim();
        if value.starts_with('-') {
            return Err(SwapError::InvalidAmount {
                reason: format!("'{}' is negative", value),
            });
        }
        parse_units(value, asset.decimals)
            .map(|parsed| parsed.get_absolute())
            .map_err(|e| SwapError::InvalidAmount {
                reason: format!("'{}' for {}: {}", value, asset.symbol, e),
            })
    }

    /// Base units to a display string
    pub fn format_units(asset: &Asset, amount: U256) -> String {
        format_units(amount, asset.decimals).unwrap_or_else(|_| amount.to_string())
    }
}

fn short_symbol(token: Address) -> String {
    let hex = token.to_string();
    format!("{}…{}", &hex[..6], &hex[hex.len() - 4..])
}
