//! Asset normalization
//!
//! Pools only know ERC-20 addresses. The base currency takes part in them
//! through its wrapped token, so every pool key and path comparison is made
//! on normalized addresses. The native/ERC distinction itself is kept on
//! [`AssetId`] for the executor.

use std::collections::HashSet;

use alloy_primitives::Address;
use bastion_core::{Asset, AssetId};

use crate::state::AmmError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetNormalizer {
    wrapped_native: Address,
}

impl AssetNormalizer {
    pub fn new(wrapped_native: Address) -> Self {
        Self { wrapped_native }
    }

    pub fn wrapped_native(&self) -> Address {
        self.wrapped_native
    }

    /// Canonical pool-participant address of an asset
    pub fn normalize(&self, id: &AssetId) -> Address {
        match id {
            AssetId::Native => self.wrapped_native,
            AssetId::Erc20(addr) => *addr,
        }
    }

    /// Whether two assets meet in the same pools
    pub fn same_pool_asset(&self, a: &AssetId, b: &AssetId) -> bool {
        self.normalize(a) == self.normalize(b)
    }

    /// Normalize a whole path, rejecting short paths and repeated assets.
    ///
    /// Native and wrapped-native count as the same asset here.
    pub fn normalize_path(&self, path: &[Asset]) -> Result<Vec<Address>, AmmError> {
        if path.len() < 2 {
            return Err(AmmError::InvalidPath(format!(
                "path needs at least two assets, got {}",
                path.len()
            )));
        }

        let mut seen = HashSet::with_capacity(path.len());
        let mut tokens = Vec::with_capacity(path.len());
        for asset in path {
            let token = self.normalize(&asset.id);
            if !seen.insert(token) {
                return Err(AmmError::InvalidPath(format!(
                    "{} appears more than once",
                    asset.symbol
                )));
            }
            tokens.push(token);
        }
        Ok(tokens)
    }
}
