//! Pool Locator
//!
//! Resolves the pair holding two tokens. The pair key is order-independent:
//! both tokens are sorted before anything is derived or queried.

use std::sync::Arc;

use alloy_primitives::{keccak256, Address, B256};
use bastion_core::{retry, ChainRead, PoolId, PoolSource, RetryPolicy};

use crate::state::AmmError;

/// Sort two token addresses the way the factory does (`token0 < token1`)
pub fn sort_tokens(token_a: Address, token_b: Address) -> Result<(Address, Address), AmmError> {
    if token_a == token_b {
        return Err(AmmError::InvalidPath(format!(
            "identical tokens {}",
            token_a
        )));
    }
    let (token0, token1) = if token_a < token_b {
        (token_a, token_b)
    } else {
        (token_b, token_a)
    };
    if token0 == Address::ZERO {
        return Err(AmmError::InvalidPath("zero address".to_string()));
    }
    Ok((token0, token1))
}

/// CREATE2 address of the pair for two tokens.
///
/// `keccak256(0xff ++ factory ++ keccak256(token0 ++ token1) ++ init_code_hash)[12..]`
pub fn pair_address(
    factory: Address,
    token_a: Address,
    token_b: Address,
    init_code_hash: B256,
) -> Result<PoolId, AmmError> {
    let (token0, token1) = sort_tokens(token_a, token_b)?;
    let mut packed = [0u8; 40];
    packed[..20].copy_from_slice(token0.as_slice());
    packed[20..].copy_from_slice(token1.as_slice());
    let salt = keccak256(packed);
    Ok(PoolId::new(factory.create2(salt, init_code_hash)))
}

pub struct PoolLocator {
    chain: Arc<dyn ChainRead>,
    factory: Address,
    source: PoolSource,
    retry: RetryPolicy,
}

impl PoolLocator {
    pub fn new(
        chain: Arc<dyn ChainRead>,
        factory: Address,
        source: PoolSource,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            chain,
            factory,
            source,
            retry,
        }
    }

    /// Pool for two normalized token addresses, `None` if never created.
    ///
    /// In CREATE2 mode the address is derived offline; whether a pair
    /// actually lives there is settled by the reserve read.
    pub async fn locate(&self, token_a: Address, token_b: Address) -> Result<Option<PoolId>, AmmError> {
        let (token0, token1) = sort_tokens(token_a, token_b)?;
        match self.source {
            PoolSource::Create2 { init_code_hash } => {
                pair_address(self.factory, token0, token1, init_code_hash).map(Some)
            }
            PoolSource::Factory => {
                let pool = retry(&self.retry, "getPair", || self.chain.get_pool(token0, token1)).await?;
                Ok(pool.filter(|p| p.address() != Address::ZERO))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockChain;
    use alloy_primitives::{address, b256};
    use alloy_primitives::U256;

    #[test]
    fn test_sort_tokens() {
        let a = Address::repeat_byte(2);
        let b = Address::repeat_byte(1);
        assert_eq!(sort_tokens(a, b).unwrap(), (b, a));
        assert_eq!(sort_tokens(b, a).unwrap(), (b, a));
        assert!(sort_tokens(a, a).is_err());
        assert!(sort_tokens(Address::ZERO, a).is_err());
    }

    #[test]
    fn test_pair_address_matches_mainnet_usdc_weth() {
        let factory = address!("5C69bEe701ef814a2B6a3EDD4B1652CB9cc5aA6f");
        let usdc = address!("A0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48");
        let weth = address!("C02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2");
        let init = b256!("96e8ac4277198ff8b6f785478aa9a39f403cb768dd02cbee326c3e7da348845f");

        let pool = pair_address(factory, weth, usdc, init).unwrap();
        assert_eq!(
            pool.address(),
            address!("B4e16d0168e52d35CaCD2c6185b44281Ec28C9Dc")
        );
        // Order-independent
        assert_eq!(pair_address(factory, usdc, weth, init).unwrap(), pool);
    }

    #[tokio::test]
    async fn test_locate_via_factory() {
        let chain = Arc::new(MockChain::new());
        let a = Address::repeat_byte(1);
        let b = Address::repeat_byte(2);
        let pool = chain.add_pool(a, b, U256::from(10), U256::from(20));

        let locator = PoolLocator::new(
            chain.clone(),
            chain.factory(),
            PoolSource::Factory,
            RetryPolicy::none(),
        );
        assert_eq!(locator.locate(a, b).await.unwrap(), Some(pool));
        assert_eq!(locator.locate(b, a).await.unwrap(), Some(pool));
        assert_eq!(locator.locate(a, Address::repeat_byte(3)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_locate_via_create2_needs_no_rpc() {
        let chain = Arc::new(MockChain::new());
        let a = Address::repeat_byte(1);
        let b = Address::repeat_byte(2);
        let pool = chain.add_pool(a, b, U256::from(10), U256::from(20));
        chain.fail_next_reads(100);

        let locator = PoolLocator::new(
            chain.clone(),
            chain.factory(),
            PoolSource::Create2 {
                init_code_hash: chain.init_code_hash(),
            },
            RetryPolicy::none(),
        );
        assert_eq!(locator.locate(b, a).await.unwrap(), Some(pool));
    }

    #[tokio::test]
    async fn test_locate_retries_transient_failures() {
        let chain = Arc::new(MockChain::new());
        let a = Address::repeat_byte(1);
        let b = Address::repeat_byte(2);
        let pool = chain.add_pool(a, b, U256::from(10), U256::from(20));
        chain.fail_next_reads(2);

        let locator = PoolLocator::new(
            chain.clone(),
            chain.factory(),
            PoolSource::Factory,
            RetryPolicy::immediate(3),
        );
        assert_eq!(locator.locate(a, b).await.unwrap(), Some(pool));
    }
}
