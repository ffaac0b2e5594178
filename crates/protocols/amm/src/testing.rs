//! In-memory chain for tests
//!
//! Simulates a Uniswap-V2 factory, pairs, router and ERC-20 ledgers closely
//! enough to exercise routing and execution end to end, including node
//! failures, wallet rejection and router reverts.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;
use bastion_core::{
    AppConfig, ChainConfig, ChainRead, ChainWrite, Network, NodeError, NodeHealth, NodeStatus,
    PoolId, ReserveSnapshot, RetryPolicy, SwapCall, SwapKind, TxHash, TxReceipt,
};

use crate::calculator;
use crate::locator::{pair_address, sort_tokens};

pub const FACTORY: Address = Address::repeat_byte(0xfa);
pub const ROUTER: Address = Address::repeat_byte(0x70);
pub const WETH: Address = Address::repeat_byte(0xee);
pub const USER: Address = Address::repeat_byte(0x5e);
pub const INIT_CODE_HASH: B256 = B256::repeat_byte(0x1c);

/// Config pointing at a [`MockChain`], with zero-delay retries and polling
pub fn mock_config() -> AppConfig {
    let mut config = AppConfig {
        chain: ChainConfig {
            chain_id: 31337,
            network: Network::Devnet,
            router: ROUTER,
            factory: FACTORY,
            wrapped_native: WETH,
            ..ChainConfig::default()
        },
        assets: Vec::new(),
        hubs: Vec::new(),
        retry: RetryPolicy::immediate(3),
        ..AppConfig::default()
    };
    config.node.sender = Some(USER);
    config.swap.receipt_poll_ms = 0;
    config.swap.receipt_timeout_secs = 5;
    config
}

#[derive(Debug, Clone, Copy)]
struct Pair {
    token0: Address,
    token1: Address,
    reserve0: U256,
    reserve1: U256,
}

impl Pair {
    fn oriented(&self, token_in: Address) -> (U256, U256) {
        if token_in == self.token0 {
            (self.reserve0, self.reserve1)
        } else {
            (self.reserve1, self.reserve0)
        }
    }

    fn apply(&mut self, token_in: Address, amount_in: U256, amount_out: U256) {
        if token_in == self.token0 {
            self.reserve0 += amount_in;
            self.reserve1 -= amount_out;
        } else {
            self.reserve1 += amount_in;
            self.reserve0 -= amount_out;
        }
    }
}

#[derive(Default)]
struct State {
    pools: HashMap<PoolId, Pair>,
    decimals: HashMap<Address, u8>,
    native_balances: HashMap<Address, U256>,
    token_balances: HashMap<(Address, Address), U256>,
    allowances: HashMap<(Address, Address, Address), U256>,
    timestamp: u64,
    timestamp_step: u64,
    block_number: u64,
    tx_counter: u64,
    receipts: HashMap<TxHash, TxReceipt>,
    held: HashSet<TxHash>,
    hold_receipts: bool,
    failing_reads: u32,
    failing_sends: u32,
    reject_next_send: bool,
    front_run: Option<(Address, Address, U256, U256)>,
    swaps: Vec<SwapCall>,
    approvals: Vec<(Address, Address, U256)>,
    sender: Option<Address>,
    lose_next_swap_reply: bool,
    lagging_receipts: u32,
    clock_jump_after_swap: Option<u64>,
}

pub struct MockChain {
    state: Mutex<State>,
}

impl Default for MockChain {
    fn default() -> Self {
        Self::new()
    }
}

impl MockChain {
    pub fn new() -> Self {
        let state = State {
            timestamp: 1_700_000_000,
            block_number: 1,
            sender: Some(USER),
            ..State::default()
        };
        Self {
            state: Mutex::new(state),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn factory(&self) -> Address {
        FACTORY
    }

    pub fn init_code_hash(&self) -> B256 {
        INIT_CODE_HASH
    }

    /// Create a pair holding `reserve_a` of `token_a` and `reserve_b` of `token_b`
    pub fn add_pool(&self, token_a: Address, token_b: Address, reserve_a: U256, reserve_b: U256) -> PoolId {
        let pool = match pair_address(FACTORY, token_a, token_b, INIT_CODE_HASH) {
            Ok(pool) => pool,
            Err(e) => panic!("bad mock pool: {}", e),
        };
        let (token0, token1) = (token_a.min(token_b), token_a.max(token_b));
        let (reserve0, reserve1) = if token_a == token0 {
            (reserve_a, reserve_b)
        } else {
            (reserve_b, reserve_a)
        };
        self.state().pools.insert(
            pool,
            Pair {
                token0,
                token1,
                reserve0,
                reserve1,
            },
        );
        pool
    }

    pub fn set_reserves(&self, token_a: Address, token_b: Address, reserve_a: U256, reserve_b: U256) {
        self.add_pool(token_a, token_b, reserve_a, reserve_b);
    }

    /// Move a pair's reserves right before the next swap executes
    pub fn front_run_next_swap(&self, token_a: Address, token_b: Address, reserve_a: U256, reserve_b: U256) {
        self.state().front_run = Some((token_a, token_b, reserve_a, reserve_b));
    }

    pub fn set_decimals(&self, token: Address, decimals: u8) {
        self.state().decimals.insert(token, decimals);
    }

    pub fn set_native_balance(&self, owner: Address, amount: U256) {
        self.state().native_balances.insert(owner, amount);
    }

    pub fn set_token_balance(&self, token: Address, owner: Address, amount: U256) {
        self.state().token_balances.insert((token, owner), amount);
    }

    pub fn set_allowance(&self, token: Address, owner: Address, spender: Address, amount: U256) {
        self.state().allowances.insert((token, owner, spender), amount);
    }

    pub fn native_balance_of(&self, owner: Address) -> U256 {
        self.state().native_balances.get(&owner).copied().unwrap_or_default()
    }

    pub fn token_balance_of(&self, token: Address, owner: Address) -> U256 {
        self.state()
            .token_balances
            .get(&(token, owner))
            .copied()
            .unwrap_or_default()
    }

    pub fn set_timestamp(&self, timestamp: u64) {
        self.state().timestamp = timestamp;
    }

    /// Advance the chain clock by `step` seconds on every timestamp read
    pub fn set_timestamp_step(&self, step: u64) {
        self.state().timestamp_step = step;
    }

    /// Keep submitted transactions pending (no receipt) until released
    pub fn hold_receipts(&self, hold: bool) {
        let mut state = self.state();
        state.hold_receipts = hold;
        if !hold {
            state.held.clear();
        }
    }

    /// The next `n` reads fail with a rate-limit error
    pub fn fail_next_reads(&self, n: u32) {
        self.state().failing_reads = n;
    }

    /// The next `n` submissions fail with a rate-limit error
    pub fn fail_next_sends(&self, n: u32) {
        self.state().failing_sends = n;
    }

    /// The next submission is declined in the wallet
    pub fn reject_next_send(&self) {
        self.state().reject_next_send = true;
    }

    /// The next swap is mined but its submission reply is lost to a timeout
    pub fn lose_next_swap_reply(&self) {
        self.state().lose_next_swap_reply = true;
    }

    /// Move the chain clock forward by `secs` right after the next swap is mined
    pub fn advance_clock_after_next_swap(&self, secs: u64) {
        self.state().clock_jump_after_swap = Some(secs);
    }

    /// The next `n` receipt lookups report the transaction as pending
    pub fn lag_receipts(&self, n: u32) {
        self.state().lagging_receipts = n;
    }

    pub fn submitted_swaps(&self) -> Vec<SwapCall> {
        self.state().swaps.clone()
    }

    pub fn submitted_approvals(&self) -> Vec<(Address, Address, U256)> {
        self.state().approvals.clone()
    }

    fn read_guard(&self) -> Result<MutexGuard<'_, State>, NodeError> {
        let mut state = self.state();
        if state.failing_reads > 0 {
            state.failing_reads -= 1;
            return Err(NodeError::RateLimited);
        }
        Ok(state)
    }

    fn send_guard(&self) -> Result<MutexGuard<'_, State>, NodeError> {
        let mut state = self.state();
        if state.reject_next_send {
            state.reject_next_send = false;
            return Err(NodeError::Rpc {
                code: 4001,
                message: "User rejected the request.".to_string(),
            });
        }
        if state.failing_sends > 0 {
            state.failing_sends -= 1;
            return Err(NodeError::RateLimited);
        }
        if state.sender.is_none() {
            return Err(NodeError::NoSender);
        }
        Ok(state)
    }
}

impl State {
    fn next_hash(&mut self) -> TxHash {
        self.tx_counter += 1;
        TxHash::new(B256::left_padding_from(&self.tx_counter.to_be_bytes()))
    }

    fn mine(&mut self, success: bool, revert_reason: Option<String>) -> TxHash {
        let tx_hash = self.next_hash();
        self.block_number += 1;
        self.receipts.insert(
            tx_hash,
            TxReceipt {
                tx_hash,
                block_number: self.block_number,
                success,
                revert_reason,
            },
        );
        if self.hold_receipts {
            self.held.insert(tx_hash);
        }
        tx_hash
    }

    fn revert(&mut self, reason: &str) -> TxHash {
        self.mine(false, Some(format!("execution reverted: {}", reason)))
    }

    fn execute_swap(&mut self, call: &SwapCall, sender: Address) -> TxHash {
        if let Some((a, b, ra, rb)) = self.front_run.take() {
            if let Ok(pool) = pair_address(FACTORY, a, b, INIT_CODE_HASH) {
                let (token0, token1) = (a.min(b), a.max(b));
                let (reserve0, reserve1) = if a == token0 { (ra, rb) } else { (rb, ra) };
                self.pools.insert(
                    pool,
                    Pair {
                        token0,
                        token1,
                        reserve0,
                        reserve1,
                    },
                );
            }
        }

        if call.deadline < self.timestamp {
            return self.revert("UniswapV2Router: EXPIRED");
        }
        if call.path.len() < 2 {
            return self.revert("UniswapV2Library: INVALID_PATH");
        }
        let first = call.path[0];
        let last = call.path[call.path.len() - 1];
        match call.kind {
            SwapKind::ExactNativeForTokens if first != WETH => {
                return self.revert("UniswapV2Router: INVALID_PATH");
            }
            SwapKind::ExactTokensForNative if last != WETH => {
                return self.revert("UniswapV2Router: INVALID_PATH");
            }
            _ => {}
        }

        // Quote every hop against current reserves
        let mut amounts = vec![call.amount_in];
        let mut pools = Vec::new();
        for pair in call.path.windows(2) {
            let pool = match pair_address(FACTORY, pair[0], pair[1], INIT_CODE_HASH) {
                Ok(pool) => pool,
                Err(_) => return self.revert("UniswapV2Library: IDENTICAL_ADDRESSES"),
            };
            let Some(existing) = self.pools.get(&pool).copied() else {
                return self.revert("UniswapV2Library: INSUFFICIENT_LIQUIDITY");
            };
            let (reserve_in, reserve_out) = existing.oriented(pair[0]);
            let current = amounts[amounts.len() - 1];
            match calculator::get_amount_out(current, reserve_in, reserve_out) {
                Ok(out) => amounts.push(out),
                Err(_) => return self.revert("UniswapV2Library: INSUFFICIENT_LIQUIDITY"),
            }
            pools.push(pool);
        }
        let amount_out = amounts[amounts.len() - 1];
        if amount_out < call.amount_out_min {
            return self.revert("UniswapV2Router: INSUFFICIENT_OUTPUT_AMOUNT");
        }

        // Pull input
        if call.kind.pays_value() {
            let balance = self.native_balances.entry(sender).or_default();
            *balance -= call.amount_in;
        } else {
            let allowance = self
                .allowances
                .get(&(first, sender, ROUTER))
                .copied()
                .unwrap_or_default();
            let balance = self
                .token_balances
                .get(&(first, sender))
                .copied()
                .unwrap_or_default();
            if allowance < call.amount_in || balance < call.amount_in {
                return self.revert("TransferHelper: TRANSFER_FROM_FAILED");
            }
            self.allowances
                .insert((first, sender, ROUTER), allowance - call.amount_in);
            self.token_balances
                .insert((first, sender), balance - call.amount_in);
        }

        for (i, pool) in pools.iter().enumerate() {
            if let Some(pair) = self.pools.get_mut(pool) {
                pair.apply(call.path[i], amounts[i], amounts[i + 1]);
            }
        }

        // Deliver output
        if call.kind == SwapKind::ExactTokensForNative {
            *self.native_balances.entry(call.recipient).or_default() += amount_out;
        } else {
            *self
                .token_balances
                .entry((last, call.recipient))
                .or_default() += amount_out;
        }

        self.mine(true, None)
    }
}

#[async_trait]
impl ChainRead for MockChain {
    async fn get_pool(&self, token_a: Address, token_b: Address) -> Result<Option<PoolId>, NodeError> {
        let state = self.read_guard()?;
        if sort_tokens(token_a, token_b).is_err() {
            return Ok(None);
        }
        let pool = pair_address(FACTORY, token_a, token_b, INIT_CODE_HASH)
            .map_err(|e| NodeError::ParseError(e.to_string()))?;
        Ok(state.pools.contains_key(&pool).then_some(pool))
    }

    async fn get_reserves(&self, pool: PoolId) -> Result<Option<ReserveSnapshot>, NodeError> {
        let state = self.read_guard()?;
        Ok(state.pools.get(&pool).map(|p| ReserveSnapshot {
            token0: p.token0,
            token1: p.token1,
            reserve0: p.reserve0,
            reserve1: p.reserve1,
        }))
    }

    async fn decimals(&self, token: Address) -> Result<u8, NodeError> {
        let state = self.read_guard()?;
        Ok(state.decimals.get(&token).copied().unwrap_or(18))
    }

    async fn block_timestamp(&self) -> Result<u64, NodeError> {
        let mut state = self.read_guard()?;
        let now = state.timestamp;
        state.timestamp += state.timestamp_step;
        Ok(now)
    }

    async fn native_balance(&self, owner: Address) -> Result<U256, NodeError> {
        let state = self.read_guard()?;
        Ok(state.native_balances.get(&owner).copied().unwrap_or_default())
    }

    async fn token_balance(&self, token: Address, owner: Address) -> Result<U256, NodeError> {
        let state = self.read_guard()?;
        Ok(state
            .token_balances
            .get(&(token, owner))
            .copied()
            .unwrap_or_default())
    }

    async fn allowance(&self, token: Address, owner: Address, spender: Address) -> Result<U256, NodeError> {
        let state = self.read_guard()?;
        Ok(state
            .allowances
            .get(&(token, owner, spender))
            .copied()
            .unwrap_or_default())
    }

    async fn receipt(&self, tx_hash: TxHash) -> Result<Option<TxReceipt>, NodeError> {
        let mut state = self.read_guard()?;
        if state.lagging_receipts > 0 {
            state.lagging_receipts -= 1;
            return Ok(None);
        }
        if state.held.contains(&tx_hash) {
            return Ok(None);
        }
        Ok(state.receipts.get(&tx_hash).cloned())
    }
}

#[async_trait]
impl ChainWrite for MockChain {
    fn sender(&self) -> Result<Address, NodeError> {
        self.state().sender.ok_or(NodeError::NoSender)
    }

    async fn approve(&self, token: Address, spender: Address, amount: U256) -> Result<TxHash, NodeError> {
        let mut state = self.send_guard()?;
        let owner = state.sender.ok_or(NodeError::NoSender)?;
        state.allowances.insert((token, owner, spender), amount);
        state.approvals.push((token, spender, amount));
        Ok(state.mine(true, None))
    }

    async fn swap(&self, call: &SwapCall) -> Result<TxHash, NodeError> {
        let mut state = self.send_guard()?;
        let sender = state.sender.ok_or(NodeError::NoSender)?;
        if call.kind.pays_value() {
            let balance = state.native_balances.get(&sender).copied().unwrap_or_default();
            if balance < call.value() {
                // Rejected by the node before it reaches a block
                return Err(NodeError::Rpc {
                    code: -32000,
                    message: "insufficient funds for gas * price + value".to_string(),
                });
            }
        }
        state.swaps.push(call.clone());
        let tx_hash = state.execute_swap(call, sender);
        if let Some(secs) = state.clock_jump_after_swap.take() {
            state.timestamp += secs;
        }
        if state.lose_next_swap_reply {
            state.lose_next_swap_reply = false;
            return Err(NodeError::Timeout { secs: 30 });
        }
        Ok(tx_hash)
    }
}

#[async_trait]
impl NodeHealth for MockChain {
    async fn status(&self) -> Result<NodeStatus, NodeError> {
        let state = self.read_guard()?;
        Ok(NodeStatus {
            chain_id: 31337,
            block_number: state.block_number,
            block_timestamp: state.timestamp,
            client_version: Some("mockchain/v1".to_string()),
            latency_ms: 0,
        })
    }
}
