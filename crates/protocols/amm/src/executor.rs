//! Swap Executor
//!
//! Turns a quoted route into a protected router call: slippage floor,
//! chain-clock deadline, native/ERC-20 branching, allowance top-up, and
//! confirmation tracking with failures classified for the caller.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::{Address, U256};
use bastion_core::{
    classify_revert, retry, retry_if, AppConfig, Asset, ChainRead, ChainWrite, NodeError,
    RetryPolicy, SwapCall, SwapError, SwapKind, TxHash, TxReceipt,
};

use crate::calculator::apply_slippage;
use crate::router::Router;
use crate::state::{Route, TxHandle};

/// Submission and confirmation settings
#[derive(Debug, Clone)]
pub struct ExecutorSettings {
    /// Router contract the swap is sent to (and the allowance spender)
    pub router: Address,
    pub retry: RetryPolicy,
    pub receipt_poll: Duration,
    pub receipt_timeout: Duration,
}

impl ExecutorSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            router: config.chain.router,
            retry: config.retry.clone(),
            receipt_poll: Duration::from_millis(config.swap.receipt_poll_ms),
            receipt_timeout: Duration::from_secs(config.swap.receipt_timeout_secs),
        }
    }
}

/// Router entry point for the endpoints of a path
pub fn swap_kind(token_in: &Asset, token_out: &Asset) -> SwapKind {
    if token_in.is_native() {
        SwapKind::ExactNativeForTokens
    } else if token_out.is_native() {
        SwapKind::ExactTokensForNative
    } else {
        SwapKind::ExactTokensForTokens
    }
}

pub struct SwapExecutor {
    chain: Arc<dyn ChainRead>,
    wallet: Arc<dyn ChainWrite>,
    router: Arc<Router>,
    settings: ExecutorSettings,
}

impl SwapExecutor {
    pub fn new(
        chain: Arc<dyn ChainRead>,
        wallet: Arc<dyn ChainWrite>,
        router: Arc<Router>,
        settings: ExecutorSettings,
    ) -> Self {
        Self {
            chain,
            wallet,
            router,
            settings,
        }
    }

    /// Execute `route` for `amount_in`, accepting no less than
    /// `min_amount_out_requested` reduced by `slippage_bps`.
    ///
    /// Returns once the swap is mined. Balance and a fresh re-quote are
    /// checked first so a doomed swap never spends gas.
    pub async fn execute(
        &self,
        route: &Route,
        amount_in: U256,
        min_amount_out_requested: U256,
        recipient: Address,
        slippage_bps: u32,
        deadline_secs: u64,
    ) -> Result<TxHandle, SwapError> {
        self.execute_path(
            &route.path,
            amount_in,
            min_amount_out_requested,
            recipient,
            slippage_bps,
            deadline_secs,
        )
        .await
    }

    /// [`execute`](Self::execute) over a bare asset path; the pre-flight
    /// re-quote is the only quote taken.
    pub async fn execute_path(
        &self,
        path: &[Asset],
        amount_in: U256,
        min_amount_out_requested: U256,
        recipient: Address,
        slippage_bps: u32,
        deadline_secs: u64,
    ) -> Result<TxHandle, SwapError> {
        let tokens = self.router.normalizer().normalize_path(path)?;
        if amount_in.is_zero() {
            return Err(SwapError::InsufficientInput);
        }
        let (Some(token_in), Some(token_out)) = (path.first(), path.last()) else {
            return Err(SwapError::InvalidPath {
                reason: "empty path".to_string(),
            });
        };

        // Rounded toward zero: never stricter than requested
        let min_amount_out = apply_slippage(min_amount_out_requested, slippage_bps)?;
        let kind = swap_kind(token_in, token_out);
        let sender = self.wallet.sender().map_err(SwapError::from)?;

        self.ensure_balance(sender, token_in, amount_in).await?;

        let fresh = self.router.quote_path(path, amount_in, true).await?;
        if fresh.amount_out() < min_amount_out {
            tracing::warn!(
                "Re-quote {} below minimum {} for {}",
                fresh.amount_out(),
                min_amount_out,
                fresh
            );
            return Err(SwapError::InsufficientOutput {
                quoted: Some(fresh.amount_out()),
                minimum: Some(min_amount_out),
            });
        }

        let now = retry(&self.settings.retry, "block timestamp", || {
            self.chain.block_timestamp()
        })
        .await?;
        let deadline = now.saturating_add(deadline_secs);

        let approval_tx = match token_in.id.address() {
            Some(token) => {
                self.ensure_allowance(sender, token, amount_in).await?
            }
            _ => None,
        };

        let call = SwapCall {
            router: self.settings.router,
            kind,
            amount_in,
            amount_out_min: min_amount_out,
            path: tokens,
            recipient,
            deadline,
        };
        tracing::info!(
            "Submitting {:?} {} -> {} (in: {}, min out: {}, deadline: {})",
            kind,
            token_in,
            token_out,
            amount_in,
            min_amount_out,
            deadline
        );
        let tx_hash = self.submit("swap", || self.wallet.swap(&call)).await?;
        tracing::info!("Swap submitted: {}", tx_hash);

        let receipt = self.wait_for_receipt(tx_hash, Some(deadline)).await?;
        tracing::info!("Swap {} confirmed in block {}", tx_hash, receipt.block_number);

        Ok(TxHandle {
            tx_hash,
            approval_tx,
            amount_in,
            min_amount_out,
            deadline,
            block_number: receipt.block_number,
        })
    }

    async fn ensure_balance(&self, owner: Address, asset: &Asset, amount: U256) -> Result<(), SwapError> {
        let available = match asset.id.address() {
            Some(token) => {
                retry(&self.settings.retry, "balanceOf", || {
                    self.chain.token_balance(token, owner)
                })
                .await?
            }
            _ => {
                retry(&self.settings.retry, "balance", || self.chain.native_balance(owner)).await?
            }
        };
        if available < amount {
            return Err(SwapError::InsufficientBalance {
                required: Some(amount),
                available: Some(available),
            });
        }
        Ok(())
    }

    /// Approve the router for `amount` if the current allowance is short.
    ///
    /// The approval must be mined before the swap is sent.
    async fn ensure_allowance(
        &self,
        owner: Address,
        token: Address,
        amount: U256,
    ) -> Result<Option<TxHash>, SwapError> {
        let spender = self.settings.router;
        let current = retry(&self.settings.retry, "allowance", || {
            self.chain.allowance(token, owner, spender)
        })
        .await?;
        if current >= amount {
            return Ok(None);
        }

        tracing::info!(
            "Allowance {} below {} for {}, approving router",
            current,
            amount,
            token
        );
        let tx_hash = self
            .submit("approve", || self.wallet.approve(token, spender, amount))
            .await?;
        self.wait_for_receipt(tx_hash, None).await?;
        tracing::info!("Approval {} confirmed", tx_hash);
        Ok(Some(tx_hash))
    }

    /// Send a state-changing call.
    ///
    /// It is resent only when the node explicitly refused it. A timeout or
    /// dropped connection leaves the outcome unknown, so nothing is resent.
    async fn submit<F, Fut>(&self, label: &str, send: F) -> Result<TxHash, SwapError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<TxHash, NodeError>>,
    {
        retry_if(&self.settings.retry, label, NodeError::is_safe_to_resend, send)
            .await
            .map_err(|e| match e {
                NodeError::Timeout { .. } | NodeError::Unreachable { .. } => {
                    tracing::warn!("{} may have reached the node, not resending: {}", label, e);
                    SwapError::SubmissionUnknown {
                        message: e.to_string(),
                    }
                }
                other => SwapError::from(other),
            })
    }

    async fn fetch_receipt(&self, tx_hash: TxHash) -> Result<Option<TxReceipt>, SwapError> {
        Ok(retry(&self.settings.retry, "receipt", || self.chain.receipt(tx_hash)).await?)
    }

    /// Poll until `tx_hash` is mined.
    ///
    /// With a deadline, gives up once the chain clock passes it and a last
    /// receipt lookup still finds nothing.
    async fn wait_for_receipt(&self, tx_hash: TxHash, deadline: Option<u64>) -> Result<TxReceipt, SwapError> {
        let started = tokio::time::Instant::now();
        loop {
            if let Some(receipt) = self.fetch_receipt(tx_hash).await? {
                return settle(tx_hash, receipt);
            }

            if let Some(deadline) = deadline {
                let now = retry(&self.settings.retry, "block timestamp", || {
                    self.chain.block_timestamp()
                })
                .await?;
                if now > deadline {
                    // The block that moved the clock may be the one that mined it
                    if let Some(receipt) = self.fetch_receipt(tx_hash).await? {
                        return settle(tx_hash, receipt);
                    }
                    tracing::warn!("Transaction {} still pending past deadline {}", tx_hash, deadline);
                    return Err(SwapError::DeadlineExpired {
                        deadline: Some(deadline),
                    });
                }
            }

            if started.elapsed() >= self.settings.receipt_timeout {
                return Err(SwapError::ConfirmationTimeout { tx_hash });
            }
            tokio::time::sleep(self.settings.receipt_poll).await;
        }
    }
}

fn settle(tx_hash: TxHash, receipt: TxReceipt) -> Result<TxReceipt, SwapError> {
    if receipt.success {
        return Ok(receipt);
    }
    tracing::warn!(
        "Transaction {} reverted: {}",
        tx_hash,
        receipt.revert_reason.as_deref().unwrap_or("unknown")
    );
    Err(classify_revert(receipt.revert_reason.as_deref()))
}
