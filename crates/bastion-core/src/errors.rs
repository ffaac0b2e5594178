//! Error types for Bastion

use alloy_primitives::{Address, U256};
use thiserror::Error;

use crate::types::{PoolId, TxHash};

/// Core errors that can occur in Bastion
#[derive(Debug, Error)]
pub enum Error {
    #[error("Node error: {0}")]
    Node(#[from] NodeError),

    #[error("Swap error: {0}")]
    Swap(#[from] SwapError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Node connection and query errors
#[derive(Debug, Clone, Error)]
pub enum NodeError {
    #[error("Node unreachable at {url}")]
    Unreachable { url: String },

    #[error("Node request timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("Node rate limit exceeded")]
    RateLimited,

    #[error("Node returned error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("No sending account configured")]
    NoSender,
}

impl NodeError {
    /// Whether retrying the same request may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Unreachable { .. } | Self::Timeout { .. } | Self::RateLimited => true,
            Self::Rpc { code, message } => {
                matches!(*code, -32005 | 429) || is_transient_message(&message.to_lowercase())
            }
            Self::ParseError(_) | Self::NoSender => false,
        }
    }

    /// Whether the node certainly turned the request away.
    ///
    /// A timeout or a dropped connection may hide an accepted transaction,
    /// so only explicit rate-limit answers qualify.
    pub fn is_safe_to_resend(&self) -> bool {
        match self {
            Self::RateLimited => true,
            Self::Rpc { code, .. } => matches!(*code, -32005 | 429),
            _ => false,
        }
    }
}

/// Swap routing and execution errors, as surfaced to the caller
#[derive(Debug, Clone, Error)]
pub enum SwapError {
    #[error("No pool exists for {token_a} / {token_b}")]
    NoPool { token_a: Address, token_b: Address },

    #[error("Pool {pool} has no liquidity")]
    NoLiquidity { pool: PoolId },

    #[error("Invalid path: {reason}")]
    InvalidPath { reason: String },

    #[error("Slippage of {bps} bps is out of range (max 10000)")]
    InvalidSlippage { bps: u32 },

    #[error("Invalid amount: {reason}")]
    InvalidAmount { reason: String },

    #[error("Input amount must be greater than zero")]
    InsufficientInput,

    #[error("Insufficient liquidity for this trade")]
    InsufficientLiquidity,

    #[error("Output below minimum{}", describe_shortfall(.quoted, .minimum, "quoted", "minimum"))]
    InsufficientOutput {
        quoted: Option<U256>,
        minimum: Option<U256>,
    },

    #[error("Transaction expired before it was mined")]
    DeadlineExpired { deadline: Option<u64> },

    #[error("Request rejected by user")]
    UserRejected,

    #[error("Insufficient balance{}", describe_shortfall(.required, .available, "need", "have"))]
    InsufficientBalance {
        required: Option<U256>,
        available: Option<U256>,
    },

    #[error("Insufficient allowance{}", describe_shortfall(.required, .available, "need", "have"))]
    InsufficientAllowance {
        required: Option<U256>,
        available: Option<U256>,
    },

    #[error("Network error: {message}")]
    TransientNetwork { message: String },

    #[error("Transaction reverted: {reason}")]
    Reverted { reason: String },

    #[error("Transaction {tx_hash} not confirmed in time")]
    ConfirmationTimeout { tx_hash: TxHash },

    #[error("Submission outcome unknown: {message}")]
    SubmissionUnknown { message: String },

    #[error("Node error: {0}")]
    Node(NodeError),
}

fn describe_shortfall(
    left: &Option<U256>,
    right: &Option<U256>,
    left_label: &str,
    right_label: &str,
) -> String {
    match (left, right) {
        (Some(l), Some(r)) => format!(": {} {}, {} {}", left_label, l, right_label, r),
        (Some(l), None) => format!(": {} {}", left_label, l),
        (None, Some(r)) => format!(": {} {}", right_label, r),
        (None, None) => String::new(),
    }
}

impl SwapError {
    /// Get an HTTP-friendly error code
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NoPool { .. } => "no_pool",
            Self::NoLiquidity { .. } => "no_liquidity",
            Self::InvalidPath { .. } => "invalid_path",
            Self::InvalidSlippage { .. } => "invalid_slippage",
            Self::InvalidAmount { .. } => "invalid_amount",
            Self::InsufficientInput => "insufficient_input",
            Self::InsufficientLiquidity => "insufficient_liquidity",
            Self::InsufficientOutput { .. } => "insufficient_output",
            Self::DeadlineExpired { .. } => "deadline_expired",
            Self::UserRejected => "user_rejected",
            Self::InsufficientBalance { .. } => "insufficient_balance",
            Self::InsufficientAllowance { .. } => "insufficient_allowance",
            Self::TransientNetwork { .. } => "network_error",
            Self::Reverted { .. } => "reverted",
            Self::ConfirmationTimeout { .. } => "confirmation_timeout",
            Self::SubmissionUnknown { .. } => "submission_unknown",
            Self::Node(_) => "node_error",
        }
    }

    /// Get HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidPath { .. }
            | Self::InvalidSlippage { .. }
            | Self::InvalidAmount { .. }
            | Self::InsufficientInput => 400,
            Self::UserRejected => 409,
            Self::NoPool { .. }
            | Self::NoLiquidity { .. }
            | Self::InsufficientLiquidity
            | Self::InsufficientOutput { .. }
            | Self::DeadlineExpired { .. }
            | Self::InsufficientBalance { .. }
            | Self::InsufficientAllowance { .. }
            | Self::Reverted { .. } => 422,
            Self::ConfirmationTimeout { .. } | Self::SubmissionUnknown { .. } => 504,
            Self::TransientNetwork { .. } | Self::Node(_) => 503,
        }
    }

    /// Actionable message for the person confirming the swap
    pub fn user_message(&self) -> String {
        match self {
            Self::InsufficientOutput { .. } => {
                "Price moved beyond your slippage tolerance. Try again with higher slippage or a smaller size."
                    .to_string()
            }
            Self::DeadlineExpired { .. } => "Transaction expired, retry.".to_string(),
            Self::UserRejected => "Transaction was rejected in the wallet.".to_string(),
            Self::NoPool { .. } | Self::NoLiquidity { .. } | Self::InsufficientLiquidity => {
                "Insufficient liquidity for this trade.".to_string()
            }
            Self::InsufficientBalance { .. } => "Insufficient balance for this swap.".to_string(),
            Self::InsufficientAllowance { .. } => {
                "Token allowance is too low for this swap.".to_string()
            }
            Self::TransientNetwork { .. } | Self::Node(_) => {
                "Network is unavailable, please retry shortly.".to_string()
            }
            Self::SubmissionUnknown { .. } => {
                "The node did not answer in time. Check your wallet activity before trying again."
                    .to_string()
            }
            other => other.to_string(),
        }
    }

    pub fn is_transient(&self) -> bool {
        match self {
            Self::TransientNetwork { .. } => true,
            Self::Node(e) => e.is_transient(),
            _ => false,
        }
    }
}

impl From<NodeError> for SwapError {
    fn from(err: NodeError) -> Self {
        // EIP-1193 user rejection
        if let NodeError::Rpc { code: 4001, .. } = err {
            return Self::UserRejected;
        }
        if err.is_transient() {
            return Self::TransientNetwork {
                message: err.to_string(),
            };
        }
        let classified = match &err {
            NodeError::Rpc { message, .. } => classify_message(message),
            _ => None,
        };
        classified.unwrap_or(Self::Node(err))
    }
}

/// Classify a raw node or revert message into the swap error taxonomy.
///
/// Returns `None` when the message matches no known pattern.
pub fn classify_message(message: &str) -> Option<SwapError> {
    let lower = message.to_lowercase();

    if lower.contains("user rejected")
        || lower.contains("user denied")
        || lower.contains("rejected by user")
    {
        return Some(SwapError::UserRejected);
    }
    if lower.contains("insufficient_output_amount") || lower.contains("insufficient output") {
        return Some(SwapError::InsufficientOutput {
            quoted: None,
            minimum: None,
        });
    }
    if lower.contains("expired") {
        return Some(SwapError::DeadlineExpired { deadline: None });
    }
    if lower.contains("transfer_from_failed")
        || lower.contains("insufficient allowance")
        || lower.contains("exceeds allowance")
    {
        return Some(SwapError::InsufficientAllowance {
            required: None,
            available: None,
        });
    }
    if lower.contains("insufficient funds")
        || lower.contains("exceeds balance")
        || lower.contains("insufficient balance")
    {
        return Some(SwapError::InsufficientBalance {
            required: None,
            available: None,
        });
    }
    if lower.contains("insufficient_liquidity") {
        return Some(SwapError::InsufficientLiquidity);
    }
    if lower.contains("insufficient_input_amount") {
        return Some(SwapError::InsufficientInput);
    }
    if is_transient_message(&lower) {
        return Some(SwapError::TransientNetwork {
            message: message.to_string(),
        });
    }
    if lower.contains("revert") {
        return Some(SwapError::Reverted {
            reason: strip_revert_prefix(message),
        });
    }
    None
}

/// Classify a failed receipt's revert reason, falling back to a generic revert.
pub fn classify_revert(reason: Option<&str>) -> SwapError {
    match reason {
        Some(r) => classify_message(r).unwrap_or_else(|| SwapError::Reverted {
            reason: strip_revert_prefix(r),
        }),
        None => SwapError::Reverted {
            reason: "unknown".to_string(),
        },
    }
}

fn is_transient_message(lower: &str) -> bool {
    lower.contains("rate limit")
        || lower.contains("too many requests")
        || lower.contains("timed out")
        || lower.contains("timeout")
        || lower.contains("connection")
        || lower.contains("header not found")
        || lower.contains("temporarily unavailable")
}

fn strip_revert_prefix(message: &str) -> String {
    message
        .trim()
        .trim_start_matches("execution reverted:")
        .trim_start_matches("execution reverted")
        .trim()
        .to_string()
}

/// Result type alias for Bastion operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_swap_error_codes() {
        let err = SwapError::InsufficientOutput {
            quoted: Some(U256::from(90)),
            minimum: Some(U256::from(100)),
        };
        assert_eq!(err.error_code(), "insufficient_output");
        assert_eq!(err.status_code(), 422);
        assert_eq!(err.to_string(), "Output below minimum: quoted 90, minimum 100");

        let err = SwapError::InvalidPath {
            reason: "too short".into(),
        };
        assert_eq!(err.error_code(), "invalid_path");
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn test_classify_router_reverts() {
        assert!(matches!(
            classify_message("execution reverted: UniswapV2Router: INSUFFICIENT_OUTPUT_AMOUNT"),
            Some(SwapError::InsufficientOutput { .. })
        ));
        assert!(matches!(
            classify_message("execution reverted: UniswapV2Router: EXPIRED"),
            Some(SwapError::DeadlineExpired { .. })
        ));
        assert!(matches!(
            classify_message("TransferHelper: TRANSFER_FROM_FAILED"),
            Some(SwapError::InsufficientAllowance { .. })
        ));
        assert!(matches!(
            classify_message("insufficient funds for gas * price + value"),
            Some(SwapError::InsufficientBalance { .. })
        ));
    }

    #[test]
    fn test_classify_wallet_and_network() {
        assert!(matches!(
            classify_message("MetaMask Tx Signature: User denied transaction signature."),
            Some(SwapError::UserRejected)
        ));
        assert!(matches!(
            classify_message("429 Too Many Requests"),
            Some(SwapError::TransientNetwork { .. })
        ));
        assert!(classify_message("something entirely different").is_none());
    }

    #[test]
    fn test_classify_revert_fallback() {
        match classify_revert(Some("execution reverted: Pausable: paused")) {
            SwapError::Reverted { reason } => assert_eq!(reason, "Pausable: paused"),
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(classify_revert(None), SwapError::Reverted { .. }));
    }

    #[test]
    fn test_node_error_conversion() {
        let rejected: SwapError = NodeError::Rpc {
            code: 4001,
            message: "User rejected the request.".into(),
        }
        .into();
        assert!(matches!(rejected, SwapError::UserRejected));

        let limited: SwapError = NodeError::RateLimited.into();
        assert!(limited.is_transient());

        let reverted: SwapError = NodeError::Rpc {
            code: 3,
            message: "execution reverted: UniswapV2Router: EXPIRED".into(),
        }
        .into();
        assert!(matches!(reverted, SwapError::DeadlineExpired { .. }));

        let parse: SwapError = NodeError::ParseError("bad hex".into()).into();
        assert!(matches!(parse, SwapError::Node(_)));
        assert!(!parse.is_transient());
    }

    #[test]
    fn test_only_explicit_refusals_are_safe_to_resend() {
        assert!(NodeError::RateLimited.is_safe_to_resend());
        assert!(NodeError::Rpc {
            code: -32005,
            message: "limit exceeded".into(),
        }
        .is_safe_to_resend());

        // Transient, but the request may have landed
        let timeout = NodeError::Timeout { secs: 30 };
        assert!(timeout.is_transient());
        assert!(!timeout.is_safe_to_resend());
        assert!(!NodeError::Unreachable {
            url: "http://127.0.0.1:8545".into(),
        }
        .is_safe_to_resend());

        let err = SwapError::SubmissionUnknown {
            message: timeout.to_string(),
        };
        assert_eq!(err.error_code(), "submission_unknown");
        assert_eq!(err.status_code(), 504);
        assert!(!err.is_transient());
    }

    #[test]
    fn test_user_message_is_actionable() {
        let msg = SwapError::InsufficientOutput {
            quoted: None,
            minimum: None,
        }
        .user_message();
        assert!(msg.contains("higher slippage"));
        assert_eq!(
            SwapError::DeadlineExpired { deadline: Some(1) }.user_message(),
            "Transaction expired, retry."
        );
    }
}
