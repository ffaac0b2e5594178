//! JSON-RPC transport
//!
//! One POST per call. HTTP and JSON-RPC failures are mapped onto
//! [`NodeError`] here so callers only ever see the core taxonomy.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use alloy_primitives::U256;
use bastion_core::NodeError;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

pub struct RpcTransport {
    http: reqwest::Client,
    url: String,
    timeout: Duration,
    next_id: AtomicU64,
}

impl RpcTransport {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
            timeout,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Send one request and deserialize its `result`
    pub async fn request<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, NodeError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let payload = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": id,
        });
        tracing::trace!("rpc #{} {}", id, method);

        let body = timed_request(self.timeout, self.send(&payload)).await?;
        let result = parse_response(body)?;
        serde_json::from_value(result)
            .map_err(|e| NodeError::ParseError(format!("{} result: {}", method, e)))
    }

    async fn send(&self, payload: &Value) -> Result<Value, NodeError> {
        let response = self
            .http
            .post(&self.url)
            .json(payload)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(NodeError::RateLimited);
        }
        if status.is_server_error() {
            return Err(NodeError::Unreachable {
                url: format!("{} (HTTP {})", self.url, status),
            });
        }
        response
            .json::<Value>()
            .await
            .map_err(|e| NodeError::ParseError(format!("HTTP {}: {}", status, e)))
    }

    fn transport_error(&self, err: reqwest::Error) -> NodeError {
        if err.is_timeout() {
            NodeError::Timeout {
                secs: self.timeout.as_secs(),
            }
        } else {
            NodeError::Unreachable {
                url: format!("{}: {}", self.url, err),
            }
        }
    }
}

/// Wrap a node call with a timeout
async fn timed_request<T>(
    timeout: Duration,
    fut: impl std::future::Future<Output = Result<T, NodeError>>,
) -> Result<T, NodeError> {
    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| NodeError::Timeout {
            secs: timeout.as_secs(),
        })?
}

/// Extract `result` from a JSON-RPC response body.
///
/// Error objects keep their code; any `data` string (often the revert
/// payload) is appended to the message.
pub fn parse_response(body: Value) -> Result<Value, NodeError> {
    if let Some(error) = body.get("error") {
        let code = error.get("code").and_then(Value::as_i64).unwrap_or(-32603);
        let mut message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error")
            .to_string();
        if let Some(data) = error.get("data").and_then(Value::as_str) {
            if let Some(reason) = revert_reason_from_hex(data) {
                message = format!("{}: {}", message, reason);
            }
        }
        if code == 429 || code == -32005 {
            return Err(NodeError::RateLimited);
        }
        return Err(NodeError::Rpc { code, message });
    }
    body.get("result")
        .cloned()
        .ok_or_else(|| NodeError::ParseError("response has neither result nor error".to_string()))
}

/// Decode an `Error(string)` or panic payload carried as hex
pub fn revert_reason_from_hex(data: &str) -> Option<String> {
    let bytes = hex::decode(data.trim_start_matches("0x")).ok()?;
    alloy_sol_types::decode_revert_reason(&bytes)
}

/// `0x`-prefixed quantity to u64
pub fn parse_quantity(value: &str) -> Result<u64, NodeError> {
    let digits = value.trim_start_matches("0x");
    if digits.is_empty() {
        return Ok(0);
    }
    u64::from_str_radix(digits, 16)
        .map_err(|e| NodeError::ParseError(format!("quantity '{}': {}", value, e)))
}

/// `0x`-prefixed quantity to U256
pub fn parse_u256(value: &str) -> Result<U256, NodeError> {
    let digits = value.trim_start_matches("0x");
    if digits.is_empty() {
        return Ok(U256::ZERO);
    }
    U256::from_str_radix(digits, 16)
        .map_err(|e| NodeError::ParseError(format!("quantity '{}': {}", value, e)))
}

pub fn to_quantity(value: U256) -> String {
    format!("{:#x}", value)
}

pub fn to_data(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

pub fn parse_data(value: &str) -> Result<Vec<u8>, NodeError> {
    hex::decode(value.trim_start_matches("0x"))
        .map_err(|e| NodeError::ParseError(format!("data '{}': {}", value, e)))
}
