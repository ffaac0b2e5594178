//! bastion-core: Shared types, errors, and configuration
//!
//! This crate provides the foundational types used across the Bastion workspace,
//! including the chain collaborator traits the routing engine is written against.

pub mod cache;
pub mod chain;
pub mod config;
pub mod errors;
pub mod retry;
pub mod types;

pub use cache::{Clock, ManualClock, SnapshotCache, SystemClock};
pub use chain::{ChainRead, ChainWrite, NodeHealth, SwapCall, SwapKind};
pub use config::*;
pub use errors::*;
pub use retry::{retry, retry_if, RetryPolicy, Transient};
pub use types::*;
