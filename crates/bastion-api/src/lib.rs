//! bastion-api: HTTP API layer for Bastion
//!
//! Exposes quoting and swap confirmation to a UI over JSON.

pub mod dto;
pub mod routes;
pub mod server;
pub mod state;

pub use server::*;
pub use state::{AppState, StateError};
