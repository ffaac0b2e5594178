//! Application state shared across API handlers

use std::sync::Arc;

use amm::DexService;
use bastion_core::{AppConfig, ChainRead, ChainWrite, NodeError, NodeHealth};
use evm_node_client::NodeClient;
use thiserror::Error;

/// Errors that can occur while building the state
#[derive(Debug, Error)]
pub enum StateError {
    #[error("Configuration error: {0}")]
    Config(#[from] bastion_core::Error),

    #[error("Node connection failed: {0}")]
    Node(#[from] NodeError),
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AppConfig,
    service: DexService,
    health: Arc<dyn NodeHealth>,
}

impl AppState {
    /// Build state over arbitrary chain collaborators
    pub fn new(
        config: AppConfig,
        chain: Arc<dyn ChainRead>,
        wallet: Arc<dyn ChainWrite>,
        health: Arc<dyn NodeHealth>,
    ) -> Result<Self, StateError> {
        let service = DexService::from_config(&config, chain, wallet)?;
        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                service,
                health,
            }),
        })
    }

    /// Connect to the configured node and build state over it
    pub async fn connect(config: AppConfig) -> Result<Self, StateError> {
        tracing::info!("Creating node client for URL: {}", config.node.url);
        let client = Arc::new(NodeClient::connect(config.node.clone(), &config.chain).await?);
        if client.config().sender.is_none() {
            tracing::warn!("No sender configured; quotes only, swaps will be rejected");
        }
        Self::new(config, client.clone(), client.clone(), client)
    }

    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    pub fn service(&self) -> &DexService {
        &self.inner.service
    }

    pub fn health(&self) -> &dyn NodeHealth {
        self.inner.health.as_ref()
    }
}
