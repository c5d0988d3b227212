//! Application startup and lifecycle management.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

use service_core::error::AppError;

use crate::config::Config;
use crate::services::{
    BalanceService, ContractEditor, ContractStore, EventEmitter, WebhookEmitter,
};
use crate::{build_router, AppState};

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: Config) -> Result<Self, AppError> {
        let store = ContractStore::new();
        let emitter = Arc::new(WebhookEmitter::new(
            config.webhooks.targets.clone(),
            config.webhooks.secret.clone(),
        ));
        if config.webhooks.targets.is_empty() {
            tracing::warn!("No webhook targets configured - events will not be delivered");
        }

        let event_emitter: Arc<dyn EventEmitter> = emitter.clone();
        let balances = BalanceService::new(store.clone(), event_emitter.clone());
        let editor = Arc::new(ContractEditor::new(
            store.clone(),
            event_emitter,
            balances.clone(),
        ));

        let state = AppState {
            config: config.clone(),
            store,
            emitter,
            balances,
            editor,
        };

        // Port 0 binds a random port for testing.
        let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Contract service: HTTP on port {}", port);

        Ok(Self {
            port,
            listener,
            state,
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Get the application state for direct service access.
    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let router = build_router(self.state);
        axum::serve(self.listener, router)
            .await
            .map_err(|e| std::io::Error::other(format!("HTTP server error: {}", e)))
    }
}
