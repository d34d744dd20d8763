//! HTTP API module
//!
//! JSON endpoints for the asset settings UI and session control, plus the
//! SSE streams a browser overlay draws from.

pub mod api;
pub mod routes;

use axum::Router;
use std::sync::Arc;

use crate::config::HttpConfig;
use crate::error::WebError;
use crate::AppState;

/// Web server for the API and streams
pub struct WebServer {
    app_state: Arc<AppState>,
    config: HttpConfig,
}

impl WebServer {
    /// Create a new web server
    pub fn new(app_state: Arc<AppState>, config: &HttpConfig) -> Self {
        Self {
            app_state,
            config: config.clone(),
        }
    }

    /// Build the router
    pub fn router(&self) -> Router {
        routes::create_router(Arc::clone(&self.app_state), &self.config)
    }

    /// Serve until the shutdown signal fires
    pub async fn run(self) -> Result<(), WebError> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| WebError::Bind(format!("{}: {}", addr, e)))?;
        tracing::info!("HTTP server listening on {}", addr);

        let mut shutdown_rx = self.app_state.subscribe_shutdown();
        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            })
            .await
            .map_err(|e| WebError::Serve(e.to_string()))?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
