//! Prediction server
//!
//! REST API in front of a loaded artifact bundle: login gate, form
//! descriptor, single-record prediction and bundle metadata.

mod api;
mod error;
mod handlers;
mod state;

pub use api::create_router;
pub use error::ServerError;
pub use handlers::AuthSession;
pub use state::AppState;

use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

use crate::inference::Predictor;
use crate::security::{CredentialStore, InMemoryCredentialStore, SessionManager, DEFAULT_SESSION_TTL_SECS};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub bundle_path: String,
    /// JSON file of `username -> password`; the default admin is used when unset
    pub users_file: Option<String>,
    /// Session lifetime in seconds
    pub session_ttl_secs: i64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            bundle_path: std::env::var("BUNDLE_PATH")
                .unwrap_or_else(|_| "model_bundle.json".to_string()),
            users_file: std::env::var("USERS_FILE").ok().filter(|s| !s.is_empty()),
            session_ttl_secs: std::env::var("SESSION_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|v: &i64| *v > 0)
                .unwrap_or(DEFAULT_SESSION_TTL_SECS),
        }
    }
}

impl ServerConfig {
    /// Credential store named by the config
    pub fn credential_store(&self) -> anyhow::Result<Arc<dyn CredentialStore>> {
        let store = match &self.users_file {
            Some(path) => InMemoryCredentialStore::from_file(path)?,
            None => {
                warn!("No USERS_FILE configured, using the default admin account");
                InMemoryCredentialStore::with_default_admin()
            }
        };
        Ok(Arc::new(store))
    }
}

/// Start the server with the given configuration
pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let predictor = Predictor::load(&config.bundle_path)?;
    let sessions = SessionManager::new(config.credential_store()?)
        .with_ttl(chrono::Duration::seconds(config.session_ttl_secs));

    let state = Arc::new(AppState::new(config.clone(), predictor, sessions));
    let start_time = state.started_at;
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!(
        address = %addr,
        bundle = %config.bundle_path,
        started_at = %start_time.to_rfc3339(),
        "Talent retention server starting"
    );
    info!(url = %format!("http://{}/api/health", addr), "Health endpoint available");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(address = %addr, pid = std::process::id(), "Server listening and ready to accept connections");

    // Graceful shutdown on ctrl+c
    let shutdown_signal = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install ctrl+c handler, graceful shutdown disabled");
            std::future::pending::<()>().await;
        }
        let uptime = chrono::Utc::now().signed_duration_since(start_time);
        info!(uptime_secs = uptime.num_seconds(), "Shutdown signal received, stopping server gracefully");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server shut down cleanly");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_store_has_admin() {
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            bundle_path: "model_bundle.json".to_string(),
            users_file: None,
            session_ttl_secs: DEFAULT_SESSION_TTL_SECS,
        };
        let store = config.credential_store().unwrap();
        assert!(store.verify("admin", "admin123"));
    }
}
