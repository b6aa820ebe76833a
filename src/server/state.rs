//! Application state management

use crate::inference::Predictor;
use crate::security::SessionManager;

use super::ServerConfig;

/// Application state shared across handlers.
///
/// The predictor's bundle is read-only after load; sessions carry their own
/// lock.
pub struct AppState {
    pub config: ServerConfig,
    pub predictor: Predictor,
    pub sessions: SessionManager,
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    pub fn new(config: ServerConfig, predictor: Predictor, sessions: SessionManager) -> Self {
        Self {
            config,
            predictor,
            sessions,
            started_at: chrono::Utc::now(),
        }
    }
}
