use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Default account seeded into a fresh store
pub const DEFAULT_ADMIN_USER: &str = "admin";
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

/// Session lifetime when none is configured
pub const DEFAULT_SESSION_TTL_SECS: i64 = 8 * 60 * 60;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Username already exists: {0}")]
    UsernameTaken(String),

    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    #[error("Invalid or expired session")]
    InvalidSession,

    #[error("Credential store error: {0}")]
    Storage(String),
}

/// Source of truth for user accounts
pub trait CredentialStore: Send + Sync {
    fn verify(&self, username: &str, password: &str) -> bool;

    /// Add a new account; fails if the name is taken
    fn register(&self, username: &str, password: &str) -> Result<(), AuthError>;
}

fn digest(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

/// Accounts held in memory as SHA-256 password digests
#[derive(Debug, Clone, Default)]
pub struct InMemoryCredentialStore {
    users: Arc<RwLock<HashMap<String, String>>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with the default admin account
    pub fn with_default_admin() -> Self {
        let store = Self::new();
        store
            .users
            .write()
            .insert(DEFAULT_ADMIN_USER.to_string(), digest(DEFAULT_ADMIN_PASSWORD));
        store
    }

    /// Load `{"username": "password", ...}` from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, AuthError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| AuthError::Storage(format!("{}: {}", path.display(), e)))?;
        let accounts: HashMap<String, String> =
            serde_json::from_str(&json).map_err(|e| AuthError::Storage(e.to_string()))?;

        let store = Self::new();
        for (username, password) in &accounts {
            store.register(username, password)?;
        }
        tracing::info!(users = accounts.len(), path = %path.display(), "Loaded credential store");
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.users.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.read().is_empty()
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn verify(&self, username: &str, password: &str) -> bool {
        self.users
            .read()
            .get(username)
            .is_some_and(|stored| *stored == digest(password))
    }

    fn register(&self, username: &str, password: &str) -> Result<(), AuthError> {
        if username.trim().is_empty() {
            return Err(AuthError::EmptyField("username"));
        }
        if password.is_empty() {
            return Err(AuthError::EmptyField("password"));
        }

        let mut users = self.users.write();
        if users.contains_key(username) {
            return Err(AuthError::UsernameTaken(username.to_string()));
        }
        users.insert(username.to_string(), digest(password));
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

impl Session {
    fn is_expired(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        now - self.created_at >= ttl
    }
}

/// Login gate over an injected credential store
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn CredentialStore>,
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    ttl: Duration,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("active_sessions", &self.sessions.read().len())
            .field("ttl_secs", &self.ttl.num_seconds())
            .finish()
    }
}

impl SessionManager {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self {
            store,
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl: Duration::seconds(DEFAULT_SESSION_TTL_SECS),
        }
    }

    /// Override the session lifetime
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Open a session and return it
    pub fn login(&self, username: &str, password: &str) -> Result<Session, AuthError> {
        if !self.store.verify(username, password) {
            tracing::warn!(username, "Rejected login");
            return Err(AuthError::InvalidCredentials);
        }

        let session = Session {
            token: uuid::Uuid::new_v4().simple().to_string(),
            username: username.to_string(),
            created_at: Utc::now(),
        };
        let mut sessions = self.sessions.write();
        let now = session.created_at;
        sessions.retain(|_, s| !s.is_expired(self.ttl, now));
        sessions.insert(session.token.clone(), session.clone());
        drop(sessions);
        tracing::info!(username, "User logged in");
        Ok(session)
    }

    /// Create an account; the caller still has to log in
    pub fn signup(&self, username: &str, password: &str, confirm_password: &str) -> Result<(), AuthError> {
        if password != confirm_password {
            return Err(AuthError::PasswordMismatch);
        }
        self.store.register(username, password)?;
        tracing::info!(username, "Account created");
        Ok(())
    }

    /// Drop a session; returns whether it existed
    pub fn logout(&self, token: &str) -> bool {
        self.sessions.write().remove(token).is_some()
    }

    /// Username behind a live session token; expired sessions are dropped
    pub fn authenticate(&self, token: &str) -> Result<String, AuthError> {
        let now = Utc::now();
        {
            let sessions = self.sessions.read();
            match sessions.get(token) {
                None => return Err(AuthError::InvalidSession),
                Some(s) if !s.is_expired(self.ttl, now) => return Ok(s.username.clone()),
                Some(_) => {}
            }
        }

        self.sessions.write().remove(token);
        tracing::debug!("Expired session removed");
        Err(AuthError::InvalidSession)
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.read().len()
    }
}
