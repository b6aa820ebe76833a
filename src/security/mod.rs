// Security module - credential store and session-based login gate
pub mod auth;

pub use auth::{
    AuthError, CredentialStore, InMemoryCredentialStore, Session, SessionManager,
    DEFAULT_ADMIN_PASSWORD, DEFAULT_ADMIN_USER, DEFAULT_SESSION_TTL_SECS,
};
