//! HTTP request handlers

use std::sync::Arc;
use axum::{
    extract::{rejection::JsonRejection, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::inference::{probability_chart, ChartBar, JobChangeLabel};
use crate::preprocessing::RawRecord;

use super::error::{Result, ServerError};
use super::state::AppState;

/// Session attached to a request by [`require_session`]
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub token: String,
    pub username: String,
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Reject requests without a live session token
pub async fn require_session(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let token = bearer_token(request.headers())
        .map(str::to_string)
        .ok_or_else(|| ServerError::Unauthorized("Missing bearer token".to_string()))?;

    let username = state.sessions.authenticate(&token)?;
    request.extensions_mut().insert(AuthSession { token, username });
    Ok(next.run(request).await)
}

// ============================================================================
// Auth Handlers
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub password: String,
    pub confirm_password: String,
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>> {
    let Json(request) = payload?;
    let session = state.sessions.login(&request.username, &request.password)?;
    Ok(Json(serde_json::json!({
        "token": session.token,
        "username": session.username,
    })))
}

pub async fn signup(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<SignupRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(request) = payload?;
    state
        .sessions
        .signup(&request.username, &request.password, &request.confirm_password)?;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "created": true,
            "username": request.username,
        })),
    ))
}

pub async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<AuthSession>,
) -> Json<serde_json::Value> {
    state.sessions.logout(&session.token);
    info!(username = %session.username, "User logged out");
    Json(serde_json::json!({ "logged_out": true }))
}

// ============================================================================
// Prediction Handlers
// ============================================================================

pub async fn form(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "fields": state.predictor.form_fields(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    pub record: RawRecord,
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub label: JobChangeLabel,
    pub message: String,
    pub probability: f64,
    pub probability_percent: String,
    pub chart: Vec<ChartBar>,
}

pub async fn predict(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<AuthSession>,
    payload: std::result::Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Json<PredictResponse>> {
    let Json(request) = payload?;
    let prediction = state.predictor.predict(&request.record)?;
    info!(
        username = %session.username,
        label = ?prediction.label,
        probability = prediction.probability,
        "Prediction served"
    );

    Ok(Json(PredictResponse {
        label: prediction.label,
        message: prediction.label.to_string(),
        probability: prediction.probability,
        probability_percent: format!("{:.2}%", prediction.probability * 100.0),
        chart: probability_chart(&prediction),
    }))
}

pub async fn model_info(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let bundle = state.predictor.bundle();
    Json(serde_json::json!({
        "format_version": bundle.format_version,
        "created_at": bundle.created_at.to_rfc3339(),
        "schema_hash": bundle.schema_hash,
        "schema": bundle.schema,
        "categorical_columns": bundle.encoders.columns().collect::<Vec<_>>(),
        "metadata": bundle.metadata,
    }))
}

// ============================================================================
// System
// ============================================================================

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let bundle = state.predictor.bundle();
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "schema_hash": bundle.schema_hash,
        "uptime_secs": (chrono::Utc::now() - state.started_at).num_seconds(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc123"));
        assert_eq!(bearer_token(&headers), Some("abc123"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc123"));
        assert_eq!(bearer_token(&headers), None);
    }
}
