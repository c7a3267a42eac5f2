//! HTTP API for the E-Key plane

pub mod error;
pub mod handlers;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::issuer::Issuer;
use crate::verifier::Verifier;

/// Application state shared across handlers
pub struct AppState {
    /// The issuance state machine
    pub issuer: Issuer,
    /// The verification state machine
    pub verifier: Verifier,
    /// Issuer identity, reported by readiness
    pub issuer_url: String,
    /// Signing algorithm, reported by readiness
    pub signing_alg: String,
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Readiness check response
#[derive(Serialize)]
pub struct ReadyResponse {
    pub ready: bool,
    pub issuer_url: String,
    pub signing_alg: String,
}

/// Health check endpoint
///
/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
    })
}

/// Readiness check endpoint
///
/// GET /ready
pub async fn ready(State(state): State<Arc<AppState>>) -> Json<ReadyResponse> {
    Json(ReadyResponse {
        ready: true,
        issuer_url: state.issuer_url.clone(),
        signing_alg: state.signing_alg.clone(),
    })
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    // CORS configuration for browser-based SDKs
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health endpoints
        .route("/health", get(health))
        .route("/ready", get(ready))
        // Issuance endpoint
        .route("/token", post(handlers::issue_token))
        // Verification endpoint for resource servers without the library
        .route("/v1/verify", post(handlers::verify_token))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
