//! Token verification handler
//!
//! Resource servers that do not link the verifier library can delegate
//! admission decisions to this endpoint, forwarding the presented token,
//! proof, and request coordinates.

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::api::error::ApiError;
use crate::api::AppState;
use crate::verifier::{VerificationResult, VerifyRequest};

/// Verify a protected request
///
/// POST /v1/verify
pub async fn verify_token(
    State(state): State<Arc<AppState>>,
    Json(request): Json<VerifyRequest>,
) -> Result<Json<VerificationResult>, ApiError> {
    let result = state.verifier.verify(&request).await?;
    Ok(Json(result))
}
