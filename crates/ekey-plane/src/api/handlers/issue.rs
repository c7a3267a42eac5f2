//! Token issuance handler

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::api::error::ApiError;
use crate::api::AppState;
use crate::issuer::{IssueRequest, TokenResponse};

/// Issue a fresh E-Key
///
/// POST /token
pub async fn issue_token(
    State(state): State<Arc<AppState>>,
    Json(request): Json<IssueRequest>,
) -> Result<(StatusCode, Json<TokenResponse>), ApiError> {
    let response = state.issuer.issue(request)?;
    Ok((StatusCode::CREATED, Json(response)))
}
