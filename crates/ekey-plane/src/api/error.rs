//! API error types and responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::issuer::IssueError;
use crate::verifier::VerifyError;

/// API error type
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("issuance failed")]
    Issue(#[from] IssueError),

    #[error("verification failed")]
    Verify(#[from] VerifyError),
}

/// API error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ErrorDetail>>,
}

/// One field-level validation failure
#[derive(Serialize)]
pub struct ErrorDetail {
    pub path: String,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            ApiError::Issue(IssueError::InvalidRequest { field, message }) => (
                StatusCode::BAD_REQUEST,
                "invalid_request",
                "request validation failed".to_string(),
                Some(vec![ErrorDetail {
                    path: field.clone(),
                    message: message.clone(),
                }]),
            ),
            ApiError::Issue(IssueError::InvalidBinding(message)) => (
                StatusCode::BAD_REQUEST,
                "invalid_binding",
                message.clone(),
                None,
            ),
            ApiError::Issue(IssueError::SignerFailure(_)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "signer_failure",
                "token signing failed".to_string(),
                None,
            ),
            ApiError::Verify(err) => {
                let status = match err {
                    VerifyError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
                    VerifyError::InvalidToken(_)
                    | VerifyError::ExpiredToken
                    | VerifyError::InvalidProof(_) => StatusCode::UNAUTHORIZED,
                    VerifyError::CapabilityMismatch(_) | VerifyError::ReplayDetected => {
                        StatusCode::FORBIDDEN
                    }
                };
                (status, err.code(), err.to_string(), None)
            }
        };

        let body = ErrorResponse {
            error: message,
            code: code.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: ApiError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_issue_error_statuses() {
        assert_eq!(
            status_of(ApiError::Issue(IssueError::InvalidRequest {
                field: "ttl".into(),
                message: "out of range".into(),
            })),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(ApiError::Issue(IssueError::InvalidBinding("no jwk".into()))),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_verify_error_statuses() {
        assert_eq!(
            status_of(ApiError::Verify(VerifyError::InvalidRequest("x".into()))),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(ApiError::Verify(VerifyError::ExpiredToken)),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(ApiError::Verify(VerifyError::InvalidProof("x".into()))),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(ApiError::Verify(VerifyError::ReplayDetected)),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_of(ApiError::Verify(VerifyError::CapabilityMismatch("x".into()))),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn test_error_body_carries_message_and_code() {
        let body = ErrorResponse {
            error: "request validation failed".into(),
            code: "invalid_request".into(),
            details: Some(vec![ErrorDetail {
                path: "ttl".into(),
                message: "must be within 1..=60".into(),
            }]),
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["error"], "request validation failed");
        assert_eq!(json["code"], "invalid_request");
        assert_eq!(json["details"][0]["path"], "ttl");
    }

    #[test]
    fn test_error_body_omits_empty_details() {
        let body = ErrorResponse {
            error: "token expired".into(),
            code: "expired_token".into(),
            details: None,
        };

        let json = serde_json::to_string(&body).unwrap();
        assert!(!json.contains("details"));
    }
}
