//! HTTP error mapping.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use pdpx_core::{ErrorCode, PdpError};
use serde::{Deserialize, Serialize};

/// Error body returned for every failed request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub response_code: String,
    pub error_message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub error_details: Vec<String>,
}

/// Errors produced by the HTTP handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Pdp(#[from] PdpError),

    /// Body could not be read as the expected document.
    #[error("Invalid request body: {0}")]
    BadRequest(String),
}

impl ApiError {
    fn code(&self) -> ErrorCode {
        match self {
            Self::Pdp(e) => e.code(),
            Self::BadRequest(_) => ErrorCode::BadRequest,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.code();
        let status =
            StatusCode::from_u16(code.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let error_details = match &self {
            Self::Pdp(PdpError::Deploy(pdpx_core::DeployError::Translation(e))) => {
                e.field().map(|f| vec![format!("field: {f}")]).unwrap_or_default()
            }
            Self::Pdp(PdpError::InvalidRequest { field, .. }) => vec![format!("field: {field}")],
            _ => Vec::new(),
        };

        let body = ErrorResponse {
            response_code: code.as_str().to_string(),
            error_message: self.to_string(),
            error_details,
        };

        (status, Json(body)).into_response()
    }
}
