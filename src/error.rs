//! Errors surfaced by the stamping service and their HTTP mapping

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::page_range::PageSelectionError;

#[derive(Debug, Error)]
pub enum StampError {
    #[error(transparent)]
    Pages(#[from] PageSelectionError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("{0}")]
    FetchFailed(String),

    #[error("Invalid PDF: {0}")]
    InvalidPdf(String),

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl StampError {
    pub fn status(&self) -> StatusCode {
        match self {
            StampError::Pages(PageSelectionError::OutOfRange { .. }) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            StampError::Pages(_) | StampError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            StampError::InvalidPdf(_) => StatusCode::UNPROCESSABLE_ENTITY,
            StampError::FetchFailed(_) | StampError::UploadFailed(_) => StatusCode::BAD_GATEWAY,
            StampError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for StampError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            StampError::Internal(e) => {
                tracing::error!("Internal error: {:#}", e);
                "Internal error".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": message,
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}
