use crate::predictor::PredictorError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use common::model::history::BatchReport;
use log::error;
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed or missing request data.
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    /// A unique field (species scientific name, user name or email) is taken.
    #[error("{0}")]
    Conflict(String),

    /// The prediction service was unreachable or answered with an error.
    #[error("Prediction failed: {message}")]
    UpstreamPrediction {
        message: String,
        payload: Option<Value>,
    },

    /// Some items of a batch failed; the rest are already stored.
    #[error(
        "Upload failed for {} of {} images",
        .0.failed.len(),
        .0.failed.len() + .0.persisted.len()
    )]
    BatchIncomplete(BatchReport),

    #[error("Report rendering failed: {0}")]
    Render(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<PredictorError> for AppError {
    fn from(err: PredictorError) -> Self {
        let message = err.to_string();
        let payload = match err {
            PredictorError::Upstream { payload, .. } => payload,
            _ => None,
        };
        AppError::UpstreamPrediction { message, payload }
    }
}

impl From<actix_multipart::MultipartError> for AppError {
    fn from(err: actix_multipart::MultipartError) -> Self {
        AppError::Validation(format!("Invalid multipart payload: {}", err))
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Internal(format!("join error: {}", err))
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::UpstreamPrediction { .. } | AppError::BatchIncomplete(_) => {
                StatusCode::BAD_GATEWAY
            }
            AppError::Render(_)
            | AppError::Internal(_)
            | AppError::Database(_)
            | AppError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let body = match self {
            AppError::UpstreamPrediction { payload, .. } => json!({
                "message": "Upload failed",
                "error": payload.clone().unwrap_or_else(|| Value::String(self.to_string())),
            }),
            AppError::BatchIncomplete(report) => json!({
                "message": self.to_string(),
                "persisted": report.persisted,
                "failed": report.failed,
            }),
            _ if status.is_server_error() => {
                error!("{}", self);
                json!({ "message": "Internal Server Error" })
            }
            _ => json!({ "message": self.to_string() }),
        };
        HttpResponse::build(status).json(body)
    }
}
