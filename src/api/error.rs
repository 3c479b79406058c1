use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::DbErr;
use serde_json::json;
use validator::ValidationErrors;

use crate::analyzer::AnalysisError;
use crate::workflow::WorkflowError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Please correct the errors below.")]
    Validation(#[from] ValidationErrors),
    #[error("Error analyzing outfit: {0}")]
    Analysis(AnalysisError),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("Invalid upload: {0}")]
    Multipart(#[from] MultipartError),
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
    #[error("database error: {0}")]
    Database(#[from] DbErr),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Analysis(_) => StatusCode::BAD_GATEWAY,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Multipart(e) => e.status(),
            ApiError::Workflow(_) | ApiError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        tracing::Span::current().record("error", tracing::field::display(&self));

        let body = match &self {
            ApiError::Validation(errors) => json!({
                "error": self.to_string(),
                "fields": errors,
            }),
            ApiError::Workflow(_) | ApiError::Database(_) => {
                tracing::error!("Request failed: {}", self);
                json!({"error": "Internal server error"})
            }
            _ => json!({"error": self.to_string()}),
        };

        (status, Json(body)).into_response()
    }
}
