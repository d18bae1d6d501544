use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Failures surfaced by the reconciliation worker. `Decode` and
/// `Validation` are permanent (the source document is discarded);
/// everything else leaves the document in place for a later retry.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("document is not parseable: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("document failed validation: {0}")]
    Validation(#[source] serde_json::Error),

    #[error("object store request failed: {0}")]
    Store(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),

    #[error("database reconciliation failed: {0}")]
    Reconciliation(#[from] sea_orm::DbErr),

    #[error("worker manager is already running")]
    AlreadyRunning,
}

impl<E, R> From<aws_sdk_s3::error::SdkError<E, R>> for WorkerError
where
    E: std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug + Send + Sync + 'static,
{
    fn from(err: aws_sdk_s3::error::SdkError<E, R>) -> Self {
        WorkerError::Store(Box::new(err))
    }
}

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug)]
pub enum ApiError {
    NotFound,
    Internal(anyhow::Error),
}

impl From<sea_orm::DbErr> for ApiError {
    fn from(err: sea_orm::DbErr) -> Self {
        ApiError::Internal(anyhow::Error::new(err))
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Internal(anyhow::Error::new(err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NotFound => {
                (StatusCode::NOT_FOUND, Json(json!({"error": "Not found"}))).into_response()
            },
            ApiError::Internal(err) => {
                tracing::error!(error = %err, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"error": "Internal server error"})),
                )
                    .into_response()
            },
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
