use crate::pipeline::{PipelineError, error_chain};
use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use super::pages;

pub type WebResult<T> = Result<T, WebError>;

/// Failures outside the pipeline itself: bad requests, unknown results,
/// server startup.
#[derive(Debug, Error)]
pub enum WebError {
    #[error("The upload could not be read. Please try again with a PNG or JPEG file.")]
    Multipart(#[from] MultipartError),

    #[error("No file provided. Choose an image to upload.")]
    MissingFile,

    #[error("Result not found. It may have been evicted; please upload the image again.")]
    ResultNotFound,

    #[error("Processing task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("Failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    #[error("Server error: {0}")]
    Serve(std::io::Error),
}

impl WebError {
    pub fn status(&self) -> StatusCode {
        match self {
            WebError::Multipart(err) => err.status(),
            WebError::MissingFile => StatusCode::BAD_REQUEST,
            WebError::ResultNotFound => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %error_chain(&self), "request failed");
        } else {
            tracing::debug!(
                error = %error_chain(&self),
                status = status.as_u16(),
                "request rejected"
            );
        }
        let page = pages::render_error(&self.to_string());
        (status, page).into_response()
    }
}

/// HTTP status for a failed pipeline run.
pub fn pipeline_status(err: &PipelineError) -> StatusCode {
    match err {
        PipelineError::SizeLimit { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        PipelineError::FileNotFound(_) => StatusCode::NOT_FOUND,
        PipelineError::Decode(_) | PipelineError::Removal(_) => StatusCode::UNPROCESSABLE_ENTITY,
        PipelineError::Io { .. } | PipelineError::Encode(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
