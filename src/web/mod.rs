//! Browser UI served with axum.
//!
//! | Route | Response |
//! |---|---|
//! | `GET /` | Upload page; processes the first default image when one exists |
//! | `POST /fix` | Runs the pipeline on the multipart field `file`, renders the result page |
//! | `GET /results/{key}/original` | Upload bytes as received, typed by their signature |
//! | `GET /results/{key}/fixed.png` | Processed image |
//! | `GET /results/{key}/download` | Processed image as a `fixed.png` attachment |
//! | `GET /api/cache` | Cache statistics as JSON |
//!
//! Result images are served straight from the [`ProcessingCache`] without
//! re-encoding; once an entry is evicted its URLs answer 404 and the image
//! has to be uploaded again.
//!
//! ## Upload size
//!
//! `POST /fix` reads the file part in chunks and only buffers up to
//! `max_file_size`. Past that it keeps counting, discarding the bytes, so
//! the page can say how large the file was. Counting stops at
//! [`upload_read_limit`] and the request body is capped just above it.
//!
//! [`ProcessingCache`]: crate::cache::ProcessingCache

pub mod error;
mod handlers;
pub mod pages;

pub use error::{WebError, WebResult};

use crate::config::AppConfig;
use crate::pipeline::Pipeline;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{Level, info, warn};

/// Room for multipart boundaries and part headers on top of the file itself.
pub const MULTIPART_SLACK: usize = 64 * 1024;

/// Oversize uploads are counted up to this multiple of `max_file_size`.
pub const OVERSIZE_READ_FACTOR: usize = 10;

/// Bytes of an oversize file part read before giving up on counting.
pub fn upload_read_limit(max_file_size: usize) -> usize {
    max_file_size.saturating_mul(OVERSIZE_READ_FACTOR)
}

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<Pipeline>,
    default_images: Arc<[PathBuf]>,
}

impl AppState {
    pub fn new(pipeline: Pipeline, default_images: Vec<PathBuf>) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            default_images: default_images.into(),
        }
    }

    /// State built from `config`, with default images resolved against
    /// `config_dir`.
    pub fn from_config(config: &AppConfig, config_dir: &Path) -> Self {
        Self::new(
            Pipeline::from_config(config),
            config.resolve_default_images(config_dir),
        )
    }

    pub fn pipeline(&self) -> &Arc<Pipeline> {
        &self.pipeline
    }

    pub fn default_images(&self) -> &[PathBuf] {
        &self.default_images
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let body_limit =
        upload_read_limit(state.pipeline.limits().max_file_size).saturating_add(MULTIPART_SLACK);

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_request(DefaultOnRequest::new().level(Level::DEBUG))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    Router::new()
        .route("/", get(handlers::index))
        .route("/fix", post(handlers::fix))
        .route("/results/:key/original", get(handlers::original_image))
        .route("/results/:key/fixed.png", get(handlers::fixed_image))
        .route("/results/:key/download", get(handlers::download))
        .route("/api/cache", get(handlers::cache_stats))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(trace_layer)
        .with_state(state)
}

/// Bind `addr` and serve until Ctrl+C or SIGTERM.
pub async fn serve(state: AppState, addr: &str) -> WebResult<()> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| WebError::Bind {
            addr: addr.to_string(),
            source,
        })?;

    info!("Listening on http://{}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(WebError::Serve)?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(error = %err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
