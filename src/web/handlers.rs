use super::error::{WebError, WebResult, pipeline_status};
use super::{AppState, pages, upload_read_limit};
use crate::cache::{CacheKey, CacheStats};
use crate::imaging::ImageKind;
use crate::pipeline::{
    InputSource, OUTPUT_FILE_NAME, OUTPUT_MIME, Outcome, PipelineError, ProgressEvent,
};
use crate::types::{ProcessedResult, RawUpload};
use axum::Json;
use axum::extract::{Multipart, Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use std::sync::Arc;
use tracing::{debug, warn};

/// Multipart field carrying the uploaded image.
const UPLOAD_FIELD: &str = "file";

pub async fn index(State(state): State<AppState>) -> WebResult<Response> {
    let source = InputSource::Defaults(state.default_images().to_vec());
    run_and_render(&state, source).await
}

pub async fn fix(State(state): State<AppState>, mut multipart: Multipart) -> WebResult<Response> {
    let limit = state.pipeline().limits().max_file_size;
    match read_upload(&mut multipart, limit).await? {
        Received::Upload(upload) => {
            debug!(
                file_name = upload.file_name.as_deref().unwrap_or("-"),
                size = upload.size(),
                "upload received"
            );
            run_and_render(&state, InputSource::Upload(upload)).await
        }
        Received::TooLarge(size) => {
            warn!(size, limit, "upload rejected: too large");
            let outcome = Outcome::Failed(PipelineError::SizeLimit { size, limit });
            Ok(render(&state, &outcome, &[]))
        }
    }
}

pub async fn original_image(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> WebResult<Response> {
    let result = cached_result(&state, &key)?;
    let mime = ImageKind::sniff(&result.source)
        .map(ImageKind::mime)
        .unwrap_or("application/octet-stream");
    Ok(([(header::CONTENT_TYPE, mime)], result.source.clone()).into_response())
}

pub async fn fixed_image(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> WebResult<Response> {
    let result = cached_result(&state, &key)?;
    Ok(([(header::CONTENT_TYPE, OUTPUT_MIME)], result.fixed_png.clone()).into_response())
}

pub async fn download(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> WebResult<Response> {
    let result = cached_result(&state, &key)?;
    let disposition = format!("attachment; filename=\"{}\"", OUTPUT_FILE_NAME);
    Ok((
        [
            (header::CONTENT_TYPE, OUTPUT_MIME.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        result.fixed_png.clone(),
    )
        .into_response())
}

pub async fn cache_stats(State(state): State<AppState>) -> Json<CacheStats> {
    Json(state.pipeline().cache().stats())
}

/// What the `file` part of the form turned out to be.
enum Received {
    Upload(RawUpload),
    /// More than the size limit; only the byte count was kept.
    TooLarge(usize),
}

/// First `file` part of the form. A part with no file name and no bytes is
/// what browsers send when nothing was chosen.
///
/// At most `limit` bytes are buffered. An oversize part is counted and
/// discarded until [`upload_read_limit`], where reading stops.
async fn read_upload(multipart: &mut Multipart, limit: usize) -> WebResult<Received> {
    while let Some(mut field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let file_name = field
            .file_name()
            .filter(|name| !name.is_empty())
            .map(str::to_string);
        let content_type = field.content_type().map(str::to_string);

        let mut bytes = Vec::new();
        let mut size = 0usize;
        while let Some(chunk) = field.chunk().await? {
            size = size.saturating_add(chunk.len());
            if size <= limit {
                bytes.extend_from_slice(&chunk);
                continue;
            }
            bytes = Vec::new();
            if size > upload_read_limit(limit) {
                break;
            }
        }
        if size > limit {
            return Ok(Received::TooLarge(size));
        }
        if bytes.is_empty() && file_name.is_none() {
            return Err(WebError::MissingFile);
        }

        let mut upload = RawUpload::new(bytes);
        if let Some(name) = file_name {
            upload = upload.with_file_name(name);
        }
        if let Some(mime) = content_type {
            upload = upload.with_mime(&mime);
        }
        return Ok(Received::Upload(upload));
    }
    Err(WebError::MissingFile)
}

/// Run the pipeline off the async executor and render its outcome.
async fn run_and_render(state: &AppState, source: InputSource) -> WebResult<Response> {
    let pipeline = state.pipeline().clone();
    let (outcome, progress) = tokio::task::spawn_blocking(move || {
        let mut progress: Vec<ProgressEvent> = Vec::new();
        let outcome = pipeline.run(source, &mut progress);
        (outcome, progress)
    })
    .await?;
    Ok(render(state, &outcome, &progress))
}

fn render(state: &AppState, outcome: &Outcome, progress: &[ProgressEvent]) -> Response {
    let status = match outcome {
        Outcome::Failed(err) => pipeline_status(err),
        _ => StatusCode::OK,
    };
    let page = pages::render_page(outcome, progress, state.pipeline().limits());
    (status, page).into_response()
}

fn cached_result(state: &AppState, key: &str) -> WebResult<Arc<ProcessedResult>> {
    let key = CacheKey::parse(key).ok_or(WebError::ResultNotFound)?;
    state
        .pipeline()
        .cache()
        .get(&key)
        .ok_or(WebError::ResultNotFound)
}
