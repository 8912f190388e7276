//! Upload → fit → remove → present.
//!
//! The pipeline turns one input into one [`Outcome`]. Each run is linear
//! and synchronous:
//!
//! ```text
//! 1. Load      upload bytes, or the first existing default image
//! 2. Validate  reject inputs over the size limit before decoding
//! 3. Process   decode → fit → remove background → encode fixed.png
//!              (via ProcessingCache)
//! 4. Present   hand the cached result and its PNG to the caller
//! ```
//!
//! No input at all is not an error: the run ends in
//! [`Outcome::AwaitingInput`] so the UI can show a prompt. Every failure is
//! logged with its full source chain and returned as [`Outcome::Failed`];
//! nothing is retried and no partial output is produced.
//!
//! ## Progress
//!
//! Progress reporting is advisory. The caller passes a [`Progress`]
//! implementation explicitly, so the pipeline never touches UI state and
//! runs the same from the CLI, the web server or a test.
//!
//! | Percent | Status |
//! |---|---|
//! | 10 | Loading... |
//! | 30 | Processing... |
//! | 80 | Rendering result |
//! | 100 | Completed in X.XX seconds |

use crate::cache::{CacheKey, CacheStatus, ProcessingCache};
use crate::config::{AppConfig, DEFAULT_MAX_FILE_SIZE, DEFAULT_MAX_IMAGE_SIZE, LimitsConfig};
use crate::imaging::{
    BackgroundRemover, BorderKeyRemover, CodecError, RemovalError, decode, encode_png, fit,
    remove_background, sniff_format,
};
use crate::types::{ProcessedResult, RawUpload};
use serde::Serialize;
use std::error::Error as StdError;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Download file name of the processed image.
pub const OUTPUT_FILE_NAME: &str = "fixed.png";

/// MIME type of the processed image.
pub const OUTPUT_MIME: &str = "image/png";

fn megabytes(bytes: &usize) -> f64 {
    *bytes as f64 / (1024.0 * 1024.0)
}

/// Errors that end a pipeline run. `Display` is the user-facing message.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(
        "File is too large ({:.1} MB). Please upload a file smaller than {:.1} MB.",
        megabytes(.size),
        megabytes(.limit)
    )]
    SizeLimit { size: usize, limit: usize },
    #[error("Image not found: {}", .0.display())]
    FileNotFound(PathBuf),
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Error processing image: {0}")]
    Decode(#[source] CodecError),
    #[error("Error processing image: {0}")]
    Removal(#[from] RemovalError),
    #[error("Failed to prepare the download: {0}")]
    Encode(#[source] CodecError),
}

/// Size guards applied to every run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Largest accepted input, in bytes
    pub max_file_size: usize,
    /// Bounding dimension images are fitted to before removal
    pub max_image_size: u32,
}

impl Limits {
    pub fn from_config(config: &LimitsConfig) -> Self {
        Self {
            max_file_size: config.max_file_size,
            max_image_size: config.max_image_size,
        }
    }

    fn check_size(&self, size: usize) -> Result<(), PipelineError> {
        if size > self.max_file_size {
            return Err(PipelineError::SizeLimit {
                size,
                limit: self.max_file_size,
            });
        }
        Ok(())
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            max_image_size: DEFAULT_MAX_IMAGE_SIZE,
        }
    }
}

/// Where a run gets its bytes from.
#[derive(Debug, Clone)]
pub enum InputSource {
    /// Bytes uploaded through the UI.
    Upload(RawUpload),
    /// A specific file that must exist.
    File(PathBuf),
    /// Fallback images, the first existing one is used. None existing
    /// (or an empty list) means there is nothing to process yet.
    Defaults(Vec<PathBuf>),
}

/// Receives advisory progress milestones.
pub trait Progress {
    fn update(&mut self, percent: u8, status: &str);
}

/// Discards progress.
pub struct NoProgress;

impl Progress for NoProgress {
    fn update(&mut self, _percent: u8, _status: &str) {}
}

/// Forwards progress to the log at debug level.
pub struct LogProgress;

impl Progress for LogProgress {
    fn update(&mut self, percent: u8, status: &str) {
        debug!(percent, status, "progress");
    }
}

/// One recorded progress milestone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressEvent {
    pub percent: u8,
    pub status: String,
}

impl Progress for Vec<ProgressEvent> {
    fn update(&mut self, percent: u8, status: &str) {
        self.push(ProgressEvent {
            percent,
            status: status.to_string(),
        });
    }
}

/// Everything the UI needs to show and offer a finished result.
#[derive(Debug, Clone)]
pub struct Presentation {
    pub key: CacheKey,
    pub result: Arc<ProcessedResult>,
    /// Human-readable origin: the upload's file name or the file path
    pub source_label: String,
    pub cache_status: CacheStatus,
    pub elapsed: Duration,
}

impl Presentation {
    /// PNG bytes of the processed image, offered as [`OUTPUT_FILE_NAME`].
    pub fn png(&self) -> &[u8] {
        &self.result.fixed_png
    }

    pub fn completion_message(&self) -> String {
        completion_message(self.elapsed)
    }
}

fn completion_message(elapsed: Duration) -> String {
    format!("Completed in {:.2} seconds", elapsed.as_secs_f64())
}

/// Result of one pipeline run.
#[derive(Debug)]
pub enum Outcome {
    Completed(Presentation),
    /// Nothing uploaded and no default image available.
    AwaitingInput,
    Failed(PipelineError),
}

impl Outcome {
    /// The message shown to the user for this outcome.
    pub fn message(&self) -> String {
        match self {
            Outcome::Completed(p) => p.completion_message(),
            Outcome::AwaitingInput => "Upload an image to get started!".to_string(),
            Outcome::Failed(e) => e.to_string(),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }
}

/// Join an error and all of its sources into one line.
pub fn error_chain(err: &dyn StdError) -> String {
    let mut chain = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        // Variants like Decode(#[source]) already embed their cause in Display
        if !chain.ends_with(&text) {
            chain.push_str(": ");
            chain.push_str(&text);
        }
        source = cause.source();
    }
    chain
}

/// Cache-backed background removal pipeline, shareable across requests.
pub struct Pipeline {
    remover: Arc<dyn BackgroundRemover>,
    cache: Arc<ProcessingCache>,
    limits: Limits,
}

impl Pipeline {
    pub fn new(
        remover: Arc<dyn BackgroundRemover>,
        cache: Arc<ProcessingCache>,
        limits: Limits,
    ) -> Self {
        Self {
            remover,
            cache,
            limits,
        }
    }

    /// Built-in engine and cache, configured from `config`.
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            Arc::new(BorderKeyRemover::new(config.removal.tolerance)),
            Arc::new(
                ProcessingCache::with_capacity(config.cache.capacity())
                    .with_max_bytes(config.cache.byte_budget()),
            ),
            Limits::from_config(&config.limits),
        )
    }

    pub fn cache(&self) -> &ProcessingCache {
        &self.cache
    }

    pub fn limits(&self) -> Limits {
        self.limits
    }

    /// Run the pipeline to completion. Never panics on bad input; every
    /// failure is logged and reported through the returned [`Outcome`].
    pub fn run(&self, source: InputSource, progress: &mut dyn Progress) -> Outcome {
        let start = Instant::now();
        match self.try_run(source, progress, start) {
            Ok(Some(presentation)) => {
                info!(
                    key = %presentation.key,
                    source = %presentation.source_label,
                    cache = ?presentation.cache_status,
                    elapsed_ms = presentation.elapsed.as_millis() as u64,
                    "background removed"
                );
                Outcome::Completed(presentation)
            }
            Ok(None) => {
                info!("no upload and no default image available");
                Outcome::AwaitingInput
            }
            Err(err) => {
                error!(error = %error_chain(&err), debug = ?err, "pipeline failed");
                Outcome::Failed(err)
            }
        }
    }

    fn try_run(
        &self,
        source: InputSource,
        progress: &mut dyn Progress,
        start: Instant,
    ) -> Result<Option<Presentation>, PipelineError> {
        progress.update(10, "Loading...");
        let Some((bytes, source_label)) = self.load(source)? else {
            return Ok(None);
        };

        progress.update(30, "Processing...");
        let (key, result, cache_status) = self
            .cache
            .get_or_compute(&bytes, |b| self.process_bytes(b))?;

        progress.update(80, "Rendering result");
        let elapsed = start.elapsed();
        progress.update(100, &completion_message(elapsed));
        Ok(Some(Presentation {
            key,
            result,
            source_label,
            cache_status,
            elapsed,
        }))
    }

    /// Resolve the input to bytes, enforcing the size limit before anything
    /// is decoded. `Ok(None)` means no input is available.
    fn load(&self, source: InputSource) -> Result<Option<(Vec<u8>, String)>, PipelineError> {
        match source {
            InputSource::Upload(upload) => {
                self.limits.check_size(upload.size())?;
                if let Some(kind) = upload.kind
                    && let Some(format) = sniff_format(&upload.bytes)
                    && !kind.matches(format)
                {
                    warn!(hint = ?kind, sniffed = ?format, "upload name does not match its content");
                }
                let label = upload
                    .file_name
                    .clone()
                    .unwrap_or_else(|| "upload".to_string());
                Ok(Some((upload.bytes, label)))
            }
            InputSource::File(path) => self.read_file(&path).map(Some),
            InputSource::Defaults(candidates) => {
                match candidates.iter().find(|p| p.is_file()) {
                    Some(path) => {
                        debug!(path = %path.display(), "using default image");
                        self.read_file(path).map(Some)
                    }
                    None => Ok(None),
                }
            }
        }
    }

    fn read_file(&self, path: &Path) -> Result<(Vec<u8>, String), PipelineError> {
        let io_err = |source| PipelineError::Io {
            path: path.to_path_buf(),
            source,
        };
        if !path.exists() {
            return Err(PipelineError::FileNotFound(path.to_path_buf()));
        }
        let len = std::fs::metadata(path).map_err(io_err)?.len();
        self.limits
            .check_size(usize::try_from(len).unwrap_or(usize::MAX))?;
        let bytes = std::fs::read(path).map_err(io_err)?;
        Ok((bytes, path.display().to_string()))
    }

    /// Decode, fit, remove the background of raw bytes and encode the
    /// download. Pure with respect to `bytes`, which is what makes the
    /// content-addressed cache sound.
    pub fn process_bytes(&self, bytes: &[u8]) -> Result<ProcessedResult, PipelineError> {
        let original = decode(bytes).map_err(PipelineError::Decode)?;
        let processed = {
            let fitted = fit(&original, self.limits.max_image_size);
            remove_background(self.remover.as_ref(), &fitted)?
        };
        let fixed_png = encode_png(&processed).map_err(PipelineError::Encode)?;
        Ok(ProcessedResult {
            original,
            processed,
            fixed_png,
            source: bytes.to_vec(),
        })
    }
}
