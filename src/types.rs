//! Shared types passed between the UI boundary, the cache and the pipeline.

use crate::imaging::ImageKind;
use image::DynamicImage;

/// Bytes of an uploaded file, as received from the UI boundary.
///
/// Immutable once created and never persisted; dropped when the request
/// that carried it completes.
#[derive(Debug, Clone)]
pub struct RawUpload {
    pub bytes: Vec<u8>,
    /// Original file name, when the client sent one
    pub file_name: Option<String>,
    /// Format hint from the file name or MIME type
    pub kind: Option<ImageKind>,
}

impl RawUpload {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            file_name: None,
            kind: None,
        }
    }

    /// Attach a file name and derive the format hint from its extension.
    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.kind = ImageKind::from_file_name(&name).or(self.kind);
        self.file_name = Some(name);
        self
    }

    /// Attach a MIME type hint. An extension-derived hint takes precedence.
    pub fn with_mime(mut self, mime: &str) -> Self {
        self.kind = self.kind.or(ImageKind::from_mime(mime));
        self
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// Original image paired with its background-removed version.
///
/// `original` is the decoded upload at its source size; `processed` is the
/// fitted image with background pixels made transparent.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedResult {
    pub original: DynamicImage,
    pub processed: DynamicImage,
    /// `processed` encoded as PNG, served as the `fixed.png` download
    pub fixed_png: Vec<u8>,
    /// Upload bytes exactly as received, served as the original view
    pub source: Vec<u8>,
}

impl ProcessedResult {
    /// Bytes held by the images and buffers, for cache budgeting.
    pub fn weight(&self) -> usize {
        self.original.as_bytes().len()
            + self.processed.as_bytes().len()
            + self.fixed_png.len()
            + self.source.len()
    }
}
