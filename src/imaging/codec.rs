//! Decoding uploaded bytes and encoding results to PNG.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Format sniffing | `image::ImageReader::with_guessed_format` (magic bytes) |
//! | Decode (JPEG, PNG) | `image` crate (pure Rust decoders) |
//! | Encode → PNG | `image::codecs::png::PngEncoder` |
//!
//! The file name or MIME type of an upload is only a hint used to reject
//! obviously unsupported files early; decoding always trusts the bytes.

use image::codecs::png::PngEncoder;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::io::Cursor;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("{0}")]
    Decode(String),
    #[error("PNG encode failed: {0}")]
    Encode(#[from] image::ImageError),
}

/// Upload formats accepted by the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Png,
    Jpeg,
}

const ACCEPTED_EXTENSIONS: &[(&str, ImageKind)] = &[
    ("png", ImageKind::Png),
    ("jpg", ImageKind::Jpeg),
    ("jpeg", ImageKind::Jpeg),
];

impl ImageKind {
    /// Kind from a file name's extension (case-insensitive).
    pub fn from_file_name(name: &str) -> Option<Self> {
        let (_, ext) = name.rsplit_once('.')?;
        ACCEPTED_EXTENSIONS
            .iter()
            .find(|(candidate, _)| candidate.eq_ignore_ascii_case(ext))
            .map(|(_, kind)| *kind)
    }

    /// Kind from a MIME type such as `image/jpeg`.
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime.trim().to_ascii_lowercase().as_str() {
            "image/png" => Some(Self::Png),
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            _ => None,
        }
    }

    /// Kind of sniffed content, when it is an accepted upload format.
    pub fn from_format(format: ImageFormat) -> Option<Self> {
        match format {
            ImageFormat::Png => Some(Self::Png),
            ImageFormat::Jpeg => Some(Self::Jpeg),
            _ => None,
        }
    }

    /// Kind of encoded bytes, judged by their signature alone.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        sniff_format(bytes).and_then(Self::from_format)
    }

    /// Whether sniffed content agrees with this hint.
    pub fn matches(self, format: ImageFormat) -> bool {
        matches!(
            (self, format),
            (Self::Png, ImageFormat::Png) | (Self::Jpeg, ImageFormat::Jpeg)
        )
    }

    pub fn mime(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
        }
    }
}

/// File extensions offered by the upload widget's `accept` attribute.
pub fn accepted_extensions() -> impl Iterator<Item = &'static str> {
    ACCEPTED_EXTENSIONS.iter().map(|(ext, _)| *ext)
}

/// Decode raw bytes into an image, sniffing the format from its content.
pub fn decode(bytes: &[u8]) -> Result<DynamicImage, CodecError> {
    if bytes.is_empty() {
        return Err(CodecError::Decode("cannot decode an empty file".into()));
    }
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| CodecError::Decode(format!("failed to read image: {e}")))?;
    if reader.format().is_none() {
        return Err(CodecError::Decode(
            "unrecognized image format (expected PNG or JPEG)".into(),
        ));
    }
    reader
        .decode()
        .map_err(|e| CodecError::Decode(format!("failed to decode image: {e}")))
}

/// Encode an image as PNG, keeping the alpha channel when there is one.
pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, CodecError> {
    let mut buf = Vec::new();
    img.write_with_encoder(PngEncoder::new(&mut buf))?;
    Ok(buf)
}

/// Format of an encoded image, if the bytes carry a known signature.
pub fn sniff_format(bytes: &[u8]) -> Option<ImageFormat> {
    image::guess_format(bytes).ok()
}
