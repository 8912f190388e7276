//! Image handling in pure Rust, no system libraries.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** (PNG, JPEG) | `image::ImageReader` with format sniffing |
//! | **Fit** | pure dimension math + `resize_exact` (Lanczos3) |
//! | **Remove background** | [`BackgroundRemover`] engine |
//! | **Encode** | `image::codecs::png::PngEncoder` |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Codec**: Bytes ⇄ [`image::DynamicImage`]
//! - **Remover**: [`BackgroundRemover`] trait + [`BorderKeyRemover`]
//! - **Operations**: High-level functions combining the above

pub mod border_key;
mod calculations;
pub mod codec;
pub mod operations;
pub mod remover;

pub use border_key::BorderKeyRemover;
pub use calculations::{calculate_fit_dimensions, needs_fit};
pub use codec::{CodecError, ImageKind, decode, encode_png, sniff_format};
pub use operations::{fit, remove_background};
pub use remover::{BackgroundRemover, RemovalError};
