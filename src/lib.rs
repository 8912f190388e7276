//! # bgfix
//!
//! Upload an image, get it back with the background removed, download the
//! result as `fixed.png`.
//!
//! # Architecture: One Linear Pipeline
//!
//! Every request, from the browser or the CLI, goes through the same
//! synchronous pipeline:
//!
//! ```text
//! upload / default image
//!   → size guard      reject > max_file_size before decoding
//!   → decode          PNG / JPEG → DynamicImage
//!   → fit             scale down to max_image_size (aspect preserved)
//!   → remove          BackgroundRemover engine → RGBA with transparency
//!   → encode          processed image → fixed.png
//!   → present         show original + processed, offer fixed.png
//! ```
//!
//! The decode → fit → remove → encode steps are memoized by a
//! content-addressed cache keyed on the SHA-256 of the raw upload bytes, so
//! resubmitting the same file is instant.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`pipeline`] | Orchestrates a run, reports progress, turns failures into user messages |
//! | [`cache`] | Content-addressed LRU cache of processed results |
//! | [`imaging`] | Decode, fit, background removal engines, PNG encoding |
//! | [`web`] | axum + Maud browser UI: upload form, result page, downloads |
//! | [`config`] | `config.toml` loading, validation, merging over stock defaults |
//! | [`types`] | `RawUpload` and `ProcessedResult` shared between modules |
//! | [`output`] | CLI output formatting for pipeline outcomes and cache stats |
//!
//! # Design Decisions
//!
//! ## Pluggable Removal Engine
//!
//! Background removal sits behind the [`imaging::BackgroundRemover`] trait.
//! The built-in [`imaging::BorderKeyRemover`] estimates the background color
//! from the image border and flood-fills it to transparent. Swapping in a
//! model-based engine only requires another trait implementation; the
//! pipeline, cache and UI never change.
//!
//! ## Maud Over Template Engines
//!
//! Pages are rendered with [Maud](https://maud.lambda.xyz/), so malformed HTML
//! is a build error and all interpolation is escaped. There is no template
//! directory to ship alongside the binary.
//!
//! ## Failures Are Outcomes
//!
//! A pipeline run never panics on user input. Size-limit, missing-file,
//! decode and removal failures are logged with their full cause chain and
//! surface as [`pipeline::Outcome::Failed`] with a plain-language message.

pub mod cache;
pub mod config;
pub mod imaging;
pub mod output;
pub mod pipeline;
pub mod types;
pub mod web;

#[cfg(test)]
pub(crate) mod test_helpers;
