//! HTML pages rendered with Maud.
//!
//! There is a single page layout: a sidebar with the upload form, the
//! download link and the image guidelines, and a main area that shows the
//! outcome of the last run. Every handler, successful or not, renders
//! through [`render_page`] so the upload form is always one click away.

use crate::cache::CacheKey;
use crate::imaging::codec::accepted_extensions;
use crate::pipeline::{Limits, OUTPUT_FILE_NAME, Outcome, ProgressEvent};
use maud::{DOCTYPE, Markup, PreEscaped, html};

const CSS: &str = include_str!("../../static/style.css");

const PAGE_TITLE: &str = "Image Background Remover";

/// URL of a cached image for `key`. `name` is `original` or `fixed.png`.
pub fn result_url(key: &CacheKey, name: &str) -> String {
    format!("/results/{}/{}", key, name)
}

pub fn download_url(key: &CacheKey) -> String {
    format!("/results/{}/download", key)
}

fn megabytes(bytes: usize) -> String {
    format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
}

fn accept_attribute() -> String {
    accepted_extensions()
        .map(|ext| format!(".{ext}"))
        .collect::<Vec<_>>()
        .join(",")
}

fn base_document(content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (PAGE_TITLE) }
                style { (PreEscaped(CSS)) }
            }
            body {
                (content)
            }
        }
    }
}

fn guidelines(limits: Limits) -> Markup {
    let formats = accepted_extensions()
        .map(str::to_ascii_uppercase)
        .collect::<Vec<_>>()
        .join(", ");
    html! {
        details.guidelines {
            summary { "Image Guidelines" }
            ul {
                li { "Maximum file size: " (megabytes(limits.max_file_size)) }
                li { "Images larger than " (limits.max_image_size) "px are resized automatically" }
                li { "Supported formats: " (formats) }
                li { "Processing time depends on image size" }
            }
        }
    }
}

fn sidebar(limits: Option<Limits>, download: Option<&CacheKey>) -> Markup {
    html! {
        aside.sidebar {
            h2 { "Upload and download" }
            form.upload-form method="post" action="/fix" enctype="multipart/form-data" {
                input type="file" name="file" accept=(accept_attribute()) required;
                button type="submit" { "Remove background" }
            }
            @if let Some(key) = download {
                p {
                    a.download href=(download_url(key)) download=(OUTPUT_FILE_NAME) {
                        "Download fixed image"
                    }
                }
            }
            @if let Some(limits) = limits {
                (guidelines(limits))
            }
        }
    }
}

fn progress_list(progress: &[ProgressEvent]) -> Markup {
    html! {
        @if !progress.is_empty() {
            ol.progress {
                @for event in progress {
                    li data-percent=(event.percent) { (event.status) }
                }
            }
        }
    }
}

fn outcome_body(outcome: &Outcome) -> Markup {
    match outcome {
        Outcome::Completed(p) => html! {
            div.status.success { (p.completion_message()) }
            div.columns {
                figure {
                    figcaption { "Original image" }
                    img src=(result_url(&p.key, "original")) alt=(p.source_label);
                }
                figure {
                    figcaption { "Fixed image" }
                    img src=(result_url(&p.key, OUTPUT_FILE_NAME)) alt="Background removed";
                }
            }
        },
        Outcome::AwaitingInput => html! {
            div.status.info { (outcome.message()) }
        },
        Outcome::Failed(_) => html! {
            div.status.error role="alert" { (outcome.message()) }
        },
    }
}

/// Full page for the outcome of a pipeline run.
pub fn render_page(outcome: &Outcome, progress: &[ProgressEvent], limits: Limits) -> Markup {
    let download = match outcome {
        Outcome::Completed(p) => Some(&p.key),
        _ => None,
    };
    base_document(html! {
        (sidebar(Some(limits), download))
        main.main {
            h2 { "Remove background from your image" }
            p { "Upload an image to see its background removed. The full quality result can be downloaded from the sidebar." }
            (outcome_body(outcome))
            (progress_list(progress))
        }
    })
}

/// Page for a request that never reached the pipeline.
pub fn render_error(message: &str) -> Markup {
    base_document(html! {
        (sidebar(None, None))
        main.main {
            h2 { "Remove background from your image" }
            div.status.error role="alert" { (message) }
        }
    })
}
