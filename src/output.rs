//! CLI output formatting for pipeline runs.
//!
//! # Output Format
//!
//! ## Completed
//!
//! ```text
//! zebra.jpg
//!     Original: 4000x1000
//!     Processed: 2000x500 (processed)
//!     Saved: fixed.png
//! Completed in 0.42 seconds
//! ```
//!
//! ## Failed
//!
//! ```text
//! Error: File is too large (12.0 MB). Please upload a file smaller than 10.0 MB.
//! ```
//!
//! # Architecture
//!
//! Each display has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.

use crate::cache::{CacheStats, CacheStatus};
use crate::pipeline::{Outcome, Presentation};
use image::GenericImageView;
use std::path::Path;

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn megabytes(bytes: usize) -> String {
    format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
}

fn dimensions_label(dims: (u32, u32)) -> String {
    format!("{}x{}", dims.0, dims.1)
}

fn cache_label(status: CacheStatus) -> &'static str {
    match status {
        CacheStatus::Hit => "cached",
        CacheStatus::Miss => "processed",
    }
}

fn presentation_lines(p: &Presentation, saved_to: Option<&Path>) -> Vec<String> {
    let mut lines = vec![p.source_label.clone()];
    lines.push(format!(
        "{}Original: {}",
        indent(1),
        dimensions_label(p.result.original.dimensions())
    ));
    lines.push(format!(
        "{}Processed: {} ({})",
        indent(1),
        dimensions_label(p.result.processed.dimensions()),
        cache_label(p.cache_status)
    ));
    if let Some(path) = saved_to {
        lines.push(format!("{}Saved: {}", indent(1), path.display()));
    }
    lines.push(p.completion_message());
    lines
}

/// Format the result of one pipeline run.
///
/// `saved_to` is where the processed PNG was written, if anywhere.
pub fn format_outcome(outcome: &Outcome, saved_to: Option<&Path>) -> Vec<String> {
    match outcome {
        Outcome::Completed(p) => presentation_lines(p, saved_to),
        Outcome::AwaitingInput => vec![outcome.message()],
        Outcome::Failed(_) => vec![format!("Error: {}", outcome.message())],
    }
}

pub fn print_outcome(outcome: &Outcome, saved_to: Option<&Path>) {
    for line in format_outcome(outcome, saved_to) {
        println!("{}", line);
    }
}

/// Format cache statistics, one line plus capacity and memory detail.
///
/// ```text
/// Cache: 1 cached, 2 processed (3 total)
///     Entries: 2 of 64, 0 evicted
///     Memory: 12.5 MB of 512.0 MB
/// ```
pub fn format_cache_stats(stats: &CacheStats) -> Vec<String> {
    let capacity = match stats.capacity {
        Some(n) => format!("{} of {}", stats.entries, n),
        None => format!("{} (unbounded)", stats.entries),
    };
    let memory = match stats.max_bytes {
        Some(n) => format!("{} of {}", megabytes(stats.bytes), megabytes(n)),
        None => format!("{} (unlimited)", megabytes(stats.bytes)),
    };
    vec![
        format!("Cache: {}", stats),
        format!("{}Entries: {}, {} evicted", indent(1), capacity, stats.evictions),
        format!("{}Memory: {}", indent(1), memory),
    ]
}

pub fn print_cache_stats(stats: &CacheStats) {
    for line in format_cache_stats(stats) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheKey;
    use crate::pipeline::PipelineError;
    use crate::test_helpers::{processed_result, solid_rgb};
    use std::sync::Arc;
    use std::time::Duration;

    fn presentation(status: CacheStatus) -> Presentation {
        Presentation {
            key: CacheKey::from_bytes(b"zebra"),
            result: Arc::new(processed_result(
                solid_rgb(4000, 1000, [0, 0, 0]),
                solid_rgb(2000, 500, [0, 0, 0]),
            )),
            source_label: "zebra.jpg".to_string(),
            cache_status: status,
            elapsed: Duration::from_millis(420),
        }
    }

    // =========================================================================
    // Outcome
    // =========================================================================

    #[test]
    fn completed_shows_dimensions_and_destination() {
        let outcome = Outcome::Completed(presentation(CacheStatus::Miss));
        let lines = format_outcome(&outcome, Some(Path::new("fixed.png")));
        assert_eq!(
            lines,
            vec![
                "zebra.jpg",
                "    Original: 4000x1000",
                "    Processed: 2000x500 (processed)",
                "    Saved: fixed.png",
                "Completed in 0.42 seconds",
            ]
        );
    }

    #[test]
    fn completed_from_cache_without_destination() {
        let outcome = Outcome::Completed(presentation(CacheStatus::Hit));
        let lines = format_outcome(&outcome, None);
        assert_eq!(lines[2], "    Processed: 2000x500 (cached)");
        assert!(!lines.iter().any(|l| l.contains("Saved")));
    }

    #[test]
    fn awaiting_input_shows_prompt() {
        let lines = format_outcome(&Outcome::AwaitingInput, None);
        assert_eq!(lines, vec!["Upload an image to get started!"]);
    }

    #[test]
    fn failure_prefixed_with_error() {
        let outcome = Outcome::Failed(PipelineError::FileNotFound("missing.png".into()));
        let lines = format_outcome(&outcome, None);
        assert_eq!(lines, vec!["Error: Image not found: missing.png"]);
    }

    // =========================================================================
    // Cache stats
    // =========================================================================

    #[test]
    fn cache_stats_bounded() {
        let stats = CacheStats {
            hits: 1,
            misses: 2,
            evictions: 0,
            entries: 2,
            capacity: Some(64),
            bytes: 25 * 1024 * 512,
            max_bytes: Some(512 * 1024 * 1024),
        };
        let lines = format_cache_stats(&stats);
        assert_eq!(lines[0], "Cache: 1 cached, 2 processed (3 total)");
        assert_eq!(lines[1], "    Entries: 2 of 64, 0 evicted");
        assert_eq!(lines[2], "    Memory: 12.5 MB of 512.0 MB");
    }

    #[test]
    fn cache_stats_unbounded() {
        let stats = CacheStats {
            hits: 0,
            misses: 3,
            evictions: 0,
            entries: 3,
            ..CacheStats::default()
        };
        let lines = format_cache_stats(&stats);
        assert_eq!(lines[1], "    Entries: 3 (unbounded), 0 evicted");
        assert_eq!(lines[2], "    Memory: 0.0 MB (unlimited)");
    }
}
