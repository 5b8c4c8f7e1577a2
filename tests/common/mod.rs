//! Shared helpers for the integration tests: tracing setup and tree fixtures.
//!
//! # Usage
//!
//! ```rust,ignore
//! mod common;
//!
//! #[test]
//! fn my_test() {
//!     common::init_tracing();
//!     let tree = common::tree_with(&["/a/", "/a/b/"]);
//!     common::assert_listing(&tree, "/a/", "b");
//! }
//! ```
//!
//! # Configuration
//!
//! Environment variables:
//! - `RUST_LOG`: Filter directives (e.g., `dirtree=debug,dirtree::tree::traverse=trace`)
//! - `DIRTREE_LOG_DIR`: Log directory (default: `logs/`)
//! - `DIRTREE_LOG_CONSOLE`: Set to "0" to disable console output
//!
//! # Log Files
//!
//! Logs are written to `logs/dirtree.jsonl` as newline-delimited JSON (NDJSON).
//! Use `jq` for pretty-printing and filtering:
//!
//! ```bash
//! # Pretty-print all logs
//! cat logs/dirtree.jsonl | jq .
//!
//! # Convert to JSON array
//! cat logs/dirtree.jsonl | jq -s .
//!
//! # Follow one directory through create/move/remove
//! cat logs/dirtree.jsonl | jq 'select(.span.path == "/a/b/")'
//!
//! # Show only errors
//! cat logs/dirtree.jsonl | jq 'select(.level == "ERROR")'
//! ```

#![allow(dead_code)]

use std::env;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Once;

use dirtree::Tree;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Ensures tracing is only initialized once across all tests.
static INIT: Once = Once::new();

/// Initialize the tracing subscriber with file and console logging.
///
/// Safe to call multiple times - only the first call takes effect.
/// Logs are appended to `logs/dirtree.jsonl` as NDJSON.
pub fn init_tracing() {
    INIT.call_once(|| {
        setup_tracing();
    });
}

/// Configuration for tracing setup.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Directory for log files.
    pub log_dir: PathBuf,
    /// Log file name.
    pub log_file: String,
    /// Enable console output.
    pub console_enabled: bool,
    /// Default log level if RUST_LOG is not set.
    pub default_level: Level,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("logs"),
            log_file: "dirtree.jsonl".to_string(),
            console_enabled: true,
            default_level: Level::INFO,
        }
    }
}

impl TracingConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(dir) = env::var("DIRTREE_LOG_DIR") {
            config.log_dir = PathBuf::from(dir);
        }

        if env::var("DIRTREE_LOG_CONSOLE").is_ok_and(|v| v == "0") {
            config.console_enabled = false;
        }

        config
    }
}

/// Create an EnvFilter from RUST_LOG or use default level.
fn make_filter(default_level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(format!("{default_level}")))
}

#[expect(clippy::expect_used)]
fn setup_tracing() {
    let config = TracingConfig::from_env();

    // Create log directory
    std::fs::create_dir_all(&config.log_dir).expect("Failed to create log directory");

    let log_path = config.log_dir.join(&config.log_file);

    // Open file in append mode (nextest runs tests in separate processes)
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .expect("Failed to open log file");

    // === Console Layer ===
    let console_layer = if config.console_enabled {
        Some(
            tracing_subscriber::fmt::layer()
                .with_thread_ids(true)
                .with_thread_names(true)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_span_events(FmtSpan::CLOSE)
                .with_ansi(true)
                .compact()
                .with_filter(make_filter(config.default_level)),
        )
    } else {
        None
    };

    // === File Layer (NDJSON format) ===
    // Writes one JSON object per line. Use `jq` for pretty-printing.
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::sync::Mutex::new(file))
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::CLOSE)
        .json()
        .with_filter(make_filter(config.default_level));

    // Compose and install subscriber (use try_init to avoid panic if lib already set one)
    let _ = Registry::default()
        .with(console_layer)
        .with(file_layer)
        .try_init();
}

// ============================================================================
//  Tree fixtures
// ============================================================================

/// Build a tree by creating `paths` in order.
#[expect(clippy::expect_used)]
pub fn tree_with(paths: &[&str]) -> Tree {
    let tree = Tree::new();
    for path in paths {
        tree.create(path).expect("fixture path must be creatable");
    }
    tree
}

/// Assert that `path` lists exactly `expected`.
pub fn assert_listing(tree: &Tree, path: &str, expected: &str) {
    assert_eq!(tree.list(path).as_deref(), Ok(expected), "listing of {path}");
}

/// Every directory path in the tree, depth-first, root excluded.
#[expect(clippy::expect_used)]
pub fn all_paths(tree: &Tree) -> Vec<String> {
    let mut out = Vec::new();
    let mut pending = vec![String::from("/")];

    while let Some(dir) = pending.pop() {
        for name in tree.list_names(&dir).expect("listed directory must exist") {
            let child = format!("{dir}{name}/");
            out.push(child.clone());
            pending.push(child);
        }
    }
    out.sort();
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracing_init() {
        init_tracing();
        tracing::info!("Tracing initialized successfully");
        tracing::debug!(path = "/a/b/", "Debug event");
        tracing::trace!(thread = ?std::thread::current().id(), "Trace event");
    }
}
