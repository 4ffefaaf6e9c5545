// Error types for startup and the watch loop
//
// Configuration, directory scanning, and the translation client carry typed
// thiserror enums; the OCR pipeline attaches context with anyhow at call
// sites instead, since its failures are only ever reported, never matched on.

use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no watched directory configured (set WATCHED_PATH)")]
    MissingWatchedPath,

    #[error("watched path is not a directory: {0}")]
    InvalidWatchedPath(String),

    #[error("no OCR model configured (set OCR_MODEL)")]
    MissingOcrModel,

    #[error("no translation model configured (set {0})")]
    MissingTranslationVar(&'static str),

    #[error("poll delay must be a positive number of seconds, got {0}")]
    InvalidPollDelay(f64),
}

/// Watched-directory errors
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("failed to read watched directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Translation service errors
#[derive(Debug, Error)]
pub enum TranslationError {
    #[error("chat request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("translation service returned {status}: {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("translation response contained no content")]
    EmptyResponse,
}

// Convenience type aliases for Results
pub type ConfigResult<T> = Result<T, ConfigError>;
pub type WatchResult<T> = Result<T, WatchError>;
pub type TranslationResult<T> = Result<T, TranslationError>;
