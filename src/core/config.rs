use crate::core::errors::{ConfigError, ConfigResult};
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

/// Seconds between directory scans when LOOP_DELAY is unset or unparsable.
const DEFAULT_POLL_DELAY_SECS: f64 = 1.0;

/// Default Ollama port.
const DEFAULT_TRANSLATION_PORT: u16 = 11434;

/// Watched directory configuration
#[derive(Debug, Clone)]
pub struct WatchConfig {
    pub path: PathBuf,
    pub poll_delay: Duration,
}

/// OCR pipeline configuration
#[derive(Debug, Clone)]
pub struct OcrConfig {
    /// Directory holding the ONNX model and its charset file.
    pub model_dir: PathBuf,
    /// Pinned inference backend; None means auto-detection.
    pub forced_backend: Option<String>,
}

/// Translation service configuration
#[derive(Debug, Clone)]
pub struct TranslationConfig {
    pub host: String,
    pub port: u16,
    /// Base model the translation persona is derived from.
    pub base_model: String,
    /// Name the derived persona model is registered and addressed under.
    pub model_name: String,
}

/// Main application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub watch: WatchConfig,
    pub ocr: OcrConfig,
    pub translation: TranslationConfig,
}

impl Config {
    pub fn new() -> ConfigResult<Self> {
        // Load .env file if it exists
        let _ = dotenvy::dotenv();

        let config = Self::load_from_env()?;
        config.validate()?;
        Ok(config)
    }

    fn load_from_env() -> ConfigResult<Self> {
        let watched_path = env::var("WATCHED_PATH").map_err(|_| ConfigError::MissingWatchedPath)?;
        let model_dir = env::var("OCR_MODEL").map_err(|_| ConfigError::MissingOcrModel)?;
        let poll_delay = poll_delay_from(env::var("LOOP_DELAY").ok())?;

        Ok(Self {
            watch: WatchConfig {
                path: PathBuf::from(watched_path),
                poll_delay,
            },
            ocr: OcrConfig {
                model_dir: PathBuf::from(model_dir),
                forced_backend: env::var("INFERENCE_BACKEND")
                    .ok()
                    .map(|s| s.trim().to_lowercase())
                    .filter(|s| !s.is_empty() && s != "auto"),
            },
            translation: TranslationConfig {
                host: env::var("OLLAMA_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
                port: port_from(env::var("OLLAMA_PORT").ok()),
                base_model: env::var("OLLAMA_BASE_MODEL")
                    .map_err(|_| ConfigError::MissingTranslationVar("OLLAMA_BASE_MODEL"))?,
                model_name: env::var("OLLAMA_TRANSLATION_MODEL_NAME").map_err(|_| {
                    ConfigError::MissingTranslationVar("OLLAMA_TRANSLATION_MODEL_NAME")
                })?,
            },
        })
    }

    fn validate(&self) -> ConfigResult<()> {
        if !self.watch.path.is_dir() {
            return Err(ConfigError::InvalidWatchedPath(
                self.watch.path.display().to_string(),
            ));
        }
        Ok(())
    }
}

/// Poll delay with the unset/unparsable fallback. A value that parses but is
/// not a positive finite number is a hard error: it cannot be slept on.
fn poll_delay_from(raw: Option<String>) -> ConfigResult<Duration> {
    let secs = match raw {
        None => DEFAULT_POLL_DELAY_SECS,
        Some(raw) => match raw.trim().parse::<f64>() {
            Ok(secs) => secs,
            Err(e) => {
                warn!(
                    "error loading environment variables: {e}; \
                     using default poll delay of {DEFAULT_POLL_DELAY_SECS}s"
                );
                DEFAULT_POLL_DELAY_SECS
            }
        },
    };

    if !secs.is_finite() || secs <= 0.0 {
        return Err(ConfigError::InvalidPollDelay(secs));
    }
    Ok(Duration::from_secs_f64(secs))
}

fn port_from(raw: Option<String>) -> u16 {
    match raw {
        None => DEFAULT_TRANSLATION_PORT,
        Some(raw) => raw.trim().parse().unwrap_or_else(|e| {
            warn!(
                "error loading environment variables: {e}; \
                 using default translation port {DEFAULT_TRANSLATION_PORT}"
            );
            DEFAULT_TRANSLATION_PORT
        }),
    }
}

/// Log level for the tracing filter, read directly from the environment so
/// the subscriber can be installed before configuration loading logs its
/// fallback warnings.
pub fn log_level_from_env() -> &'static str {
    match env::var("LOG_LEVEL").ok().map(|s| s.to_lowercase()).as_deref() {
        Some("trace") => "trace",
        Some("debug") => "debug",
        Some("warn") | Some("warning") => "warn",
        Some("error") => "error",
        _ => "info",
    }
}
