// Main entry point for the capture translation workflow

use capture_translator::{
    core::config::{self, Config},
    orchestration::PollLoop,
    services::{OcrService, TranslationClient},
    watcher::DirectoryWatcher,
};

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // .env must be loaded before LOG_LEVEL is read. Config::new() loads it
    // again, which is a no-op by then.
    let _ = dotenvy::dotenv();

    let filter = EnvFilter::new(format!(
        "capture_translator={},ort=off",
        config::log_level_from_env()
    ));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Load configuration
    let config = Config::new().context("failed to load configuration")?;

    info!("=== CAPTURE TRANSLATOR ===");
    info!(
        "watching {} every {:.2}s",
        config.watch.path.display(),
        config.watch.poll_delay.as_secs_f64()
    );
    info!(
        "translation model '{}' at {}:{} (base: {})",
        config.translation.model_name,
        config.translation.host,
        config.translation.port,
        config.translation.base_model
    );

    // Initialize the OCR pipeline
    let ocr = OcrService::new(&config.ocr.model_dir, config.ocr.forced_backend.as_deref())
        .context("failed to initialize OCR service")?;
    info!("OCR backend: {}", ocr.backend());

    // Connect the translation client and register the persona model
    let translator =
        TranslationClient::new(&config.translation).context("failed to create translation client")?;
    translator
        .register_persona()
        .await
        .context("failed to register translation model")?;

    let watcher = DirectoryWatcher::new(config.watch.path.clone());
    PollLoop::new(watcher, config.watch.poll_delay, ocr, translator)
        .run()
        .await
}
