//! Quick OCR smoke test - run the local pipeline on a single image
//! Run with: cargo run --release --bin test_ocr -- <image_path>

use anyhow::Result;
use capture_translator::services::OcrService;
use std::path::{Path, PathBuf};

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter("capture_translator::services::ocr=debug")
        .with_target(false)
        .init();

    let _ = dotenvy::dotenv();

    // Get image path from args
    let args: Vec<String> = std::env::args().collect();
    let image_path = args
        .get(1)
        .cloned()
        .unwrap_or_else(|| "test_sample.png".to_string());

    if !Path::new(&image_path).exists() {
        eprintln!("image not found: {image_path}");
        std::process::exit(1);
    }

    let model_dir = std::env::var("OCR_MODEL")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("models/ocr"));

    let ocr = OcrService::new(&model_dir, None)?;
    let result = ocr.recognize_file(Path::new(&image_path))?;

    println!("backend:    {}", ocr.backend());
    println!("confidence: {:.2}", result.confidence);
    if result.text.is_empty() {
        println!("text:       (empty)");
    } else {
        println!("text:       {}", result.text);
    }

    Ok(())
}
