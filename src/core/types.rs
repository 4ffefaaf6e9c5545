// Value types shared between the watcher, OCR, and translation stages

use std::path::PathBuf;

/// Top candidate produced by the OCR pipeline for one image.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognizedText {
    pub text: String,
    /// Mean per-character confidence in [0, 1]; 0 when nothing was decoded.
    pub confidence: f32,
}

/// One completed poll cycle: a newly detected capture, its recognized text,
/// and the translation produced for it.
#[derive(Debug, Clone)]
pub struct CaptureTranslation {
    pub source: PathBuf,
    pub ocr_text: String,
    pub translated_text: String,
}
