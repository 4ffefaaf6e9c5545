pub mod ocr;
pub mod onnx;
pub mod translation;

// Re-export commonly used services
pub use ocr::OcrService;
pub use translation::TranslationClient;
