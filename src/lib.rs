// Library exports for the capture translation workflow

pub mod core;
pub mod orchestration;
pub mod services;
pub mod watcher;

// Re-export commonly used types and functions
pub use crate::core::{
    config::Config,
    errors::{ConfigError, TranslationError, WatchError},
    types::{CaptureTranslation, RecognizedText},
};

pub use crate::orchestration::{PollLoop, TextRecognizer, Translator};

pub use crate::services::{OcrService, TranslationClient};

pub use crate::watcher::{ChangeTracker, DirectoryWatcher};
