// Poll loop orchestration - one sequential OCR + translation cycle per
// newly detected capture
//
// The loop is a single task: the sleep, the directory scan, the OCR call,
// and the translation call all run back to back. Any error past the scan
// propagates out of run() and terminates the process.

use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::core::types::{CaptureTranslation, RecognizedText};
use crate::watcher::{ChangeTracker, DirectoryWatcher};

/// Image-to-text seam, implemented by the local ONNX pipeline.
pub trait TextRecognizer: Send + Sync {
    fn recognize_file(&self, path: &Path) -> Result<RecognizedText>;
}

/// Chat-completion seam, implemented by the Ollama client.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str) -> Result<String>;
}

pub struct PollLoop<R, T> {
    watcher: DirectoryWatcher,
    tracker: ChangeTracker,
    delay: Duration,
    recognizer: R,
    translator: T,
}

impl<R: TextRecognizer, T: Translator> PollLoop<R, T> {
    pub fn new(watcher: DirectoryWatcher, delay: Duration, recognizer: R, translator: T) -> Self {
        Self {
            watcher,
            tracker: ChangeTracker::new(),
            delay,
            recognizer,
            translator,
        }
    }

    /// One poll cycle. Returns Some when a new most-recent file was fully
    /// processed; an empty directory, an unchanged newest file, and the
    /// seeding observation are all no-ops.
    pub async fn tick(&mut self) -> Result<Option<CaptureTranslation>> {
        let Some(newest) = self.watcher.newest_file()? else {
            return Ok(None);
        };
        let Some(path) = self.tracker.observe(newest) else {
            return Ok(None);
        };

        debug!("new capture detected: {}", path.display());
        let recognized = self.recognizer.recognize_file(&path)?;
        debug!(
            "recognized {} chars (confidence {:.2})",
            recognized.text.chars().count(),
            recognized.confidence
        );
        let translated = self.translator.translate(&recognized.text).await?;

        Ok(Some(CaptureTranslation {
            source: path,
            ocr_text: recognized.text,
            translated_text: translated,
        }))
    }

    /// Poll until an error escapes. Each completed cycle is printed to
    /// stdout as `{ocr_text}: {translation}`.
    pub async fn run(mut self) -> Result<()> {
        info!("ready, watching {}", self.watcher.path().display());
        loop {
            sleep(self.delay).await;
            if let Some(cycle) = self.tick().await? {
                println!("{}: {}", cycle.ocr_text, cycle.translated_text);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::SystemTime;

    #[derive(Default)]
    struct CountingRecognizer {
        calls: AtomicUsize,
        seen: Mutex<Vec<PathBuf>>,
    }

    impl TextRecognizer for Arc<CountingRecognizer> {
        fn recognize_file(&self, path: &Path) -> Result<RecognizedText> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(path.to_path_buf());
            Ok(RecognizedText {
                text: "こんにちは".to_string(),
                confidence: 0.9,
            })
        }
    }

    #[derive(Default)]
    struct CountingTranslator {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Translator for Arc<CountingTranslator> {
        async fn translate(&self, text: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("translated: {text}"))
        }
    }

    fn touch(dir: &Path, name: &str, mtime_secs: u64) -> PathBuf {
        let path = dir.join(name);
        let file = File::create(&path).unwrap();
        file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(mtime_secs))
            .unwrap();
        path
    }

    fn poll_loop(
        dir: &Path,
    ) -> (
        PollLoop<Arc<CountingRecognizer>, Arc<CountingTranslator>>,
        Arc<CountingRecognizer>,
        Arc<CountingTranslator>,
    ) {
        let recognizer = Arc::new(CountingRecognizer::default());
        let translator = Arc::new(CountingTranslator::default());
        let watch = PollLoop::new(
            DirectoryWatcher::new(dir),
            Duration::from_millis(10),
            Arc::clone(&recognizer),
            Arc::clone(&translator),
        );
        (watch, recognizer, translator)
    }

    #[tokio::test]
    async fn empty_directory_makes_no_calls() {
        let dir = tempfile::tempdir().unwrap();
        let (mut watch, recognizer, translator) = poll_loop(dir.path());

        assert!(watch.tick().await.unwrap().is_none());
        assert!(watch.tick().await.unwrap().is_none());
        assert_eq!(recognizer.calls.load(Ordering::SeqCst), 0);
        assert_eq!(translator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn first_observation_seeds_without_processing() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "preexisting.png", 1_000);
        let (mut watch, recognizer, translator) = poll_loop(dir.path());

        assert!(watch.tick().await.unwrap().is_none());
        assert_eq!(recognizer.calls.load(Ordering::SeqCst), 0);
        assert_eq!(translator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unchanged_newest_file_makes_no_further_calls() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "capture.png", 1_000);
        let (mut watch, recognizer, translator) = poll_loop(dir.path());

        for _ in 0..3 {
            assert!(watch.tick().await.unwrap().is_none());
        }
        assert_eq!(recognizer.calls.load(Ordering::SeqCst), 0);
        assert_eq!(translator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn new_capture_triggers_exactly_one_cycle() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "old.png", 1_000);
        let (mut watch, recognizer, translator) = poll_loop(dir.path());

        // Seed the baseline with the pre-existing file
        assert!(watch.tick().await.unwrap().is_none());

        let newer = touch(dir.path(), "new.png", 2_000);
        let cycle = watch.tick().await.unwrap().expect("cycle for new capture");

        assert_eq!(cycle.source, newer);
        assert_eq!(cycle.ocr_text, "こんにちは");
        assert_eq!(cycle.translated_text, "translated: こんにちは");
        assert_eq!(recognizer.calls.load(Ordering::SeqCst), 1);
        assert_eq!(translator.calls.load(Ordering::SeqCst), 1);
        assert_eq!(recognizer.seen.lock().unwrap().as_slice(), &[newer]);

        // The same newest file never triggers again
        assert!(watch.tick().await.unwrap().is_none());
        assert_eq!(recognizer.calls.load(Ordering::SeqCst), 1);
        assert_eq!(translator.calls.load(Ordering::SeqCst), 1);
    }
}
