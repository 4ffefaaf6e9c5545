// Directory watcher - finds the most recent capture and reports changes
//
// The watched directory is scanned non-recursively on every poll tick. The
// only state carried between ticks is the path of the last most-recent file.

use std::cmp::Reverse;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::trace;

use crate::core::errors::{WatchError, WatchResult};

/// Scans a single directory for its newest regular file.
pub struct DirectoryWatcher {
    path: PathBuf,
}

impl DirectoryWatcher {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The newest regular file directly inside the watched directory, by
    /// modification time. Subdirectories are not descended into; entries
    /// whose metadata cannot be read are skipped. Equal timestamps keep the
    /// listing order (stable sort). An empty directory yields None.
    pub fn newest_file(&self) -> WatchResult<Option<PathBuf>> {
        let entries = std::fs::read_dir(&self.path).map_err(|source| WatchError::ReadDir {
            path: self.path.clone(),
            source,
        })?;

        let mut files: Vec<(PathBuf, SystemTime)> = Vec::new();
        for entry in entries {
            let Ok(entry) = entry else { continue };
            let Ok(metadata) = entry.metadata() else { continue };
            if !metadata.is_file() {
                continue;
            }
            let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            files.push((entry.path(), modified));
        }

        files.sort_by_key(|(_, modified)| Reverse(*modified));
        trace!("scanned {}: {} files", self.path.display(), files.len());

        Ok(files.into_iter().next().map(|(path, _)| path))
    }
}

/// Tracks the last most-recent file and reports each change exactly once.
///
/// The first observation seeds the baseline without reporting: files already
/// present when the program starts are not processed.
#[derive(Debug, Default)]
pub struct ChangeTracker {
    last_seen: Option<PathBuf>,
}

impl ChangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `newest` and returns it when it differs from the previously
    /// recorded path. Returns None on the seeding observation and whenever
    /// the newest file is unchanged.
    pub fn observe(&mut self, newest: PathBuf) -> Option<PathBuf> {
        match &self.last_seen {
            None => {
                self.last_seen = Some(newest);
                None
            }
            Some(prev) if *prev == newest => None,
            Some(_) => {
                self.last_seen = Some(newest.clone());
                Some(newest)
            }
        }
    }

    pub fn last_seen(&self) -> Option<&Path> {
        self.last_seen.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::time::Duration;

    fn touch(dir: &Path, name: &str, mtime_secs: u64) -> PathBuf {
        let path = dir.join(name);
        let file = File::create(&path).unwrap();
        file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(mtime_secs))
            .unwrap();
        path
    }

    #[test]
    fn empty_directory_yields_none() {
        let dir = tempfile::tempdir().unwrap();
        let watcher = DirectoryWatcher::new(dir.path());
        assert_eq!(watcher.newest_file().unwrap(), None);
    }

    #[test]
    fn newest_file_wins_by_modification_time() {
        let dir = tempfile::tempdir().unwrap();
        let _old = touch(dir.path(), "old.png", 1_000);
        let newer = touch(dir.path(), "newer.png", 3_000);
        let _mid = touch(dir.path(), "mid.png", 2_000);

        let watcher = DirectoryWatcher::new(dir.path());
        assert_eq!(watcher.newest_file().unwrap(), Some(newer));
    }

    #[test]
    fn subdirectories_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let top = touch(dir.path(), "top.png", 1_000);

        // The subdirectory itself has a current mtime, far newer than the
        // file above; files inside it must not be considered either.
        let sub = dir.path().join("nested");
        std::fs::create_dir(&sub).unwrap();
        File::create(sub.join("inner.png")).unwrap();

        let watcher = DirectoryWatcher::new(dir.path());
        assert_eq!(watcher.newest_file().unwrap(), Some(top));
    }

    #[test]
    fn missing_directory_is_an_error() {
        let watcher = DirectoryWatcher::new("/definitely/not/a/real/path");
        assert!(watcher.newest_file().is_err());
    }

    #[test]
    fn tracker_seeds_then_reports_each_change_once() {
        let mut tracker = ChangeTracker::new();

        // First observation seeds without reporting
        assert_eq!(tracker.observe(PathBuf::from("a.png")), None);
        assert_eq!(tracker.last_seen(), Some(Path::new("a.png")));

        // Unchanged newest file stays quiet
        assert_eq!(tracker.observe(PathBuf::from("a.png")), None);

        // A new file is reported exactly once
        assert_eq!(
            tracker.observe(PathBuf::from("b.png")),
            Some(PathBuf::from("b.png"))
        );
        assert_eq!(tracker.observe(PathBuf::from("b.png")), None);
    }
}
