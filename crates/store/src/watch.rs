//! Cross-process change notification for the slot file.
//!
//! Other processes write the same preferences file; this watcher polls it
//! and reports per-key changes over a channel. The embedding host drains the
//! channel on its UI thread and feeds the changed keys into
//! [`crate::PreferenceStore::reload`] / [`crate::CurrencyStore::reload`],
//! which is what turns an external write into renderer updates.
//!
//! Polling (rather than inotify-style backends) is deliberate: the file is
//! small, writes are rare, and poll watching behaves identically across
//! platforms and network filesystems.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::time::Duration;

use notify::{PollWatcher, RecursiveMode, Watcher};

use crate::error::StorageError;
use crate::storage::read_slots;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// One observed slot mutation. `value: None` means the key was removed
/// (or the whole file disappeared).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageChange {
    pub key: String,
    pub value: Option<String>,
}

/// Watches a slot file and emits [`StorageChange`]s for external writes.
///
/// The writer process does not hear its own writes through the store (its
/// subscribers were already notified synchronously), but it will see them
/// again here if it also runs a watcher; `reload` re-applying the same
/// value is harmless.
pub struct PreferenceWatcher {
    // Held for its Drop: dropping the watcher stops the poll thread.
    _watcher: PollWatcher,
    receiver: Receiver<StorageChange>,
}

impl PreferenceWatcher {
    /// Watch `path` at the default 500ms poll interval.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        Self::with_poll_interval(path, DEFAULT_POLL_INTERVAL)
    }

    pub fn with_poll_interval(path: impl Into<PathBuf>, interval: Duration) -> Result<Self, StorageError> {
        let file: PathBuf = path.into();
        // Watch the parent directory: the file may not exist yet, and
        // editors/other processes often replace it atomically.
        let dir = file
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."))
            .to_path_buf();

        let (tx, rx) = mpsc::channel();
        let mut last = read_slots(&file).unwrap_or_default();

        let target = file.clone();
        let mut watcher = PollWatcher::new(
            move |res: Result<notify::Event, notify::Error>| {
                if res.is_err() {
                    return;
                }
                // Re-read and diff on any event under the directory. The
                // diff makes spurious events (temp files, metadata churn)
                // produce no output.
                let current = read_slots(&target).unwrap_or_default();
                emit_diff(&tx, &last, &current);
                last = current;
            },
            notify::Config::default()
                .with_poll_interval(interval)
                // Compare file contents, not just mtime: an external rewrite
                // landing within the filesystem's mtime granularity would
                // otherwise be missed. The file is small, so hashing is cheap.
                .with_compare_contents(true),
        )
        .map_err(|e| StorageError::Watch(e.to_string()))?;

        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(|e| StorageError::Watch(e.to_string()))?;

        Ok(Self { _watcher: watcher, receiver: rx })
    }

    /// Channel of observed changes. Blocking reads are fine on a dedicated
    /// thread; UI hosts normally drain with [`Self::try_changes`] instead.
    pub fn receiver(&self) -> &Receiver<StorageChange> {
        &self.receiver
    }

    /// Drain without blocking. Returns the changes observed since the last
    /// drain, oldest first.
    pub fn try_changes(&self) -> Vec<StorageChange> {
        self.receiver.try_iter().collect()
    }
}

fn emit_diff(
    tx: &mpsc::Sender<StorageChange>,
    last: &BTreeMap<String, String>,
    current: &BTreeMap<String, String>,
) {
    for (key, value) in current {
        if last.get(key) != Some(value) {
            let _ = tx.send(StorageChange { key: key.clone(), value: Some(value.clone()) });
        }
    }
    for key in last.keys() {
        if !current.contains_key(key) {
            let _ = tx.send(StorageChange { key: key.clone(), value: None });
        }
    }
}
