//! Durable slot storage for format preferences.
//!
//! Preferences live in a flat string-to-string map keyed by well-known slot
//! names, mirroring the shape of a browser localStorage namespace. The file
//! backend keeps that map as pretty-printed JSON under the user config
//! directory so several processes can share one file; every read and write
//! goes back to disk, which is what makes cross-process reload work.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::StorageError;

/// Well-known slot names.
///
/// These are a shared contract with every other process writing the same
/// slot file, so they are never renamed.
pub mod keys {
    /// Stored date pattern.
    pub const DATE_FORMAT: &str = "selectedDateFormat";
    /// Stored time pattern.
    pub const TIME_FORMAT: &str = "selectedDateTimeFormat";
    /// Stored timezone identifier (absent or "local" = host-local).
    pub const TIMEZONE: &str = "selectedTimezone";
    /// Stored currency code (empty string = explicitly no currency).
    pub const CURRENCY_CODE: &str = "selectedCurrencyCode";
    /// Stored currency locale tag.
    pub const CURRENCY_LOCALE: &str = "selectedCurrencyLocale";
}

// ---------------------------------------------------------------------------
// Backend trait
// ---------------------------------------------------------------------------

/// A keyed string-slot store.
///
/// Implementations are deliberately dumb: one value per key, no typing, no
/// validation. Validation belongs to [`crate::PreferenceStore`], which owns
/// what the slots mean.
pub trait PreferenceBackend {
    /// Read a slot. `Ok(None)` means the slot is absent.
    fn read(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write a slot, creating it if needed.
    fn write(&mut self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove a slot. Removing an absent slot is not an error.
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;

    /// Filesystem location of the backing file, if there is one.
    /// A watcher can poll this path for writes made by other processes.
    fn location(&self) -> Option<PathBuf>;
}

// ---------------------------------------------------------------------------
// File backend
// ---------------------------------------------------------------------------

/// File-backed slot store.
///
/// Stateless with respect to the file: every operation re-reads the map from
/// disk, so two backends pointed at the same path (say, the format store and
/// the currency store inside one process) never clobber each other's keys.
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Default slot file location: `<config_dir>/gridfmt/preferences.json`.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("gridfmt")
            .join("preferences.json")
    }

    /// Backend at the default location.
    pub fn open_default() -> Self {
        Self::new(Self::default_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PreferenceBackend for JsonFileBackend {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        let slots = read_slots(&self.path)?;
        Ok(slots.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut slots = read_slots(&self.path)?;
        slots.insert(key.to_string(), value.to_string());
        write_slots(&self.path, &slots)
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        let mut slots = read_slots(&self.path)?;
        if slots.remove(key).is_some() {
            write_slots(&self.path, &slots)?;
        }
        Ok(())
    }

    fn location(&self) -> Option<PathBuf> {
        Some(self.path.clone())
    }
}

/// Read the whole slot map. A missing file is an empty map, not an error.
pub(crate) fn read_slots(path: &Path) -> Result<BTreeMap<String, String>, StorageError> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }
    let contents = fs::read_to_string(path).map_err(|e| StorageError::Io(e.to_string()))?;
    if contents.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    serde_json::from_str(&contents).map_err(|e| StorageError::Malformed(e.to_string()))
}

pub(crate) fn write_slots(path: &Path, slots: &BTreeMap<String, String>) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| StorageError::Io(e.to_string()))?;
    }
    let json = serde_json::to_string_pretty(slots).map_err(|e| StorageError::Malformed(e.to_string()))?;
    fs::write(path, json).map_err(|e| StorageError::Io(e.to_string()))
}

// ---------------------------------------------------------------------------
// Memory backend
// ---------------------------------------------------------------------------

/// In-memory slot store for tests and embedding without persistence.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    slots: BTreeMap<String, String>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seeded backend, for simulating previously stored preferences.
    pub fn with_slots<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            slots: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

impl PreferenceBackend for MemoryBackend {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.slots.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.slots.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.slots.remove(key);
        Ok(())
    }

    fn location(&self) -> Option<PathBuf> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_backend_round_trip() {
        let mut backend = MemoryBackend::new();
        assert_eq!(backend.read(keys::DATE_FORMAT).unwrap(), None);

        backend.write(keys::DATE_FORMAT, "dd/MM/yyyy").unwrap();
        assert_eq!(backend.read(keys::DATE_FORMAT).unwrap().as_deref(), Some("dd/MM/yyyy"));

        backend.remove(keys::DATE_FORMAT).unwrap();
        assert_eq!(backend.read(keys::DATE_FORMAT).unwrap(), None);
    }

    #[test]
    fn file_backend_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preferences.json");

        let mut backend = JsonFileBackend::new(&path);
        backend.write(keys::TIME_FORMAT, "hh:mm a").unwrap();
        drop(backend);

        let backend = JsonFileBackend::new(&path);
        assert_eq!(backend.read(keys::TIME_FORMAT).unwrap().as_deref(), Some("hh:mm a"));
    }

    #[test]
    fn file_backend_missing_file_reads_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let backend = JsonFileBackend::new(dir.path().join("nope.json"));
        assert_eq!(backend.read(keys::DATE_FORMAT).unwrap(), None);
    }

    #[test]
    fn file_backend_does_not_clobber_sibling_keys() {
        // Two stateless backends on one file: each write re-reads the map,
        // so keys written through one instance survive writes through the other.
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preferences.json");

        let mut a = JsonFileBackend::new(&path);
        let mut b = JsonFileBackend::new(&path);
        a.write(keys::DATE_FORMAT, "yyyy/MM/dd").unwrap();
        b.write(keys::CURRENCY_CODE, "USD").unwrap();

        assert_eq!(a.read(keys::DATE_FORMAT).unwrap().as_deref(), Some("yyyy/MM/dd"));
        assert_eq!(a.read(keys::CURRENCY_CODE).unwrap().as_deref(), Some("USD"));
    }

    #[test]
    fn malformed_file_is_an_error_not_a_panic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preferences.json");
        std::fs::write(&path, "{\"selectedDateFormat\": 42}").unwrap();

        let backend = JsonFileBackend::new(&path);
        assert!(matches!(backend.read(keys::DATE_FORMAT), Err(StorageError::Malformed(_))));
    }

    #[test]
    fn remove_absent_key_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let mut backend = JsonFileBackend::new(dir.path().join("preferences.json"));
        assert!(backend.remove(keys::TIMEZONE).is_ok());
    }
}
