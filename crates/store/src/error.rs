//! Error types for preference storage.

use std::fmt;

use crate::prefs::{DATE_PATTERNS, TIME_PATTERNS};

/// Errors from the durable slot backend.
///
/// Callers inside this crate treat every variant as "slot absent": a broken
/// backend degrades to built-in defaults and never propagates into rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Filesystem error reading or writing the slot file.
    Io(String),
    /// Slot file exists but is not a flat JSON string map.
    Malformed(String),
    /// Could not set up the file watcher for cross-process notification.
    Watch(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Io(msg) => write!(f, "storage I/O error: {}", msg),
            StorageError::Malformed(msg) => write!(f, "malformed slot file: {}", msg),
            StorageError::Watch(msg) => write!(f, "watch error: {}", msg),
        }
    }
}

impl std::error::Error for StorageError {}

/// A rejected preference write.
///
/// The plain `set_*` methods swallow this (invalid writes are no-ops); the
/// `try_set_*` variants surface it for callers that want to report the
/// rejection, e.g. a CLI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreferenceError {
    /// Date pattern is not in the allowed set.
    UnknownDatePattern(String),
    /// Time pattern is not in the allowed set.
    UnknownTimePattern(String),
}

impl fmt::Display for PreferenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreferenceError::UnknownDatePattern(p) => {
                write!(f, "date pattern {:?} is not allowed (expected one of: {})", p, DATE_PATTERNS.join(", "))
            }
            PreferenceError::UnknownTimePattern(p) => {
                write!(f, "time pattern {:?} is not allowed (expected one of: {})", p, TIME_PATTERNS.join(", "))
            }
        }
    }
}

impl std::error::Error for PreferenceError {}
