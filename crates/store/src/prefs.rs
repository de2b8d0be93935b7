//! Stored date/time format preferences with change notification.
//!
//! One `PreferenceStore` instance is shared (via `Rc`) by every grid view in
//! a process. Writes go through validated setters, update the in-memory
//! snapshot, persist to the backend, and then notify subscribers — in that
//! order, so a subscriber always observes the post-write state.

use std::cell::RefCell;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::dispatch::Dispatcher;
use crate::error::PreferenceError;
use crate::storage::{keys, JsonFileBackend, PreferenceBackend};
use crate::SubscriptionToken;

/// Date patterns a preference write may select.
pub const DATE_PATTERNS: &[&str] = &[
    "yyyy-MM-dd",
    "dd/MM/yyyy",
    "MM/dd/yyyy",
    "yyyy/MM/dd",
    "dd-MM-yyyy",
    "MM-dd-yyyy",
    "dd MMM yyyy",
    "MMM dd, yyyy",
];

/// Time patterns a preference write may select.
pub const TIME_PATTERNS: &[&str] = &["HH:mm:ss", "HH:mm", "hh:mm:ss a", "hh:mm a"];

pub const DEFAULT_DATE_PATTERN: &str = "yyyy-MM-dd";
pub const DEFAULT_TIME_PATTERN: &str = "HH:mm";

/// Timezone value meaning "use the host-local zone".
pub const LOCAL_TIMEZONE: &str = "local";

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Immutable view of the stored preferences at one point in time.
///
/// The two pattern fields are always members of the allowed sets; invalid
/// stored values degrade to the defaults at load time and invalid writes are
/// rejected before they reach this struct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatPreferences {
    pub date_pattern: String,
    pub time_pattern: String,
    /// IANA zone name, or `None` for the host-local zone.
    pub timezone: Option<String>,
}

impl Default for FormatPreferences {
    fn default() -> Self {
        Self {
            date_pattern: DEFAULT_DATE_PATTERN.to_string(),
            time_pattern: DEFAULT_TIME_PATTERN.to_string(),
            timezone: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Change notification
// ---------------------------------------------------------------------------

/// Which preference a subscription listens to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrefChannel {
    DatePattern,
    TimePattern,
    Timezone,
}

/// Delivered to subscribers after a preference changes.
///
/// Carries a full snapshot so handlers can re-resolve formats without
/// calling back into the store mid-notification.
#[derive(Debug, Clone)]
pub struct PreferenceChange {
    pub channel: PrefChannel,
    /// The value just applied on that channel (`None` = cleared timezone).
    pub value: Option<String>,
    /// Post-change state of all three preferences.
    pub prefs: FormatPreferences,
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Shared store for date/time format preferences.
///
/// Not `Send`: lives on the UI thread next to its subscribers. Cross-process
/// changes arrive via [`crate::PreferenceWatcher`] and are applied with
/// [`PreferenceStore::reload`].
pub struct PreferenceStore {
    prefs: RefCell<FormatPreferences>,
    backend: RefCell<Box<dyn PreferenceBackend>>,
    dispatcher: Dispatcher<PrefChannel, PreferenceChange>,
}

impl PreferenceStore {
    /// Build a store over the given backend, loading whatever it holds.
    /// Absent or invalid slots degrade to the built-in defaults.
    pub fn new(backend: Box<dyn PreferenceBackend>) -> Self {
        let prefs = load_initial(backend.as_ref());
        Self {
            prefs: RefCell::new(prefs),
            backend: RefCell::new(backend),
            dispatcher: Dispatcher::new(),
        }
    }

    /// Store over the default per-user slot file.
    pub fn open_default() -> Self {
        Self::new(Box::new(JsonFileBackend::open_default()))
    }

    // --- reads ---

    pub fn snapshot(&self) -> FormatPreferences {
        self.prefs.borrow().clone()
    }

    pub fn date_pattern(&self) -> String {
        self.prefs.borrow().date_pattern.clone()
    }

    pub fn time_pattern(&self) -> String {
        self.prefs.borrow().time_pattern.clone()
    }

    /// `None` means host-local.
    pub fn timezone(&self) -> Option<String> {
        self.prefs.borrow().timezone.clone()
    }

    /// Path of the backing slot file, if the backend has one.
    pub fn storage_path(&self) -> Option<PathBuf> {
        self.backend.borrow().location()
    }

    // --- writes ---

    /// Set the date pattern. An out-of-set pattern is silently ignored:
    /// no state change, no persistence, no notification.
    pub fn set_date_pattern(&self, pattern: &str) {
        let _ = self.try_set_date_pattern(pattern);
    }

    /// Like [`Self::set_date_pattern`] but reports a rejected pattern.
    pub fn try_set_date_pattern(&self, pattern: &str) -> Result<(), PreferenceError> {
        if !DATE_PATTERNS.contains(&pattern) {
            return Err(PreferenceError::UnknownDatePattern(pattern.to_string()));
        }
        self.prefs.borrow_mut().date_pattern = pattern.to_string();
        // Memory is the source of truth; a failed persist degrades to
        // session-only behavior rather than blocking the change.
        let _ = self.backend.borrow_mut().write(keys::DATE_FORMAT, pattern);
        self.emit(PrefChannel::DatePattern, Some(pattern.to_string()));
        Ok(())
    }

    /// Set the time pattern. An out-of-set pattern is silently ignored.
    pub fn set_time_pattern(&self, pattern: &str) {
        let _ = self.try_set_time_pattern(pattern);
    }

    /// Like [`Self::set_time_pattern`] but reports a rejected pattern.
    pub fn try_set_time_pattern(&self, pattern: &str) -> Result<(), PreferenceError> {
        if !TIME_PATTERNS.contains(&pattern) {
            return Err(PreferenceError::UnknownTimePattern(pattern.to_string()));
        }
        self.prefs.borrow_mut().time_pattern = pattern.to_string();
        let _ = self.backend.borrow_mut().write(keys::TIME_FORMAT, pattern);
        self.emit(PrefChannel::TimePattern, Some(pattern.to_string()));
        Ok(())
    }

    /// Set the timezone. `None`, an empty string, or the sentinel `"local"`
    /// all clear it back to host-local (and remove the stored slot).
    pub fn set_timezone(&self, timezone: Option<&str>) {
        let normalized = normalize_timezone(timezone);
        self.prefs.borrow_mut().timezone = normalized.clone();
        {
            let mut backend = self.backend.borrow_mut();
            let _ = match &normalized {
                Some(tz) => backend.write(keys::TIMEZONE, tz),
                None => backend.remove(keys::TIMEZONE),
            };
        }
        self.emit(PrefChannel::Timezone, normalized);
    }

    // --- subscriptions ---

    /// Register a callback for one preference channel. The callback runs
    /// synchronously after each applied change on that channel.
    pub fn subscribe(
        &self,
        channel: PrefChannel,
        callback: impl FnMut(&PreferenceChange) + 'static,
    ) -> SubscriptionToken {
        self.dispatcher.subscribe(channel, Box::new(callback))
    }

    /// Release a subscription. Returns true if the token was still live.
    pub fn unsubscribe(&self, token: SubscriptionToken) -> bool {
        self.dispatcher.unsubscribe(token)
    }

    pub fn subscriber_count(&self) -> usize {
        self.dispatcher.subscriber_count()
    }

    // --- cross-process reload ---

    /// Re-read the given slot keys from the backend and notify.
    ///
    /// This is how changes written by another process (observed through a
    /// [`crate::PreferenceWatcher`]) enter this store. Unknown keys are
    /// ignored. Re-reading an unchanged value still notifies: delivery is
    /// at-least-once, and rendering the active format twice is idempotent.
    pub fn reload(&self, changed_keys: &[&str]) {
        for key in changed_keys {
            if *key == keys::DATE_FORMAT {
                self.reload_date_pattern();
            } else if *key == keys::TIME_FORMAT {
                self.reload_time_pattern();
            } else if *key == keys::TIMEZONE {
                self.reload_timezone();
            }
        }
    }

    /// Re-read every slot this store owns.
    pub fn reload_all(&self) {
        self.reload(&[keys::DATE_FORMAT, keys::TIME_FORMAT, keys::TIMEZONE]);
    }

    fn reload_date_pattern(&self) {
        let stored = self.read_slot(keys::DATE_FORMAT);
        let next = match stored {
            Some(v) if DATE_PATTERNS.contains(&v.as_str()) => v,
            // A value outside the allowed set cannot have come from a
            // validated setter; leave the current state alone.
            Some(_) => return,
            None => DEFAULT_DATE_PATTERN.to_string(),
        };
        self.prefs.borrow_mut().date_pattern = next.clone();
        self.emit(PrefChannel::DatePattern, Some(next));
    }

    fn reload_time_pattern(&self) {
        let stored = self.read_slot(keys::TIME_FORMAT);
        let next = match stored {
            Some(v) if TIME_PATTERNS.contains(&v.as_str()) => v,
            Some(_) => return,
            None => DEFAULT_TIME_PATTERN.to_string(),
        };
        self.prefs.borrow_mut().time_pattern = next.clone();
        self.emit(PrefChannel::TimePattern, Some(next));
    }

    fn reload_timezone(&self) {
        let stored = self.read_slot(keys::TIMEZONE);
        let next = normalize_timezone(stored.as_deref());
        self.prefs.borrow_mut().timezone = next.clone();
        self.emit(PrefChannel::Timezone, next);
    }

    fn read_slot(&self, key: &str) -> Option<String> {
        match self.backend.borrow().read(key) {
            Ok(v) => v,
            Err(e) => {
                eprintln!("gridfmt: preference storage unavailable ({}), treating {} as unset", e, key);
                None
            }
        }
    }

    fn emit(&self, channel: PrefChannel, value: Option<String>) {
        let change = PreferenceChange {
            channel,
            value,
            prefs: self.prefs.borrow().clone(),
        };
        self.dispatcher.notify(channel, &change);
    }
}

fn load_initial(backend: &dyn PreferenceBackend) -> FormatPreferences {
    let mut prefs = FormatPreferences::default();

    match backend.read(keys::DATE_FORMAT) {
        Ok(Some(v)) if DATE_PATTERNS.contains(&v.as_str()) => prefs.date_pattern = v,
        Ok(_) => {}
        Err(e) => {
            eprintln!("gridfmt: preference storage unavailable ({}), using default formats", e);
            return prefs;
        }
    }
    if let Ok(Some(v)) = backend.read(keys::TIME_FORMAT) {
        if TIME_PATTERNS.contains(&v.as_str()) {
            prefs.time_pattern = v;
        }
    }
    if let Ok(Some(v)) = backend.read(keys::TIMEZONE) {
        prefs.timezone = normalize_timezone(Some(&v));
    }
    prefs
}

fn normalize_timezone(timezone: Option<&str>) -> Option<String> {
    match timezone {
        Some(tz) => {
            let tz = tz.trim();
            if tz.is_empty() || tz == LOCAL_TIMEZONE {
                None
            } else {
                Some(tz.to_string())
            }
        }
        None => None,
    }
}
