//! `gridfmt-store` — durable format preferences shared across grid views.
//!
//! Holds the user's chosen date/time patterns, timezone, and currency in a
//! flat slot file, validates writes against the allowed pattern sets, and
//! notifies registered subscribers on every applied change. A poll-based
//! watcher surfaces writes made by other processes against the same file.
//!
//! No rendering here: pattern semantics live in `gridfmt-engine`.

pub mod currency;
pub mod dispatch;
pub mod error;
pub mod prefs;
pub mod storage;
pub mod watch;

pub use currency::{
    CurrencyChange, CurrencyOption, CurrencySelection, CurrencyStore, StoredCurrency,
    CURRENCY_OPTIONS, DEFAULT_CURRENCY_CODE, DEFAULT_CURRENCY_LOCALE,
};
pub use dispatch::SubscriptionToken;
pub use error::{PreferenceError, StorageError};
pub use prefs::{
    FormatPreferences, PrefChannel, PreferenceChange, PreferenceStore, DATE_PATTERNS,
    DEFAULT_DATE_PATTERN, DEFAULT_TIME_PATTERN, LOCAL_TIMEZONE, TIME_PATTERNS,
};
pub use storage::{keys, JsonFileBackend, MemoryBackend, PreferenceBackend};
pub use watch::{PreferenceWatcher, StorageChange};
