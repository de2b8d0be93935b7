//! Stored currency selection.
//!
//! The selection is tri-state on disk:
//!   - slot absent: the user never chose, renderers fall back to the default
//!   - slot holds empty string: the user explicitly chose "no currency"
//!   - slot holds a code: that code
//!
//! The locale slot only ever holds a real tag; clearing the selection also
//! clears the locale.

use std::cell::RefCell;
use std::path::PathBuf;

use crate::dispatch::Dispatcher;
use crate::storage::{keys, JsonFileBackend, PreferenceBackend};
use crate::SubscriptionToken;

pub const DEFAULT_CURRENCY_CODE: &str = "SAR";
pub const DEFAULT_CURRENCY_LOCALE: &str = "ar-SA";

/// An explicit currency choice: a code, or deliberately none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CurrencySelection {
    /// Plain numbers, no currency symbol.
    None,
    /// ISO 4217 code, e.g. "USD".
    Code(String),
}

impl CurrencySelection {
    pub fn code(&self) -> Option<&str> {
        match self {
            CurrencySelection::None => None,
            CurrencySelection::Code(c) => Some(c),
        }
    }

    fn from_slot(raw: &str) -> Self {
        if raw.is_empty() {
            CurrencySelection::None
        } else {
            CurrencySelection::Code(raw.to_string())
        }
    }
}

/// One row of the currency picker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrencyOption {
    /// `None` = the "no currency" entry.
    pub code: Option<&'static str>,
    pub locale: Option<&'static str>,
    pub label: &'static str,
}

/// The selectable currencies, in display order.
pub const CURRENCY_OPTIONS: &[CurrencyOption] = &[
    CurrencyOption { code: None, locale: None, label: "None" },
    CurrencyOption { code: Some("USD"), locale: Some("en-US"), label: "US Dollar" },
    CurrencyOption { code: Some("EUR"), locale: Some("de-DE"), label: "Euro" },
    CurrencyOption { code: Some("GBP"), locale: Some("en-GB"), label: "British Pound" },
    CurrencyOption { code: Some("SAR"), locale: Some("ar-SA"), label: "Saudi Riyal" },
];

/// What the slots currently hold. `selection: None` means the slot is absent
/// (never chosen), which is distinct from `Some(CurrencySelection::None)`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StoredCurrency {
    pub selection: Option<CurrencySelection>,
    pub locale: Option<String>,
}

/// Delivered to subscribers after the selection changes.
#[derive(Debug, Clone)]
pub struct CurrencyChange {
    pub stored: StoredCurrency,
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Shared store for the grid-wide currency selection.
pub struct CurrencyStore {
    stored: RefCell<StoredCurrency>,
    backend: RefCell<Box<dyn PreferenceBackend>>,
    dispatcher: Dispatcher<(), CurrencyChange>,
}

impl CurrencyStore {
    pub fn new(backend: Box<dyn PreferenceBackend>) -> Self {
        let stored = load_initial(backend.as_ref());
        Self {
            stored: RefCell::new(stored),
            backend: RefCell::new(backend),
            dispatcher: Dispatcher::new(),
        }
    }

    pub fn open_default() -> Self {
        Self::new(Box::new(JsonFileBackend::open_default()))
    }

    pub fn stored(&self) -> StoredCurrency {
        self.stored.borrow().clone()
    }

    pub fn options() -> &'static [CurrencyOption] {
        CURRENCY_OPTIONS
    }

    /// Look up the picker entry for a code (`None` = the "no currency" entry).
    pub fn option_for(code: Option<&str>) -> Option<&'static CurrencyOption> {
        CURRENCY_OPTIONS.iter().find(|o| o.code == code)
    }

    pub fn storage_path(&self) -> Option<PathBuf> {
        self.backend.borrow().location()
    }

    /// Apply a picker choice.
    ///
    /// `Some(code)` selects that entry and stores its locale alongside.
    /// `None`, or a code not in the picker, selects "no currency": the code
    /// slot is written as empty string (explicit none) and the locale slot
    /// is removed.
    pub fn set_selection(&self, code: Option<&str>) {
        let chosen = code.and_then(|c| Self::option_for(Some(c)));
        let stored = match chosen {
            Some(option) => StoredCurrency {
                selection: option.code.map(|c| CurrencySelection::Code(c.to_string())),
                locale: option.locale.map(str::to_string),
            },
            None => StoredCurrency {
                selection: Some(CurrencySelection::None),
                locale: None,
            },
        };

        *self.stored.borrow_mut() = stored.clone();
        {
            let mut backend = self.backend.borrow_mut();
            match &stored.selection {
                Some(CurrencySelection::Code(c)) => {
                    let _ = backend.write(keys::CURRENCY_CODE, c);
                }
                _ => {
                    let _ = backend.write(keys::CURRENCY_CODE, "");
                }
            }
            match &stored.locale {
                Some(locale) => {
                    let _ = backend.write(keys::CURRENCY_LOCALE, locale);
                }
                None => {
                    let _ = backend.remove(keys::CURRENCY_LOCALE);
                }
            }
        }
        self.emit();
    }

    pub fn subscribe(&self, callback: impl FnMut(&CurrencyChange) + 'static) -> SubscriptionToken {
        self.dispatcher.subscribe((), Box::new(callback))
    }

    pub fn unsubscribe(&self, token: SubscriptionToken) -> bool {
        self.dispatcher.unsubscribe(token)
    }

    pub fn subscriber_count(&self) -> usize {
        self.dispatcher.subscriber_count()
    }

    /// Re-read the currency slots after an external write. Unknown keys are
    /// ignored; recognized keys re-notify even if the value is unchanged.
    pub fn reload(&self, changed_keys: &[&str]) {
        let relevant = changed_keys
            .iter()
            .any(|k| *k == keys::CURRENCY_CODE || *k == keys::CURRENCY_LOCALE);
        if !relevant {
            return;
        }
        let next = load_initial(self.backend.borrow().as_ref());
        *self.stored.borrow_mut() = next;
        self.emit();
    }

    fn emit(&self) {
        let change = CurrencyChange { stored: self.stored.borrow().clone() };
        self.dispatcher.notify((), &change);
    }
}

fn load_initial(backend: &dyn PreferenceBackend) -> StoredCurrency {
    let selection = match backend.read(keys::CURRENCY_CODE) {
        Ok(Some(raw)) => Some(CurrencySelection::from_slot(&raw)),
        Ok(None) => None,
        Err(e) => {
            eprintln!("gridfmt: preference storage unavailable ({}), using default currency", e);
            return StoredCurrency::default();
        }
    };
    let locale = match backend.read(keys::CURRENCY_LOCALE) {
        Ok(Some(raw)) if !raw.is_empty() => Some(raw),
        _ => None,
    };
    StoredCurrency { selection, locale }
}
