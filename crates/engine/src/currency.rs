//! Currency resolution and rendering.
//!
//! The resolution chain mirrors the date side but adds a row-field hop:
//! explicit cell parameter, then a code read from a named row field, then
//! the stored selection, then the default (SAR). "No currency" is an
//! explicit state at every level and renders a plain decimal number.
//!
//! Number shaping comes from a fixed locale table — separators, digit
//! script, and symbol placement per supported tag. SAR always renders with
//! the Saudi Riyal sign (U+20C1), never a textual code.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use gridfmt_store::{
    CurrencySelection, CurrencyStore, StoredCurrency, SubscriptionToken, DEFAULT_CURRENCY_CODE,
    DEFAULT_CURRENCY_LOCALE,
};

use crate::value::CellValue;

/// Locale used for the plain-decimal rendering of "no currency".
const PLAIN_DECIMAL_LOCALE: &str = "en-US";

const SAUDI_RIYAL_SIGN: &str = "\u{20C1}";
const NBSP: char = '\u{A0}';

/// Fraction-digit and grouping knobs, matching the common number-format
/// options hosts pass through column definitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrencyFormatOptions {
    pub min_fraction_digits: u32,
    pub max_fraction_digits: u32,
    pub use_grouping: bool,
}

impl Default for CurrencyFormatOptions {
    fn default() -> Self {
        Self { min_fraction_digits: 0, max_fraction_digits: 2, use_grouping: true }
    }
}

/// Per-cell currency parameters from the column definition.
#[derive(Debug, Clone, Default)]
pub struct CurrencyParams {
    /// Explicit selection; set means the cell never consults row or store.
    pub code: Option<CurrencySelection>,
    /// Name of a row field holding the code for this row. An empty field
    /// value is an explicit "no currency"; an absent field falls through.
    pub currency_field: Option<String>,
    /// Explicit locale tag override.
    pub locale: Option<String>,
    pub options: CurrencyFormatOptions,
}

/// A currency cell binding: the value, the cell parameters, and the row
/// fields the parameters may reference.
#[derive(Debug, Clone, Default)]
pub struct CurrencyRequest {
    pub value: CellValue,
    pub params: CurrencyParams,
    pub row: BTreeMap<String, String>,
}

/// Run the resolution chain; returns the selection and the locale tag.
pub fn resolve_currency(
    params: &CurrencyParams,
    row: &BTreeMap<String, String>,
    stored: &StoredCurrency,
) -> (CurrencySelection, String) {
    let selection = match &params.code {
        Some(explicit) => explicit.clone(),
        None => {
            let from_row = params.currency_field.as_ref().and_then(|field| row.get(field));
            match from_row {
                Some(v) if v.is_empty() => CurrencySelection::None,
                Some(v) => CurrencySelection::Code(v.clone()),
                None => match &stored.selection {
                    Some(stored_selection) => stored_selection.clone(),
                    None => CurrencySelection::Code(DEFAULT_CURRENCY_CODE.to_string()),
                },
            }
        }
    };

    let locale = params
        .locale
        .clone()
        .filter(|l| !l.is_empty())
        .or_else(|| stored.locale.clone())
        .unwrap_or_else(|| DEFAULT_CURRENCY_LOCALE.to_string());

    (selection, locale)
}

/// Format a value under a resolved selection and locale.
///
/// Blank values render empty; non-numeric values render as their raw text
/// unchanged. Numbers are shaped by the locale table and carry the
/// currency symbol unless the selection is "no currency".
pub fn format_currency(
    value: &CellValue,
    selection: &CurrencySelection,
    locale: &str,
    options: &CurrencyFormatOptions,
) -> String {
    if value.is_blank() {
        return String::new();
    }
    let n = match numeric_value(value) {
        Some(n) => n,
        None => return raw_text(value),
    };

    let sign = if n.is_sign_negative() && n != 0.0 { "-" } else { "" };
    match selection {
        CurrencySelection::None => {
            let spec = locale_spec(PLAIN_DECIMAL_LOCALE);
            format!("{}{}", sign, format_decimal(n.abs(), spec, options))
        }
        CurrencySelection::Code(code) => {
            let spec = locale_spec(locale);
            let body = format_decimal(n.abs(), spec, options);
            let symbol = currency_symbol(code);
            match spec.symbol_position {
                SymbolPosition::Prefix => match symbol {
                    Symbol::Glyph(g) => format!("{}{}{}", sign, g, body),
                    Symbol::Code => format!("{}{}{}{}", sign, code, NBSP, body),
                },
                SymbolPosition::Suffix => match symbol {
                    Symbol::Glyph(g) => format!("{}{}{}{}", sign, body, NBSP, g),
                    Symbol::Code => format!("{}{}{}{}", sign, body, NBSP, code),
                },
            }
        }
    }
}

fn numeric_value(value: &CellValue) -> Option<f64> {
    match value {
        CellValue::Number(n) if n.is_finite() => Some(*n),
        CellValue::Number(_) => None,
        // Strings are cleaned of everything but digits, dot, and minus
        // before the parse, so "$1,234.50" and "1 234,50" both survive.
        CellValue::Text(s) => {
            let cleaned: String = s
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
                .collect();
            cleaned.parse().ok().filter(|n: &f64| n.is_finite())
        }
        _ => None,
    }
}

fn raw_text(value: &CellValue) -> String {
    match value {
        CellValue::Empty => String::new(),
        CellValue::Text(s) => s.clone(),
        CellValue::Number(n) => n.to_string(),
        CellValue::Instant(i) => i.to_rfc3339(),
    }
}

// ---------------------------------------------------------------------------
// Locale table
// ---------------------------------------------------------------------------

enum SymbolPosition {
    Prefix,
    Suffix,
}

enum Symbol {
    Glyph(&'static str),
    Code,
}

struct LocaleSpec {
    tag: &'static str,
    group_sep: char,
    decimal_sep: char,
    /// Zero digit of the locale's digit script; `None` = Latin digits.
    zero_digit: Option<char>,
    symbol_position: SymbolPosition,
}

const LOCALES: &[LocaleSpec] = &[
    LocaleSpec {
        tag: "en-US",
        group_sep: ',',
        decimal_sep: '.',
        zero_digit: None,
        symbol_position: SymbolPosition::Prefix,
    },
    LocaleSpec {
        tag: "en-GB",
        group_sep: ',',
        decimal_sep: '.',
        zero_digit: None,
        symbol_position: SymbolPosition::Prefix,
    },
    LocaleSpec {
        tag: "de-DE",
        group_sep: '.',
        decimal_sep: ',',
        zero_digit: None,
        symbol_position: SymbolPosition::Suffix,
    },
    LocaleSpec {
        tag: "ar-SA",
        // Arabic thousands (U+066C) and decimal (U+066B) separators,
        // Arabic-Indic digits starting at U+0660.
        group_sep: '\u{066C}',
        decimal_sep: '\u{066B}',
        zero_digit: Some('\u{0660}'),
        symbol_position: SymbolPosition::Suffix,
    },
];

fn locale_spec(tag: &str) -> &'static LocaleSpec {
    LOCALES
        .iter()
        .find(|spec| spec.tag == tag)
        .unwrap_or(&LOCALES[0])
}

fn currency_symbol(code: &str) -> Symbol {
    match code {
        "USD" => Symbol::Glyph("$"),
        "EUR" => Symbol::Glyph("\u{20AC}"),
        "GBP" => Symbol::Glyph("\u{A3}"),
        "SAR" => Symbol::Glyph(SAUDI_RIYAL_SIGN),
        _ => Symbol::Code,
    }
}

// ---------------------------------------------------------------------------
// Decimal shaping
// ---------------------------------------------------------------------------

/// Hard cap on fraction digits, the Intl limit. Keeps a hostile
/// `max_fraction_digits` from inflating the fixed-point expansion.
const FRACTION_DIGITS_CAP: u32 = 100;

/// Format a non-negative number per the locale spec: round to the maximum
/// fraction digits, trim trailing zeros down to the minimum, group the
/// integer part, then transliterate digits if the locale calls for it.
fn format_decimal(n: f64, spec: &LocaleSpec, options: &CurrencyFormatOptions) -> String {
    let max_digits = options.max_fraction_digits.min(FRACTION_DIGITS_CAP);
    let max = max_digits as usize;
    let min = options.min_fraction_digits.min(max_digits) as usize;

    let fixed = format!("{:.*}", max, round_to(n, max_digits));
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i, f),
        None => (fixed.as_str(), ""),
    };

    let mut frac = frac_part;
    while frac.len() > min && frac.ends_with('0') {
        frac = &frac[..frac.len() - 1];
    }

    let mut out = if options.use_grouping {
        group_thousands(int_part, spec.group_sep)
    } else {
        int_part.to_string()
    };
    if !frac.is_empty() {
        out.push(spec.decimal_sep);
        out.push_str(frac);
    }

    match spec.zero_digit {
        Some(zero) => transliterate_digits(&out, zero),
        None => out,
    }
}

fn round_to(value: f64, decimals: u32) -> f64 {
    // Past f64 precision rounding cannot change the value, and the scale
    // round-trip would only add noise.
    if decimals > 17 {
        return value;
    }
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

fn group_thousands(int_part: &str, sep: char) -> String {
    let len = int_part.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, c) in int_part.chars().enumerate() {
        out.push(c);
        let pos_from_end = len - i - 1;
        if pos_from_end > 0 && pos_from_end % 3 == 0 {
            out.push(sep);
        }
    }
    out
}

fn transliterate_digits(s: &str, zero: char) -> String {
    s.chars()
        .map(|c| {
            if c.is_ascii_digit() {
                char::from_u32(zero as u32 + (c as u32 - '0' as u32)).unwrap_or(c)
            } else {
                c
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Cell renderer
// ---------------------------------------------------------------------------

struct CurrencyCellState {
    request: CurrencyRequest,
    selection: CurrencySelection,
    locale: String,
    display: String,
}

/// A currency cell bound to the shared currency store.
///
/// Same lifecycle as the date-side renderer. A cell with an explicit
/// `params.code` never subscribes; everything else re-resolves from the
/// snapshot carried in each change notification.
pub struct CurrencyRenderer {
    store: Rc<CurrencyStore>,
    state: Option<Rc<RefCell<CurrencyCellState>>>,
    token: Option<SubscriptionToken>,
}

impl CurrencyRenderer {
    pub fn new(store: Rc<CurrencyStore>) -> Self {
        Self { store, state: None, token: None }
    }

    pub fn initialize(&mut self, request: CurrencyRequest) {
        self.dispose();

        let stored = self.store.stored();
        let (selection, locale) = resolve_currency(&request.params, &request.row, &stored);
        let display = format_currency(&request.value, &selection, &locale, &request.params.options);
        let subscribe = request.params.code.is_none();

        let state = Rc::new(RefCell::new(CurrencyCellState { request, selection, locale, display }));
        self.state = Some(Rc::clone(&state));

        if subscribe {
            let cell = Rc::clone(&state);
            let token = self.store.subscribe(move |change| {
                let mut cell = cell.borrow_mut();
                let (selection, locale) =
                    resolve_currency(&cell.request.params, &cell.request.row, &change.stored);
                cell.display =
                    format_currency(&cell.request.value, &selection, &locale, &cell.request.params.options);
                cell.selection = selection;
                cell.locale = locale;
            });
            self.token = Some(token);
        }
    }

    /// Replace the value; keeps the resolved selection and locale.
    pub fn update_value(&mut self, value: impl Into<CellValue>) -> bool {
        let Some(state) = &self.state else {
            return false;
        };
        let mut cell = state.borrow_mut();
        cell.request.value = value.into();
        cell.display =
            format_currency(&cell.request.value, &cell.selection, &cell.locale, &cell.request.params.options);
        true
    }

    /// Full re-resolve against the store's current state.
    pub fn refresh(&mut self, request: CurrencyRequest) -> bool {
        let Some(state) = &self.state else {
            return false;
        };
        let stored = self.store.stored();
        let mut cell = state.borrow_mut();
        let (selection, locale) = resolve_currency(&request.params, &request.row, &stored);
        cell.display = format_currency(&request.value, &selection, &locale, &request.params.options);
        cell.selection = selection;
        cell.locale = locale;
        cell.request = request;
        true
    }

    pub fn display(&self) -> String {
        self.state
            .as_ref()
            .map(|s| s.borrow().display.clone())
            .unwrap_or_default()
    }

    pub fn is_subscribed(&self) -> bool {
        self.token.is_some()
    }

    pub fn dispose(&mut self) {
        if let Some(token) = self.token.take() {
            self.store.unsubscribe(token);
        }
    }
}

impl Drop for CurrencyRenderer {
    fn drop(&mut self) {
        self.dispose();
    }
}
