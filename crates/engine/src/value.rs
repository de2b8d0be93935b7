//! Raw cell values as they arrive from the grid.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What a cell holds before any formatting.
///
/// `Instant` covers hosts that hand over already-typed timestamps; `Number`
/// is an epoch value (seconds or milliseconds, disambiguated by magnitude at
/// parse time); `Text` is anything the user typed.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum CellValue {
    #[default]
    Empty,
    Instant(DateTime<Utc>),
    Number(f64),
    Text(String),
}

impl CellValue {
    /// True for `Empty` and for whitespace-only text.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<DateTime<Utc>> for CellValue {
    fn from(instant: DateTime<Utc>) -> Self {
        CellValue::Instant(instant)
    }
}

impl<V: Into<CellValue>> From<Option<V>> for CellValue {
    fn from(value: Option<V>) -> Self {
        match value {
            Some(v) => v.into(),
            None => CellValue::Empty,
        }
    }
}
