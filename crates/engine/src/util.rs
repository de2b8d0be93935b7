//! Write-back normalization and column sorting.
//!
//! [`to_utc_iso`] is what the grid writes after an edit: a second-precision
//! UTC stamp. [`compare_cell_text`] orders rendered cell text the way users
//! expect mixed numeric/textual columns to sort.

use std::cmp::Ordering;

use chrono::{DateTime, Local, Timelike, Utc};

use crate::parse::{parse_text, parse_value, ParsedInstant};
use crate::value::CellValue;

/// Normalize an edited value to a UTC timestamp string, `%Y-%m-%dT%H:%M:%SZ`.
///
/// Empty values stamp the current moment. Values that carry no time of day
/// (anything landing on local midnight exactly) take the current wall-clock
/// time instead, so a date-only edit keeps "when it was edited" as its time.
/// Values nothing can be made of come back as `"Invalid Date"`.
pub fn to_utc_iso(value: &CellValue) -> String {
    let local: DateTime<Local> = match value {
        CellValue::Empty => Local::now(),
        CellValue::Text(s) if s.trim().is_empty() => Local::now(),
        CellValue::Text(s) => match parse_text(s) {
            ParsedInstant::Valid(utc) => utc.with_timezone(&Local),
            ParsedInstant::Invalid { .. } => return "Invalid Date".to_string(),
        },
        other => match parse_value(other) {
            ParsedInstant::Valid(utc) => utc.with_timezone(&Local),
            ParsedInstant::Invalid { .. } => return "Invalid Date".to_string(),
        },
    };

    let local = if is_local_midnight(&local) {
        let now = Local::now();
        local
            .with_hour(now.hour())
            .and_then(|d| d.with_minute(now.minute()))
            .and_then(|d| d.with_second(now.second()))
            .unwrap_or(local)
    } else {
        local
    };

    local.with_timezone(&Utc).format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

fn is_local_midnight(local: &DateTime<Local>) -> bool {
    local.hour() == 0 && local.minute() == 0 && local.second() == 0 && local.nanosecond() == 0
}

// ---------------------------------------------------------------------------
// Sorting
// ---------------------------------------------------------------------------

/// Order two rendered cell texts for a column sort.
///
/// Missing cells sort first. Integer-looking texts compare numerically
/// (leading zeros ignored), numbers sort before words, and everything else
/// compares case-insensitively with embedded digit runs compared by value,
/// so "row9" comes before "row10".
pub fn compare_cell_text(a: Option<&str>, b: Option<&str>) -> Ordering {
    let (a, b) = match (a, b) {
        (None, None) => return Ordering::Equal,
        (None, Some(_)) => return Ordering::Less,
        (Some(_), None) => return Ordering::Greater,
        (Some(a), Some(b)) => (a.trim(), b.trim()),
    };

    match (integer_key(a), integer_key(b)) {
        (Some(ka), Some(kb)) => compare_integer_keys(ka, kb),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => natural_compare(a, b),
    }
}

/// The digits of a pure unsigned integer, leading zeros stripped.
/// `None` when the text is anything else.
fn integer_key(s: &str) -> Option<&str> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let stripped = s.trim_start_matches('0');
    Some(if stripped.is_empty() { "0" } else { stripped })
}

fn compare_integer_keys(a: &str, b: &str) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// Case-insensitive compare with digit runs compared as numbers.
fn natural_compare(a: &str, b: &str) -> Ordering {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (mut i, mut j) = (0, 0);

    while i < a.len() && j < b.len() {
        if a[i].is_ascii_digit() && b[j].is_ascii_digit() {
            let run_a = digit_run(&a, &mut i);
            let run_b = digit_run(&b, &mut j);
            let cmp = compare_integer_keys(&run_a, &run_b);
            if cmp != Ordering::Equal {
                return cmp;
            }
        } else {
            let ca = a[i].to_lowercase().next().unwrap_or(a[i]);
            let cb = b[j].to_lowercase().next().unwrap_or(b[j]);
            if ca != cb {
                return ca.cmp(&cb);
            }
            i += 1;
            j += 1;
        }
    }
    a.len().cmp(&b.len())
}

/// Consume a run of digits starting at `*idx`, returning it with leading
/// zeros stripped.
fn digit_run(chars: &[char], idx: &mut usize) -> String {
    let start = *idx;
    while *idx < chars.len() && chars[*idx].is_ascii_digit() {
        *idx += 1;
    }
    let run: String = chars[start..*idx].iter().collect();
    let stripped = run.trim_start_matches('0');
    if stripped.is_empty() { "0".to_string() } else { stripped.to_string() }
}
