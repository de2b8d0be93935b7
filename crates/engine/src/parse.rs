//! Turning raw cell values into instants.
//!
//! Dispatch is shape-first and ordered; the first matching shape wins and a
//! shape match that fails validation does not fall through to later steps.
//! Date-only inputs become local midnight, time-only inputs attach to
//! today's local date, and epoch numbers are read as seconds or
//! milliseconds depending on magnitude.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

use crate::value::CellValue;

/// Outcome of parsing a cell value.
///
/// `Invalid` is not an error: it flows into the defensive raw-display
/// fallback instead of aborting the render.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedInstant {
    Valid(DateTime<Utc>),
    Invalid { raw: String },
}

impl ParsedInstant {
    pub fn instant(&self) -> Option<DateTime<Utc>> {
        match self {
            ParsedInstant::Valid(i) => Some(*i),
            ParsedInstant::Invalid { .. } => None,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, ParsedInstant::Valid(_))
    }
}

/// Parse any cell value.
pub fn parse_value(value: &CellValue) -> ParsedInstant {
    match value {
        CellValue::Empty => ParsedInstant::Invalid { raw: String::new() },
        CellValue::Instant(i) => ParsedInstant::Valid(*i),
        CellValue::Number(n) => match parse_epoch(*n) {
            Some(i) => ParsedInstant::Valid(i),
            None => ParsedInstant::Invalid { raw: n.to_string() },
        },
        CellValue::Text(s) => parse_text(s),
    }
}

/// Parse a textual cell value through the ordered shape dispatch.
pub fn parse_text(raw: &str) -> ParsedInstant {
    let invalid = || ParsedInstant::Invalid { raw: raw.to_string() };
    let s = raw.trim();
    if s.is_empty() {
        return invalid();
    }

    // ISO date, bare or with a time/zone suffix.
    if let Some((head, rest)) = iso_date_head(s) {
        if rest.is_empty() {
            return match parse_ymd(head, '-').and_then(local_midnight) {
                Some(i) => ParsedInstant::Valid(i),
                None => invalid(),
            };
        }
        return match parse_native(s) {
            Some(i) => ParsedInstant::Valid(i),
            None => invalid(),
        };
    }

    // yyyy/MM/dd.
    if looks_slash_ymd(s) {
        return match parse_ymd(s, '/').and_then(local_midnight) {
            Some(i) => ParsedInstant::Valid(i),
            None => invalid(),
        };
    }

    // dd/MM/yyyy and dd-MM-yyyy: day first.
    if looks_dmy(s) {
        return match parse_dmy(s).and_then(local_midnight) {
            Some(i) => ParsedInstant::Valid(i),
            None => invalid(),
        };
    }

    // Bare time of day, anchored to today.
    if looks_time_only(s) {
        let today = Local::now().date_naive();
        return match parse_time_only(s).and_then(|t| local_to_utc(today.and_time(t))) {
            Some(i) => ParsedInstant::Valid(i),
            None => invalid(),
        };
    }

    match parse_native(s) {
        Some(i) => ParsedInstant::Valid(i),
        None => invalid(),
    }
}

/// Epoch number: values under 1e12 in magnitude are seconds, larger ones
/// milliseconds. Non-finite input does not parse.
fn parse_epoch(n: f64) -> Option<DateTime<Utc>> {
    if !n.is_finite() {
        return None;
    }
    let millis = if n.abs() < 1e12 { n * 1000.0 } else { n };
    DateTime::from_timestamp_millis(millis.round() as i64)
}

// ---------------------------------------------------------------------------
// Shape checks
// ---------------------------------------------------------------------------

fn digits(bytes: &[u8]) -> bool {
    !bytes.is_empty() && bytes.iter().all(u8::is_ascii_digit)
}

/// `YYYY-MM-DD` head with an empty, `T`, or space suffix.
/// Returns the head and the remainder.
fn iso_date_head(s: &str) -> Option<(&str, &str)> {
    let b = s.as_bytes();
    if b.len() < 10 {
        return None;
    }
    let shaped = digits(&b[0..4]) && b[4] == b'-' && digits(&b[5..7]) && b[7] == b'-' && digits(&b[8..10]);
    if !shaped {
        return None;
    }
    let rest = &s[10..];
    if rest.is_empty() || rest.starts_with('T') || rest.starts_with(' ') {
        Some((&s[..10], rest))
    } else {
        None
    }
}

fn looks_slash_ymd(s: &str) -> bool {
    let b = s.as_bytes();
    b.len() == 10
        && digits(&b[0..4])
        && b[4] == b'/'
        && digits(&b[5..7])
        && b[7] == b'/'
        && digits(&b[8..10])
}

fn looks_dmy(s: &str) -> bool {
    let b = s.as_bytes();
    b.len() == 10
        && digits(&b[0..2])
        && (b[2] == b'/' || b[2] == b'-')
        && digits(&b[3..5])
        && (b[5] == b'/' || b[5] == b'-')
        && digits(&b[6..10])
}

/// `H:MM`, `H:MM:SS`, optionally followed by AM/PM.
pub(crate) fn looks_time_only(s: &str) -> bool {
    let (body, _) = split_meridiem(s);
    let parts: Vec<&str> = body.split(':').collect();
    match parts.as_slice() {
        [h, m] => (1..=2).contains(&h.len()) && digits(h.as_bytes()) && m.len() == 2 && digits(m.as_bytes()),
        [h, m, sec] => {
            (1..=2).contains(&h.len())
                && digits(h.as_bytes())
                && m.len() == 2
                && digits(m.as_bytes())
                && sec.len() == 2
                && digits(sec.as_bytes())
        }
        _ => false,
    }
}

/// Date-only shapes the kind-inference heuristic recognizes.
pub(crate) fn looks_date_only(s: &str) -> bool {
    (iso_date_head(s).map(|(_, rest)| rest.is_empty())).unwrap_or(false) || looks_slash_ymd(s) || looks_dmy(s)
}

// ---------------------------------------------------------------------------
// Component parsers
// ---------------------------------------------------------------------------

/// Year-first date split on `sep`, with checked construction: a calendar
/// impossibility like November 31st yields `None` rather than rolling over.
fn parse_ymd(s: &str, sep: char) -> Option<NaiveDate> {
    let mut parts = s.split(sep);
    let y: i32 = parts.next()?.parse().ok()?;
    let m: u32 = parts.next()?.parse().ok()?;
    let d: u32 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    NaiveDate::from_ymd_opt(y, m, d)
}

/// Day-first date; separators may be `/` or `-` in either position.
fn parse_dmy(s: &str) -> Option<NaiveDate> {
    let d: u32 = s[0..2].parse().ok()?;
    let m: u32 = s[3..5].parse().ok()?;
    let y: i32 = s[6..10].parse().ok()?;
    NaiveDate::from_ymd_opt(y, m, d)
}

/// Trailing AM/PM marker, case-insensitive. Returns the remaining body and
/// `Some(true)` for PM, `Some(false)` for AM.
fn split_meridiem(s: &str) -> (&str, Option<bool>) {
    let t = s.trim();
    if t.len() >= 2 && t.is_char_boundary(t.len() - 2) {
        let (head, tail) = t.split_at(t.len() - 2);
        if tail.eq_ignore_ascii_case("am") {
            return (head.trim_end(), Some(false));
        }
        if tail.eq_ignore_ascii_case("pm") {
            return (head.trim_end(), Some(true));
        }
    }
    (t, None)
}

fn parse_time_only(s: &str) -> Option<NaiveTime> {
    let (body, meridiem) = split_meridiem(s);
    let mut parts = body.split(':');
    let mut hour: u32 = parts.next()?.parse().ok()?;
    let minute: u32 = parts.next()?.parse().ok()?;
    let second: u32 = match parts.next() {
        Some(sec) => sec.parse().ok()?,
        None => 0,
    };
    if parts.next().is_some() {
        return None;
    }
    match meridiem {
        Some(true) if hour < 12 => hour += 12,
        Some(false) if hour == 12 => hour = 0,
        _ => {}
    }
    NaiveTime::from_hms_opt(hour, minute, second)
}

// ---------------------------------------------------------------------------
// Generic fallback
// ---------------------------------------------------------------------------

const DATETIME_LAYOUTS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const ZONED_LAYOUTS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f%#z"];

const DATE_LAYOUTS: &[&str] = &["%b %d, %Y", "%d %b %Y", "%B %d, %Y", "%d %B %Y"];

/// Last-resort parse for anything the shape dispatch did not claim:
/// RFC 3339 / RFC 2822, a few zoneless layouts read as local wall time,
/// and English month-name dates read as local midnight.
fn parse_native(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for layout in ZONED_LAYOUTS {
        if let Ok(dt) = DateTime::parse_from_str(s, layout) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for layout in DATETIME_LAYOUTS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, layout) {
            return local_to_utc(naive);
        }
    }
    for layout in DATE_LAYOUTS {
        if let Ok(date) = NaiveDate::parse_from_str(s, layout) {
            return local_midnight(date);
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Local-time conversion
// ---------------------------------------------------------------------------

fn local_midnight(date: NaiveDate) -> Option<DateTime<Utc>> {
    local_to_utc(date.and_hms_opt(0, 0, 0)?)
}

/// Interpret a wall-clock time in the host-local zone. DST ambiguity takes
/// the earlier offset; a time inside a spring-forward gap does not parse.
fn local_to_utc(naive: NaiveDateTime) -> Option<DateTime<Utc>> {
    Local.from_local_datetime(&naive).earliest().map(|dt| dt.with_timezone(&Utc))
}
