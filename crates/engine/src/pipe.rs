//! One-shot value formatting.
//!
//! [`fmt_date`] is the stateless entry point hosts use in templates and
//! exports: no live cell, no subscriptions, just resolve-and-render against
//! a preferences snapshot. When the caller does not say which kind the
//! value is, the shape of the text decides.

use gridfmt_store::FormatPreferences;

use crate::parse::{looks_date_only, looks_time_only};
use crate::render::render_value;
use crate::resolve::{resolve, FormatKind, RenderRequest};
use crate::value::CellValue;

/// Caller-supplied knobs for a one-shot format call. All optional; an empty
/// struct formats with the stored preferences alone.
#[derive(Debug, Clone, Default)]
pub struct FmtDateOptions {
    /// Force a kind instead of inferring one from the value.
    pub kind: Option<FormatKind>,
    /// Combined pattern override, used verbatim whatever the kind.
    pub fmt: Option<String>,
    pub date_pattern: Option<String>,
    pub time_pattern: Option<String>,
    pub timezone: Option<String>,
}

/// Format one value against a preferences snapshot.
///
/// Blank values come back empty. Text values with no explicit kind are
/// sniffed: a bare clock reading formats as a time, a bare date as a date,
/// anything else as a full datetime.
pub fn fmt_date(
    value: impl Into<CellValue>,
    options: &FmtDateOptions,
    prefs: &FormatPreferences,
) -> String {
    let value = value.into();
    if value.is_blank() {
        return String::new();
    }

    let kind = options.kind.unwrap_or_else(|| infer_kind(&value));
    let request = RenderRequest {
        value,
        kind,
        fmt: options.fmt.clone(),
        date_override: options.date_pattern.clone(),
        time_override: options.time_pattern.clone(),
        timezone_override: options.timezone.clone(),
    };
    let resolved = resolve(&request, prefs);
    render_value(&request.value, &resolved)
}

/// Sniff the kind of an untyped value from its shape. Bare clock readings
/// are times, bare dates are dates, everything else is a full datetime.
pub fn infer_kind(value: &CellValue) -> FormatKind {
    match value {
        CellValue::Text(s) => {
            let trimmed = s.trim();
            if looks_time_only(trimmed) {
                FormatKind::Time
            } else if looks_date_only(trimmed) {
                FormatKind::Date
            } else {
                FormatKind::DateTime
            }
        }
        _ => FormatKind::DateTime,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn riyadh() -> FmtDateOptions {
        FmtDateOptions { timezone: Some("Asia/Riyadh".to_string()), ..FmtDateOptions::default() }
    }

    #[test]
    fn blank_values_format_empty() {
        let prefs = FormatPreferences::default();
        assert_eq!(fmt_date(CellValue::Empty, &FmtDateOptions::default(), &prefs), "");
        assert_eq!(fmt_date("   ", &FmtDateOptions::default(), &prefs), "");
    }

    // Bare dates and clock readings are local wall-clock values, so these
    // render in the host zone and hold on any machine.
    #[test]
    fn bare_date_text_infers_date_kind() {
        let prefs = FormatPreferences::default();
        let out = fmt_date("2025-03-01", &FmtDateOptions::default(), &prefs);
        assert_eq!(out, "2025-03-01");
    }

    #[test]
    fn bare_time_text_infers_time_kind() {
        let prefs = FormatPreferences::default();
        let out = fmt_date("14:45", &FmtDateOptions::default(), &prefs);
        assert_eq!(out, "14:45");
    }

    #[test]
    fn full_text_infers_datetime_kind() {
        let prefs = FormatPreferences::default();
        let out = fmt_date("2025-03-01T12:00:00Z", &riyadh(), &prefs);
        assert_eq!(out, "2025-03-01 15:00");
    }

    #[test]
    fn explicit_kind_beats_inference() {
        let prefs = FormatPreferences::default();
        let options = FmtDateOptions { kind: Some(FormatKind::Date), ..riyadh() };
        let out = fmt_date("2025-03-01T12:00:00Z", &options, &prefs);
        assert_eq!(out, "2025-03-01");
    }

    #[test]
    fn fmt_override_beats_preferences() {
        let mut prefs = FormatPreferences::default();
        prefs.date_pattern = "dd/MM/yyyy".to_string();
        let options = FmtDateOptions {
            kind: Some(FormatKind::Date),
            fmt: Some("dd MMM yyyy".to_string()),
            ..FmtDateOptions::default()
        };
        let out = fmt_date("2025-03-01", &options, &prefs);
        assert_eq!(out, "01 Mar 2025");
    }

    #[test]
    fn preferences_apply_when_no_override() {
        let mut prefs = FormatPreferences::default();
        prefs.date_pattern = "MM/dd/yyyy".to_string();
        let options = FmtDateOptions { kind: Some(FormatKind::Date), ..FmtDateOptions::default() };
        let out = fmt_date("2025-03-01", &options, &prefs);
        assert_eq!(out, "03/01/2025");
    }

    #[test]
    fn slash_and_day_first_dates_normalize() {
        let prefs = FormatPreferences::default();
        assert_eq!(fmt_date("2025/03/01", &FmtDateOptions::default(), &prefs), "2025-03-01");
        assert_eq!(fmt_date("01/03/2025", &FmtDateOptions::default(), &prefs), "2025-03-01");
    }

    #[test]
    fn date_only_fmt_on_datetime_value_drops_the_time() {
        let prefs = FormatPreferences::default();
        let options = FmtDateOptions { fmt: Some("dd-MM-yyyy".to_string()), ..riyadh() };
        let out = fmt_date("2025-03-01T12:00:00Z", &options, &prefs);
        assert_eq!(out, "01-03-2025");
    }

    #[test]
    fn unparseable_text_falls_back() {
        let prefs = FormatPreferences::default();
        let out = fmt_date("next tuesday maybe", &FmtDateOptions::default(), &prefs);
        assert_eq!(out, "next");
    }
}
