//! Format resolution: request overrides against stored preferences.
//!
//! Resolution is a pure function of the request and a preference snapshot,
//! so subscribers can re-resolve from the snapshot carried in a change
//! notification without touching the store.

use serde::{Deserialize, Serialize};

use gridfmt_store::FormatPreferences;

use crate::split::split_combined;
use crate::value::CellValue;

/// What a cell renders as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatKind {
    Date,
    Time,
    #[default]
    DateTime,
}

/// Everything a cell binding supplies: the raw value, the rendering kind,
/// and optional per-cell format overrides. Empty-string overrides count as
/// absent.
#[derive(Debug, Clone, Default)]
pub struct RenderRequest {
    pub value: CellValue,
    pub kind: FormatKind,
    /// Combined date+time pattern; wins over the per-part overrides.
    pub fmt: Option<String>,
    pub date_override: Option<String>,
    pub time_override: Option<String>,
    /// IANA zone for display; absent (or "local") means host-local.
    /// Stored preferences are never consulted for the zone.
    pub timezone_override: Option<String>,
}

impl RenderRequest {
    pub fn new(value: impl Into<CellValue>, kind: FormatKind) -> Self {
        Self {
            value: value.into(),
            kind,
            ..Self::default()
        }
    }

    /// True when the cell pins its own pattern. Any format override field
    /// freezes the cell, whatever its kind: it renders the same way
    /// regardless of preference changes, so renderers skip subscribing
    /// for it.
    pub fn has_explicit_format(&self) -> bool {
        present(&self.fmt).is_some()
            || present(&self.date_override).is_some()
            || present(&self.time_override).is_some()
    }
}

/// The format a cell resolved to, ready for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedFormat {
    /// Full pattern for this kind (date and time halves joined for
    /// `DateTime`).
    pub pattern: String,
    /// Display zone; `None` = host-local.
    pub timezone: Option<String>,
    pub date_part: String,
    pub time_part: String,
}

/// Resolve a request against a preference snapshot.
///
/// A combined `fmt` override is the effective pattern verbatim, whatever the
/// kind. Otherwise each half comes from its per-part override, then the
/// stored preference, selected or joined per kind. The timezone is the
/// request's own or host-local — deliberately never the stored one, so a
/// shared zone preference cannot silently re-interpret a cell that opted out.
pub fn resolve(request: &RenderRequest, prefs: &FormatPreferences) -> ResolvedFormat {
    let timezone = normalize_timezone(&request.timezone_override);

    if let Some(fmt) = present(&request.fmt) {
        // The combined pattern is the effective pattern as given, for every
        // kind; the halves are derived for consumers that want one part,
        // with explicit per-part overrides beating the split's guess.
        let (split_date, split_time) = split_combined(fmt);
        let date_part = present(&request.date_override)
            .map(str::to_string)
            .unwrap_or(split_date);
        let time_part = present(&request.time_override)
            .map(str::to_string)
            .unwrap_or(split_time);
        return ResolvedFormat { pattern: fmt.to_string(), timezone, date_part, time_part };
    }

    let date_part = present(&request.date_override)
        .unwrap_or(&prefs.date_pattern)
        .to_string();
    let time_part = present(&request.time_override)
        .unwrap_or(&prefs.time_pattern)
        .to_string();
    let pattern = match request.kind {
        FormatKind::Date => date_part.clone(),
        FormatKind::Time => time_part.clone(),
        FormatKind::DateTime => format!("{} {}", date_part, time_part).trim().to_string(),
    };

    ResolvedFormat { pattern, timezone, date_part, time_part }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn normalize_timezone(timezone: &Option<String>) -> Option<String> {
    present(timezone)
        .filter(|tz| *tz != gridfmt_store::LOCAL_TIMEZONE)
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prefs() -> FormatPreferences {
        FormatPreferences {
            date_pattern: "dd/MM/yyyy".to_string(),
            time_pattern: "HH:mm:ss".to_string(),
            timezone: Some("Asia/Riyadh".to_string()),
        }
    }

    #[test]
    fn stored_preference_when_no_overrides() {
        let request = RenderRequest::new(CellValue::Empty, FormatKind::DateTime);
        let resolved = resolve(&request, &prefs());
        assert_eq!(resolved.pattern, "dd/MM/yyyy HH:mm:ss");
        assert_eq!(resolved.date_part, "dd/MM/yyyy");
        assert_eq!(resolved.time_part, "HH:mm:ss");
    }

    #[test]
    fn combined_fmt_wins_over_everything() {
        let request = RenderRequest {
            fmt: Some("yyyy-MM-dd hh:mm a".to_string()),
            date_override: Some("MM/dd/yyyy".to_string()),
            time_override: Some("HH:mm".to_string()),
            ..RenderRequest::new(CellValue::Empty, FormatKind::DateTime)
        };
        let resolved = resolve(&request, &prefs());
        assert_eq!(resolved.pattern, "yyyy-MM-dd hh:mm a");
        // The explicit halves still beat the split's guess for the parts.
        assert_eq!(resolved.date_part, "MM/dd/yyyy");
        assert_eq!(resolved.time_part, "HH:mm");
    }

    #[test]
    fn date_only_fmt_on_datetime_appends_nothing() {
        let request = RenderRequest {
            fmt: Some("dd-MM-yyyy".to_string()),
            ..RenderRequest::new(CellValue::Empty, FormatKind::DateTime)
        };
        let resolved = resolve(&request, &prefs());
        assert_eq!(resolved.pattern, "dd-MM-yyyy");
        assert_eq!(resolved.date_part, "dd-MM-yyyy");
        // The split has no time tokens to hand out, so the default fills in
        // for cells that only want the time half.
        assert_eq!(resolved.time_part, "HH:mm");
    }

    #[test]
    fn combined_fmt_is_verbatim_for_every_kind() {
        for kind in [FormatKind::Date, FormatKind::Time, FormatKind::DateTime] {
            let request = RenderRequest {
                fmt: Some("MMM dd, yyyy hh:mm a".to_string()),
                ..RenderRequest::new(CellValue::Empty, kind)
            };
            let resolved = resolve(&request, &prefs());
            // Never narrowed to one half, even for single-kind cells.
            assert_eq!(resolved.pattern, "MMM dd, yyyy hh:mm a");
            assert_eq!(resolved.date_part, "MMM dd, yyyy");
            assert_eq!(resolved.time_part, "hh:mm a");
        }
    }

    #[test]
    fn per_part_override_beats_stored_preference() {
        let request = RenderRequest {
            date_override: Some("MMM dd, yyyy".to_string()),
            ..RenderRequest::new(CellValue::Empty, FormatKind::DateTime)
        };
        let resolved = resolve(&request, &prefs());
        assert_eq!(resolved.pattern, "MMM dd, yyyy HH:mm:ss");
    }

    #[test]
    fn empty_string_override_counts_as_absent() {
        let request = RenderRequest {
            fmt: Some("".to_string()),
            date_override: Some("   ".to_string()),
            ..RenderRequest::new(CellValue::Empty, FormatKind::Date)
        };
        let resolved = resolve(&request, &prefs());
        assert_eq!(resolved.pattern, "dd/MM/yyyy");
        assert!(!request.has_explicit_format());
    }

    #[test]
    fn kind_selects_the_pattern_half() {
        let date = RenderRequest::new(CellValue::Empty, FormatKind::Date);
        assert_eq!(resolve(&date, &prefs()).pattern, "dd/MM/yyyy");
        let time = RenderRequest::new(CellValue::Empty, FormatKind::Time);
        assert_eq!(resolve(&time, &prefs()).pattern, "HH:mm:ss");
    }

    #[test]
    fn stored_timezone_is_never_used() {
        // prefs carry Asia/Riyadh, but without a per-cell override the
        // resolved zone stays host-local.
        let request = RenderRequest::new(CellValue::Empty, FormatKind::DateTime);
        assert_eq!(resolve(&request, &prefs()).timezone, None);
    }

    #[test]
    fn timezone_override_applies_and_local_sentinel_clears() {
        let mut request = RenderRequest::new(CellValue::Empty, FormatKind::DateTime);
        request.timezone_override = Some("Europe/Berlin".to_string());
        assert_eq!(resolve(&request, &prefs()).timezone.as_deref(), Some("Europe/Berlin"));

        request.timezone_override = Some("local".to_string());
        assert_eq!(resolve(&request, &prefs()).timezone, None);
    }

    #[test]
    fn any_format_override_pins_the_cell() {
        let mut request = RenderRequest::new(CellValue::Empty, FormatKind::Date);
        assert!(!request.has_explicit_format());

        // Even an override for the half this kind never renders pins it.
        request.time_override = Some("HH:mm".to_string());
        assert!(request.has_explicit_format());

        let mut time_cell = RenderRequest::new(CellValue::Empty, FormatKind::Time);
        time_cell.fmt = Some("yyyy-MM-dd HH:mm".to_string());
        assert!(time_cell.has_explicit_format());
    }

    #[test]
    fn timezone_override_alone_does_not_pin() {
        let mut request = RenderRequest::new(CellValue::Empty, FormatKind::DateTime);
        request.timezone_override = Some("Europe/Berlin".to_string());
        assert!(!request.has_explicit_format());
    }
}
