//! Rendering values through resolved formats, and the cell renderer
//! component that keeps a rendered cell in sync with preference changes.

use std::cell::RefCell;
use std::rc::Rc;

use chrono::{DateTime, Local, NaiveDateTime, Utc};
use chrono_tz::Tz;

use gridfmt_store::{PrefChannel, PreferenceStore, SubscriptionToken};

use crate::error::PatternError;
use crate::parse::{parse_value, ParsedInstant};
use crate::pattern::format_naive;
use crate::resolve::{resolve, FormatKind, RenderRequest, ResolvedFormat};
use crate::value::CellValue;

/// Render a value with an already-resolved format. Never fails: parse and
/// pattern problems degrade to the defensive raw display.
pub fn render_value(value: &CellValue, format: &ResolvedFormat) -> String {
    match parse_value(value) {
        ParsedInstant::Valid(instant) => {
            apply_pattern(instant, &format.pattern, format.timezone.as_deref())
                .unwrap_or_else(|_| fallback_text(value))
        }
        ParsedInstant::Invalid { .. } => fallback_text(value),
    }
}

/// Project an instant into the display zone (`None` = host-local) and
/// format it.
pub fn apply_pattern(
    instant: DateTime<Utc>,
    pattern: &str,
    timezone: Option<&str>,
) -> Result<String, PatternError> {
    let wall: NaiveDateTime = match timezone {
        None => instant.with_timezone(&Local).naive_local(),
        Some(name) => {
            let tz: Tz = name
                .parse()
                .map_err(|_| PatternError::UnknownTimezone(name.to_string()))?;
            instant.with_timezone(&tz).naive_local()
        }
    };
    format_naive(&wall, pattern)
}

/// Raw display for values that could not be parsed or formatted: the value's
/// string form, cut to its date-looking prefix (first 10 chars of an ISO-ish
/// string, otherwise the text before the first space).
fn fallback_text(value: &CellValue) -> String {
    let s = match value {
        CellValue::Empty => return String::new(),
        CellValue::Text(s) => s.clone(),
        CellValue::Number(n) => n.to_string(),
        CellValue::Instant(i) => i.to_rfc3339(),
    };
    if s.contains('T') {
        s.chars().take(10).collect()
    } else {
        s.split(' ').next().unwrap_or("").to_string()
    }
}

// ---------------------------------------------------------------------------
// Cell renderer
// ---------------------------------------------------------------------------

struct CellState {
    request: RenderRequest,
    resolved: ResolvedFormat,
    display: String,
}

/// A rendered cell bound to the shared preference store.
///
/// One renderer per visible cell, parameterized by the request's
/// [`FormatKind`]. Lifecycle:
///
/// - [`initialize`](Self::initialize): resolve once, render, and subscribe
///   to the preference channels this kind depends on — unless the cell
///   pins its own format, in which case it never subscribes.
/// - [`update_value`](Self::update_value): new raw value, same bindings;
///   re-renders under the already-resolved format without re-running
///   precedence.
/// - [`refresh`](Self::refresh): full re-resolve against current
///   preferences. Subscriptions are left as initialized.
/// - [`dispose`](Self::dispose): release subscriptions. Also runs on drop.
///
/// Preference changes re-resolve from the snapshot carried in the change,
/// so notification handling never re-enters the store.
pub struct CellRenderer {
    store: Rc<PreferenceStore>,
    state: Option<Rc<RefCell<CellState>>>,
    tokens: Vec<SubscriptionToken>,
}

impl CellRenderer {
    pub fn new(store: Rc<PreferenceStore>) -> Self {
        Self { store, state: None, tokens: Vec::new() }
    }

    /// Bind a cell. Re-initializing releases the previous subscriptions
    /// first.
    pub fn initialize(&mut self, request: RenderRequest) {
        self.dispose();

        let prefs = self.store.snapshot();
        let resolved = resolve(&request, &prefs);
        let display = render_value(&request.value, &resolved);
        let subscribe = !request.has_explicit_format();
        let kind = request.kind;

        let state = Rc::new(RefCell::new(CellState { request, resolved, display }));
        self.state = Some(Rc::clone(&state));

        if subscribe {
            let channels: &[PrefChannel] = match kind {
                FormatKind::Date => &[PrefChannel::DatePattern],
                FormatKind::Time => &[PrefChannel::TimePattern],
                FormatKind::DateTime => &[PrefChannel::DatePattern, PrefChannel::TimePattern],
            };
            for &channel in channels {
                let cell = Rc::clone(&state);
                let token = self.store.subscribe(channel, move |change| {
                    let mut cell = cell.borrow_mut();
                    let resolved = resolve(&cell.request, &change.prefs);
                    cell.display = render_value(&cell.request.value, &resolved);
                    cell.resolved = resolved;
                });
                self.tokens.push(token);
            }
        }
    }

    /// Replace the cell's value without re-running format precedence.
    /// Returns false if the renderer was never initialized.
    pub fn update_value(&mut self, value: impl Into<CellValue>) -> bool {
        let Some(state) = &self.state else {
            return false;
        };
        let mut cell = state.borrow_mut();
        cell.request.value = value.into();
        cell.display = render_value(&cell.request.value, &cell.resolved);
        true
    }

    /// Re-bind with a fresh request and re-resolve against the store's
    /// current snapshot. Subscriptions are not re-evaluated. Returns false
    /// if the renderer was never initialized.
    pub fn refresh(&mut self, request: RenderRequest) -> bool {
        let Some(state) = &self.state else {
            return false;
        };
        let prefs = self.store.snapshot();
        let mut cell = state.borrow_mut();
        cell.resolved = resolve(&request, &prefs);
        cell.display = render_value(&request.value, &cell.resolved);
        cell.request = request;
        true
    }

    /// Current display text ("" before initialization).
    pub fn display(&self) -> String {
        self.state
            .as_ref()
            .map(|s| s.borrow().display.clone())
            .unwrap_or_default()
    }

    /// The format the cell last resolved to.
    pub fn resolved(&self) -> Option<ResolvedFormat> {
        self.state.as_ref().map(|s| s.borrow().resolved.clone())
    }

    /// True while the renderer holds live store subscriptions.
    pub fn is_subscribed(&self) -> bool {
        !self.tokens.is_empty()
    }

    /// Release store subscriptions. The last rendered display remains
    /// readable.
    pub fn dispose(&mut self) {
        for token in self.tokens.drain(..) {
            self.store.unsubscribe(token);
        }
    }
}

impl Drop for CellRenderer {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use gridfmt_store::{MemoryBackend, PreferenceStore};

    fn store() -> Rc<PreferenceStore> {
        Rc::new(PreferenceStore::new(Box::new(MemoryBackend::new())))
    }

    fn resolved(pattern: &str, timezone: Option<&str>) -> ResolvedFormat {
        ResolvedFormat {
            pattern: pattern.to_string(),
            timezone: timezone.map(str::to_string),
            date_part: String::new(),
            time_part: String::new(),
        }
    }

    #[test]
    fn renders_instant_in_fixed_zone() {
        let instant = Utc.with_ymd_and_hms(2025, 3, 1, 21, 30, 0).unwrap();
        let out = render_value(
            &CellValue::Instant(instant),
            &resolved("yyyy-MM-dd HH:mm", Some("Asia/Riyadh")),
        );
        // Riyadh is UTC+3 year-round.
        assert_eq!(out, "2025-03-02 00:30");
    }

    #[test]
    fn unknown_timezone_falls_back_to_raw() {
        let out = render_value(
            &CellValue::from("2025-03-01T10:00:00Z"),
            &resolved("yyyy-MM-dd", Some("Mars/Olympus")),
        );
        assert_eq!(out, "2025-03-01");
    }

    #[test]
    fn bad_pattern_falls_back_to_raw() {
        let out = render_value(&CellValue::from("2025-03-01"), &resolved("QQQQ", None));
        assert_eq!(out, "2025-03-01");
    }

    #[test]
    fn unparseable_text_with_t_keeps_date_looking_prefix() {
        let out = render_value(&CellValue::from("2025-03-01Tjunk-suffix"), &resolved("yyyy-MM-dd", None));
        assert_eq!(out, "2025-03-01");
    }

    #[test]
    fn unparseable_text_truncates_at_first_space() {
        let out = render_value(&CellValue::from("hello world"), &resolved("yyyy-MM-dd", None));
        assert_eq!(out, "hello");
    }

    #[test]
    fn unparseable_number_falls_back_to_its_string_form() {
        assert_eq!(render_value(&CellValue::Number(f64::NAN), &resolved("yyyy-MM-dd", None)), "NaN");
        assert_eq!(render_value(&CellValue::Number(f64::INFINITY), &resolved("yyyy-MM-dd", None)), "inf");
    }

    #[test]
    fn empty_value_renders_empty() {
        assert_eq!(render_value(&CellValue::Empty, &resolved("yyyy-MM-dd", None)), "");
    }

    #[test]
    fn renderer_follows_preference_change() {
        let store = store();
        let instant = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();

        let mut renderer = CellRenderer::new(Rc::clone(&store));
        renderer.initialize(RenderRequest {
            timezone_override: Some("Asia/Riyadh".to_string()),
            ..RenderRequest::new(instant, FormatKind::Date)
        });
        assert_eq!(renderer.display(), "2025-03-01");
        assert!(renderer.is_subscribed());

        store.set_date_pattern("dd MMM yyyy");
        assert_eq!(renderer.display(), "01 Mar 2025");
    }

    #[test]
    fn pinned_cell_ignores_preference_changes() {
        let store = store();
        let instant = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();

        let mut renderer = CellRenderer::new(Rc::clone(&store));
        renderer.initialize(RenderRequest {
            date_override: Some("MM/dd/yyyy".to_string()),
            timezone_override: Some("Asia/Riyadh".to_string()),
            ..RenderRequest::new(instant, FormatKind::Date)
        });
        assert!(!renderer.is_subscribed());
        assert_eq!(renderer.display(), "03/01/2025");

        store.set_date_pattern("dd MMM yyyy");
        assert_eq!(renderer.display(), "03/01/2025", "pinned cell must not change");
    }

    #[test]
    fn off_kind_override_still_pins_the_cell() {
        // A date-kind cell carrying only a time override never subscribes:
        // any explicit format field freezes the binding.
        let store = store();
        let instant = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();

        let mut renderer = CellRenderer::new(Rc::clone(&store));
        renderer.initialize(RenderRequest {
            time_override: Some("HH:mm".to_string()),
            timezone_override: Some("Asia/Riyadh".to_string()),
            ..RenderRequest::new(instant, FormatKind::Date)
        });
        assert!(!renderer.is_subscribed());
        assert_eq!(renderer.display(), "2025-03-01");

        store.set_date_pattern("dd MMM yyyy");
        assert_eq!(renderer.display(), "2025-03-01");
    }

    #[test]
    fn datetime_kind_listens_on_both_channels() {
        let store = store();
        let instant = Utc.with_ymd_and_hms(2025, 3, 1, 14, 45, 0).unwrap();

        let mut renderer = CellRenderer::new(Rc::clone(&store));
        renderer.initialize(RenderRequest {
            timezone_override: Some("Asia/Riyadh".to_string()),
            ..RenderRequest::new(instant, FormatKind::DateTime)
        });
        assert_eq!(renderer.display(), "2025-03-01 17:45");

        store.set_date_pattern("dd/MM/yyyy");
        assert_eq!(renderer.display(), "01/03/2025 17:45");

        store.set_time_pattern("hh:mm a");
        assert_eq!(renderer.display(), "01/03/2025 05:45 PM");
    }

    #[test]
    fn update_value_keeps_resolved_format() {
        let store = store();
        let mut renderer = CellRenderer::new(Rc::clone(&store));
        renderer.initialize(RenderRequest {
            timezone_override: Some("Asia/Riyadh".to_string()),
            ..RenderRequest::new("2025-03-01T00:00:00Z", FormatKind::Date)
        });
        assert_eq!(renderer.display(), "2025-03-01");

        assert!(renderer.update_value("2025-06-15T00:00:00Z"));
        assert_eq!(renderer.display(), "2025-06-15");
    }

    #[test]
    fn refresh_rebinds_without_touching_subscriptions() {
        let store = store();
        let mut renderer = CellRenderer::new(Rc::clone(&store));
        renderer.initialize(RenderRequest {
            timezone_override: Some("Asia/Riyadh".to_string()),
            ..RenderRequest::new("2025-03-01T00:00:00Z", FormatKind::Date)
        });
        let subscribed_before = renderer.is_subscribed();

        let refreshed = renderer.refresh(RenderRequest {
            date_override: Some("MM/dd/yyyy".to_string()),
            timezone_override: Some("Asia/Riyadh".to_string()),
            ..RenderRequest::new("2025-03-01T00:00:00Z", FormatKind::Date)
        });
        assert!(refreshed);
        assert_eq!(renderer.display(), "03/01/2025");
        assert_eq!(renderer.is_subscribed(), subscribed_before);
    }

    #[test]
    fn dispose_stops_updates_and_drop_releases() {
        let store = store();
        let mut renderer = CellRenderer::new(Rc::clone(&store));
        renderer.initialize(RenderRequest {
            timezone_override: Some("Asia/Riyadh".to_string()),
            ..RenderRequest::new("2025-03-01T00:00:00Z", FormatKind::Date)
        });
        assert_eq!(store.subscriber_count(), 1);

        renderer.dispose();
        assert_eq!(store.subscriber_count(), 0);
        store.set_date_pattern("dd/MM/yyyy");
        assert_eq!(renderer.display(), "2025-03-01", "disposed renderer keeps last display");

        let mut other = CellRenderer::new(Rc::clone(&store));
        other.initialize(RenderRequest::new(CellValue::Empty, FormatKind::Time));
        assert_eq!(store.subscriber_count(), 1);
        drop(other);
        assert_eq!(store.subscriber_count(), 0);
    }

    #[test]
    fn uninitialized_renderer_answers_safely() {
        let mut renderer = CellRenderer::new(store());
        assert_eq!(renderer.display(), "");
        assert!(!renderer.update_value("x"));
        assert!(!renderer.refresh(RenderRequest::default()));
    }
}
