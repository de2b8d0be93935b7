//! Splitting a combined datetime pattern into date and time halves.

use gridfmt_store::{DEFAULT_DATE_PATTERN, DEFAULT_TIME_PATTERN};

/// Split a combined pattern like `"dd/MM/yyyy HH:mm"` at the first hour
/// token (`H` or `h`, either case kind).
///
/// Heuristic, by contract: a pattern with no hour token — or one that
/// starts with it — keeps the whole trimmed input as the date half and
/// falls back to the default time pattern. An empty half after trimming
/// also falls back to its default. Quoted literals are not skipped, so an
/// `h` inside quotes will split there; the allowed sets never contain one.
pub fn split_combined(fmt: &str) -> (String, String) {
    let hour_at = fmt.char_indices().find(|(_, c)| *c == 'H' || *c == 'h').map(|(i, _)| i);

    match hour_at {
        None | Some(0) => (fmt.trim().to_string(), DEFAULT_TIME_PATTERN.to_string()),
        Some(i) => {
            let date = fmt[..i].trim();
            let time = fmt[i..].trim();
            (
                if date.is_empty() { DEFAULT_DATE_PATTERN } else { date }.to_string(),
                if time.is_empty() { DEFAULT_TIME_PATTERN } else { time }.to_string(),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_at_first_hour_token() {
        assert_eq!(
            split_combined("yyyy-MM-dd HH:mm"),
            ("yyyy-MM-dd".to_string(), "HH:mm".to_string())
        );
        assert_eq!(
            split_combined("dd/MM/yyyy hh:mm:ss a"),
            ("dd/MM/yyyy".to_string(), "hh:mm:ss a".to_string())
        );
    }

    #[test]
    fn date_only_pattern_gets_default_time() {
        assert_eq!(
            split_combined("MMM dd, yyyy"),
            ("MMM dd, yyyy".to_string(), DEFAULT_TIME_PATTERN.to_string())
        );
    }

    #[test]
    fn leading_hour_token_keeps_whole_input_as_date_half() {
        // Documented imprecision: a pure time pattern is not recognized as
        // one; the caller sees it in the date slot.
        assert_eq!(
            split_combined("HH:mm:ss"),
            ("HH:mm:ss".to_string(), DEFAULT_TIME_PATTERN.to_string())
        );
    }

    #[test]
    fn surrounding_whitespace_is_trimmed() {
        assert_eq!(
            split_combined("  yyyy-MM-dd   HH:mm  "),
            ("yyyy-MM-dd".to_string(), "HH:mm".to_string())
        );
    }

    #[test]
    fn empty_input_is_an_empty_date_half_with_default_time() {
        // No hour token, so the whole (empty) input is the date half; only
        // the time side falls back.
        assert_eq!(
            split_combined(""),
            ("".to_string(), DEFAULT_TIME_PATTERN.to_string())
        );
    }
}
