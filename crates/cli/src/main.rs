// gridfmt CLI - headless cell formatting against the shared preference store

mod exit_codes;

use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use chrono::Utc;

use gridfmt_engine::{
    compare_cell_text, fmt_date, format_currency, infer_kind, parse_value, render_value, resolve,
    resolve_currency, to_utc_iso, CellValue, CurrencyFormatOptions, CurrencyParams, FmtDateOptions,
    FormatKind, RenderRequest,
};
use gridfmt_store::{
    keys, CurrencySelection, CurrencyStore, JsonFileBackend, PreferenceBackend, PreferenceStore,
    PreferenceWatcher, CURRENCY_OPTIONS, DATE_PATTERNS, DEFAULT_DATE_PATTERN, DEFAULT_TIME_PATTERN,
    TIME_PATTERNS,
};

use exit_codes::{EXIT_IO, EXIT_SUCCESS, EXIT_USAGE, EXIT_VALUE};

#[derive(Parser)]
#[command(name = "gridfmt")]
#[command(about = "Grid cell formatting against shared preferences (headless)")]
#[command(version)]
#[command(subcommand_required = false)]
struct Cli {
    /// Preference slot file (defaults to the per-user location)
    #[arg(long, global = true, value_name = "PATH")]
    file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Format a value the way a grid cell would display it
    #[command(after_help = "\
Examples:
  gridfmt render '2025-03-01T12:00:00Z'
  gridfmt render 2025-03-01 --kind date
  gridfmt render 14:45 --kind time --time-format 'hh:mm a'
  gridfmt render 1740830445 --tz Asia/Riyadh
  gridfmt render '01/03/2025' --fmt 'dd MMM yyyy HH:mm' --json")]
    Render {
        /// Value to format: date text, clock text, or an epoch number
        value: String,

        /// Treat the value as this kind instead of sniffing its shape
        #[arg(long)]
        kind: Option<KindArg>,

        /// Combined date+time pattern, overrides both stored patterns
        #[arg(long)]
        fmt: Option<String>,

        /// Date pattern override
        #[arg(long, value_name = "PATTERN")]
        date_format: Option<String>,

        /// Time pattern override
        #[arg(long, value_name = "PATTERN")]
        time_format: Option<String>,

        /// IANA timezone override ("local" = host zone)
        #[arg(long, value_name = "ZONE")]
        tz: Option<String>,

        /// Emit a JSON object with the resolved format alongside the text
        #[arg(long)]
        json: bool,
    },

    /// Format a numeric value as currency
    #[command(after_help = "\
Examples:
  gridfmt currency 1234.5
  gridfmt currency 1234.5 --code USD --locale en-US
  gridfmt currency 1234.5 --plain --no-grouping
  gridfmt currency ' $1,234.50 ' --code EUR --locale de-DE --min-frac 2")]
    Currency {
        /// Value to format (number or numeric text)
        value: String,

        /// ISO 4217 code (defaults to the stored selection)
        #[arg(long, conflicts_with = "plain")]
        code: Option<String>,

        /// Force plain-number rendering (explicit "no currency")
        #[arg(long)]
        plain: bool,

        /// Locale tag for separators and digit script
        #[arg(long, value_name = "TAG")]
        locale: Option<String>,

        /// Minimum fraction digits
        #[arg(long, default_value_t = 0, value_name = "N")]
        min_frac: u32,

        /// Maximum fraction digits
        #[arg(long, default_value_t = 2, value_name = "N")]
        max_frac: u32,

        /// Disable thousands grouping
        #[arg(long)]
        no_grouping: bool,
    },

    /// Normalize an edited value to a UTC timestamp for write-back
    #[command(after_help = "\
Examples:
  gridfmt normalize '01/03/2025'
  gridfmt normalize 2025-03-01      # date only: takes the current clock time
  gridfmt normalize 1740830445")]
    Normalize {
        /// Value to normalize
        value: String,
    },

    /// Sort lines from stdin the way a grid column sorts rendered cells
    #[command(after_help = "\
Examples:
  printf 'row10\\nrow9\\n' | gridfmt sort
  cut -d, -f2 data.csv | gridfmt sort -r")]
    Sort {
        /// Reverse the order
        #[arg(long, short = 'r')]
        reverse: bool,
    },

    /// Inspect and change the stored preferences
    Prefs {
        #[command(subcommand)]
        command: PrefsCommands,
    },

    /// Preview a value under every allowed pattern
    Preview {
        /// Value to preview (defaults to the current moment)
        value: Option<String>,

        /// IANA timezone override ("local" = host zone)
        #[arg(long, value_name = "ZONE")]
        tz: Option<String>,
    },

    /// Watch the slot file and print external preference changes
    #[command(after_help = "\
Examples:
  gridfmt watch
  gridfmt watch --interval-ms 100 --json")]
    Watch {
        /// Poll interval in milliseconds
        #[arg(long, default_value_t = 500, value_name = "MS")]
        interval_ms: u64,

        /// Emit JSON lines instead of plain text
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum PrefsCommands {
    /// Print the stored preferences
    Show {
        #[arg(long)]
        json: bool,
    },

    /// List the allowed date and time patterns
    Patterns,

    /// Set the stored date pattern (must be in the allowed set)
    SetDateFormat {
        pattern: String,
    },

    /// Set the stored time pattern (must be in the allowed set)
    SetTimeFormat {
        pattern: String,
    },

    /// Set the stored timezone ("local" clears back to the host zone)
    SetTimezone {
        zone: String,
    },

    /// Set the stored currency (a code from the picker, or "none")
    SetCurrency {
        code: String,
    },

    /// Remove every stored preference, returning all views to defaults
    Reset,
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Date,
    Time,
    Datetime,
}

impl KindArg {
    fn into_kind(self) -> FormatKind {
        match self {
            KindArg::Date => FormatKind::Date,
            KindArg::Time => FormatKind::Time,
            KindArg::Datetime => FormatKind::DateTime,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let file = cli.file;

    let result = match cli.command {
        None => {
            eprintln!("Usage: gridfmt <command> [options]");
            eprintln!("       gridfmt --help for more information");
            Ok(())
        }
        Some(Commands::Render { value, kind, fmt, date_format, time_format, tz, json }) => {
            cmd_render(&file, value, kind, fmt, date_format, time_format, tz, json)
        }
        Some(Commands::Currency { value, code, plain, locale, min_frac, max_frac, no_grouping }) => {
            cmd_currency(&file, value, code, plain, locale, min_frac, max_frac, no_grouping)
        }
        Some(Commands::Normalize { value }) => cmd_normalize(value),
        Some(Commands::Sort { reverse }) => cmd_sort(reverse),
        Some(Commands::Prefs { command }) => match command {
            PrefsCommands::Show { json } => cmd_prefs_show(&file, json),
            PrefsCommands::Patterns => cmd_prefs_patterns(),
            PrefsCommands::SetDateFormat { pattern } => cmd_prefs_set_date(&file, pattern),
            PrefsCommands::SetTimeFormat { pattern } => cmd_prefs_set_time(&file, pattern),
            PrefsCommands::SetTimezone { zone } => cmd_prefs_set_timezone(&file, zone),
            PrefsCommands::SetCurrency { code } => cmd_prefs_set_currency(&file, code),
            PrefsCommands::Reset => cmd_prefs_reset(&file),
        },
        Some(Commands::Preview { value, tz }) => cmd_preview(&file, value, tz),
        Some(Commands::Watch { interval_ms, json }) => cmd_watch(&file, interval_ms, json),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
struct CliError {
    code: u8,
    message: String,
    hint: Option<String>,
}

impl CliError {
    fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO, message: msg.into(), hint: None }
    }

    /// Exit code without a message; the command already printed its output.
    fn silent(code: u8) -> Self {
        Self { code, message: String::new(), hint: None }
    }

    fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

// ============================================================================
// shared helpers
// ============================================================================

fn backend_at(file: &Option<PathBuf>) -> JsonFileBackend {
    match file {
        Some(path) => JsonFileBackend::new(path),
        None => JsonFileBackend::open_default(),
    }
}

fn prefs_at(file: &Option<PathBuf>) -> PreferenceStore {
    PreferenceStore::new(Box::new(backend_at(file)))
}

fn currency_at(file: &Option<PathBuf>) -> CurrencyStore {
    CurrencyStore::new(Box::new(backend_at(file)))
}

/// Type a raw argument the way a grid host types cell data: numeric text
/// becomes a number (epoch semantics), everything else stays text.
fn read_value(raw: &str) -> CellValue {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return CellValue::Empty;
    }
    if let Ok(n) = trimmed.parse::<f64>() {
        return CellValue::Number(n);
    }
    CellValue::from(raw)
}

/// Read a slot back through a fresh backend after a store write. The stores
/// treat persistence as best-effort; a one-shot CLI has nothing but the
/// file, so a silent persist failure must become an exit code here.
fn verify_persisted(
    file: &Option<PathBuf>,
    key: &str,
    expect: Option<&str>,
) -> Result<(), CliError> {
    let backend = backend_at(file);
    let got = backend.read(key).map_err(|e| CliError::io(e.to_string()))?;
    if got.as_deref() != expect {
        return Err(CliError::io(format!("failed to persist {}", key)));
    }
    Ok(())
}

// ============================================================================
// render
// ============================================================================

fn cmd_render(
    file: &Option<PathBuf>,
    raw: String,
    kind: Option<KindArg>,
    fmt: Option<String>,
    date_format: Option<String>,
    time_format: Option<String>,
    tz: Option<String>,
    json: bool,
) -> Result<(), CliError> {
    let store = prefs_at(file);
    let prefs = store.snapshot();

    let value = read_value(&raw);
    let kind = kind.map(KindArg::into_kind).unwrap_or_else(|| infer_kind(&value));
    let request = RenderRequest {
        value,
        kind,
        fmt,
        date_override: date_format,
        time_override: time_format,
        timezone_override: tz,
    };
    let resolved = resolve(&request, &prefs);
    let text = render_value(&request.value, &resolved);
    let valid = request.value.is_blank() || parse_value(&request.value).is_valid();

    if json {
        let out = serde_json::json!({
            "text": text,
            "valid": valid,
            "kind": kind,
            "pattern": resolved.pattern,
            "datePattern": resolved.date_part,
            "timePattern": resolved.time_part,
            "timezone": resolved.timezone,
        });
        println!("{}", out);
    } else {
        println!("{}", text);
    }

    if valid {
        Ok(())
    } else {
        Err(CliError::silent(EXIT_VALUE))
    }
}

// ============================================================================
// currency
// ============================================================================

fn cmd_currency(
    file: &Option<PathBuf>,
    raw: String,
    code: Option<String>,
    plain: bool,
    locale: Option<String>,
    min_frac: u32,
    max_frac: u32,
    no_grouping: bool,
) -> Result<(), CliError> {
    if min_frac > max_frac {
        return Err(CliError::args("--min-frac cannot exceed --max-frac"));
    }

    let params = CurrencyParams {
        code: if plain {
            Some(CurrencySelection::None)
        } else {
            code.map(CurrencySelection::Code)
        },
        currency_field: None,
        locale,
        options: CurrencyFormatOptions {
            min_fraction_digits: min_frac,
            max_fraction_digits: max_frac,
            use_grouping: !no_grouping,
        },
    };

    let stored = currency_at(file).stored();
    let (selection, locale) = resolve_currency(&params, &BTreeMap::new(), &stored);
    let text = format_currency(&read_value(&raw), &selection, &locale, &params.options);
    println!("{}", text);
    Ok(())
}

// ============================================================================
// normalize
// ============================================================================

fn cmd_normalize(raw: String) -> Result<(), CliError> {
    let out = to_utc_iso(&read_value(&raw));
    println!("{}", out);
    if out == "Invalid Date" {
        return Err(CliError::silent(EXIT_VALUE));
    }
    Ok(())
}

// ============================================================================
// sort
// ============================================================================

fn cmd_sort(reverse: bool) -> Result<(), CliError> {
    let stdin = io::stdin();
    let mut lines: Vec<String> = Vec::new();
    for line in stdin.lock().lines() {
        lines.push(line.map_err(|e| CliError::io(e.to_string()))?);
    }

    lines.sort_by(|a, b| {
        let ord = compare_cell_text(Some(a.as_str()), Some(b.as_str()));
        if reverse { ord.reverse() } else { ord }
    });

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    for line in lines {
        writeln!(handle, "{}", line).map_err(|e| CliError::io(e.to_string()))?;
    }
    Ok(())
}

// ============================================================================
// prefs
// ============================================================================

fn cmd_prefs_show(file: &Option<PathBuf>, json: bool) -> Result<(), CliError> {
    let store = prefs_at(file);
    let prefs = store.snapshot();
    let stored = currency_at(file).stored();

    if json {
        let currency_code = match &stored.selection {
            None => serde_json::Value::Null,
            Some(CurrencySelection::None) => serde_json::json!(""),
            Some(CurrencySelection::Code(c)) => serde_json::json!(c),
        };
        let out = serde_json::json!({
            "dateFormat": prefs.date_pattern,
            "timeFormat": prefs.time_pattern,
            "timezone": prefs.timezone,
            "currencyCode": currency_code,
            "currencyLocale": stored.locale,
        });
        println!("{}", out);
        return Ok(());
    }

    println!("date format:  {}", prefs.date_pattern);
    println!("time format:  {}", prefs.time_pattern);
    println!("timezone:     {}", prefs.timezone.as_deref().unwrap_or("local"));
    let currency = match &stored.selection {
        None => "(not set)".to_string(),
        Some(CurrencySelection::None) => "none".to_string(),
        Some(CurrencySelection::Code(c)) => match &stored.locale {
            Some(locale) => format!("{} ({})", c, locale),
            None => c.clone(),
        },
    };
    println!("currency:     {}", currency);
    if let Some(path) = store.storage_path() {
        println!("file:         {}", path.display());
    }
    Ok(())
}

fn cmd_prefs_patterns() -> Result<(), CliError> {
    println!("date patterns:");
    for pattern in DATE_PATTERNS {
        let marker = if *pattern == DEFAULT_DATE_PATTERN { " (default)" } else { "" };
        println!("  {}{}", pattern, marker);
    }
    println!();
    println!("time patterns:");
    for pattern in TIME_PATTERNS {
        let marker = if *pattern == DEFAULT_TIME_PATTERN { " (default)" } else { "" };
        println!("  {}{}", pattern, marker);
    }
    Ok(())
}

fn cmd_prefs_set_date(file: &Option<PathBuf>, pattern: String) -> Result<(), CliError> {
    let store = prefs_at(file);
    store
        .try_set_date_pattern(&pattern)
        .map_err(|e| CliError::args(e.to_string()))?;
    verify_persisted(file, keys::DATE_FORMAT, Some(pattern.as_str()))
}

fn cmd_prefs_set_time(file: &Option<PathBuf>, pattern: String) -> Result<(), CliError> {
    let store = prefs_at(file);
    store
        .try_set_time_pattern(&pattern)
        .map_err(|e| CliError::args(e.to_string()))?;
    verify_persisted(file, keys::TIME_FORMAT, Some(pattern.as_str()))
}

fn cmd_prefs_set_timezone(file: &Option<PathBuf>, zone: String) -> Result<(), CliError> {
    if zone != "local" && zone.parse::<chrono_tz::Tz>().is_err() {
        return Err(CliError::args(format!("unknown timezone \"{}\"", zone))
            .with_hint("IANA names like Europe/Berlin, or \"local\" for the host zone"));
    }

    let store = prefs_at(file);
    store.set_timezone(Some(zone.as_str()));
    let expect = if zone == "local" { None } else { Some(zone.as_str()) };
    verify_persisted(file, keys::TIMEZONE, expect)
}

fn cmd_prefs_set_currency(file: &Option<PathBuf>, code: String) -> Result<(), CliError> {
    let store = currency_at(file);
    if code == "none" {
        store.set_selection(None);
        return verify_persisted(file, keys::CURRENCY_CODE, Some(""));
    }

    if CurrencyStore::option_for(Some(code.as_str())).is_none() {
        let available: Vec<&str> = CURRENCY_OPTIONS.iter().filter_map(|o| o.code).collect();
        return Err(CliError::args(format!("unknown currency \"{}\"", code))
            .with_hint(format!("available: none, {}", available.join(", "))));
    }
    store.set_selection(Some(code.as_str()));
    verify_persisted(file, keys::CURRENCY_CODE, Some(code.as_str()))
}

fn cmd_prefs_reset(file: &Option<PathBuf>) -> Result<(), CliError> {
    let mut backend = backend_at(file);
    for key in [
        keys::DATE_FORMAT,
        keys::TIME_FORMAT,
        keys::TIMEZONE,
        keys::CURRENCY_CODE,
        keys::CURRENCY_LOCALE,
    ] {
        backend.remove(key).map_err(|e| CliError::io(e.to_string()))?;
    }
    Ok(())
}

// ============================================================================
// preview
// ============================================================================

fn cmd_preview(
    file: &Option<PathBuf>,
    raw: Option<String>,
    tz: Option<String>,
) -> Result<(), CliError> {
    let store = prefs_at(file);
    let prefs = store.snapshot();

    let value = match raw {
        Some(raw) => {
            let value = read_value(&raw);
            if !parse_value(&value).is_valid() {
                return Err(CliError::args(format!("cannot preview \"{}\": not a date/time", raw)));
            }
            value
        }
        None => CellValue::Instant(Utc::now()),
    };

    println!("date patterns:");
    for pattern in DATE_PATTERNS {
        let options = FmtDateOptions {
            kind: Some(FormatKind::Date),
            date_pattern: Some(pattern.to_string()),
            timezone: tz.clone(),
            ..FmtDateOptions::default()
        };
        let marker = if *pattern == prefs.date_pattern { "*" } else { " " };
        println!("{} {:<14} {}", marker, pattern, fmt_date(value.clone(), &options, &prefs));
    }
    println!();
    println!("time patterns:");
    for pattern in TIME_PATTERNS {
        let options = FmtDateOptions {
            kind: Some(FormatKind::Time),
            time_pattern: Some(pattern.to_string()),
            timezone: tz.clone(),
            ..FmtDateOptions::default()
        };
        let marker = if *pattern == prefs.time_pattern { "*" } else { " " };
        println!("{} {:<14} {}", marker, pattern, fmt_date(value.clone(), &options, &prefs));
    }
    Ok(())
}

// ============================================================================
// watch
// ============================================================================

fn cmd_watch(file: &Option<PathBuf>, interval_ms: u64, json: bool) -> Result<(), CliError> {
    let path = match file {
        Some(path) => path.clone(),
        None => JsonFileBackend::default_path(),
    };

    let watcher = PreferenceWatcher::with_poll_interval(&path, Duration::from_millis(interval_ms))
        .map_err(|e| CliError::io(e.to_string()))?;
    eprintln!("watching {}", path.display());

    let stdout = io::stdout();
    while let Ok(change) = watcher.receiver().recv() {
        let mut handle = stdout.lock();
        if json {
            let line = serde_json::json!({ "key": change.key, "value": change.value });
            writeln!(handle, "{}", line).map_err(|e| CliError::io(e.to_string()))?;
        } else {
            match &change.value {
                Some(value) => writeln!(handle, "{} = {}", change.key, value),
                None => writeln!(handle, "{} (removed)", change.key),
            }
            .map_err(|e| CliError::io(e.to_string()))?;
        }
        handle.flush().map_err(|e| CliError::io(e.to_string()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_value_types_numbers_and_text() {
        assert_eq!(read_value("1740830445"), CellValue::Number(1740830445.0));
        assert_eq!(read_value("  -2.5 "), CellValue::Number(-2.5));
        assert_eq!(read_value("2025-03-01"), CellValue::from("2025-03-01"));
        assert_eq!(read_value("   "), CellValue::Empty);
    }

    #[test]
    fn verify_persisted_reports_missing_slot() {
        let dir = tempfile::tempdir().unwrap();
        let file = Some(dir.path().join("preferences.json"));

        // Nothing written yet: expecting a value must fail, expecting
        // absence must pass.
        assert!(verify_persisted(&file, keys::DATE_FORMAT, Some("yyyy-MM-dd")).is_err());
        assert!(verify_persisted(&file, keys::DATE_FORMAT, None).is_ok());
    }

    #[test]
    fn set_and_show_round_trip_through_slot_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = Some(dir.path().join("preferences.json"));

        cmd_prefs_set_date(&file, "dd MMM yyyy".to_string()).unwrap();
        cmd_prefs_set_timezone(&file, "Asia/Riyadh".to_string()).unwrap();
        cmd_prefs_set_currency(&file, "EUR".to_string()).unwrap();

        let store = prefs_at(&file);
        assert_eq!(store.date_pattern(), "dd MMM yyyy");
        assert_eq!(store.timezone().as_deref(), Some("Asia/Riyadh"));
        let stored = currency_at(&file).stored();
        assert_eq!(stored.selection, Some(CurrencySelection::Code("EUR".to_string())));
        assert_eq!(stored.locale.as_deref(), Some("de-DE"));

        cmd_prefs_reset(&file).unwrap();
        let store = prefs_at(&file);
        assert_eq!(store.date_pattern(), DEFAULT_DATE_PATTERN);
        assert_eq!(store.timezone(), None);
    }

    #[test]
    fn rejected_pattern_is_a_usage_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = Some(dir.path().join("preferences.json"));

        let err = cmd_prefs_set_date(&file, "yyyy.MM.dd".to_string()).unwrap_err();
        assert_eq!(err.code, EXIT_USAGE);

        let err = cmd_prefs_set_timezone(&file, "Mars/Olympus".to_string()).unwrap_err();
        assert_eq!(err.code, EXIT_USAGE);

        let err = cmd_prefs_set_currency(&file, "XYZ".to_string()).unwrap_err();
        assert_eq!(err.code, EXIT_USAGE);
        assert!(err.hint.unwrap().contains("USD"));
    }
}
