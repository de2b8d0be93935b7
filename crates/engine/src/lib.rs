//! `gridfmt-engine` — parsing, format resolution, and cell rendering.
//!
//! Turns raw cell values (text, epoch numbers, typed instants) into display
//! strings under a resolved format: per-cell overrides first, then the
//! stored preferences from `gridfmt-store`, then built-in defaults. Live
//! renderers subscribe to the store and re-render themselves when the
//! preferences move; the one-shot pipe does the same resolution statelessly.

pub mod currency;
pub mod error;
pub mod parse;
pub mod pattern;
pub mod pipe;
pub mod render;
pub mod resolve;
pub mod split;
pub mod util;
pub mod value;

pub use currency::{
    format_currency, resolve_currency, CurrencyFormatOptions, CurrencyParams, CurrencyRenderer,
    CurrencyRequest,
};
pub use error::PatternError;
pub use parse::{parse_text, parse_value, ParsedInstant};
pub use pattern::format_naive;
pub use pipe::{fmt_date, infer_kind, FmtDateOptions};
pub use render::{render_value, CellRenderer};
pub use resolve::{resolve, FormatKind, RenderRequest, ResolvedFormat};
pub use split::split_combined;
pub use util::{compare_cell_text, to_utc_iso};
pub use value::CellValue;
