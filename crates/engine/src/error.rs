//! Error types for pattern formatting.

use std::fmt;

/// A pattern could not be applied to an instant.
///
/// Renderers catch this and fall back to a defensive raw display; it only
/// reaches callers through the pattern engine's public entry points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    /// A token run the engine does not implement, e.g. `ddd` or `Q`.
    UnsupportedToken(String),
    /// A quoted literal with no closing quote.
    UnterminatedLiteral,
    /// Timezone identifier not in the IANA database.
    UnknownTimezone(String),
}

impl fmt::Display for PatternError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternError::UnsupportedToken(token) => write!(f, "unsupported pattern token: {:?}", token),
            PatternError::UnterminatedLiteral => write!(f, "unterminated quoted literal in pattern"),
            PatternError::UnknownTimezone(tz) => write!(f, "unknown timezone: {:?}", tz),
        }
    }
}

impl std::error::Error for PatternError {}
