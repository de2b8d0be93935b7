//! CLDR-style date pattern formatting.
//!
//! Implements the token subset the allowed pattern sets actually use, plus
//! enough headroom for per-cell overrides: year/month/day, 12/24-hour time,
//! weekday names, day period, and quoted literals. Anything else is an
//! error — callers fall back to a raw display rather than guessing.
//!
//! Token reference (run length in parentheses):
//!   y (1-4)   year             M (1-2) month number   MMM/MMMM month name
//!   d (1-2)   day of month     E (1-4) weekday name
//!   H (1-2)   hour 0-23        h (1-2) hour 1-12
//!   m (1-2)   minute           s (1-2) second         a  AM/PM
//!   '...'     literal text     ''     literal apostrophe

use chrono::{Datelike, NaiveDateTime, Timelike};

use crate::error::PatternError;

/// Format a wall-clock datetime with a pattern.
pub fn format_naive(dt: &NaiveDateTime, pattern: &str) -> Result<String, PatternError> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len() + 8);
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c == '\'' {
            i = consume_literal(&chars, i, &mut out)?;
        } else if c.is_ascii_alphabetic() {
            let mut j = i + 1;
            while j < chars.len() && chars[j] == c {
                j += 1;
            }
            out.push_str(&render_token(dt, c, j - i)?);
            i = j;
        } else {
            out.push(c);
            i += 1;
        }
    }
    Ok(out)
}

/// Consume a quoted section starting at the opening quote; returns the index
/// just past the closing quote. A doubled quote is a literal apostrophe,
/// both inside and outside quoted sections.
fn consume_literal(chars: &[char], start: usize, out: &mut String) -> Result<usize, PatternError> {
    // `''` outside a literal.
    if chars.get(start + 1) == Some(&'\'') {
        out.push('\'');
        return Ok(start + 2);
    }

    let mut i = start + 1;
    loop {
        match chars.get(i) {
            None => return Err(PatternError::UnterminatedLiteral),
            Some('\'') => {
                if chars.get(i + 1) == Some(&'\'') {
                    out.push('\'');
                    i += 2;
                } else {
                    return Ok(i + 1);
                }
            }
            Some(c) => {
                out.push(*c);
                i += 1;
            }
        }
    }
}

fn render_token(dt: &NaiveDateTime, letter: char, run: usize) -> Result<String, PatternError> {
    let piece = match (letter, run) {
        ('y', 1) => dt.year().to_string(),
        ('y', 2) => format!("{:02}", dt.year().rem_euclid(100)),
        ('y', 3) | ('y', 4) => format!("{:04}", dt.year()),
        ('M', 1) => dt.month().to_string(),
        ('M', 2) => format!("{:02}", dt.month()),
        ('M', 3) => dt.format("%b").to_string(),
        ('M', 4) => dt.format("%B").to_string(),
        ('d', 1) => dt.day().to_string(),
        ('d', 2) => format!("{:02}", dt.day()),
        ('E', 1..=3) => dt.format("%a").to_string(),
        ('E', 4) => dt.format("%A").to_string(),
        ('H', 1) => dt.hour().to_string(),
        ('H', 2) => format!("{:02}", dt.hour()),
        ('h', 1) | ('h', 2) => {
            let h12 = match dt.hour() % 12 {
                0 => 12,
                h => h,
            };
            if run == 1 {
                h12.to_string()
            } else {
                format!("{:02}", h12)
            }
        }
        ('m', 1) => dt.minute().to_string(),
        ('m', 2) => format!("{:02}", dt.minute()),
        ('s', 1) => dt.second().to_string(),
        ('s', 2) => format!("{:02}", dt.second()),
        ('a', 1) => (if dt.hour() < 12 { "AM" } else { "PM" }).to_string(),
        _ => {
            return Err(PatternError::UnsupportedToken(
                std::iter::repeat(letter).take(run).collect(),
            ))
        }
    };
    Ok(piece)
}
