//! Locale-aware parsing of published price cells.
//!
//! The operator renders prices for a Polish audience, so the same value can
//! arrive as `"312,50"`, `"1 234,56"`, `"1.234,56"` or plain `"312.50"`.
//! This module turns one cell into a number, an explicit "no value" marker,
//! or a [`PriceTextError`] that the caller records and skips.
//!
//! It does **not**:
//! - know which hour a cell belongs to (see `assemble.rs`)
//! - apply sanity bounds (see `quality.rs`)

use std::fmt;

/// Tokens the operator uses for "no price yet", compared case-insensitively.
const NO_VALUE_TOKENS: &[&str] = &["n/a", "brak"];

/// Dash glyphs that stand in for an empty cell.
const DASHES: &[&str] = &["-", "\u{2013}", "\u{2014}"];

/// Space-like characters folded to an ASCII space before anything else.
const SPACE_LIKE: &[char] = &['\u{00a0}', '\u{202f}', '\u{2007}', '\u{2009}'];

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// A non-empty cell whose text is not a number in any accepted layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceTextError {
    /// The cell text exactly as received.
    pub raw: String,
}

impl fmt::Display for PriceTextError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "price text could not be parsed: '{}'", self.raw)
    }
}

impl std::error::Error for PriceTextError {}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse one price cell.
///
/// Returns:
/// - `Ok(Some(v))` for a finite number,
/// - `Ok(None)` when the cell is empty, a dash, or a "no value" token,
/// - `Err(_)` when non-empty text is not a number.
///
/// Separator rules:
/// - spaces are thousands separators and are dropped,
/// - with both `,` and `.` present, `.` groups thousands and `,` is decimal,
/// - a lone `,` is the decimal separator,
/// - a lone `.` (or neither) is left as is.
pub fn parse_price_text(raw: &str) -> Result<Option<f64>, PriceTextError> {
    let folded: String = raw
        .chars()
        .map(|c| if SPACE_LIKE.contains(&c) { ' ' } else { c })
        .collect();
    let text = folded.trim();

    if is_absent_marker(text) {
        return Ok(None);
    }

    let mut compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();

    if compact.contains(',') && compact.contains('.') {
        compact = compact.replace('.', "").replace(',', ".");
    } else if compact.contains(',') {
        compact = compact.replace(',', ".");
    }

    // Rust's float grammar also accepts "NaN" and "inf"; neither is a price.
    match compact.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(Some(v)),
        _ => Err(PriceTextError {
            raw: raw.to_string(),
        }),
    }
}

fn is_absent_marker(text: &str) -> bool {
    if text.is_empty() || DASHES.contains(&text) {
        return true;
    }
    let lower = text.to_lowercase();
    NO_VALUE_TOKENS.contains(&lower.as_str())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
