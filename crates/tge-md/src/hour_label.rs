//! Market hour labels and their canonical order.
//!
//! The operator names delivery hours `H01`..`H24`, with `H25` and a lettered
//! twin (`H02A`) appearing only around the autumn clock change. Labels do not
//! map 1:1 to wall-clock hours, so the only thing downstream code may rely on
//! is the **position** of a label after sorting with the order defined here.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Lowest and highest base numbers the market ever publishes.
pub const MIN_BASE: u8 = 1;
pub const MAX_BASE: u8 = 25;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HourLabelError {
    /// Text does not look like `[H]NN[X]`.
    Malformed(String),
    /// Two digits were present but outside `MIN_BASE..=MAX_BASE`.
    BaseOutOfRange { raw: String, base: u8 },
}

impl fmt::Display for HourLabelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HourLabelError::Malformed(raw) => {
                write!(f, "hour label '{raw}' does not match [H]NN[letter]")
            }
            HourLabelError::BaseOutOfRange { raw, base } => {
                write!(
                    f,
                    "hour label '{raw}' has base {base}, expected {MIN_BASE}..={MAX_BASE}"
                )
            }
        }
    }
}

impl std::error::Error for HourLabelError {}

// ---------------------------------------------------------------------------
// HourLabel
// ---------------------------------------------------------------------------

/// A delivery-hour identifier: two-digit base plus an optional letter suffix.
///
/// The suffix is stored uppercased so `h02a` and `H02A` are the same label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HourLabel {
    base: u8,
    suffix: Option<char>,
}

impl HourLabel {
    pub fn new(base: u8, suffix: Option<char>) -> Result<Self, HourLabelError> {
        let suffix = suffix.map(|c| c.to_ascii_uppercase());
        if !(MIN_BASE..=MAX_BASE).contains(&base) {
            return Err(HourLabelError::BaseOutOfRange {
                raw: render(base, suffix),
                base,
            });
        }
        if let Some(c) = suffix {
            if !c.is_ascii_alphabetic() {
                return Err(HourLabelError::Malformed(render(base, Some(c))));
            }
        }
        Ok(Self { base, suffix })
    }

    /// Parse `H01`, `h02a`, `02A` or `24`. Surrounding whitespace is ignored.
    pub fn parse(raw: &str) -> Result<Self, HourLabelError> {
        let t = raw.trim();
        let body = t
            .strip_prefix('H')
            .or_else(|| t.strip_prefix('h'))
            .unwrap_or(t);

        let bytes = body.as_bytes();
        let malformed = || HourLabelError::Malformed(raw.to_string());

        if !(bytes.len() == 2 || bytes.len() == 3) {
            return Err(malformed());
        }
        if !bytes[0].is_ascii_digit() || !bytes[1].is_ascii_digit() {
            return Err(malformed());
        }
        let base = (bytes[0] - b'0') * 10 + (bytes[1] - b'0');

        let suffix = match bytes.get(2) {
            None => None,
            Some(b) if b.is_ascii_alphabetic() => Some(*b as char),
            Some(_) => return Err(malformed()),
        };

        if !(MIN_BASE..=MAX_BASE).contains(&base) {
            return Err(HourLabelError::BaseOutOfRange {
                raw: raw.to_string(),
                base,
            });
        }

        Ok(Self {
            base,
            suffix: suffix.map(|c| c.to_ascii_uppercase()),
        })
    }

    pub fn is_suffixed(&self) -> bool {
        self.suffix.is_some()
    }

    /// The lettered twin of this label (`H02` -> `H02A`).
    pub fn repeated(&self) -> Self {
        Self {
            base: self.base,
            suffix: Some('A'),
        }
    }
}

/// Numeric base ascending; on equal base the plain label precedes the
/// suffixed one.
pub fn compare(a: &HourLabel, b: &HourLabel) -> Ordering {
    a.base
        .cmp(&b.base)
        .then_with(|| a.is_suffixed().cmp(&b.is_suffixed()))
        .then_with(|| a.suffix.cmp(&b.suffix))
}

impl Ord for HourLabel {
    fn cmp(&self, other: &Self) -> Ordering {
        compare(self, other)
    }
}

impl PartialOrd for HourLabel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl FromStr for HourLabel {
    type Err = HourLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for HourLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render(self.base, self.suffix))
    }
}

fn render(base: u8, suffix: Option<char>) -> String {
    match suffix {
        Some(c) => format!("H{base:02}{c}"),
        None => format!("H{base:02}"),
    }
}

/// Sort labels in place into canonical chronological order.
pub fn sort_labels(labels: &mut [HourLabel]) {
    labels.sort_by(compare);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
