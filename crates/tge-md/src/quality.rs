//! Sanity gate for an assembled [`PriceSeries`].
//!
//! A series must pass every check here before anything is archived:
//! - hour count within bounds (23..=25 by default)
//! - every local timestamp on the delivery date
//! - every price within an inclusive band (-500..=10 000 by default)
//!
//! The gate never mutates the series. On success it returns a
//! [`SeriesSummary`] and logs it as one line.

use std::fmt;

use chrono::NaiveDate;
use tracing::info;

use crate::series::PriceSeries;

pub const DEFAULT_MIN_HOURS: usize = 23;
pub const DEFAULT_MAX_HOURS: usize = 25;
pub const DEFAULT_MIN_PRICE: f64 = -500.0;
pub const DEFAULT_MAX_PRICE: f64 = 10_000.0;

// ---------------------------------------------------------------------------
// Bounds
// ---------------------------------------------------------------------------

/// Inclusive limits applied by [`validate_series`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidationBounds {
    pub min_hours: usize,
    pub max_hours: usize,
    pub min_price: f64,
    pub max_price: f64,
}

impl Default for ValidationBounds {
    fn default() -> Self {
        Self {
            min_hours: DEFAULT_MIN_HOURS,
            max_hours: DEFAULT_MAX_HOURS,
            min_price: DEFAULT_MIN_PRICE,
            max_price: DEFAULT_MAX_PRICE,
        }
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Too few or too many hours: wrong table, DST miscount or a format change.
    HourCount {
        count: usize,
        min: usize,
        max: usize,
    },
    /// A point's local date differs from the delivery date.
    DateMismatch {
        ordinal: usize,
        timestamp: String,
        expected: NaiveDate,
    },
    /// A price outside the band (or not finite).
    PriceOutOfRange {
        ordinal: usize,
        timestamp: String,
        price: f64,
        min: f64,
        max: f64,
    },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::HourCount { count, min, max } => write!(
                f,
                "unexpected hour count {count} (expected {min}..={max}); \
                 wrong table, DST miscount or upstream format change"
            ),
            ValidationError::DateMismatch {
                ordinal,
                timestamp,
                expected,
            } => write!(
                f,
                "point {ordinal} has timestamp '{timestamp}', expected date {expected}"
            ),
            ValidationError::PriceOutOfRange {
                ordinal,
                timestamp,
                price,
                min,
                max,
            } => write!(
                f,
                "price {price} at point {ordinal} ('{timestamp}') outside [{min}, {max}]"
            ),
        }
    }
}

impl std::error::Error for ValidationError {}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesSummary {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

impl fmt::Display for SeriesSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} hours | min={:.2} max={:.2} mean={:.2}",
            self.count, self.min, self.max, self.mean
        )
    }
}

// ---------------------------------------------------------------------------
// Main entry point
// ---------------------------------------------------------------------------

/// Check `series` against `delivery_date` and `bounds`.
///
/// Checks run in order: count, then per point date then price. The first
/// failure is returned.
pub fn validate_series(
    series: &PriceSeries,
    delivery_date: NaiveDate,
    bounds: &ValidationBounds,
) -> Result<SeriesSummary, ValidationError> {
    let count = series.len();
    if count < bounds.min_hours || count > bounds.max_hours {
        return Err(ValidationError::HourCount {
            count,
            min: bounds.min_hours,
            max: bounds.max_hours,
        });
    }

    for (ordinal, point) in series.points().iter().enumerate() {
        if point.local_time().date_naive() != delivery_date {
            return Err(ValidationError::DateMismatch {
                ordinal,
                timestamp: point.timestamp_text(),
                expected: delivery_date,
            });
        }

        let price = point.price();
        // NaN fails both comparisons, so it lands here too.
        if !(price >= bounds.min_price && price <= bounds.max_price) {
            return Err(ValidationError::PriceOutOfRange {
                ordinal,
                timestamp: point.timestamp_text(),
                price,
                min: bounds.min_price,
                max: bounds.max_price,
            });
        }
    }

    let summary = summarize(series);
    info!(date = %delivery_date, "validation ok: {summary}");
    Ok(summary)
}

fn summarize(series: &PriceSeries) -> SeriesSummary {
    let count = series.len();
    let (min, max, sum) = series.prices().fold(
        (f64::INFINITY, f64::NEG_INFINITY, 0.0),
        |(lo, hi, sum), p| (lo.min(p), hi.max(p), sum + p),
    );
    SeriesSummary {
        count,
        min,
        max,
        mean: sum / count as f64,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
