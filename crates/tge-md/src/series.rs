//! Timestamped price series construction.
//!
//! Ordinal position `i` in the sorted label list means "`i` elapsed hours
//! after local midnight of the delivery date". Elapsed hours are counted on
//! the UTC clock and each instant is converted back to the market zone on
//! its own, which yields the right wall-clock time and offset on 23-, 24- and
//! 25-hour days without any code that knows which kind of day it is.
//!
//! Pure logic. No IO, no wall-clock reads.

use std::fmt;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Textual form of a local timestamp: `YYYY-MM-DD HH:MM:SS±HH:MM`.
pub const LOCAL_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%:z";

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeriesError {
    /// Local midnight of the delivery date falls in a DST gap of the zone.
    MidnightNotRepresentable { date: NaiveDate, zone: String },
}

impl fmt::Display for SeriesError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeriesError::MidnightNotRepresentable { date, zone } => {
                write!(f, "local midnight of {date} does not exist in zone {zone}")
            }
        }
    }
}

impl std::error::Error for SeriesError {}

// ---------------------------------------------------------------------------
// PricePoint / PriceSeries
// ---------------------------------------------------------------------------

/// One delivery hour: local wall-clock start with its UTC offset, and price.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    local_time: DateTime<FixedOffset>,
    price: f64,
}

impl PricePoint {
    pub fn new(local_time: DateTime<FixedOffset>, price: f64) -> Self {
        Self { local_time, price }
    }

    pub fn local_time(&self) -> DateTime<FixedOffset> {
        self.local_time
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    /// `YYYY-MM-DD HH:MM:SS±HH:MM`, sign and minutes always present.
    pub fn timestamp_text(&self) -> String {
        self.local_time.format(LOCAL_TIMESTAMP_FORMAT).to_string()
    }
}

/// Hourly prices for one delivery date, in ordinal order.
///
/// Built once by [`build_series`]; there are no mutating accessors.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    delivery_date: NaiveDate,
    points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn delivery_date(&self) -> NaiveDate {
        self.delivery_date
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn prices(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|p| p.price)
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Map ordinal positions to local timestamps and pair them with `prices`.
///
/// `prices` must already be in canonical hour-label order. The length is not
/// checked here; count bounds belong to the validator.
pub fn build_series(
    delivery_date: NaiveDate,
    zone: Tz,
    prices: &[f64],
) -> Result<PriceSeries, SeriesError> {
    let midnight_utc = local_midnight_utc(delivery_date, zone)?;

    let points = prices
        .iter()
        .enumerate()
        .map(|(ordinal, &price)| {
            let instant = midnight_utc + Duration::hours(ordinal as i64);
            PricePoint::new(instant.with_timezone(&zone).fixed_offset(), price)
        })
        .collect();

    Ok(PriceSeries {
        delivery_date,
        points,
    })
}

/// Absolute instant of `date 00:00:00` in `zone`.
///
/// If midnight is ambiguous the earlier instant starts the day.
fn local_midnight_utc(date: NaiveDate, zone: Tz) -> Result<DateTime<Utc>, SeriesError> {
    let naive = date.and_time(NaiveTime::MIN);
    zone.from_local_datetime(&naive)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(|| SeriesError::MidnightNotRepresentable {
            date,
            zone: zone.name().to_string(),
        })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Europe::Warsaw;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn texts(series: &PriceSeries) -> Vec<String> {
        series.points().iter().map(|p| p.timestamp_text()).collect()
    }

    #[test]
    fn winter_day_is_plus_one() {
        let s = build_series(date(2026, 2, 28), Warsaw, &[1.0; 24]).unwrap();
        let t = texts(&s);
        assert_eq!(t[0], "2026-02-28 00:00:00+01:00");
        assert_eq!(t[23], "2026-02-28 23:00:00+01:00");
        assert!(t.iter().all(|x| x.ends_with("+01:00")));
    }

    #[test]
    fn summer_day_is_plus_two() {
        let s = build_series(date(2026, 7, 15), Warsaw, &[1.0; 24]).unwrap();
        let t = texts(&s);
        assert_eq!(t[0], "2026-07-15 00:00:00+02:00");
        assert_eq!(t[23], "2026-07-15 23:00:00+02:00");
        assert!(t.iter().all(|x| x.ends_with("+02:00")));
    }

    #[test]
    fn prices_follow_ordinals() {
        let prices: Vec<f64> = (0..24).map(|i| i as f64 * 10.0).collect();
        let s = build_series(date(2026, 2, 28), Warsaw, &prices).unwrap();
        assert_eq!(s.prices().collect::<Vec<_>>(), prices);
        assert_eq!(s.delivery_date(), date(2026, 2, 28));
    }

    #[test]
    fn fall_back_repeats_two_oclock_with_both_offsets() {
        let s = build_series(date(2026, 10, 25), Warsaw, &[1.0; 25]).unwrap();
        let t = texts(&s);
        assert_eq!(t[1], "2026-10-25 01:00:00+02:00");
        assert_eq!(t[2], "2026-10-25 02:00:00+02:00");
        assert_eq!(t[3], "2026-10-25 02:00:00+01:00");
        assert_eq!(t[24], "2026-10-25 23:00:00+01:00");
        assert!(s
            .points()
            .iter()
            .all(|p| p.local_time().date_naive() == date(2026, 10, 25)));
    }

    #[test]
    fn spring_forward_skips_two_oclock() {
        let s = build_series(date(2026, 3, 29), Warsaw, &[1.0; 23]).unwrap();
        let t = texts(&s);
        assert_eq!(t[1], "2026-03-29 01:00:00+01:00");
        assert_eq!(t[2], "2026-03-29 03:00:00+02:00");
        assert_eq!(t[22], "2026-03-29 23:00:00+02:00");
        assert!(!t.iter().any(|x| x.contains(" 02:00:00")));
    }

    #[test]
    fn consecutive_points_are_one_hour_apart() {
        for (d, n) in [(date(2026, 3, 29), 23), (date(2026, 10, 25), 25)] {
            let s = build_series(d, Warsaw, &vec![0.0; n]).unwrap();
            for w in s.points().windows(2) {
                let gap = w[1].local_time() - w[0].local_time();
                assert_eq!(gap, Duration::hours(1));
            }
        }
    }

    #[test]
    fn empty_input_builds_empty_series() {
        let s = build_series(date(2026, 2, 28), Warsaw, &[]).unwrap();
        assert!(s.is_empty());
    }

    #[test]
    fn midnight_in_gap_is_reported() {
        // Sao Paulo started DST at local midnight on 2018-11-04.
        let err = build_series(date(2018, 11, 4), chrono_tz::America::Sao_Paulo, &[1.0])
            .unwrap_err();
        assert!(matches!(err, SeriesError::MidnightNotRepresentable { .. }));
    }
}
