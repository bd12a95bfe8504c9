//! Wire types of the archive: one record file per delivery date plus the
//! index. Field order and text formats here are the published format.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use tge_md::PriceSeries;

/// `YYYY-MM-DDTHH:MM:SSZ`, UTC, no fractional seconds.
pub const UTC_STAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

pub fn utc_stamp(at: DateTime<Utc>) -> String {
    at.format(UTC_STAMP_FORMAT).to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceEntry {
    /// `YYYY-MM-DD HH:MM:SS±HH:MM`
    pub time: String,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveRecord {
    pub date: NaiveDate,
    pub scraped_at: String,
    pub unit: String,
    pub prices: Vec<PriceEntry>,
}

impl ArchiveRecord {
    pub fn from_series(series: &PriceSeries, unit: &str, retrieved_at: DateTime<Utc>) -> Self {
        Self {
            date: series.delivery_date(),
            scraped_at: utc_stamp(retrieved_at),
            unit: unit.to_string(),
            prices: series
                .points()
                .iter()
                .map(|p| PriceEntry {
                    time: p.timestamp_text(),
                    price: p.price(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveIndex {
    /// Ascending, no duplicates.
    pub dates: Vec<NaiveDate>,
    pub latest: NaiveDate,
    pub updated_at: String,
}

impl ArchiveIndex {
    /// Index over exactly `dates`, or `None` when there are none.
    pub fn from_dates(dates: BTreeSet<NaiveDate>, now: DateTime<Utc>) -> Option<Self> {
        let latest = *dates.iter().next_back()?;
        Some(Self {
            dates: dates.into_iter().collect(),
            latest,
            updated_at: utc_stamp(now),
        })
    }
}
