//! Typed view of the merged configuration.

use anyhow::{bail, Context, Result};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use tge_md::hour_label::{MAX_BASE, MIN_BASE};
use tge_md::{HttpSourceOptions, RepeatedHourPolicy, ValidationBounds};

pub const DEFAULT_TIME_ZONE: &str = "Europe/Warsaw";
pub const DEFAULT_UNIT: &str = "PLN/MWh";
pub const DEFAULT_SOURCE_URL: &str = "https://wyniki.tge.pl/pl/wyniki/rdn/fixing-I/";
pub const DEFAULT_ARCHIVE_DIR: &str = "data/prices";

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36";
const DEFAULT_ACCEPT_LANGUAGE: &str = "pl-PL,pl;q=0.9,en-US;q=0.8";
const DEFAULT_REFERER: &str = "https://wyniki.tge.pl/";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Header fragments that identify the Fixing I price column, most specific first.
const DEFAULT_PRICE_COLUMN_CANDIDATES: &[&str] = &[
    "fixing i kurs",
    "fixing 1 kurs",
    "kurs fixing i",
    "kurs fixing 1",
    "fixing i",
    "fixing 1",
    "kurs jednolity",
    "kurs fix",
];

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub market: MarketSettings,
    pub source: SourceSettings,
    pub extraction: ExtractionSettings,
    pub validation: ValidationSettings,
    pub archive: ArchiveSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketSettings {
    /// IANA zone name the delivery day is defined in.
    pub time_zone: String,
    pub unit: String,
}

impl Default for MarketSettings {
    fn default() -> Self {
        Self {
            time_zone: DEFAULT_TIME_ZONE.to_string(),
            unit: DEFAULT_UNIT.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSettings {
    pub url: String,
    pub user_agent: String,
    pub accept_language: String,
    pub referer: Option<String>,
    pub timeout_secs: u64,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_SOURCE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept_language: DEFAULT_ACCEPT_LANGUAGE.to_string(),
            referer: Some(DEFAULT_REFERER.to_string()),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionSettings {
    pub price_column_candidates: Vec<String>,
    pub repeated_hour: RepeatedHourPolicy,
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            price_column_candidates: DEFAULT_PRICE_COLUMN_CANDIDATES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            repeated_hour: RepeatedHourPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationSettings {
    pub min_price: f64,
    pub max_price: f64,
    pub min_hours: usize,
    pub max_hours: usize,
}

impl Default for ValidationSettings {
    fn default() -> Self {
        let b = ValidationBounds::default();
        Self {
            min_price: b.min_price,
            max_price: b.max_price,
            min_hours: b.min_hours,
            max_hours: b.max_hours,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveSettings {
    pub dir: String,
}

impl Default for ArchiveSettings {
    fn default() -> Self {
        Self {
            dir: DEFAULT_ARCHIVE_DIR.to_string(),
        }
    }
}

impl Settings {
    /// Deserialize from a merged config document and validate.
    pub fn from_json(config_json: &Value) -> Result<Self> {
        let settings: Settings =
            serde_json::from_value(config_json.clone()).context("CONFIG_INVALID: settings shape")?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        self.time_zone()?;

        if self.market.unit.trim().is_empty() {
            bail!("CONFIG_INVALID: market.unit must not be empty");
        }
        if self.source.url.trim().is_empty() {
            bail!("CONFIG_INVALID: source.url must not be empty");
        }
        if self.source.timeout_secs == 0 {
            bail!("CONFIG_INVALID: source.timeout_secs must be > 0");
        }

        let v = &self.validation;
        if !v.min_price.is_finite() || !v.max_price.is_finite() {
            bail!("CONFIG_INVALID: validation price bounds must be finite");
        }
        if v.min_price > v.max_price {
            bail!(
                "CONFIG_INVALID: validation.min_price {} > validation.max_price {}",
                v.min_price,
                v.max_price
            );
        }
        let hour_range = MIN_BASE as usize..=MAX_BASE as usize;
        if !hour_range.contains(&v.min_hours) || !hour_range.contains(&v.max_hours) {
            bail!(
                "CONFIG_INVALID: validation hour bounds must lie in [{}, {}]",
                hour_range.start(),
                hour_range.end()
            );
        }
        if v.min_hours > v.max_hours {
            bail!(
                "CONFIG_INVALID: validation.min_hours {} > validation.max_hours {}",
                v.min_hours,
                v.max_hours
            );
        }

        if !self
            .extraction
            .price_column_candidates
            .iter()
            .any(|c| !c.trim().is_empty())
        {
            bail!("CONFIG_INVALID: extraction.price_column_candidates needs at least one entry");
        }

        if self.archive.dir.trim().is_empty() {
            bail!("CONFIG_INVALID: archive.dir must not be empty");
        }
        Ok(())
    }

    pub fn time_zone(&self) -> Result<Tz> {
        self.market
            .time_zone
            .parse::<Tz>()
            .map_err(|e| anyhow::anyhow!("CONFIG_INVALID: market.time_zone: {e}"))
    }

    pub fn validation_bounds(&self) -> ValidationBounds {
        ValidationBounds {
            min_hours: self.validation.min_hours,
            max_hours: self.validation.max_hours,
            min_price: self.validation.min_price,
            max_price: self.validation.max_price,
        }
    }

    pub fn http_options(&self) -> HttpSourceOptions {
        HttpSourceOptions {
            user_agent: self.source.user_agent.clone(),
            accept_language: self.source.accept_language.clone(),
            referer: self.source.referer.clone(),
            timeout: Duration::from_secs(self.source.timeout_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_document_is_all_defaults() {
        let s = Settings::from_json(&json!({})).unwrap();
        assert_eq!(s, Settings::default());
        assert_eq!(s.time_zone().unwrap(), chrono_tz::Europe::Warsaw);
        assert_eq!(s.validation_bounds(), ValidationBounds::default());
        assert_eq!(s.extraction.price_column_candidates.len(), 8);
        assert_eq!(s.http_options().timeout, Duration::from_secs(60));
    }

    #[test]
    fn unknown_zone_is_rejected() {
        let err = Settings::from_json(&json!({"market": {"time_zone": "Europe/Atlantis"}})).unwrap_err();
        assert!(err.to_string().contains("market.time_zone"));
    }

    #[test]
    fn inverted_bounds_are_rejected() {
        assert!(Settings::from_json(&json!({"validation": {"min_price": 10.0, "max_price": 1.0}})).is_err());
        assert!(Settings::from_json(&json!({"validation": {"min_hours": 25, "max_hours": 23}})).is_err());
        assert!(Settings::from_json(&json!({"validation": {"max_hours": 26}})).is_err());
    }

    #[test]
    fn repeated_hour_policy_is_lowercase() {
        let s = Settings::from_json(&json!({"extraction": {"repeated_hour": "reject"}})).unwrap();
        assert_eq!(s.extraction.repeated_hour, RepeatedHourPolicy::Reject);
        assert!(Settings::from_json(&json!({"extraction": {"repeated_hour": "maybe"}})).is_err());
    }

    #[test]
    fn blank_candidates_are_rejected() {
        assert!(Settings::from_json(&json!({"extraction": {"price_column_candidates": ["  "]}})).is_err());
    }
}
