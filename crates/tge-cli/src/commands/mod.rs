//! Command handler modules for tge-cli.
//!
//! Shared utilities used by multiple command paths live here.
//! Command-specific logic lives in the submodules.

pub mod archive;
pub mod scrape;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use tracing::info;

use tge_config::{load_layered_yaml, report_unused_keys, Settings, UnusedKeyPolicy};

/// Env var naming the delivery date when `--date` is not given.
pub const ENV_DELIVERY_DATE: &str = "DELIVERY_DATE";

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Load layered config (none given means all defaults), warn about unused
/// keys, and return validated settings plus the config hash.
pub fn load_settings(config_paths: &[String]) -> Result<(Settings, String)> {
    let path_refs: Vec<&str> = config_paths.iter().map(|s| s.as_str()).collect();
    let loaded = load_layered_yaml(&path_refs)?;
    report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Warn)?;
    let settings = loaded.settings()?;
    info!(config_hash = %loaded.config_hash, layers = config_paths.len(), "config loaded");
    Ok((settings, loaded.config_hash))
}

/// Strict `YYYY-MM-DD`.
pub fn parse_delivery_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .with_context(|| format!("invalid delivery date '{raw}': expected YYYY-MM-DD"))
}

/// `--date` wins, then a non-blank `DELIVERY_DATE`, else tomorrow as seen on
/// the market's wall clock at `now`.
pub fn resolve_delivery_date(
    flag: Option<&str>,
    env_value: Option<&str>,
    zone: Tz,
    now: DateTime<Utc>,
) -> Result<NaiveDate> {
    if let Some(raw) = flag {
        return parse_delivery_date(raw);
    }
    if let Some(raw) = env_value.filter(|v| !v.trim().is_empty()) {
        return parse_delivery_date(raw)
            .with_context(|| format!("{ENV_DELIVERY_DATE} is malformed"));
    }
    now.with_timezone(&zone)
        .date_naive()
        .succ_opt()
        .context("delivery date out of calendar range")
}
