//! In-process fetch-to-archive runs.
//!
//! GREEN when:
//! - a normal day lands in the archive as 24 ordered prices with `+01:00`
//! - an already archived date short-circuits before any fetch, restoring
//!   the date to an index that lost it
//! - validation failures and unpublished dates write nothing
//! - a fall-back day with a repeated hour archives 25 entries

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use std::cell::Cell;
use std::fs;
use std::path::PathBuf;

use tge_archive::{ArchiveStore, FsArchive, MemoryArchive, WriteOutcome};
use tge_cli::commands::scrape::run_scrape;
use tge_config::Settings;
use tge_md::{PageSource, SourceError};

/// Serves fixed markup and counts how often it was asked.
struct FixedPage {
    html: String,
    fetches: Cell<usize>,
}

impl FixedPage {
    fn new(html: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            fetches: Cell::new(0),
        }
    }
}

impl PageSource for FixedPage {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn fetch_page(&self, _url: &str) -> Result<String, SourceError> {
        self.fetches.set(self.fetches.get() + 1);
        Ok(self.html.clone())
    }
}

fn fixture() -> String {
    let p = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/fixing_i_2026-02-28.html");
    fs::read_to_string(p).unwrap()
}

fn page(date: &str, rows: &[(&str, String)]) -> String {
    let mut html = String::from("<table><tr><th>Instrument</th><th>Kurs fixing I</th></tr>");
    for (label, price) in rows {
        html.push_str(&format!("<tr><td>{date}_{label}</td><td>{price}</td></tr>"));
    }
    html.push_str("</table>");
    html
}

fn d(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 2, 27, 11, 15, 0).unwrap()
}

// ---------------------------------------------------------------------------
// Normal day
// ---------------------------------------------------------------------------

#[test]
fn normal_day_is_archived_in_hour_order() {
    let tmp = tempfile::tempdir().unwrap();
    let mut store = FsArchive::new(tmp.path(), "PLN/MWh");
    let source = FixedPage::new(fixture());

    let report = run_scrape(&Settings::default(), d("2026-02-28"), &source, &mut store, now()).unwrap();
    assert!(report.written());
    assert!(report.diagnostics.is_empty());
    assert_eq!(report.summary.unwrap().count, 24);

    let rec = store.read_record(d("2026-02-28")).unwrap().unwrap();
    assert_eq!(rec.unit, "PLN/MWh");
    assert_eq!(rec.scraped_at, "2026-02-27T11:15:00Z");
    assert_eq!(rec.prices.len(), 24);
    assert_eq!(rec.prices[0].time, "2026-02-28 00:00:00+01:00");
    assert_eq!(rec.prices[0].price, 307.25);
    assert_eq!(rec.prices[23].time, "2026-02-28 23:00:00+01:00");
    assert_eq!(rec.prices[23].price, 474.0);
    assert!(rec.prices.windows(2).all(|w| w[0].price < w[1].price));

    let ix = store.read_index().unwrap().unwrap();
    assert_eq!(ix.dates, vec![d("2026-02-28")]);
    assert_eq!(ix.latest, d("2026-02-28"));
}

#[test]
fn archived_date_short_circuits_before_fetch() {
    let mut store = MemoryArchive::new("PLN/MWh");
    let first = FixedPage::new(fixture());
    run_scrape(&Settings::default(), d("2026-02-28"), &first, &mut store, now()).unwrap();
    assert_eq!(first.fetches.get(), 1);

    let second = FixedPage::new("<html>changed</html>");
    let report = run_scrape(&Settings::default(), d("2026-02-28"), &second, &mut store, now()).unwrap();
    assert_eq!(report.outcome, WriteOutcome::Skipped);
    assert!(report.summary.is_none());
    assert_eq!(second.fetches.get(), 0);
}

#[test]
fn archived_date_missing_from_index_is_reindexed_without_fetch() {
    let tmp = tempfile::tempdir().unwrap();
    let mut store = FsArchive::new(tmp.path(), "PLN/MWh");
    run_scrape(&Settings::default(), d("2026-02-28"), &FixedPage::new(fixture()), &mut store, now()).unwrap();
    fs::write(store.index_path(), "{").unwrap();

    let second = FixedPage::new("<html>changed</html>");
    let report = run_scrape(&Settings::default(), d("2026-02-28"), &second, &mut store, now()).unwrap();
    assert_eq!(report.outcome, WriteOutcome::Skipped);
    assert_eq!(second.fetches.get(), 0);
    assert_eq!(store.read_index().unwrap().unwrap().dates, vec![d("2026-02-28")]);
}

// ---------------------------------------------------------------------------
// Failures write nothing
// ---------------------------------------------------------------------------

#[test]
fn unpublished_date_is_an_error() {
    let mut store = MemoryArchive::new("PLN/MWh");
    let source = FixedPage::new(fixture());
    let err = run_scrape(&Settings::default(), d("2026-03-01"), &source, &mut store, now()).unwrap_err();
    assert!(format!("{err:#}").contains("NO_DATA"));
    assert!(store.is_empty());
    assert!(store.read_index().unwrap().is_none());
}

#[test]
fn out_of_range_price_fails_validation() {
    let mut rows: Vec<(String, String)> = (1..=24).map(|h| (format!("H{h:02}"), "250,00".to_string())).collect();
    rows[7].1 = "12 500,00".to_string();
    let rows: Vec<(&str, String)> = rows.iter().map(|(l, p)| (l.as_str(), p.clone())).collect();

    let mut store = MemoryArchive::new("PLN/MWh");
    let source = FixedPage::new(page("2026-02-28", &rows));
    let err = run_scrape(&Settings::default(), d("2026-02-28"), &source, &mut store, now()).unwrap_err();
    let msg = format!("{err:#}");
    assert!(msg.contains("VALIDATION_FAILED"), "got: {msg}");
    assert!(msg.contains("12500"), "got: {msg}");
    assert!(store.is_empty());
}

#[test]
fn page_without_price_column_is_structural_error() {
    let mut store = MemoryArchive::new("PLN/MWh");
    let source = FixedPage::new("<table><tr><th>Godzina</th><th>Cena</th></tr></table>");
    let err = run_scrape(&Settings::default(), d("2026-02-28"), &source, &mut store, now()).unwrap_err();
    assert!(format!("{err:#}").contains("EXTRACT_FAILED"));
    assert!(store.is_empty());
}

// ---------------------------------------------------------------------------
// DST
// ---------------------------------------------------------------------------

#[test]
fn fall_back_day_archives_twenty_five_entries() {
    let mut rows: Vec<(String, String)> = (1..=24).map(|h| (format!("H{h:02}"), format!("{h},00"))).collect();
    rows.insert(2, ("H02A".to_string(), "2,50".to_string()));
    let rows: Vec<(&str, String)> = rows.iter().map(|(l, p)| (l.as_str(), p.clone())).collect();

    let mut store = MemoryArchive::new("PLN/MWh");
    let source = FixedPage::new(page("2026-10-25", &rows));
    run_scrape(&Settings::default(), d("2026-10-25"), &source, &mut store, now()).unwrap();

    let rec = store.read_record(d("2026-10-25")).unwrap().unwrap();
    let times: Vec<&str> = rec.prices.iter().map(|p| p.time.as_str()).collect();
    assert_eq!(times.len(), 25);
    assert_eq!(times[2], "2026-10-25 02:00:00+02:00");
    assert_eq!(times[3], "2026-10-25 02:00:00+01:00");
    assert_eq!(times[24], "2026-10-25 23:00:00+01:00");
    // Prices map to instants by position in the sorted label order.
    assert_eq!(rec.prices[2].price, 2.5);
    assert_eq!(rec.prices[3].price, 3.0);
}
