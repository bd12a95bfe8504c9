//! tge-archive
//!
//! Append-only dated archive of price series: `<dir>/YYYY-MM-DD.json` per
//! delivery date plus `<dir>/index.json`.
//!
//! Rules:
//! - a record is written at most once; a second write for the same date is a
//!   no-op reported as [`WriteOutcome::Skipped`], even if the prices differ
//! - the index is derived from the record files present, never patched, so
//!   a stale or corrupt index is replaced rather than trusted
//! - a skipped write repairs an index that is missing, unreadable or does
//!   not list the date
//!
//! Skip-if-exists is what makes repeated or concurrent invocations safe
//! without locks: record files are linked into place with create-new
//! semantics, so only one writer can take a date from absent to present.

mod fs_store;
mod memory;
mod record;

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use tracing::warn;

use tge_md::PriceSeries;

pub use fs_store::FsArchive;
pub use memory::MemoryArchive;
pub use record::{utc_stamp, ArchiveIndex, ArchiveRecord, PriceEntry, UTC_STAMP_FORMAT};

/// File name of the index inside the archive directory.
pub const INDEX_FILE: &str = "index.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    Skipped,
}

impl WriteOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            WriteOutcome::Written => "written",
            WriteOutcome::Skipped => "skipped",
        }
    }
}

/// Storage contract for the archive. Passed explicitly into the pipeline so
/// tests can substitute [`MemoryArchive`] or a temp-dir [`FsArchive`].
pub trait ArchiveStore {
    fn has(&self, delivery_date: NaiveDate) -> bool;

    /// Persist `series` for `delivery_date` unless a record already exists.
    ///
    /// `delivery_date` must equal `series.delivery_date()`.
    fn write(
        &mut self,
        delivery_date: NaiveDate,
        series: &PriceSeries,
        retrieved_at: DateTime<Utc>,
    ) -> Result<WriteOutcome>;

    fn read_record(&self, delivery_date: NaiveDate) -> Result<Option<ArchiveRecord>>;

    fn read_index(&self) -> Result<Option<ArchiveIndex>>;

    /// Regenerate the index from the records actually present.
    /// Returns `None` (and writes nothing) when the archive is empty.
    fn rebuild_index(&mut self, now: DateTime<Utc>) -> Result<Option<ArchiveIndex>>;

    /// Rebuild the index unless it already lists `delivery_date`.
    ///
    /// An index that cannot be read counts as missing. Returns `true` when
    /// the index was rewritten.
    fn repair_index(&mut self, delivery_date: NaiveDate, now: DateTime<Utc>) -> Result<bool> {
        let current = match self.read_index() {
            Ok(ix) => ix,
            Err(e) => {
                warn!(error = %format!("{e:#}"), "index unreadable, rebuilding");
                None
            }
        };
        if current.is_some_and(|ix| ix.dates.contains(&delivery_date)) {
            return Ok(false);
        }
        Ok(self.rebuild_index(now)?.is_some())
    }
}

fn ensure_same_date(delivery_date: NaiveDate, series: &PriceSeries) -> Result<()> {
    if series.delivery_date() != delivery_date {
        anyhow::bail!(
            "ARCHIVE_DATE_MISMATCH: write for {} given a series for {}",
            delivery_date,
            series.delivery_date()
        );
    }
    Ok(())
}
