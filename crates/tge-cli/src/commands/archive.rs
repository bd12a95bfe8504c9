//! `tge-cli archive status|reindex`.

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use tracing::{info, warn};

use tge_archive::{ArchiveIndex, ArchiveStore, FsArchive};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveStatus {
    pub records: usize,
    pub index: Option<ArchiveIndex>,
    /// Record dates missing from the index, or listed but without a file.
    pub drift: Vec<NaiveDate>,
}

impl ArchiveStatus {
    pub fn in_sync(&self) -> bool {
        self.drift.is_empty()
    }
}

pub fn archive_status(archive: &FsArchive) -> Result<ArchiveStatus> {
    let on_disk = archive.record_dates()?;
    let index = archive.read_index()?;

    let listed: Vec<NaiveDate> = index.as_ref().map(|ix| ix.dates.clone()).unwrap_or_default();
    let mut drift: Vec<NaiveDate> = on_disk
        .iter()
        .filter(|d| !listed.contains(d))
        .chain(listed.iter().filter(|d| !on_disk.contains(d)))
        .copied()
        .collect();
    drift.sort();
    drift.dedup();

    if !drift.is_empty() {
        warn!(dir = %archive.dir().display(), drift = drift.len(), "index out of sync with records");
    }

    Ok(ArchiveStatus {
        records: on_disk.len(),
        index,
        drift,
    })
}

pub fn archive_reindex(archive: &mut dyn ArchiveStore, now: DateTime<Utc>) -> Result<Option<ArchiveIndex>> {
    let index = archive.rebuild_index(now)?;
    match &index {
        Some(ix) => info!(dates = ix.dates.len(), latest = %ix.latest, "index rebuilt"),
        None => info!("archive empty, nothing to index"),
    }
    Ok(index)
}
