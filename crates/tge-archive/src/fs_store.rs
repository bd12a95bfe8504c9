use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::BTreeSet;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::info;

use tge_md::PriceSeries;

use crate::record::{ArchiveIndex, ArchiveRecord};
use crate::{ensure_same_date, ArchiveStore, WriteOutcome, INDEX_FILE};

/// Archive on the local filesystem.
#[derive(Debug, Clone)]
pub struct FsArchive {
    dir: PathBuf,
    unit: String,
}

impl FsArchive {
    pub fn new(dir: impl Into<PathBuf>, unit: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            unit: unit.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn record_path(&self, delivery_date: NaiveDate) -> PathBuf {
        self.dir.join(format!("{}.json", delivery_date.format("%Y-%m-%d")))
    }

    pub fn index_path(&self) -> PathBuf {
        self.dir.join(INDEX_FILE)
    }

    /// Delivery dates that have a record file, ascending.
    pub fn record_dates(&self) -> Result<BTreeSet<NaiveDate>> {
        let mut out = BTreeSet::new();
        let entries = match fs::read_dir(&self.dir) {
            Ok(e) => e,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(out),
            Err(e) => {
                return Err(e).with_context(|| format!("read archive dir failed: {}", self.dir.display()))
            }
        };

        for entry in entries {
            let entry = entry.with_context(|| format!("read archive dir failed: {}", self.dir.display()))?;
            let name = entry.file_name();
            let Some(stem) = name.to_str().and_then(|n| n.strip_suffix(".json")) else {
                continue;
            };
            if let Ok(d) = NaiveDate::parse_from_str(stem, "%Y-%m-%d") {
                out.insert(d);
            }
        }
        Ok(out)
    }

    fn write_index(&self, index: &ArchiveIndex) -> Result<()> {
        let json = serde_json::to_string_pretty(index).context("serialize index failed")?;
        let path = self.index_path();
        let tmp = self.tmp_path(INDEX_FILE);
        fs::write(&tmp, json).with_context(|| format!("write index tmp failed: {}", tmp.display()))?;
        fs::rename(&tmp, &path).with_context(|| format!("replace index failed: {}", path.display()))?;
        info!(path = %path.display(), latest = %index.latest, dates = index.dates.len(), "index updated");
        Ok(())
    }

    fn tmp_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!(".{name}.tmp-{}", std::process::id()))
    }
}

impl ArchiveStore for FsArchive {
    fn has(&self, delivery_date: NaiveDate) -> bool {
        self.record_path(delivery_date).exists()
    }

    fn write(
        &mut self,
        delivery_date: NaiveDate,
        series: &PriceSeries,
        retrieved_at: DateTime<Utc>,
    ) -> Result<WriteOutcome> {
        ensure_same_date(delivery_date, series)?;

        let path = self.record_path(delivery_date);
        if path.exists() {
            info!(path = %path.display(), "record already archived, skipping");
            self.repair_index(delivery_date, retrieved_at)?;
            return Ok(WriteOutcome::Skipped);
        }

        fs::create_dir_all(&self.dir)
            .with_context(|| format!("create archive dir failed: {}", self.dir.display()))?;

        let record = ArchiveRecord::from_series(series, &self.unit, retrieved_at);
        let json = serde_json::to_string_pretty(&record).context("serialize record failed")?;

        // Full content goes to a private file first, then is linked into
        // place. hard_link refuses an existing target, so a concurrent
        // writer that got there first wins and this one skips.
        let file_name = format!("{}.json", delivery_date.format("%Y-%m-%d"));
        let tmp = self.tmp_path(&file_name);
        {
            let mut f = fs::File::create(&tmp)
                .with_context(|| format!("create record tmp failed: {}", tmp.display()))?;
            f.write_all(json.as_bytes())
                .with_context(|| format!("write record tmp failed: {}", tmp.display()))?;
            f.sync_all()
                .with_context(|| format!("sync record tmp failed: {}", tmp.display()))?;
        }

        let linked = fs::hard_link(&tmp, &path);
        let _ = fs::remove_file(&tmp);
        match linked {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                info!(path = %path.display(), "record appeared concurrently, skipping");
                self.repair_index(delivery_date, retrieved_at)?;
                return Ok(WriteOutcome::Skipped);
            }
            Err(e) => {
                return Err(e).with_context(|| format!("publish record failed: {}", path.display()))
            }
        }
        info!(path = %path.display(), hours = record.prices.len(), "record written");

        // Listing the directory picks up dates other writers linked since
        // this one started.
        if self.rebuild_index(retrieved_at)?.is_none() {
            anyhow::bail!("record vanished before indexing: {}", path.display());
        }

        Ok(WriteOutcome::Written)
    }

    fn read_record(&self, delivery_date: NaiveDate) -> Result<Option<ArchiveRecord>> {
        read_json(&self.record_path(delivery_date))
    }

    fn read_index(&self) -> Result<Option<ArchiveIndex>> {
        read_json(&self.index_path())
    }

    fn rebuild_index(&mut self, now: DateTime<Utc>) -> Result<Option<ArchiveIndex>> {
        let dates = self.record_dates()?;
        let Some(index) = ArchiveIndex::from_dates(dates, now) else {
            info!(dir = %self.dir.display(), "archive empty, no index written");
            return Ok(None);
        };
        self.write_index(&index)?;
        Ok(Some(index))
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let raw = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e).with_context(|| format!("read failed: {}", path.display())),
    };
    let v = serde_json::from_str(&raw).with_context(|| format!("invalid json: {}", path.display()))?;
    Ok(Some(v))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_date_named() {
        let a = FsArchive::new("data/prices", "PLN/MWh");
        let d = NaiveDate::from_ymd_opt(2026, 2, 28).unwrap();
        assert_eq!(a.record_path(d), PathBuf::from("data/prices/2026-02-28.json"));
        assert_eq!(a.index_path(), PathBuf::from("data/prices/index.json"));
    }

    #[test]
    fn missing_dir_has_no_dates() {
        let a = FsArchive::new("/definitely/not/here", "PLN/MWh");
        assert!(a.record_dates().unwrap().is_empty());
        assert!(a.read_index().unwrap().is_none());
    }
}
