use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::BTreeMap;

use tge_md::PriceSeries;

use crate::record::{ArchiveIndex, ArchiveRecord};
use crate::{ensure_same_date, ArchiveStore, WriteOutcome};

/// In-process archive with the same write-once semantics as [`crate::FsArchive`].
#[derive(Debug, Clone, Default)]
pub struct MemoryArchive {
    unit: String,
    records: BTreeMap<NaiveDate, ArchiveRecord>,
    index: Option<ArchiveIndex>,
}

impl MemoryArchive {
    pub fn new(unit: impl Into<String>) -> Self {
        Self {
            unit: unit.into(),
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl ArchiveStore for MemoryArchive {
    fn has(&self, delivery_date: NaiveDate) -> bool {
        self.records.contains_key(&delivery_date)
    }

    fn write(
        &mut self,
        delivery_date: NaiveDate,
        series: &PriceSeries,
        retrieved_at: DateTime<Utc>,
    ) -> Result<WriteOutcome> {
        ensure_same_date(delivery_date, series)?;
        if self.has(delivery_date) {
            self.repair_index(delivery_date, retrieved_at)?;
            return Ok(WriteOutcome::Skipped);
        }
        let record = ArchiveRecord::from_series(series, &self.unit, retrieved_at);
        self.records.insert(delivery_date, record);
        self.rebuild_index(retrieved_at)?;
        Ok(WriteOutcome::Written)
    }

    fn read_record(&self, delivery_date: NaiveDate) -> Result<Option<ArchiveRecord>> {
        Ok(self.records.get(&delivery_date).cloned())
    }

    fn read_index(&self) -> Result<Option<ArchiveIndex>> {
        Ok(self.index.clone())
    }

    fn rebuild_index(&mut self, now: DateTime<Utc>) -> Result<Option<ArchiveIndex>> {
        let rebuilt = ArchiveIndex::from_dates(self.records.keys().copied().collect(), now);
        if rebuilt.is_some() {
            self.index = rebuilt.clone();
        }
        Ok(rebuilt)
    }
}
