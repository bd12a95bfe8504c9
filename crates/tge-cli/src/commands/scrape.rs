//! `tge-cli scrape`: fetch, extract, assemble, validate, archive.
//!
//! One delivery date per run. A date already in the archive ends the run
//! successfully before any fetch; every other failure aborts without
//! writing anything.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use tracing::{info, warn};

use tge_archive::{ArchiveStore, WriteOutcome};
use tge_config::Settings;
use tge_md::{
    assemble_series, extract_hour_cells, validate_series, CellDiagnostic, PageSource,
    SeriesSummary,
};

#[derive(Debug, Clone)]
pub struct ScrapeReport {
    pub delivery_date: NaiveDate,
    pub outcome: WriteOutcome,
    /// `None` when the date was already archived and nothing was fetched.
    pub summary: Option<SeriesSummary>,
    pub diagnostics: Vec<CellDiagnostic>,
    pub absent_cells: usize,
}

impl ScrapeReport {
    fn already_archived(delivery_date: NaiveDate) -> Self {
        Self {
            delivery_date,
            outcome: WriteOutcome::Skipped,
            summary: None,
            diagnostics: Vec::new(),
            absent_cells: 0,
        }
    }

    pub fn written(&self) -> bool {
        self.outcome == WriteOutcome::Written
    }
}

/// Run the pipeline for `delivery_date` against explicit collaborators.
pub fn run_scrape(
    settings: &Settings,
    delivery_date: NaiveDate,
    source: &dyn PageSource,
    archive: &mut dyn ArchiveStore,
    now: DateTime<Utc>,
) -> Result<ScrapeReport> {
    if archive.has(delivery_date) {
        info!(date = %delivery_date, "already archived, nothing to do");
        if archive.repair_index(delivery_date, now)? {
            warn!(date = %delivery_date, "index did not list an archived date, rebuilt");
        }
        return Ok(ScrapeReport::already_archived(delivery_date));
    }

    let zone = settings.time_zone()?;
    let url = settings.source.url.as_str();
    info!(date = %delivery_date, source = source.name(), url, "scrape starting");

    let html = source
        .fetch_page(url)
        .with_context(|| format!("FETCH_FAILED: {url}"))?;

    let cells = extract_hour_cells(
        &html,
        delivery_date,
        &settings.extraction.price_column_candidates,
    )
    .context("EXTRACT_FAILED")?;
    if cells.is_empty() {
        bail!("NO_DATA: no Fixing I rows for {delivery_date} on the page (not published yet?)");
    }
    info!(rows = cells.len(), "instrument rows extracted");

    let assembled = assemble_series(
        delivery_date,
        zone,
        &cells,
        settings.extraction.repeated_hour,
    )
    .context("ASSEMBLY_FAILED")?;
    if !assembled.diagnostics.is_empty() {
        warn!(skipped = assembled.diagnostics.len(), "cells skipped during assembly");
    }

    let summary = validate_series(
        &assembled.series,
        delivery_date,
        &settings.validation_bounds(),
    )
    .context("VALIDATION_FAILED")?;

    let outcome = archive.write(delivery_date, &assembled.series, now)?;
    info!(date = %delivery_date, outcome = outcome.as_str(), "scrape finished");

    Ok(ScrapeReport {
        delivery_date,
        outcome,
        summary: Some(summary),
        diagnostics: assembled.diagnostics,
        absent_cells: assembled.absent_cells,
    })
}
