//! From extracted `(label, price text)` cells to a [`PriceSeries`].
//!
//! Per-cell problems (bad label, unparsable price) are collected as
//! [`CellDiagnostic`]s and the cell is dropped; the run carries on with the
//! remaining cells. Problems with the label set as a whole (duplicates, more
//! than one repeated hour) fail the assembly.

use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::hour_label::{compare, HourLabel};
use crate::price_text::parse_price_text;
use crate::series::{build_series, PriceSeries, SeriesError};

/// Hour count of the only day shape that may carry a repeated hour.
const FALL_BACK_HOURS: usize = 25;

// ---------------------------------------------------------------------------
// Input / policy
// ---------------------------------------------------------------------------

/// One row handed over by the extraction step, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawHourCell {
    pub label_text: String,
    pub price_text: String,
}

impl RawHourCell {
    pub fn new(label_text: impl Into<String>, price_text: impl Into<String>) -> Self {
        Self {
            label_text: label_text.into(),
            price_text: price_text.into(),
        }
    }
}

/// What to do when an unsuffixed label shows up a second time.
///
/// Some page layouts publish the repeated autumn hour as `H02A`, others
/// repeat `H02` and rely on row order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatedHourPolicy {
    /// The second occurrence becomes the lettered twin (`H02` -> `H02A`).
    #[default]
    Promote,
    /// Any repeat is a duplicate.
    Reject,
}

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellIssue {
    InvalidLabel,
    UnparsablePrice,
}

/// A skipped cell, attributed to the label text it came with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellDiagnostic {
    pub label: String,
    pub text: String,
    pub issue: CellIssue,
    pub message: String,
}

impl fmt::Display for CellDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.label, self.message)
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssemblyError {
    /// The same label appeared twice (after any promotion).
    DuplicateLabel { label: String },
    /// More than one base carries a repeated hour.
    MultipleRepeatedHours { labels: Vec<String> },
    /// A lettered label on a page that does not list 25 hours. `count` is
    /// the number of distinct labels, including cells later skipped.
    RepeatedHourOutsideFallBack { label: String, count: usize },
    /// Nothing usable was left after per-cell filtering.
    NoUsableCells { cells: usize },
    Series(SeriesError),
}

impl fmt::Display for AssemblyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssemblyError::DuplicateLabel { label } => {
                write!(f, "hour label {label} appears more than once")
            }
            AssemblyError::MultipleRepeatedHours { labels } => {
                write!(f, "more than one repeated hour: {}", labels.join(", "))
            }
            AssemblyError::RepeatedHourOutsideFallBack { label, count } => write!(
                f,
                "repeated hour {label} in a {count}-hour series \
                 (only a {FALL_BACK_HOURS}-hour day repeats an hour)"
            ),
            AssemblyError::NoUsableCells { cells } => {
                write!(f, "no usable price cells ({cells} received)")
            }
            AssemblyError::Series(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for AssemblyError {}

impl From<SeriesError> for AssemblyError {
    fn from(e: SeriesError) -> Self {
        AssemblyError::Series(e)
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct AssembledSeries {
    pub series: PriceSeries,
    /// Labels in the same order as `series.points()`.
    pub labels: Vec<HourLabel>,
    pub diagnostics: Vec<CellDiagnostic>,
    /// Cells that were empty, a dash, or a "no value" token.
    pub absent_cells: usize,
}

// ---------------------------------------------------------------------------
// Main entry point
// ---------------------------------------------------------------------------

pub fn assemble_series(
    delivery_date: NaiveDate,
    zone: Tz,
    cells: &[RawHourCell],
    policy: RepeatedHourPolicy,
) -> Result<AssembledSeries, AssemblyError> {
    let mut seen: BTreeSet<HourLabel> = BTreeSet::new();
    let mut entries: Vec<(HourLabel, f64)> = Vec::with_capacity(cells.len());
    let mut diagnostics = Vec::new();
    let mut absent_cells = 0usize;

    for cell in cells {
        let parsed = match HourLabel::parse(&cell.label_text) {
            Ok(l) => l,
            Err(e) => {
                push_diagnostic(&mut diagnostics, cell, CellIssue::InvalidLabel, e.to_string());
                continue;
            }
        };

        let label = resolve_repeat(parsed, &seen, policy)?;
        seen.insert(label);

        match parse_price_text(&cell.price_text) {
            Ok(Some(price)) => entries.push((label, price)),
            Ok(None) => {
                debug!(label = %label, "no value published");
                absent_cells += 1;
            }
            Err(e) => {
                push_diagnostic(&mut diagnostics, cell, CellIssue::UnparsablePrice, e.to_string());
            }
        }
    }

    if entries.is_empty() {
        return Err(AssemblyError::NoUsableCells { cells: cells.len() });
    }

    entries.sort_by(|a, b| compare(&a.0, &b.0));

    // Day shape comes from the labels the page lists, not from how many
    // prices survived parsing.
    let repeated: Vec<String> = seen
        .iter()
        .filter(|l| l.is_suffixed())
        .map(|l| l.to_string())
        .collect();
    if repeated.len() > 1 {
        return Err(AssemblyError::MultipleRepeatedHours { labels: repeated });
    }
    if let Some(label) = repeated.into_iter().next() {
        if seen.len() != FALL_BACK_HOURS {
            return Err(AssemblyError::RepeatedHourOutsideFallBack {
                label,
                count: seen.len(),
            });
        }
    }

    let (labels, prices): (Vec<HourLabel>, Vec<f64>) = entries.into_iter().unzip();
    let series = build_series(delivery_date, zone, &prices)?;

    Ok(AssembledSeries {
        series,
        labels,
        diagnostics,
        absent_cells,
    })
}

fn resolve_repeat(
    label: HourLabel,
    seen: &BTreeSet<HourLabel>,
    policy: RepeatedHourPolicy,
) -> Result<HourLabel, AssemblyError> {
    if !seen.contains(&label) {
        return Ok(label);
    }
    if policy == RepeatedHourPolicy::Promote && !label.is_suffixed() {
        let twin = label.repeated();
        if !seen.contains(&twin) {
            debug!(label = %label, twin = %twin, "promoting repeated hour label");
            return Ok(twin);
        }
    }
    Err(AssemblyError::DuplicateLabel {
        label: label.to_string(),
    })
}

fn push_diagnostic(
    out: &mut Vec<CellDiagnostic>,
    cell: &RawHourCell,
    issue: CellIssue,
    message: String,
) {
    warn!(label = %cell.label_text, text = %cell.price_text, "skipping cell: {message}");
    out.push(CellDiagnostic {
        label: cell.label_text.clone(),
        text: cell.price_text.clone(),
        issue,
        message,
    });
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Europe::Warsaw;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn cells(labels: &[&str]) -> Vec<RawHourCell> {
        labels
            .iter()
            .enumerate()
            .map(|(i, l)| RawHourCell::new(*l, format!("{},00", 100 + i)))
            .collect()
    }

    fn day(n: u8) -> Vec<String> {
        (1..=n).map(|h| format!("{h:02}")).collect()
    }

    #[test]
    fn sorts_regardless_of_input_order() {
        let input = cells(&["03", "01", "02"]);
        let out = assemble_series(d(2026, 2, 28), Warsaw, &input, RepeatedHourPolicy::Promote)
            .unwrap();
        let labels: Vec<String> = out.labels.iter().map(|l| l.to_string()).collect();
        assert_eq!(labels, vec!["H01", "H02", "H03"]);
        assert_eq!(out.series.prices().collect::<Vec<_>>(), vec![101.0, 102.0, 100.0]);
    }

    #[test]
    fn bad_cells_become_diagnostics() {
        let mut input = cells(&["01", "02", "03"]);
        input[1].price_text = "12x".to_string();
        input.push(RawHourCell::new("H99", "1,0"));
        let out = assemble_series(d(2026, 2, 28), Warsaw, &input, RepeatedHourPolicy::Promote)
            .unwrap();
        assert_eq!(out.series.len(), 2);
        assert_eq!(out.diagnostics.len(), 2);
        assert_eq!(out.diagnostics[0].issue, CellIssue::UnparsablePrice);
        assert_eq!(out.diagnostics[0].label, "02");
        assert_eq!(out.diagnostics[1].issue, CellIssue::InvalidLabel);
    }

    #[test]
    fn absent_cells_are_counted_not_diagnosed() {
        let mut input = cells(&["01", "02"]);
        input[0].price_text = "-".to_string();
        let out = assemble_series(d(2026, 2, 28), Warsaw, &input, RepeatedHourPolicy::Promote)
            .unwrap();
        assert_eq!(out.absent_cells, 1);
        assert!(out.diagnostics.is_empty());
        assert_eq!(out.series.len(), 1);
    }

    #[test]
    fn all_absent_is_no_usable_cells() {
        let input = vec![RawHourCell::new("01", ""), RawHourCell::new("02", "brak")];
        let err = assemble_series(d(2026, 2, 28), Warsaw, &input, RepeatedHourPolicy::Promote)
            .unwrap_err();
        assert_eq!(err, AssemblyError::NoUsableCells { cells: 2 });
    }

    #[test]
    fn repeated_plain_label_is_promoted_on_fall_back() {
        let mut labels = day(25);
        labels.retain(|l| l != "25");
        labels.insert(2, "02".to_string());
        let refs: Vec<&str> = labels.iter().map(|s| s.as_str()).collect();
        let out = assemble_series(d(2026, 10, 25), Warsaw, &cells(&refs), RepeatedHourPolicy::Promote)
            .unwrap();
        assert_eq!(out.labels[2].to_string(), "H02A");
        assert_eq!(out.series.len(), 25);
        assert_eq!(
            out.series.points()[2].timestamp_text(),
            "2026-10-25 02:00:00+02:00"
        );
        assert_eq!(
            out.series.points()[3].timestamp_text(),
            "2026-10-25 02:00:00+01:00"
        );
    }

    #[test]
    fn repeated_plain_label_is_rejected_under_reject() {
        let input = cells(&["01", "02", "02"]);
        let err = assemble_series(d(2026, 10, 25), Warsaw, &input, RepeatedHourPolicy::Reject)
            .unwrap_err();
        assert_eq!(
            err,
            AssemblyError::DuplicateLabel {
                label: "H02".to_string()
            }
        );
    }

    #[test]
    fn third_occurrence_is_a_duplicate() {
        let input = cells(&["02", "02", "02"]);
        let err = assemble_series(d(2026, 10, 25), Warsaw, &input, RepeatedHourPolicy::Promote)
            .unwrap_err();
        assert!(matches!(err, AssemblyError::DuplicateLabel { .. }));
    }

    #[test]
    fn two_repeated_bases_fail() {
        let input = cells(&["01", "02", "02A", "03", "03A"]);
        let err = assemble_series(d(2026, 10, 25), Warsaw, &input, RepeatedHourPolicy::Promote)
            .unwrap_err();
        assert!(matches!(err, AssemblyError::MultipleRepeatedHours { .. }));
    }

    #[test]
    fn bad_cell_on_lettered_fall_back_day_is_only_a_diagnostic() {
        let mut labels = day(24);
        labels.insert(2, "02A".to_string());
        let refs: Vec<&str> = labels.iter().map(|s| s.as_str()).collect();
        let mut input = cells(&refs);
        input[10].price_text = "12?4".to_string();
        let out = assemble_series(d(2026, 10, 25), Warsaw, &input, RepeatedHourPolicy::Promote)
            .unwrap();
        assert_eq!(out.series.len(), 24);
        assert_eq!(out.diagnostics.len(), 1);
        assert_eq!(out.diagnostics[0].issue, CellIssue::UnparsablePrice);
        assert!(out.labels.iter().any(|l| l.to_string() == "H02A"));
    }

    #[test]
    fn absent_lettered_cell_still_counts_as_fall_back() {
        let mut labels = day(24);
        labels.insert(2, "02A".to_string());
        let refs: Vec<&str> = labels.iter().map(|s| s.as_str()).collect();
        let mut input = cells(&refs);
        input[2].price_text = "-".to_string();
        let out = assemble_series(d(2026, 10, 25), Warsaw, &input, RepeatedHourPolicy::Promote)
            .unwrap();
        assert_eq!(out.series.len(), 24);
        assert_eq!(out.absent_cells, 1);
    }

    #[test]
    fn suffix_on_a_normal_day_fails() {
        let mut labels = day(23);
        labels.push("02A".to_string());
        let refs: Vec<&str> = labels.iter().map(|s| s.as_str()).collect();
        let err = assemble_series(d(2026, 2, 28), Warsaw, &cells(&refs), RepeatedHourPolicy::Promote)
            .unwrap_err();
        assert_eq!(
            err,
            AssemblyError::RepeatedHourOutsideFallBack {
                label: "H02A".to_string(),
                count: 24
            }
        );
    }
}
