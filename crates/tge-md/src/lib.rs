//! tge-md
//!
//! Day-ahead hourly price series for one delivery date: from the operator's
//! published table cells to a validated, DST-correct timestamped series.
//!
//! Pipeline, leaf first:
//! - [`extract`]: markup -> `(label, price text)` cells in document order
//! - [`price_text`]: locale-formatted text -> number / absent
//! - [`hour_label`]: canonical order of `H01`..`H25` / `H02A`
//! - [`series`]: ordinal position -> local timestamp via UTC
//! - [`assemble`]: the three above glued together, with diagnostics
//! - [`quality`]: count / date / price-band gate
//!
//! Archiving is not done here; see `tge-archive`.

pub mod assemble;
pub mod extract;
pub mod hour_label;
pub mod price_text;
pub mod quality;
pub mod series;
pub mod source;

pub use assemble::{
    assemble_series, AssembledSeries, AssemblyError, CellDiagnostic, CellIssue, RawHourCell,
    RepeatedHourPolicy,
};
pub use extract::{extract_hour_cells, ExtractError};
pub use hour_label::{HourLabel, HourLabelError};
pub use price_text::{parse_price_text, PriceTextError};
pub use quality::{validate_series, SeriesSummary, ValidationBounds, ValidationError};
pub use series::{build_series, PricePoint, PriceSeries, SeriesError, LOCAL_TIMESTAMP_FORMAT};
pub use source::{FilePageSource, HttpPageSource, HttpSourceOptions, PageSource, SourceError};
