//! Locating the delivery-date rows and the price column in page markup.
//!
//! The page is a set of plain `<table>`s. The first row of a table holds
//! the headers; the price column is the first header that contains one of
//! the configured candidates. Data rows are recognised by their instrument
//! cell, `YYYY-MM-DD_H01` / `YYYY-MM-DD_H02A`, for the delivery date.
//!
//! Scanning is done on the raw text with case-insensitive tag search; the
//! markup is trusted to be well formed enough for `<tr>`/`<td>` pairing.

use std::fmt;

use chrono::NaiveDate;
use tracing::debug;

use crate::assemble::RawHourCell;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    /// None of the tables on the page has a header matching a candidate.
    PriceColumnNotFound { tables: usize },
}

impl fmt::Display for ExtractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractError::PriceColumnNotFound { tables } => write!(
                f,
                "no price column found in {tables} table(s); the page layout may have changed"
            ),
        }
    }
}

impl std::error::Error for ExtractError {}

// ---------------------------------------------------------------------------
// Main entry point
// ---------------------------------------------------------------------------

/// Pull `(label, price text)` cells for `delivery_date` out of `html`.
///
/// Returns rows of the first table that has both a price column and at least
/// one row for the date. An empty `Vec` means the page has the table but the
/// date is not published yet.
pub fn extract_hour_cells(
    html: &str,
    delivery_date: NaiveDate,
    column_candidates: &[String],
) -> Result<Vec<RawHourCell>, ExtractError> {
    let date_prefix = delivery_date.format("%Y-%m-%d").to_string();
    let candidates: Vec<String> = column_candidates
        .iter()
        .map(|c| normalize_header(c))
        .collect();

    let tables = tag_blocks(html, "table");
    let mut found_column = false;

    for (t_idx, table) in tables.iter().enumerate() {
        let rows = tag_blocks(table, "tr");
        let Some((header_row, data_rows)) = rows.split_first() else {
            continue;
        };

        let headers = cell_texts(header_row);
        let Some(col) = find_price_column(&headers, &candidates) else {
            let preview: Vec<&String> = headers.iter().take(6).collect();
            debug!(table = t_idx, headers = ?preview, "no price column, skipping table");
            continue;
        };
        found_column = true;
        debug!(table = t_idx, column = col, header = %headers[col], "price column located");

        let mut out = Vec::new();
        for row in data_rows {
            let cells = cell_texts(row);
            if cells.len() <= col {
                continue;
            }
            if let Some(label) = instrument_label(&cells[0], &date_prefix) {
                out.push(RawHourCell::new(label, cells[col].clone()));
            }
        }

        if !out.is_empty() {
            debug!(table = t_idx, rows = out.len(), "delivery rows extracted");
            return Ok(out);
        }
    }

    if found_column {
        Ok(Vec::new())
    } else {
        Err(ExtractError::PriceColumnNotFound {
            tables: tables.len(),
        })
    }
}

/// Index of the first header containing a candidate, candidates tried in
/// priority order. Candidates must already be normalized.
fn find_price_column(headers: &[String], candidates: &[String]) -> Option<usize> {
    let normalized: Vec<String> = headers.iter().map(|h| normalize_header(h)).collect();
    candidates.iter().find_map(|cand| {
        normalized
            .iter()
            .position(|h| !cand.is_empty() && h.contains(cand.as_str()))
    })
}

fn normalize_header(s: &str) -> String {
    s.replace('\u{00a0}', " ").trim().to_lowercase()
}

/// `2026-02-28_H02a` -> `02A` when the prefix matches the delivery date.
fn instrument_label(cell: &str, date_prefix: &str) -> Option<String> {
    let rest = cell.trim().strip_prefix(date_prefix)?.strip_prefix('_')?;
    let rest = rest.strip_prefix('H').or_else(|| rest.strip_prefix('h'))?;

    let b = rest.as_bytes();
    let shape_ok = match b.len() {
        2 => b[0].is_ascii_digit() && b[1].is_ascii_digit(),
        3 => b[0].is_ascii_digit() && b[1].is_ascii_digit() && b[2].is_ascii_alphabetic(),
        _ => false,
    };
    shape_ok.then(|| rest.to_ascii_uppercase())
}

// ---------------------------------------------------------------------------
// Markup scanning
// ---------------------------------------------------------------------------

/// Inner text of every `<tag ...>...</tag>` block, outermost first.
fn tag_blocks<'a>(s: &'a str, tag: &str) -> Vec<&'a str> {
    let lc = s.to_ascii_lowercase();
    let open = format!("<{tag}");
    let close = format!("</{tag}");
    let mut out = Vec::new();
    let mut from = 0;

    while let Some(start) = find_open_tag(&lc, &open, from) {
        let Some(gt) = lc[start..].find('>') else {
            break;
        };
        let inner_start = start + gt + 1;
        let Some(end_rel) = lc[inner_start..].find(&close) else {
            break;
        };
        let inner_end = inner_start + end_rel;
        out.push(&s[inner_start..inner_end]);
        from = inner_end + close.len();
    }
    out
}

/// Position of `open` at or after `from` that is a whole tag name
/// (`<th` must not match `<thead`).
fn find_open_tag(lc: &str, open: &str, from: usize) -> Option<usize> {
    let mut at = from;
    while let Some(rel) = lc.get(at..)?.find(open) {
        let pos = at + rel;
        let next = lc.as_bytes().get(pos + open.len()).copied();
        match next {
            Some(b'>') | Some(b'/') => return Some(pos),
            Some(c) if c.is_ascii_whitespace() => return Some(pos),
            _ => at = pos + open.len(),
        }
    }
    None
}

/// Text of every `th`/`td` cell of a row, in document order.
fn cell_texts(row: &str) -> Vec<String> {
    let lc = row.to_ascii_lowercase();
    let mut out = Vec::new();
    let mut from = 0;

    loop {
        let td = find_open_tag(&lc, "<td", from);
        let th = find_open_tag(&lc, "<th", from);
        let (start, close) = match (td, th) {
            (Some(a), Some(b)) if a < b => (a, "</td"),
            (Some(_), Some(b)) => (b, "</th"),
            (Some(a), None) => (a, "</td"),
            (None, Some(b)) => (b, "</th"),
            (None, None) => break,
        };
        let Some(gt) = lc[start..].find('>') else {
            break;
        };
        let inner_start = start + gt + 1;
        let Some(end_rel) = lc[inner_start..].find(close) else {
            break;
        };
        let inner_end = inner_start + end_rel;
        out.push(cell_text(&row[inner_start..inner_end]));
        from = inner_end + close.len();
    }
    out
}

fn cell_text(inner: &str) -> String {
    let decoded = decode_entities(&strip_tags(inner));
    decoded
        .split(|c: char| c.is_ascii_whitespace())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn strip_tags(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_tag = false;
    for ch in s.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    out
}

/// Decode the handful of entities that show up in numeric cells.
/// Unknown entities are kept verbatim.
fn decode_entities(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let decoded = tail
            .find(';')
            .filter(|&semi| semi <= 10)
            .and_then(|semi| entity_char(&tail[1..semi]).map(|c| (c, semi)));
        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &tail[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn entity_char(name: &str) -> Option<char> {
    match name {
        "nbsp" => Some('\u{00a0}'),
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let num = name.strip_prefix('#')?;
            let code = match num.strip_prefix('x').or_else(|| num.strip_prefix('X')) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num.parse::<u32>().ok()?,
            };
            char::from_u32(code)
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
