//! CSV ingest and cleaning.
//!
//! This module turns the raw supply/demand CSV into a [`CleanTable`]:
//!
//! 1. parse `Date`; rows with an unparseable date are dropped
//! 2. rename headers through the catalog (unknown headers pass through)
//! 3. stable sort by date
//! 4. coerce every other cell to `f64` (`NaN` when nothing numeric remains)
//! 5. forward-fill, then back-fill, each column
//! 6. append calendar features derived from the date
//!
//! No step invents a value for a column that has none: an all-missing column
//! stays `NaN` and training refuses it later.

use std::fs::File;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use csv::StringRecord;
use tracing::{info, warn};

use crate::domain::{
    CALENDAR_COLUMNS, CleanRow, CleanTable, DateOrder, calendar_features, canonical_column_name,
};
use crate::error::AppError;

/// Header of the date column in the raw file.
pub const DATE_COLUMN: &str = "Date";

/// Raw rows with a parsed date, in file order.
#[derive(Debug, Clone)]
struct RawDataset {
    /// Non-date headers as they appear in the file (BOM/whitespace stripped).
    headers: Vec<String>,
    /// `(date, non-date cells)` per kept row.
    records: Vec<(NaiveDate, Vec<String>)>,
    rows_read: usize,
    rows_dropped: usize,
}

/// A raw CSV row shown as-is (for "recent observations" displays).
#[derive(Debug, Clone, PartialEq)]
pub struct RawObservation {
    pub date: NaiveDate,
    pub cells: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecentObservations {
    pub headers: Vec<String>,
    pub rows: Vec<RawObservation>,
}

/// Load the raw CSV at `path` and run the full cleaning pass.
pub fn load_clean_dataset(path: &Path, date_order: DateOrder) -> Result<CleanTable, AppError> {
    let raw = read_raw(path, date_order)?;

    let mut columns: Vec<String> = raw
        .headers
        .iter()
        .map(|h| canonical_column_name(h).to_string())
        .collect();

    let mut rows: Vec<CleanRow> = raw
        .records
        .into_iter()
        .map(|(date, cells)| CleanRow {
            date,
            values: cells.iter().map(|c| coerce_numeric(c)).collect(),
        })
        .collect();

    // Stable: rows sharing a date keep their file order.
    rows.sort_by_key(|r| r.date);

    for col in 0..columns.len() {
        forward_fill(&mut rows, col);
        back_fill(&mut rows, col);
    }

    let empty_columns: Vec<&str> = columns
        .iter()
        .enumerate()
        .filter(|(idx, _)| !rows.is_empty() && rows.iter().all(|r| r.values[*idx].is_nan()))
        .map(|(_, name)| name.as_str())
        .collect();
    if !empty_columns.is_empty() {
        warn!(columns = ?empty_columns, "columns without a single numeric value remain missing");
    }

    append_calendar_columns(&mut columns, &mut rows);

    info!(
        path = %path.display(),
        rows_read = raw.rows_read,
        rows_dropped = raw.rows_dropped,
        rows = rows.len(),
        columns = columns.len(),
        "cleaned dataset"
    );

    Ok(CleanTable::new(columns, rows))
}

/// Last `count` raw rows by date, with the original headers and cell text.
pub fn latest_observations(path: &Path, count: usize, date_order: DateOrder) -> Result<RecentObservations, AppError> {
    let raw = read_raw(path, date_order)?;
    let mut records = raw.records;
    records.sort_by_key(|(date, _)| *date);

    let skip = records.len().saturating_sub(count);
    let rows = records
        .into_iter()
        .skip(skip)
        .map(|(date, cells)| RawObservation { date, cells })
        .collect();

    Ok(RecentObservations {
        headers: raw.headers,
        rows,
    })
}

fn read_raw(path: &Path, date_order: DateOrder) -> Result<RawDataset, AppError> {
    if !path.exists() {
        return Err(AppError::DatasetNotFound {
            path: path.to_path_buf(),
        });
    }
    let file = File::open(path)
        .map_err(|e| AppError::DatasetRead(format!("failed to open '{}': {e}", path.display())))?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let header_record = reader
        .headers()
        .map_err(|e| AppError::DatasetRead(format!("failed to read CSV headers: {e}")))?
        .clone();
    let all_headers: Vec<String> = header_record.iter().map(normalize_header_name).collect();

    let date_idx = all_headers
        .iter()
        .position(|h| h == DATE_COLUMN)
        .ok_or_else(|| AppError::DatasetRead(format!("missing required column `{DATE_COLUMN}`")))?;

    let headers: Vec<String> = all_headers
        .iter()
        .enumerate()
        .filter(|(idx, _)| *idx != date_idx)
        .map(|(_, h)| h.clone())
        .collect();

    let mut records = Vec::new();
    let mut rows_read = 0usize;
    let mut rows_dropped = 0usize;

    for (idx, result) in reader.records().enumerate() {
        rows_read += 1;
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                // +2: 1-based lines plus the header line.
                warn!(line = idx + 2, error = %e, "skipping unreadable CSV row");
                rows_dropped += 1;
                continue;
            }
        };

        let Some(date) = record.get(date_idx).and_then(|s| parse_date(s, date_order)) else {
            rows_dropped += 1;
            continue;
        };

        records.push((date, non_date_cells(&record, date_idx, all_headers.len())));
    }

    Ok(RawDataset {
        headers,
        records,
        rows_read,
        rows_dropped,
    })
}

fn non_date_cells(record: &StringRecord, date_idx: usize, width: usize) -> Vec<String> {
    (0..width)
        .filter(|&idx| idx != date_idx)
        .map(|idx| record.get(idx).unwrap_or("").to_string())
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports often prefix the first header with a UTF-8 BOM.
    name.trim().trim_start_matches('\u{feff}').trim().to_string()
}

/// Strip thousands separators and anything outside `[0-9.-]`, then parse.
///
/// Whatever cannot be parsed afterwards is missing (`NaN`), never zero.
pub fn coerce_numeric(cell: &str) -> f64 {
    let cleaned: String = cell
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    cleaned.parse::<f64>().unwrap_or(f64::NAN)
}

/// Parse a dataset date.
///
/// ISO forms win when the string leads with a four-digit year. Numeric
/// day/month forms follow `order` and fall back to the other order; textual
/// month names are accepted last.
pub fn parse_date(s: &str, order: DateOrder) -> Option<NaiveDate> {
    const ISO: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d"];
    const ISO_DATETIME: [&str; 5] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M:%S",
        "%Y/%m/%d %H:%M:%S",
        "%Y/%m/%d %H:%M",
    ];
    // Two-digit year variants first: `%Y` would read "23" as year 23.
    const MONTH_FIRST: [&str; 6] = ["%m/%d/%y", "%m/%d/%Y", "%m-%d-%y", "%m-%d-%Y", "%m.%d.%y", "%m.%d.%Y"];
    const DAY_FIRST: [&str; 6] = ["%d/%m/%y", "%d/%m/%Y", "%d-%m-%y", "%d-%m-%Y", "%d.%m.%y", "%d.%m.%Y"];
    const TEXTUAL: [&str; 8] = [
        "%d-%b-%y", "%d-%b-%Y", "%d %b %y", "%d %b %Y", "%d %B %Y", "%b %d, %Y", "%B %d, %Y", "%d-%B-%Y",
    ];

    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    let try_dates = |fmts: &[&str]| fmts.iter().find_map(|f| NaiveDate::parse_from_str(s, f).ok());

    // `%Y` takes 1 to 4 digits, so "01/02/23" would otherwise land in year 1.
    if leads_with_four_digit_year(s) {
        if let Some(d) = try_dates(&ISO) {
            return Some(d);
        }
        if let Some(d) = ISO_DATETIME
            .iter()
            .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
        {
            return Some(d.date());
        }
    }

    let (first, second) = match order {
        DateOrder::MonthFirst => (&MONTH_FIRST, &DAY_FIRST),
        DateOrder::DayFirst => (&DAY_FIRST, &MONTH_FIRST),
    };
    try_dates(first)
        .or_else(|| try_dates(second))
        .or_else(|| try_dates(&TEXTUAL))
}

fn leads_with_four_digit_year(s: &str) -> bool {
    s.split(['-', '/', '.', ' ', 'T'])
        .next()
        .is_some_and(|t| t.len() == 4 && t.bytes().all(|b| b.is_ascii_digit()))
}

fn forward_fill(rows: &mut [CleanRow], col: usize) {
    let mut last = f64::NAN;
    for row in rows.iter_mut() {
        let v = &mut row.values[col];
        if v.is_nan() {
            *v = last;
        } else {
            last = *v;
        }
    }
}

fn back_fill(rows: &mut [CleanRow], col: usize) {
    let mut next = f64::NAN;
    for row in rows.iter_mut().rev() {
        let v = &mut row.values[col];
        if v.is_nan() {
            *v = next;
        } else {
            next = *v;
        }
    }
}

/// Append calendar columns; a raw column with the same name is overwritten
/// in place.
fn append_calendar_columns(columns: &mut Vec<String>, rows: &mut [CleanRow]) {
    let positions: Vec<usize> = CALENDAR_COLUMNS
        .iter()
        .map(|name| match columns.iter().position(|c| c == name) {
            Some(idx) => idx,
            None => {
                columns.push((*name).to_string());
                columns.len() - 1
            }
        })
        .collect();

    for row in rows.iter_mut() {
        row.values.resize(columns.len(), f64::NAN);
        for (&pos, (_, value)) in positions.iter().zip(calendar_features(row.date).entries()) {
            row.values[pos] = value;
        }
    }
}
