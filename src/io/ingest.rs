//! CSV ingest of paired scores.
//!
//! Input is a headered CSV with (at least) two numeric columns. Columns can
//! be chosen by name; otherwise the first two columns are used.
//!
//! - **Listwise deletion**: a row with a missing or non-numeric value in
//!   either column is skipped and reported, never imputed
//! - **Deterministic**: rows keep file order

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use csv::StringRecord;
use tracing::{debug, warn};

use crate::error::{CopulaError, CopulaResult};

/// A row skipped during ingest.
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Paired samples plus ingest bookkeeping.
#[derive(Debug, Clone, PartialEq)]
pub struct PairData {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub x_column: String,
    pub y_column: String,
    pub rows_read: usize,
    pub row_errors: Vec<RowError>,
}

impl PairData {
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

/// Read two columns of `path` as paired samples.
pub fn read_pairs_csv(path: &Path, x_col: Option<&str>, y_col: Option<&str>) -> CopulaResult<PairData> {
    let file = File::open(path)?;
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader.headers()?.clone();
    if headers.len() < 2 {
        return Err(CopulaError::InvalidInput(format!(
            "'{}' needs at least two columns, found {}",
            path.display(),
            headers.len()
        )));
    }
    let header_map = build_header_map(&headers);
    let x_idx = resolve_column(x_col, 0, &header_map)?;
    let y_idx = resolve_column(y_col, 1, &header_map)?;
    if x_idx == y_idx {
        return Err(CopulaError::InvalidInput("X and Y must be different columns".to_string()));
    }

    let mut x = Vec::new();
    let mut y = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // Line 1 is the header.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        match (parse_value(&record, x_idx), parse_value(&record, y_idx)) {
            (Ok(a), Ok(b)) => {
                x.push(a);
                y.push(b);
            }
            (Err(e), _) | (_, Err(e)) => row_errors.push(RowError { line, message: e }),
        }
    }

    if !row_errors.is_empty() {
        warn!(
            path = %path.display(),
            skipped = row_errors.len(),
            rows_read,
            "rows with missing or invalid values were skipped"
        );
    }
    debug!(path = %path.display(), used = x.len(), "pairs loaded");

    Ok(PairData {
        x,
        y,
        x_column: headers.get(x_idx).unwrap_or_default().to_string(),
        y_column: headers.get(y_idx).unwrap_or_default().to_string(),
        rows_read,
        row_errors,
    })
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports may prefix the first header with a UTF-8 BOM.
    name.trim().trim_start_matches('\u{feff}').to_ascii_lowercase()
}

fn resolve_column(
    requested: Option<&str>,
    default: usize,
    header_map: &HashMap<String, usize>,
) -> CopulaResult<usize> {
    match requested {
        None => Ok(default),
        Some(name) => header_map
            .get(&normalize_header_name(name))
            .copied()
            .ok_or_else(|| CopulaError::InvalidInput(format!("column '{name}' not found"))),
    }
}

fn parse_value(record: &StringRecord, idx: usize) -> Result<f64, String> {
    let raw = record.get(idx).unwrap_or("");
    if raw.is_empty() || raw.eq_ignore_ascii_case("na") || raw.eq_ignore_ascii_case("nan") {
        return Err(format!("missing value in column {}", idx + 1));
    }
    let value: f64 = raw
        .parse()
        .map_err(|_| format!("non-numeric value '{raw}' in column {}", idx + 1))?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(format!("non-finite value '{raw}' in column {}", idx + 1))
    }
}
