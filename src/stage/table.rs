//! First-row extraction from the external tools' result tables.
//!
//! Both classifiers write a CSV with a header row followed by one data row per
//! query sequence. The pipeline queries one sequence at a time, so only the
//! first data row is ever read.

use std::path::Path;

use csv::{ReaderBuilder, StringRecord};
use thiserror::Error;

/// A result table that does not match the schema its stage promises.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("result table {0} is missing")]
    Missing(String),

    #[error("result table has no header row")]
    MissingHeader,

    #[error("result table has no data row")]
    MissingRow,

    #[error("expected at least {expected} columns, found {found}")]
    ColumnCount { expected: usize, found: usize },

    #[error("transporter flag must be 0 or 1, found {0:?}")]
    InvalidFlag(String),

    #[error("score column {column} is not numeric: {value:?}")]
    InvalidScore { column: usize, value: String },

    #[error("unknown class label {0:?}")]
    UnknownLabel(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Reads the first data row after the header, requiring at least `min_columns` fields.
pub(crate) fn first_data_row(path: &Path, min_columns: usize) -> Result<StringRecord, ParseError> {
    if !path.is_file() {
        return Err(ParseError::Missing(path.display().to_string()));
    }

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;
    let mut rows = reader.records();

    match rows.next() {
        Some(header) => {
            header?;
        }
        None => return Err(ParseError::MissingHeader),
    }
    let row = rows.next().ok_or(ParseError::MissingRow)??;

    if row.len() < min_columns {
        return Err(ParseError::ColumnCount {
            expected: min_columns,
            found: row.len(),
        });
    }
    Ok(row)
}
