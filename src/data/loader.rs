//! Dataset loading
//!
//! Reads a dataset file, runs it through the matching [`DatasetDecoder`] and
//! parses the resulting CSV into a polars `DataFrame`.

use super::decode::{decoder_for_path, DatasetDecoder};
use crate::error::{ExplorerError, Result};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use std::collections::BTreeSet;
use std::io::Cursor;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Loads and decodes tabular datasets
pub struct DatasetLoader {
    /// Rows scanned when inferring column types
    infer_schema_length: usize,
    /// Decoder override; chosen from the file extension when unset
    decoder: Option<Box<dyn DatasetDecoder>>,
}

impl Default for DatasetLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DatasetLoader {
    pub fn new() -> Self {
        Self {
            infer_schema_length: 100,
            decoder: None,
        }
    }

    /// Always use `decoder` regardless of the file extension
    pub fn with_decoder(mut self, decoder: Box<dyn DatasetDecoder>) -> Self {
        self.decoder = Some(decoder);
        self
    }

    /// Read, decode and parse a dataset file
    pub fn load(&self, path: &Path) -> Result<DataFrame> {
        let start = Instant::now();
        let raw = std::fs::read(path)
            .map_err(|e| ExplorerError::DataError(format!("{}: {}", path.display(), e)))?;

        let by_extension;
        let decoder: &dyn DatasetDecoder = match &self.decoder {
            Some(decoder) => decoder.as_ref(),
            None => {
                by_extension = decoder_for_path(path)?;
                by_extension.as_ref()
            }
        };
        let csv = decoder.decode(raw)?;
        debug!(path = %path.display(), decoder = decoder.name(), bytes = csv.len(), "dataset decoded");

        let df = self.parse_csv(csv)?;
        info!(
            path = %path.display(),
            rows = df.height(),
            cols = df.width(),
            elapsed = ?start.elapsed(),
            "dataset loaded"
        );
        Ok(df)
    }

    /// Parse CSV bytes with a header row
    pub fn parse_csv(&self, csv: Vec<u8>) -> Result<DataFrame> {
        CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(self.infer_schema_length))
            .into_reader_with_file_handle(Cursor::new(csv))
            .finish()
            .map_err(|e| ExplorerError::DataError(e.to_string()))
    }
}

/// Column summary of a loaded dataset
#[derive(Debug, Clone)]
pub struct DatasetInfo {
    pub n_rows: usize,
    pub columns: Vec<(String, String, usize)>,
}

impl DatasetInfo {
    /// Name, dtype and null count for every column
    pub fn from_frame(df: &DataFrame) -> Self {
        let columns = df
            .get_columns()
            .iter()
            .map(|col| (col.name().to_string(), format!("{}", col.dtype()), col.null_count()))
            .collect();
        Self {
            n_rows: df.height(),
            columns,
        }
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|(name, _, _)| name.clone()).collect()
    }
}

fn column_ref<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Column> {
    df.column(name)
        .map_err(|_| ExplorerError::FeatureNotFound(name.to_string()))
}

/// Numeric view of a column; text and other non-numeric columns are rejected
fn column_as_f64(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let column = column_ref(df, name)?;
    if column.dtype() == &DataType::String {
        return Err(ExplorerError::DataError(format!(
            "column '{}' holds text and cannot be used as a numeric feature",
            name
        )));
    }
    let cast = column
        .as_materialized_series()
        .strict_cast(&DataType::Float64)
        .map_err(|e| {
            ExplorerError::DataError(format!(
                "column '{}' ({}) is not numeric: {}",
                name,
                column.dtype(),
                e
            ))
        })?;
    let values = cast
        .f64()
        .map_err(|e| ExplorerError::DataError(e.to_string()))?
        .into_iter()
        .collect();
    Ok(values)
}

/// Extract named columns into a row-major `Array2<f64>`.
///
/// Missing values become NaN and are rejected later by the classifier. An
/// empty column list yields an `(n, 0)` array.
pub fn columns_to_array2(df: &DataFrame, col_names: &[String]) -> Result<Array2<f64>> {
    let n_rows = df.height();
    let n_cols = col_names.len();

    let col_data: Vec<Vec<f64>> = col_names
        .iter()
        .map(|name| {
            Ok(column_as_f64(df, name)?
                .into_iter()
                .map(|v| v.unwrap_or(f64::NAN))
                .collect())
        })
        .collect::<Result<Vec<Vec<f64>>>>()?;

    let col_refs: Vec<&[f64]> = col_data.iter().map(|c| c.as_slice()).collect();
    Ok(Array2::from_shape_fn((n_rows, n_cols), |(r, c)| col_refs[c][r]))
}

/// Target column as class codes
#[derive(Debug, Clone, PartialEq)]
pub struct TargetLabels {
    /// Class code of every row
    pub codes: Array1<f64>,
    /// Class names by code (code 1 is the first name) for text targets
    pub names: Option<Vec<String>>,
}

fn missing_target(name: &str, row: usize) -> ExplorerError {
    ExplorerError::DataError(format!("target '{}' is missing in row {}", name, row + 1))
}

/// Extract the target column as class labels.
///
/// Numeric columns are used as class codes directly. Text columns are
/// encoded as 1-based codes in sorted order of their distinct values. A
/// missing label is an error.
pub fn column_to_labels(df: &DataFrame, name: &str) -> Result<TargetLabels> {
    let column = column_ref(df, name)?;
    if column.dtype() != &DataType::String {
        let codes = column_as_f64(df, name)?
            .into_iter()
            .enumerate()
            .map(|(row, v)| v.ok_or_else(|| missing_target(name, row)))
            .collect::<Result<Array1<f64>>>()?;
        return Ok(TargetLabels { codes, names: None });
    }

    let values: Vec<&str> = column
        .as_materialized_series()
        .str()
        .map_err(|e| ExplorerError::DataError(e.to_string()))?
        .into_iter()
        .enumerate()
        .map(|(row, v)| v.ok_or_else(|| missing_target(name, row)))
        .collect::<Result<_>>()?;

    let names: Vec<String> = values
        .iter()
        .copied()
        .collect::<BTreeSet<&str>>()
        .into_iter()
        .map(str::to_string)
        .collect();
    let codes = values
        .iter()
        .map(|v| match names.binary_search_by(|n| n.as_str().cmp(v)) {
            Ok(idx) => Ok((idx + 1) as f64),
            Err(_) => Err(ExplorerError::DataError(format!("unknown label '{}'", v))),
        })
        .collect::<Result<Array1<f64>>>()?;
    debug!(target_column = name, classes = names.len(), "text target encoded");

    Ok(TargetLabels {
        codes,
        names: Some(names),
    })
}
