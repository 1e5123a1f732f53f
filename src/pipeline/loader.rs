//! Dataset loader for CSV and Parquet files

use anyhow::{Context, Result};
use polars::prelude::*;
use std::path::Path;

use crate::utils::{create_spinner, finish_with_success};

/// Tokens read as null in CSV input, in addition to empty fields.
const CSV_NULL_TOKENS: [&str; 2] = ["NA", "NaN"];

fn file_extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

/// Build a lazy scan over a dataset file (CSV or Parquet based on extension)
///
/// `infer_schema_length` of 0 means a full table scan for CSV type inference.
pub fn scan_dataset(path: &Path, infer_schema_length: usize) -> Result<LazyFrame> {
    let extension = file_extension(path);

    let lf = match extension.as_str() {
        "csv" => {
            let schema_length = if infer_schema_length == 0 {
                None
            } else {
                Some(infer_schema_length)
            };
            let null_values = NullValues::AllColumns(
                CSV_NULL_TOKENS
                    .iter()
                    .map(|t| PlSmallStr::from(*t))
                    .collect(),
            );
            LazyCsvReader::new(path)
                .with_infer_schema_length(schema_length)
                .with_null_values(Some(null_values))
                .finish()
                .with_context(|| format!("Failed to load CSV file: {}", path.display()))?
        }
        "parquet" => LazyFrame::scan_parquet(path, Default::default())
            .with_context(|| format!("Failed to load Parquet file: {}", path.display()))?,
        _ => anyhow::bail!(
            "Unsupported file format: {}. Supported formats: csv, parquet",
            extension
        ),
    };

    Ok(lf)
}

/// Load a dataset into memory.
pub fn load_dataset(path: &Path, infer_schema_length: usize) -> Result<DataFrame> {
    scan_dataset(path, infer_schema_length)?
        .collect()
        .with_context(|| format!("Failed to read dataset: {}", path.display()))
}

/// Load a dataset behind a spinner and report its shape.
///
/// Returns `(frame, rows, columns, estimated_memory_mb)`.
pub fn load_dataset_with_progress(
    path: &Path,
    infer_schema_length: usize,
) -> Result<(DataFrame, usize, usize, f64)> {
    let spinner = create_spinner(&format!("Loading {}...", path.display()));
    let df = match load_dataset(path, infer_schema_length) {
        Ok(df) => df,
        Err(e) => {
            spinner.finish_and_clear();
            return Err(e);
        }
    };
    let (rows, cols) = df.shape();
    let memory_mb = df.estimated_size() as f64 / (1024.0 * 1024.0);
    finish_with_success(&spinner, &format!("Loaded {} rows", rows));

    Ok((df, rows, cols, memory_mb))
}

/// Read only the column names of a dataset file.
pub fn get_column_names(path: &Path) -> Result<Vec<String>> {
    let schema = scan_dataset(path, 100)?
        .collect_schema()
        .with_context(|| format!("Failed to read schema: {}", path.display()))?;

    Ok(schema.iter_names().map(|name| name.to_string()).collect())
}
