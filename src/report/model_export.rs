//! JSON export of fitted pipeline parameters

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;

use crate::pipeline::FittedPipeline;

/// Metadata about the training run
#[derive(Serialize)]
pub struct RunMetadata {
    /// Timestamp of the run (ISO 8601 format)
    pub timestamp: String,
    pub version: String,
    pub input_file: String,
    pub label_column: String,
    /// Path of the exported ONNX/PMML artifact
    pub artifact: String,
}

/// Complete parameter dump with metadata
#[derive(Serialize)]
pub struct ModelExport<'a> {
    pub metadata: RunMetadata,
    /// Design-matrix column names, aligned with the coefficients
    pub columns: Vec<String>,
    pub model: &'a FittedPipeline,
}

/// Parameters for the JSON export metadata
pub struct ExportParams<'a> {
    pub input_file: &'a str,
    pub label_column: &'a str,
    pub artifact: &'a str,
}

/// Build the JSON document for a fitted model.
pub fn model_export_json(model: &FittedPipeline, params: &ExportParams) -> Result<String> {
    let export = ModelExport {
        metadata: RunMetadata {
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            input_file: params.input_file.to_string(),
            label_column: params.label_column.to_string(),
            artifact: params.artifact.to_string(),
        },
        columns: model.preprocessor.column_names(),
        model,
    };

    serde_json::to_string_pretty(&export).context("Failed to serialize model summary")
}

/// Write the fitted parameters to a JSON file.
pub fn export_model_summary(
    model: &FittedPipeline,
    output_path: &Path,
    params: &ExportParams,
) -> Result<()> {
    let json = model_export_json(model, params)?;

    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    std::fs::write(output_path, json)
        .with_context(|| format!("Failed to write model summary: {}", output_path.display()))?;

    Ok(())
}
