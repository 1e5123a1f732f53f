//! Export module - encode a fitted pipeline and write it to disk

pub mod onnx;
pub mod pmml;

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::pipeline::FittedPipeline;

pub use onnx::OnnxExporter;
pub use pmml::PmmlExporter;

/// Errors raised while encoding or writing an artifact
#[derive(Debug, Error)]
pub enum ExportError {
    #[error(
        "Unsupported ONNX opset {0}; supported range is {min}..={max}",
        min = onnx::MIN_OPSET,
        max = onnx::MAX_OPSET
    )]
    UnsupportedOpset(i64),

    #[error("Feature name '{0}' clashes with a value name in the ONNX graph; rename the column")]
    DuplicateValueName(String),

    #[error("Refusing to write an empty {0} artifact")]
    EmptyArtifact(ExportFormat),

    #[error("Failed to write XML: {0}")]
    Xml(String),

    #[error("Failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Supported interchange formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Onnx,
    Pmml,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Onnx => "onnx",
            ExportFormat::Pmml => "pmml",
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportFormat::Onnx => write!(f, "ONNX"),
            ExportFormat::Pmml => write!(f, "PMML"),
        }
    }
}

/// Serializes a fitted pipeline into one interchange format
pub trait ModelExporter {
    fn format(&self) -> ExportFormat;

    fn encode(&self, model: &FittedPipeline) -> Result<Vec<u8>, ExportError>;
}

/// Path of the artifact `<dir>/<name>.<ext>`.
pub fn artifact_path(dir: &Path, name: &str, format: ExportFormat) -> PathBuf {
    dir.join(format!("{}.{}", name, format.extension()))
}

/// Write encoded bytes, creating the output directory if absent.
pub fn write_artifact(
    dir: &Path,
    name: &str,
    format: ExportFormat,
    bytes: &[u8],
) -> Result<PathBuf, ExportError> {
    if bytes.is_empty() {
        return Err(ExportError::EmptyArtifact(format));
    }

    std::fs::create_dir_all(dir).map_err(|source| ExportError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let path = artifact_path(dir, name, format);
    std::fs::write(&path, bytes).map_err(|source| ExportError::Io {
        path: path.clone(),
        source,
    })?;

    Ok(path)
}

/// Encode with `exporter` and write the result.
pub fn export_model(
    exporter: &dyn ModelExporter,
    model: &FittedPipeline,
    dir: &Path,
    name: &str,
) -> Result<PathBuf, ExportError> {
    let bytes = exporter.encode(model)?;
    write_artifact(dir, name, exporter.format(), &bytes)
}
