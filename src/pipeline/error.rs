//! Error types for dataset preparation and model fitting.

use thiserror::Error;

/// Errors raised while turning a raw frame into a fitted pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A required column is absent from the input frame.
    #[error("Column '{column}' not found in dataset. Available columns: {available:?}")]
    MissingColumn {
        column: String,
        available: Vec<String>,
    },

    /// One of the two configured classes has no rows after filtering.
    #[error("Class '{class}' has no rows in label column '{label}'")]
    EmptyClass { label: String, class: String },

    /// The negative and positive classes are the same value.
    #[error("Negative and positive classes must differ (both are '{0}')")]
    IdenticalClasses(String),

    /// Nothing is left to train on after filtering and dropping missing rows.
    #[error("No rows remain after filtering and missing-value handling")]
    NoRows,

    /// No feature columns were requested.
    #[error("At least one numeric or categorical feature is required")]
    NoFeatures,

    /// A feature column has no present values, so no imputation statistic exists.
    #[error("Feature '{0}' has no non-null values")]
    AllNull(String),

    /// A numeric feature could not be read as floating point.
    #[error("Feature '{column}' is not numeric (dtype {dtype})")]
    NotNumeric { column: String, dtype: String },

    /// The Newton system could not be solved.
    #[error("Solver produced a non-finite step at iteration {0}")]
    Diverged(usize),

    #[error(transparent)]
    Polars(#[from] polars::prelude::PolarsError),
}
