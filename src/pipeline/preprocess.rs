//! Imputation, scaling and one-hot encoding
//!
//! Each step is fit on the training set and then applied row by row, so the
//! same fitted parameters drive both the design matrix and the exporters.

use std::collections::BTreeMap;

use faer::Mat;
use serde::Serialize;

use super::dataset::TrainingSet;
use super::error::PipelineError;

/// Mean imputation plus standard scaling for one numeric feature
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumericStep {
    pub name: String,
    /// Value substituted for missing inputs (training mean)
    pub impute_value: f64,
    pub mean: f64,
    /// Population standard deviation, 1.0 for a constant column
    pub scale: f64,
}

impl NumericStep {
    /// Fit on present values. Errors when the column is entirely missing.
    pub fn fit(name: &str, values: &[Option<f64>]) -> Result<Self, PipelineError> {
        let present: Vec<f64> = values.iter().flatten().copied().collect();
        if present.is_empty() {
            return Err(PipelineError::AllNull(name.to_string()));
        }

        let n = present.len() as f64;
        let mean = present.iter().sum::<f64>() / n;

        // Imputed rows sit exactly at the mean, so they add nothing to the
        // squared deviations but do count towards n.
        let imputed_n = values.len() as f64;
        let var = present.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / imputed_n;
        let std = var.sqrt();
        let scale = if std > f64::EPSILON * mean.abs().max(1.0) {
            std
        } else {
            1.0
        };

        Ok(Self {
            name: name.to_string(),
            impute_value: mean,
            mean,
            scale,
        })
    }

    pub fn transform(&self, value: Option<f64>) -> f64 {
        let x = match value {
            Some(v) if !v.is_nan() => v,
            _ => self.impute_value,
        };
        (x - self.mean) / self.scale
    }
}

/// Most-frequent imputation plus one-hot encoding for one categorical feature
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoricalStep {
    pub name: String,
    pub impute_value: String,
    /// Sorted distinct training values, one output column each
    pub categories: Vec<String>,
}

impl CategoricalStep {
    /// Fit on present values. Ties in frequency resolve to the smallest category.
    pub fn fit(name: &str, values: &[Option<String>]) -> Result<Self, PipelineError> {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for value in values.iter().flatten() {
            *counts.entry(value.as_str()).or_default() += 1;
        }

        // BTreeMap iterates in sorted order; keep the first maximum
        let mut best: Option<(&str, usize)> = None;
        for (&category, &count) in &counts {
            if best.map_or(true, |(_, c)| count > c) {
                best = Some((category, count));
            }
        }
        let (impute_value, _) = best.ok_or_else(|| PipelineError::AllNull(name.to_string()))?;

        Ok(Self {
            name: name.to_string(),
            impute_value: impute_value.to_string(),
            categories: counts.keys().map(|k| k.to_string()).collect(),
        })
    }

    pub fn width(&self) -> usize {
        self.categories.len()
    }

    /// Index of the hot column, `None` for a category unseen in training.
    pub fn encode(&self, value: Option<&str>) -> Option<usize> {
        let value = value.unwrap_or(&self.impute_value);
        self.categories.binary_search_by(|c| c.as_str().cmp(value)).ok()
    }

    /// Output column names, `<feature>=<category>`.
    pub fn column_names(&self) -> Vec<String> {
        self.categories
            .iter()
            .map(|c| format!("{}={}", self.name, c))
            .collect()
    }
}

/// A single raw input row
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    pub numeric: Vec<Option<f64>>,
    pub categorical: Vec<Option<String>>,
}

impl Record {
    pub fn new(numeric: Vec<Option<f64>>, categorical: Vec<Option<String>>) -> Self {
        Self {
            numeric,
            categorical,
        }
    }
}

/// Fitted numeric and categorical steps in design-matrix order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Preprocessor {
    pub numeric: Vec<NumericStep>,
    pub categorical: Vec<CategoricalStep>,
}

impl Preprocessor {
    pub fn fit(data: &TrainingSet) -> Result<Self, PipelineError> {
        if data.numeric.is_empty() && data.categorical.is_empty() {
            return Err(PipelineError::NoFeatures);
        }

        let numeric = data
            .numeric
            .iter()
            .map(|col| NumericStep::fit(&col.name, &col.values))
            .collect::<Result<Vec<_>, _>>()?;
        let categorical = data
            .categorical
            .iter()
            .map(|col| CategoricalStep::fit(&col.name, &col.values))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            numeric,
            categorical,
        })
    }

    /// Number of design-matrix columns
    pub fn width(&self) -> usize {
        self.numeric.len() + self.categorical.iter().map(|c| c.width()).sum::<usize>()
    }

    /// Design-matrix column names: numeric features, then one per category.
    pub fn column_names(&self) -> Vec<String> {
        self.numeric
            .iter()
            .map(|s| s.name.clone())
            .chain(self.categorical.iter().flat_map(|c| c.column_names()))
            .collect()
    }

    /// Encode one record into `out`, which must be `width()` long.
    pub fn transform_into(&self, record: &Record, out: &mut [f64]) {
        out.fill(0.0);
        for (i, step) in self.numeric.iter().enumerate() {
            out[i] = step.transform(record.numeric.get(i).copied().flatten());
        }

        let mut offset = self.numeric.len();
        for (i, step) in self.categorical.iter().enumerate() {
            let value = record.categorical.get(i).and_then(|v| v.as_deref());
            if let Some(hot) = step.encode(value) {
                out[offset + hot] = 1.0;
            }
            offset += step.width();
        }
    }

    pub fn transform_record(&self, record: &Record) -> Vec<f64> {
        let mut out = vec![0.0; self.width()];
        self.transform_into(record, &mut out);
        out
    }

    /// Build the dense design matrix (rows x width) for a training set.
    pub fn transform(&self, data: &TrainingSet) -> Mat<f64> {
        let rows = data.len();
        let width = self.width();
        let mut x = Mat::<f64>::zeros(rows, width);
        let mut row = vec![0.0; width];

        for r in 0..rows {
            let record = Record::new(
                data.numeric.iter().map(|c| c.values[r]).collect(),
                data.categorical.iter().map(|c| c.values[r].clone()).collect(),
            );
            self.transform_into(&record, &mut row);
            for (c, &v) in row.iter().enumerate() {
                x[(r, c)] = v;
            }
        }

        x
    }
}
