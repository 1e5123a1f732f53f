//! Fitted preprocessing + classifier pipeline

use serde::Serialize;

use super::dataset::{ClassMapping, TrainingSet};
use super::error::PipelineError;
use super::logistic::{fit_logistic, LogisticModel, SolverConfig};
use super::preprocess::{Preprocessor, Record};

/// Everything an exporter needs to reproduce the model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FittedPipeline {
    pub preprocessor: Preprocessor,
    pub classifier: LogisticModel,
    pub classes: ClassMapping,
    pub solver: SolverConfig,
    /// Number of training rows
    pub n_samples: usize,
}

impl FittedPipeline {
    pub fn numeric_features(&self) -> Vec<&str> {
        self.preprocessor
            .numeric
            .iter()
            .map(|s| s.name.as_str())
            .collect()
    }

    pub fn categorical_features(&self) -> Vec<&str> {
        self.preprocessor
            .categorical
            .iter()
            .map(|s| s.name.as_str())
            .collect()
    }

    /// Probabilities `[p(class 0), p(class 1)]` for a raw record.
    pub fn predict_proba(&self, record: &Record) -> [f64; 2] {
        let row = self.preprocessor.transform_record(record);
        let p = self.classifier.probability(&row);
        [1.0 - p, p]
    }

    /// Predicted class index (0 or 1). Ties go to class 0.
    pub fn predict(&self, record: &Record) -> u8 {
        let row = self.preprocessor.transform_record(record);
        u8::from(self.classifier.decision(&row) > 0.0)
    }

    /// Short human-readable description of the pipeline steps.
    pub fn describe(&self) -> String {
        let mut steps = Vec::new();
        if !self.preprocessor.numeric.is_empty() {
            steps.push(format!(
                "SimpleImputer(strategy='mean') + StandardScaler() on {:?}",
                self.numeric_features()
            ));
        }
        if !self.preprocessor.categorical.is_empty() {
            steps.push(format!(
                "SimpleImputer(strategy='most_frequent') + OneHotEncoder(handle_unknown='ignore') on {:?}",
                self.categorical_features()
            ));
        }
        steps.push(format!(
            "LogisticRegression(C={}, max_iter={}, tol={})",
            self.solver.c, self.solver.max_iter, self.solver.tol
        ));
        format!(
            "Pipeline([{}]) classes: {}=0, {}=1",
            steps.join(", "),
            self.classes.negative,
            self.classes.positive
        )
    }
}

/// Fit imputers, scaler, encoder and classifier on a training set.
pub fn fit_pipeline(
    data: &TrainingSet,
    solver: &SolverConfig,
) -> Result<FittedPipeline, PipelineError> {
    if data.is_empty() {
        return Err(PipelineError::NoRows);
    }

    let preprocessor = Preprocessor::fit(data)?;
    let x = preprocessor.transform(data);
    let classifier = fit_logistic(&x, &data.target, solver)?;

    Ok(FittedPipeline {
        preprocessor,
        classifier,
        classes: data.classes.clone(),
        solver: *solver,
        n_samples: data.len(),
    })
}
