//! Class filtering and feature selection
//!
//! Turns a raw frame into a `TrainingSet`: rows restricted to the two
//! configured classes, labels mapped to 0/1, and the selected feature
//! columns extracted with their missing values intact.

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use super::error::PipelineError;

/// Mapping from label values to the binary target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassMapping {
    /// Value that maps to 0
    pub negative: String,
    /// Value that maps to 1
    pub positive: String,
}

impl ClassMapping {
    pub fn new(negative: impl Into<String>, positive: impl Into<String>) -> Self {
        Self {
            negative: negative.into(),
            positive: positive.into(),
        }
    }

    /// Map a label value to its class index, `None` for anything else.
    pub fn class_of(&self, value: &str) -> Option<u8> {
        if value == self.negative {
            Some(0)
        } else if value == self.positive {
            Some(1)
        } else {
            None
        }
    }

    /// Label value for a class index.
    pub fn label(&self, class: u8) -> &str {
        if class == 0 {
            &self.negative
        } else {
            &self.positive
        }
    }
}

impl Default for ClassMapping {
    fn default() -> Self {
        Self::new("Adelie", "Gentoo")
    }
}

/// How rows with missing values are handled before fitting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingPolicy {
    /// Drop rows with a null in any column of the filtered frame
    #[default]
    DropAll,
    /// Drop rows with a null in the selected feature columns only
    DropFeatures,
    /// Keep every row and let the imputers fill gaps
    Impute,
}

/// Which columns feed the model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSpec {
    pub numeric: Vec<String>,
    pub categorical: Vec<String>,
}

impl FeatureSpec {
    pub fn new(numeric: Vec<String>, categorical: Vec<String>) -> Self {
        Self {
            numeric,
            categorical,
        }
    }

    pub fn all_columns(&self) -> impl Iterator<Item = &String> {
        self.numeric.iter().chain(self.categorical.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.numeric.is_empty() && self.categorical.is_empty()
    }
}

impl Default for FeatureSpec {
    fn default() -> Self {
        Self::new(
            vec!["bill_length_mm".to_string(), "bill_depth_mm".to_string()],
            Vec::new(),
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NumericColumn {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoricalColumn {
    pub name: String,
    pub values: Vec<Option<String>>,
}

/// Feature columns and 0/1 target ready for fitting
#[derive(Debug, Clone)]
pub struct TrainingSet {
    pub numeric: Vec<NumericColumn>,
    pub categorical: Vec<CategoricalColumn>,
    pub target: Vec<u8>,
    pub classes: ClassMapping,
}

impl TrainingSet {
    pub fn len(&self) -> usize {
        self.target.len()
    }

    pub fn is_empty(&self) -> bool {
        self.target.is_empty()
    }

    /// Row counts as `(negative, positive)`.
    pub fn class_counts(&self) -> (usize, usize) {
        let positive = self.target.iter().filter(|&&t| t == 1).count();
        (self.target.len() - positive, positive)
    }
}

fn require_column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Column, PipelineError> {
    df.column(name).map_err(|_| PipelineError::MissingColumn {
        column: name.to_string(),
        available: df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect(),
    })
}

/// Convert a column to a Vec of Option<String> for comparison
fn column_to_string_vec(col: &Column) -> Result<Vec<Option<String>>, PipelineError> {
    let values: Vec<Option<String>> = match col.dtype() {
        DataType::String => col
            .str()?
            .into_iter()
            .map(|v| v.map(|s| s.to_string()))
            .collect(),
        DataType::Float32 | DataType::Float64 => {
            let cast = col.cast(&DataType::Float64)?;
            cast.f64()?
                .into_iter()
                .map(|v| v.map(|n| format!("{}", n)))
                .collect()
        }
        _ => {
            let cast = col.cast(&DataType::String)?;
            cast.str()?
                .into_iter()
                .map(|v| v.map(|s| s.to_string()))
                .collect()
        }
    };

    Ok(values)
}

/// Keep only rows whose label is one of the two configured classes.
///
/// Errors when the label column is missing or either class ends up empty.
pub fn filter_two_classes(
    df: &DataFrame,
    label: &str,
    classes: &ClassMapping,
) -> Result<DataFrame, PipelineError> {
    if classes.negative == classes.positive {
        return Err(PipelineError::IdenticalClasses(classes.negative.clone()));
    }

    let labels = column_to_string_vec(require_column(df, label)?)?;
    let mut seen = [false; 2];
    let mask: BooleanChunked = labels
        .iter()
        .map(|v| {
            let class = v.as_deref().and_then(|s| classes.class_of(s));
            if let Some(c) = class {
                seen[c as usize] = true;
            }
            Some(class.is_some())
        })
        .collect();

    for (class, present) in seen.iter().enumerate() {
        if !present {
            return Err(PipelineError::EmptyClass {
                label: label.to_string(),
                class: classes.label(class as u8).to_string(),
            });
        }
    }

    Ok(df.filter(&mask)?)
}

/// Drop rows according to the missing-value policy.
pub fn apply_missing_policy(
    df: &DataFrame,
    features: &FeatureSpec,
    policy: MissingPolicy,
) -> Result<DataFrame, PipelineError> {
    let columns: Vec<&Column> = match policy {
        MissingPolicy::Impute => return Ok(df.clone()),
        MissingPolicy::DropAll => df.get_columns().iter().collect(),
        MissingPolicy::DropFeatures => features
            .all_columns()
            .map(|name| require_column(df, name))
            .collect::<Result<_, _>>()?,
    };

    let mut keep = vec![true; df.height()];
    for column in columns {
        // NaN counts as missing, as in pandas
        if column.dtype().is_float() {
            let values = column.cast(&DataType::Float64)?;
            for (slot, value) in keep.iter_mut().zip(values.f64()?) {
                *slot &= value.is_some_and(|v| !v.is_nan());
            }
        } else if column.null_count() > 0 {
            let present = column.as_materialized_series().is_not_null();
            for (slot, flag) in keep.iter_mut().zip(&present) {
                *slot &= flag.unwrap_or(false);
            }
        }
    }

    let mask: BooleanChunked = keep.into_iter().map(Some).collect();
    Ok(df.filter(&mask)?)
}

/// Filter, select and extract the columns the pipeline trains on.
///
/// Checks that the label and every feature column exist before touching
/// any data, so a typo fails fast with the list of available columns.
pub fn select_training_set(
    df: &DataFrame,
    label: &str,
    features: &FeatureSpec,
    classes: &ClassMapping,
    policy: MissingPolicy,
) -> Result<TrainingSet, PipelineError> {
    if features.is_empty() {
        return Err(PipelineError::NoFeatures);
    }
    require_column(df, label)?;
    for name in features.all_columns() {
        require_column(df, name)?;
    }

    let filtered = filter_two_classes(df, label, classes)?;
    let filtered = apply_missing_policy(&filtered, features, policy)?;
    if filtered.height() == 0 {
        return Err(PipelineError::NoRows);
    }

    let target: Vec<u8> = column_to_string_vec(require_column(&filtered, label)?)?
        .into_iter()
        // Rows were already restricted to the two classes
        .map(|v| v.as_deref().and_then(|s| classes.class_of(s)).unwrap_or(0))
        .collect();

    // Dropping rows may remove a class entirely
    for class in 0..2u8 {
        if !target.contains(&class) {
            return Err(PipelineError::EmptyClass {
                label: label.to_string(),
                class: classes.label(class).to_string(),
            });
        }
    }

    let numeric = features
        .numeric
        .iter()
        .map(|name| {
            let column = require_column(&filtered, name)?;
            if !column.dtype().is_primitive_numeric() && column.null_count() != column.len() {
                return Err(PipelineError::NotNumeric {
                    column: name.clone(),
                    dtype: column.dtype().to_string(),
                });
            }
            let cast = column.cast(&DataType::Float64)?;
            let values = cast
                .f64()?
                .into_iter()
                .map(|v| v.filter(|x| !x.is_nan()))
                .collect();
            Ok(NumericColumn {
                name: name.clone(),
                values,
            })
        })
        .collect::<Result<Vec<_>, PipelineError>>()?;

    let categorical = features
        .categorical
        .iter()
        .map(|name| {
            let values = column_to_string_vec(require_column(&filtered, name)?)?;
            Ok(CategoricalColumn {
                name: name.clone(),
                values,
            })
        })
        .collect::<Result<Vec<_>, PipelineError>>()?;

    Ok(TrainingSet {
        numeric,
        categorical,
        target,
        classes: classes.clone(),
    })
}
