//! Command-line argument definitions using clap

use clap::error::ErrorKind;
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::export::onnx::{DEFAULT_OPSET, MAX_OPSET, MIN_OPSET};
use crate::pipeline::{ClassMapping, FeatureSpec, MissingPolicy, SolverConfig};

/// Penguin export - fit a logistic-regression classifier on the penguins dataset
/// and save it as ONNX or PMML
#[derive(Parser, Debug)]
#[command(name = "penguin-export")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Parse the process arguments, exiting with a usage error when the
    /// training options are inconsistent
    pub fn parse_validated() -> Self {
        match Self::try_parse_validated_from(std::env::args_os()) {
            Ok(cli) => cli,
            Err(e) => e.exit(),
        }
    }

    pub fn try_parse_validated_from<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli = Self::try_parse_from(args)?;
        cli.command
            .train_args()
            .validate()
            .map_err(|msg| Self::command().error(ErrorKind::ValueValidation, msg))?;
        Ok(cli)
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fit the pipeline and export it as an ONNX graph
    Onnx {
        #[command(flatten)]
        train: TrainArgs,

        /// ONNX opset for the default domain
        #[arg(long, default_value_t = DEFAULT_OPSET, value_parser = validate_opset)]
        target_opset: i64,
    },

    /// Fit the pipeline and export it as a PMML document
    Pmml {
        #[command(flatten)]
        train: TrainArgs,

        /// Omit the pipeline description from the PMML header
        #[arg(long, default_value = "false")]
        no_repr: bool,
    },
}

impl Commands {
    pub fn train_args(&self) -> &TrainArgs {
        match self {
            Commands::Onnx { train, .. } | Commands::Pmml { train, .. } => train,
        }
    }
}

/// Missing-value handling before fitting
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingArg {
    /// Drop rows with a null in any column (pandas `dropna()`)
    DropAll,
    /// Drop rows with a null in a selected feature column
    DropFeatures,
    /// Keep all rows and impute (mean for numeric, most frequent for categorical)
    Impute,
}

impl From<MissingArg> for MissingPolicy {
    fn from(arg: MissingArg) -> Self {
        match arg {
            MissingArg::DropAll => MissingPolicy::DropAll,
            MissingArg::DropFeatures => MissingPolicy::DropFeatures,
            MissingArg::Impute => MissingPolicy::Impute,
        }
    }
}

/// Options shared by every export format
#[derive(Args, Debug, Clone)]
pub struct TrainArgs {
    /// Input dataset (CSV or Parquet)
    #[arg(short, long, default_value = "data/penguins.csv")]
    pub input: PathBuf,

    /// Directory the artifact is written to (created if absent)
    #[arg(short, long, default_value = "model")]
    pub output_dir: PathBuf,

    /// Artifact file name without extension
    #[arg(long, default_value = "penguin")]
    pub name: String,

    /// Label column holding the class names
    #[arg(long, default_value = "species")]
    pub label: String,

    /// Label value mapped to class 0
    #[arg(long, default_value = "Adelie")]
    pub negative_class: String,

    /// Label value mapped to class 1
    #[arg(long, default_value = "Gentoo")]
    pub positive_class: String,

    /// Numeric feature columns (comma-separated)
    #[arg(
        short,
        long,
        value_delimiter = ',',
        default_value = "bill_length_mm,bill_depth_mm"
    )]
    pub features: Vec<String>,

    /// Categorical feature columns to one-hot encode (comma-separated), e.g. island
    #[arg(short, long, value_delimiter = ',')]
    pub categorical: Vec<String>,

    /// How rows with missing values are handled
    #[arg(long, value_enum, default_value_t = MissingArg::DropAll)]
    pub missing: MissingArg,

    /// Maximum optimizer iterations
    #[arg(long, default_value = "200", value_parser = validate_max_iter)]
    pub max_iter: usize,

    /// Inverse L2 regularization strength
    #[arg(long = "c", default_value = "1.0", value_parser = validate_positive)]
    pub c: f64,

    /// Gradient tolerance for convergence
    #[arg(long, default_value = "1e-4", value_parser = validate_positive)]
    pub tol: f64,

    /// Number of rows to use for schema inference (CSV only).
    /// Use 0 for full table scan.
    #[arg(long, default_value = "10000")]
    pub infer_schema_length: usize,

    /// Also write the fitted parameters as JSON to this path
    #[arg(long)]
    pub summary_json: Option<PathBuf>,
}

impl TrainArgs {
    pub fn feature_spec(&self) -> FeatureSpec {
        let clean = |cols: &[String]| -> Vec<String> {
            cols.iter()
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect()
        };
        FeatureSpec::new(clean(&self.features), clean(&self.categorical))
    }

    /// Checks that need more than one argument at a time
    pub fn validate(&self) -> Result<(), String> {
        if self.feature_spec().is_empty() {
            let msg = "at least one feature is required (--features or --categorical)";
            return Err(msg.to_string());
        }
        if self.negative_class == self.positive_class {
            return Err(format!(
                "--negative-class and --positive-class must differ, both are '{}'",
                self.negative_class
            ));
        }
        Ok(())
    }

    pub fn class_mapping(&self) -> ClassMapping {
        ClassMapping::new(self.negative_class.clone(), self.positive_class.clone())
    }

    pub fn solver_config(&self) -> SolverConfig {
        SolverConfig {
            c: self.c,
            max_iter: self.max_iter,
            tol: self.tol,
        }
    }

    pub fn missing_policy(&self) -> MissingPolicy {
        self.missing.into()
    }
}

/// Validator for strictly positive floats (C, tolerance)
fn validate_positive(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;

    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(format!("value must be a positive number, got {}", value))
    }
}

/// Validator for max_iter parameter
fn validate_max_iter(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid iteration count", s))?;

    if value == 0 {
        Err("max_iter must be at least 1".to_string())
    } else {
        Ok(value)
    }
}

/// Validator for target_opset parameter
fn validate_opset(s: &str) -> Result<i64, String> {
    let value: i64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid opset", s))?;

    if !(MIN_OPSET..=MAX_OPSET).contains(&value) {
        Err(format!(
            "target_opset must be between {} and {}, got {}",
            MIN_OPSET, MAX_OPSET, value
        ))
    } else {
        Ok(value)
    }
}
