//! Pipeline module - load, filter, preprocess and fit

pub mod dataset;
pub mod error;
pub mod loader;
pub mod logistic;
pub mod model;
pub mod preprocess;

pub use dataset::*;
pub use error::PipelineError;
pub use loader::*;
pub use logistic::{fit_logistic, sigmoid, LogisticModel, SolverConfig};
pub use model::*;
pub use preprocess::*;
