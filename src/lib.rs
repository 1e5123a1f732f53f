//! Penguin export: logistic regression to ONNX / PMML
//!
//! Loads the penguins dataset, fits an imputer + scaler / one-hot encoder +
//! logistic-regression pipeline on two species, and writes the fitted model
//! as an ONNX graph or a PMML document.

pub mod cli;
pub mod export;
pub mod pipeline;
pub mod report;
pub mod utils;
