//! Report module - summarizing the fitted model

pub mod model_export;
pub mod summary;

pub use model_export::*;
pub use summary::*;
