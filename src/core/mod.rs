//! Core types for instrumental-variables regression.

mod interval;
mod model;
mod options;
mod result;

pub use interval::ConfidenceInterval;
pub use model::IvModel;
pub use options::{OptionsError, RegressionOptions, RegressionOptionsBuilder};
pub use result::RegressionResult;
