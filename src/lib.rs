//! Instrumental-variables regression with weak-instrument-robust inference.
//!
//! The crate fits linear IV models by two-stage least squares and computes
//! Anderson-Rubin confidence sets for the coefficient of a single endogenous
//! regressor. Anderson-Rubin sets keep their coverage when instruments are
//! weak, at the price of not always being a bounded interval: see
//! [`ConfidenceInterval`] for the possible shapes.
//!
//! # Example
//!
//! ```rust,ignore
//! use ivregress::prelude::*;
//!
//! let data = Dataset::from_csv("card_data.csv")?;
//! let design = data.iv_design(
//!     "lwage",
//!     &["educ", "exper", "expersq", "black", "south", "smsa"],
//!     &["nearc4", "exper", "expersq", "black", "south", "smsa"],
//!     true,
//! )?;
//!
//! let fitted = IvRegressor::builder().build().fit(&design)?;
//! println!("educ = {:?} ({:?})", fitted.coefficient("educ"), fitted.std_error("educ"));
//!
//! let ci = anderson_rubin_ci(&fitted, 0.95)?;
//! println!("AR 95% CI: {ci}");
//! ```

pub mod core;
pub mod data;
pub mod inference;
pub mod solvers;
pub mod utils;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::core::{
        ConfidenceInterval, IvModel, RegressionOptions, RegressionOptionsBuilder,
        RegressionResult,
    };
    pub use crate::data::{DataError, Dataset};
    pub use crate::inference::{anderson_rubin_ci, AndersonRubin, ArTest, QuadraticForm};
    pub use crate::solvers::{
        ErrorKind, FittedIv, FittedOls, FittedRegressor, IvDesign, IvRegressor, OlsRegressor,
        RegressionError, Regressor,
    };
}

pub use crate::core::{ConfidenceInterval, IvModel, RegressionOptions, RegressionResult};
pub use crate::inference::{anderson_rubin_ci, AndersonRubin};
pub use crate::solvers::{FittedIv, IvDesign, IvRegressor, RegressionError};
