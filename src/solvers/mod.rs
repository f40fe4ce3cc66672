//! Least-squares solvers for linear and instrumental-variables models.

mod traits;
mod ols;
mod iv;

pub use traits::{ErrorKind, FittedRegressor, Regressor, RegressionError};
pub use ols::{project, FittedOls, OlsRegressor, OlsRegressorBuilder};
pub use iv::{FittedIv, IvDesign, IvRegressor, IvRegressorBuilder};
