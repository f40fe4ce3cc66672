//! Core traits and the error type for estimators.

use crate::core::RegressionResult;
use faer::{Col, Mat};
use thiserror::Error;

/// Broad classification of a [`RegressionError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The inputs or settings cannot describe a valid problem.
    Configuration,
    /// The problem is well posed but could not be computed reliably.
    Numerical,
}

/// Errors that can occur during fitting and inference.
#[derive(Debug, Error)]
pub enum RegressionError {
    #[error("dimension mismatch: X has {x_rows} rows but y has {y_len} elements")]
    DimensionMismatch { x_rows: usize, y_len: usize },

    #[error("{what}: expected {expected} names, got {got}")]
    NameCountMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("insufficient observations: need at least {needed}, got {got}")]
    InsufficientObservations { needed: usize, got: usize },

    #[error("invalid options: {0}")]
    InvalidOptions(#[from] crate::core::OptionsError),

    #[error("invalid degrees of freedom: {parameter} = {value} must be positive")]
    InvalidDegreesOfFreedom { parameter: &'static str, value: i64 },

    #[error("expected exactly one endogenous regressor, found {found}")]
    EndogenousCount { found: usize },

    #[error("under-identified: {instruments} instruments for {regressors} regressors")]
    UnderIdentified { instruments: usize, regressors: usize },

    #[error("matrix is singular or nearly singular")]
    SingularMatrix,

    #[error("non-finite value in {quantity}")]
    NonFinite { quantity: &'static str },

    #[error("numerical error: {0}")]
    NumericalError(String),
}

impl RegressionError {
    /// Classify the error as a configuration or numerical failure.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DimensionMismatch { .. }
            | Self::NameCountMismatch { .. }
            | Self::InsufficientObservations { .. }
            | Self::InvalidOptions(_)
            | Self::InvalidDegreesOfFreedom { .. }
            | Self::EndogenousCount { .. }
            | Self::UnderIdentified { .. } => ErrorKind::Configuration,
            Self::SingularMatrix | Self::NonFinite { .. } | Self::NumericalError(_) => {
                ErrorKind::Numerical
            }
        }
    }

    /// Returns true for invalid inputs or settings.
    pub fn is_configuration(&self) -> bool {
        self.kind() == ErrorKind::Configuration
    }

    /// Returns true for failures of the numerical computation itself.
    pub fn is_numerical(&self) -> bool {
        self.kind() == ErrorKind::Numerical
    }
}

/// A regression estimator that can be fit to data.
///
/// Fitting returns a fitted model that can then make predictions.
pub trait Regressor {
    /// The type of the fitted model.
    type Fitted: FittedRegressor;

    /// Fit the model to the data.
    ///
    /// # Arguments
    /// * `x` - Design matrix of shape (n_samples, n_features)
    /// * `y` - Target vector of length n_samples
    fn fit(&self, x: &Mat<f64>, y: &Col<f64>) -> Result<Self::Fitted, RegressionError>;
}

/// A fitted regression model that can make predictions.
pub trait FittedRegressor {
    /// Make predictions on new data.
    fn predict(&self, x: &Mat<f64>) -> Col<f64>;

    /// Access the regression results (coefficients, statistics, etc.).
    fn result(&self) -> &RegressionResult;

    /// Get the coefficients (convenience method).
    fn coefficients(&self) -> &Col<f64> {
        &self.result().coefficients
    }

    /// Get the intercept (convenience method).
    fn intercept(&self) -> Option<f64> {
        self.result().intercept
    }

    /// Get R² (convenience method).
    fn r_squared(&self) -> f64 {
        self.result().r_squared
    }

    /// Calculate the score (R²) on new data.
    fn score(&self, x: &Mat<f64>, y: &Col<f64>) -> f64 {
        let predictions = self.predict(x);
        let n = y.nrows();

        let y_mean: f64 = y.iter().sum::<f64>() / n as f64;
        let tss: f64 = y.iter().map(|&yi| (yi - y_mean).powi(2)).sum();
        let rss: f64 = y
            .iter()
            .zip(predictions.iter())
            .map(|(&yi, &pi)| (yi - pi).powi(2))
            .sum();

        if tss == 0.0 {
            if rss == 0.0 {
                1.0
            } else {
                0.0
            }
        } else {
            1.0 - rss / tss
        }
    }
}
