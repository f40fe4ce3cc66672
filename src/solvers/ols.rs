//! Ordinary Least Squares regression solver.

use crate::core::{RegressionOptions, RegressionOptionsBuilder, RegressionResult};
use crate::solvers::traits::{FittedRegressor, RegressionError, Regressor};
use crate::utils::{center_columns, center_vector, detect_constant_columns};
use faer::{Col, Mat};

/// Ordinary Least Squares regression estimator.
///
/// Uses QR decomposition with column pivoting to handle rank-deficient matrices.
/// Aliased (collinear) coefficients are set to NaN.
///
/// # Example
///
/// ```rust,ignore
/// use ivregress::solvers::{OlsRegressor, Regressor, FittedRegressor};
/// use faer::{Mat, Col};
///
/// let x = Mat::from_fn(100, 2, |i, j| (i + j) as f64);
/// let y = Col::from_fn(100, |i| 1.0 + 2.0 * i as f64);
///
/// let fitted = OlsRegressor::builder()
///     .with_intercept(true)
///     .build()
///     .fit(&x, &y)?;
///
/// println!("R² = {}", fitted.r_squared());
/// ```
#[derive(Debug, Clone)]
pub struct OlsRegressor {
    options: RegressionOptions,
}

impl OlsRegressor {
    /// Create a new OLS regressor with the given options.
    pub fn new(options: RegressionOptions) -> Self {
        Self { options }
    }

    /// Create a builder for configuring the regressor.
    pub fn builder() -> OlsRegressorBuilder {
        OlsRegressorBuilder::default()
    }
}

impl Regressor for OlsRegressor {
    type Fitted = FittedOls;

    fn fit(&self, x: &Mat<f64>, y: &Col<f64>) -> Result<Self::Fitted, RegressionError> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if x.nrows() != y.nrows() {
            return Err(RegressionError::DimensionMismatch {
                x_rows: x.nrows(),
                y_len: y.nrows(),
            });
        }

        // Exact fits (n_params == n_samples) are allowed.
        let n_params = if self.options.with_intercept {
            n_features + 1
        } else {
            n_features
        };

        if n_samples == 0 || n_samples < n_params {
            return Err(RegressionError::InsufficientObservations {
                needed: n_params.max(1),
                got: n_samples,
            });
        }

        let (coefficients, aliased, rank, intercept) = if self.options.with_intercept {
            // Constant columns are absorbed by the intercept.
            let constant_cols = detect_constant_columns(x, self.options.rank_tolerance);
            let (x_centered, x_means) = center_columns(x);
            let (y_centered, y_mean) = center_vector(y);

            let (coefficients, aliased, rank) =
                self.solve_with_qr(&x_centered, &y_centered, &constant_cols)?;

            // intercept = y_mean - x_means' * coefficients
            let mut intercept = y_mean;
            for j in 0..n_features {
                if !aliased[j] {
                    intercept -= x_means[j] * coefficients[j];
                }
            }
            (coefficients, aliased, rank, Some(intercept))
        } else {
            let (coefficients, aliased, rank) =
                self.solve_with_qr(x, y, &vec![false; n_features])?;
            (coefficients, aliased, rank, None)
        };

        let fitted_values = linear_predictor(x, &coefficients, &aliased, intercept.unwrap_or(0.0));
        let residuals = Col::from_fn(n_samples, |i| y[i] - fitted_values[i]);

        let n_params = rank + usize::from(intercept.is_some());
        let result = self.compute_statistics(
            y,
            coefficients,
            intercept,
            residuals,
            fitted_values,
            aliased,
            rank,
            n_params,
        );

        Ok(FittedOls {
            options: self.options.clone(),
            result,
        })
    }
}

impl OlsRegressor {
    /// Solve the least squares problem using QR decomposition with column pivoting.
    pub(crate) fn solve_with_qr(
        &self,
        x: &Mat<f64>,
        y: &Col<f64>,
        constant_cols: &[bool],
    ) -> Result<(Col<f64>, Vec<bool>, usize), RegressionError> {
        let n_features = x.ncols();
        let n_samples = x.nrows();

        let mut aliased = constant_cols.to_vec();

        if n_features == 0 {
            return Ok((Col::zeros(0), aliased, 0));
        }

        let qr = x.col_piv_qr();
        let q = qr.compute_Q();
        let r = qr.R();
        let perm = qr.P();

        // perm_inv[j] = position of original column j after pivoting
        let perm_arr = perm.arrays().0;
        let mut perm_inv: Vec<usize> = vec![0; n_features];
        perm_inv[..n_features].copy_from_slice(&perm_arr[..n_features]);

        // Numerical rank from the R diagonal
        let mut rank = 0;
        for i in 0..n_features.min(n_samples) {
            if r[(i, i)].abs() > self.options.rank_tolerance {
                rank += 1;
            } else {
                break;
            }
        }

        if rank == 0 {
            return Ok((
                Col::from_fn(n_features, |_| f64::NAN),
                vec![true; n_features],
                0,
            ));
        }

        for j in 0..n_features {
            if constant_cols[j] || perm_inv[j] >= rank {
                aliased[j] = true;
            }
        }

        // Solve R * beta_perm = Q' * y for the non-aliased part
        let qty = q.transpose() * y;

        let mut beta_reduced = Col::zeros(rank);
        for i in (0..rank).rev() {
            let mut sum = qty[i];
            for j in (i + 1)..rank {
                sum -= r[(i, j)] * beta_reduced[j];
            }
            beta_reduced[i] = sum / r[(i, i)];
        }

        let coefficients = Col::from_fn(n_features, |j| {
            if aliased[j] {
                f64::NAN
            } else {
                beta_reduced[perm_inv[j]]
            }
        });

        if coefficients
            .iter()
            .zip(aliased.iter())
            .any(|(c, &a)| !a && !c.is_finite())
        {
            return Err(RegressionError::NonFinite {
                quantity: "least squares coefficients",
            });
        }

        Ok((coefficients, aliased, rank))
    }

    /// Compute fit statistics.
    #[allow(clippy::too_many_arguments)]
    fn compute_statistics(
        &self,
        y: &Col<f64>,
        coefficients: Col<f64>,
        intercept: Option<f64>,
        residuals: Col<f64>,
        fitted_values: Col<f64>,
        aliased: Vec<bool>,
        rank: usize,
        n_params: usize,
    ) -> RegressionResult {
        let n = y.nrows();

        let y_mean: f64 = y.iter().sum::<f64>() / n as f64;
        let tss: f64 = y.iter().map(|&yi| (yi - y_mean).powi(2)).sum();
        let rss: f64 = residuals.iter().map(|&r| r.powi(2)).sum();

        let r_squared = if tss > 0.0 {
            (1.0 - rss / tss).clamp(0.0, 1.0)
        } else if rss < 1e-10 {
            1.0
        } else {
            0.0
        };

        let df_resid = n.saturating_sub(n_params);
        let mse = if df_resid > 0 {
            rss / df_resid as f64
        } else {
            f64::NAN
        };

        let mut result = RegressionResult::empty(coefficients.nrows(), n);
        result.coefficients = coefficients;
        result.intercept = intercept;
        result.residuals = residuals;
        result.fitted_values = fitted_values;
        result.rank = rank;
        result.n_parameters = n_params;
        result.aliased = aliased;
        result.rank_tolerance = self.options.rank_tolerance;
        result.r_squared = r_squared;
        result.mse = mse;
        result.rmse = mse.sqrt();
        result.confidence_level = self.options.confidence_level;
        result
    }
}

/// `intercept + X·β`, skipping aliased columns.
pub(crate) fn linear_predictor(
    x: &Mat<f64>,
    coefficients: &Col<f64>,
    aliased: &[bool],
    intercept: f64,
) -> Col<f64> {
    Col::from_fn(x.nrows(), |i| {
        let mut pred = intercept;
        for j in 0..x.ncols() {
            if !aliased[j] {
                pred += x[(i, j)] * coefficients[j];
            }
        }
        pred
    })
}

/// Least-squares projection of `y` onto the column space of `design`.
///
/// Fits `y ≈ design · β` without an intercept and returns the fitted values.
/// The design must have full column rank and at least as many rows as
/// columns; otherwise the result is [`RegressionError::SingularMatrix`]. A design with no columns projects
/// onto the zero vector.
pub fn project(
    y: &Col<f64>,
    design: &Mat<f64>,
    rank_tolerance: f64,
) -> Result<Col<f64>, RegressionError> {
    if design.nrows() != y.nrows() {
        return Err(RegressionError::DimensionMismatch {
            x_rows: design.nrows(),
            y_len: y.nrows(),
        });
    }
    if design.ncols() == 0 {
        return Ok(Col::zeros(y.nrows()));
    }
    if design.ncols() > design.nrows() {
        return Err(RegressionError::SingularMatrix);
    }
    log::trace!("projecting onto {} x {} design", design.nrows(), design.ncols());

    let fitted = OlsRegressor::builder()
        .with_intercept(false)
        .rank_tolerance(rank_tolerance)
        .build()
        .fit(design, y)?;

    if fitted.result().has_aliased() {
        log::debug!(
            "projection design is rank deficient: rank {} of {} columns",
            fitted.result().rank,
            design.ncols()
        );
        return Err(RegressionError::SingularMatrix);
    }

    Ok(fitted.result.fitted_values)
}

/// A fitted OLS regression model.
#[derive(Debug, Clone)]
pub struct FittedOls {
    options: RegressionOptions,
    result: RegressionResult,
}

impl FittedOls {
    /// Get the options used to fit this model.
    pub fn options(&self) -> &RegressionOptions {
        &self.options
    }
}

impl FittedRegressor for FittedOls {
    fn predict(&self, x: &Mat<f64>) -> Col<f64> {
        linear_predictor(
            x,
            &self.result.coefficients,
            &self.result.aliased,
            self.result.intercept.unwrap_or(0.0),
        )
    }

    fn result(&self) -> &RegressionResult {
        &self.result
    }
}

/// Builder for `OlsRegressor`.
#[derive(Debug, Clone, Default)]
pub struct OlsRegressorBuilder {
    builder: RegressionOptionsBuilder,
}

impl OlsRegressorBuilder {
    /// Create a new builder with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether to include an intercept term.
    pub fn with_intercept(mut self, include: bool) -> Self {
        self.builder = self.builder.with_intercept(include);
        self
    }

    /// Set the rank tolerance for QR decomposition.
    pub fn rank_tolerance(mut self, tol: f64) -> Self {
        self.builder = self.builder.rank_tolerance(tol);
        self
    }

    /// Build the OLS regressor.
    pub fn build(self) -> OlsRegressor {
        OlsRegressor::new(self.builder.build_unchecked())
    }
}
