//! Two-stage least squares (2SLS) instrumental-variables solver.

use crate::core::{IvModel, RegressionOptions, RegressionOptionsBuilder, RegressionResult};
use crate::inference::CoefficientInference;
use crate::solvers::ols::{linear_predictor, project, OlsRegressor};
use crate::solvers::traits::{FittedRegressor, RegressionError};
use crate::utils::column;
use faer::{Col, Mat};

/// Data defining a linear IV model: outcome, named regressors and named instruments.
///
/// Exogenous regressors must appear in both matrices under the same name,
/// including any constant column.
#[derive(Debug, Clone)]
pub struct IvDesign {
    y: Col<f64>,
    x: Mat<f64>,
    x_names: Vec<String>,
    w: Mat<f64>,
    w_names: Vec<String>,
}

impl IvDesign {
    /// Create a design after checking that all dimensions agree.
    pub fn new(
        y: Col<f64>,
        x: Mat<f64>,
        x_names: Vec<String>,
        w: Mat<f64>,
        w_names: Vec<String>,
    ) -> Result<Self, RegressionError> {
        if x.nrows() != y.nrows() {
            return Err(RegressionError::DimensionMismatch {
                x_rows: x.nrows(),
                y_len: y.nrows(),
            });
        }
        if w.nrows() != y.nrows() {
            return Err(RegressionError::DimensionMismatch {
                x_rows: w.nrows(),
                y_len: y.nrows(),
            });
        }
        if x_names.len() != x.ncols() {
            return Err(RegressionError::NameCountMismatch {
                what: "regressors",
                expected: x.ncols(),
                got: x_names.len(),
            });
        }
        if w_names.len() != w.ncols() {
            return Err(RegressionError::NameCountMismatch {
                what: "instruments",
                expected: w.ncols(),
                got: w_names.len(),
            });
        }

        Ok(Self {
            y,
            x,
            x_names,
            w,
            w_names,
        })
    }

    /// Number of observations.
    pub fn n_observations(&self) -> usize {
        self.y.nrows()
    }
}

impl IvModel for IvDesign {
    fn outcome(&self) -> &Col<f64> {
        &self.y
    }

    fn regressors(&self) -> &Mat<f64> {
        &self.x
    }

    fn regressor_names(&self) -> &[String] {
        &self.x_names
    }

    fn instrument_names(&self) -> &[String] {
        &self.w_names
    }

    fn instruments(&self) -> &Mat<f64> {
        &self.w
    }
}

/// Two-stage least squares estimator.
///
/// The first stage replaces every regressor column by its projection on the
/// instruments, `X̂ = P_W X`; the second stage regresses `y` on `X̂`.
/// Residuals and σ² use the original regressors, so standard errors are
/// `sqrt(σ² · diag((X̂'X̂)⁻¹))` with `σ² = ‖y − Xβ̂‖² / (n − p)`.
///
/// # Example
///
/// ```rust,ignore
/// use ivregress::solvers::{IvDesign, IvRegressor};
///
/// let design = IvDesign::new(y, x, x_names, w, w_names)?;
/// let fitted = IvRegressor::builder().build().fit(&design)?;
/// println!("educ = {:?}", fitted.coefficient("educ"));
/// ```
#[derive(Debug, Clone)]
pub struct IvRegressor {
    options: RegressionOptions,
}

impl IvRegressor {
    /// Create a new 2SLS regressor with the given options.
    pub fn new(options: RegressionOptions) -> Self {
        Self { options }
    }

    /// Create a builder for configuring the regressor.
    pub fn builder() -> IvRegressorBuilder {
        IvRegressorBuilder::default()
    }

    /// Fit the model by two-stage least squares.
    pub fn fit(&self, design: &IvDesign) -> Result<FittedIv, RegressionError> {
        self.options.validate()?;

        let n = design.n_observations();
        let p = design.x.ncols();
        let l = design.w.ncols();

        if l < p {
            return Err(RegressionError::UnderIdentified {
                instruments: l,
                regressors: p,
            });
        }
        if n <= p {
            return Err(RegressionError::InsufficientObservations {
                needed: p + 1,
                got: n,
            });
        }

        // First stage: X̂ = P_W X, one column at a time.
        let mut x_hat = Mat::zeros(n, p);
        for j in 0..p {
            let fitted = project(&column(&design.x, j), &design.w, self.options.rank_tolerance)?;
            for i in 0..n {
                x_hat[(i, j)] = fitted[i];
            }
        }
        log::debug!("2SLS first stage done: n = {n}, p = {p}, l = {l}");

        // Second stage: y on X̂, no implicit intercept.
        let second = OlsRegressor::builder()
            .with_intercept(false)
            .rank_tolerance(self.options.rank_tolerance)
            .build();
        let (coefficients, aliased, rank) =
            second.solve_with_qr(&x_hat, &design.y, &vec![false; p])?;
        if rank < p {
            return Err(RegressionError::SingularMatrix);
        }

        let fitted_values = linear_predictor(&design.x, &coefficients, &aliased, 0.0);
        let residuals = Col::from_fn(n, |i| design.y[i] - fitted_values[i]);

        let mut result = RegressionResult::empty(p, n);
        result.coefficients = coefficients;
        result.residuals = residuals;
        result.fitted_values = fitted_values;
        result.rank = rank;
        result.n_parameters = p;
        result.aliased = aliased;
        result.rank_tolerance = self.options.rank_tolerance;
        result.confidence_level = self.options.confidence_level;

        let rss = result.rss();
        let y_mean = design.y.iter().sum::<f64>() / n as f64;
        let tss: f64 = design.y.iter().map(|&yi| (yi - y_mean).powi(2)).sum();
        result.r_squared = if tss > 0.0 { 1.0 - rss / tss } else { f64::NAN };
        result.mse = rss / (n - p) as f64;
        result.rmse = result.mse.sqrt();

        if self.options.compute_inference {
            self.compute_inference(&x_hat, &mut result);
        }

        Ok(FittedIv {
            options: self.options.clone(),
            design: design.clone(),
            result,
        })
    }

    /// Standard errors, t-statistics, p-values and CIs from the X̂ covariance.
    fn compute_inference(&self, x_hat: &Mat<f64>, result: &mut RegressionResult) {
        let df = result.residual_df() as f64;

        match CoefficientInference::standard_errors(x_hat, result.mse, &result.aliased) {
            Ok(se) => {
                let t_stats = CoefficientInference::t_statistics(&result.coefficients, &se);
                let p_vals = CoefficientInference::p_values(&t_stats, df);
                let (ci_lower, ci_upper) = CoefficientInference::confidence_intervals(
                    &result.coefficients,
                    &se,
                    df,
                    self.options.confidence_level,
                );

                result.std_errors = Some(se);
                result.t_statistics = Some(t_stats);
                result.p_values = Some(p_vals);
                result.conf_interval_lower = Some(ci_lower);
                result.conf_interval_upper = Some(ci_upper);
            }
            Err(reason) => {
                log::warn!("2SLS standard errors unavailable: {reason}");
            }
        }
    }
}

/// A fitted 2SLS model.
///
/// Keeps the design it was fitted on so it can be handed to the
/// Anderson-Rubin routines as an [`IvModel`].
#[derive(Debug, Clone)]
pub struct FittedIv {
    options: RegressionOptions,
    design: IvDesign,
    result: RegressionResult,
}

impl FittedIv {
    /// Get the options used to fit this model.
    pub fn options(&self) -> &RegressionOptions {
        &self.options
    }

    /// The design the model was fitted on.
    pub fn design(&self) -> &IvDesign {
        &self.design
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.design.x_names.iter().position(|n| n == name)
    }

    /// Coefficient of the named regressor.
    pub fn coefficient(&self, name: &str) -> Option<f64> {
        self.index_of(name)
            .and_then(|j| self.result.get_coefficient(j))
    }

    /// Standard error of the named regressor's coefficient.
    pub fn std_error(&self, name: &str) -> Option<f64> {
        let j = self.index_of(name)?;
        self.result.std_errors.as_ref().map(|se| se[j])
    }
}

impl FittedRegressor for FittedIv {
    fn predict(&self, x: &Mat<f64>) -> Col<f64> {
        linear_predictor(x, &self.result.coefficients, &self.result.aliased, 0.0)
    }

    fn result(&self) -> &RegressionResult {
        &self.result
    }
}

impl IvModel for FittedIv {
    fn outcome(&self) -> &Col<f64> {
        self.design.outcome()
    }

    fn regressors(&self) -> &Mat<f64> {
        self.design.regressors()
    }

    fn regressor_names(&self) -> &[String] {
        self.design.regressor_names()
    }

    fn instrument_names(&self) -> &[String] {
        self.design.instrument_names()
    }

    fn instruments(&self) -> &Mat<f64> {
        self.design.instruments()
    }
}

/// Builder for `IvRegressor`.
#[derive(Debug, Clone, Default)]
pub struct IvRegressorBuilder {
    builder: RegressionOptionsBuilder,
}

impl IvRegressorBuilder {
    /// Create a new builder with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether to compute inference statistics.
    pub fn compute_inference(mut self, compute: bool) -> Self {
        self.builder = self.builder.compute_inference(compute);
        self
    }

    /// Set the confidence level for coefficient confidence intervals.
    pub fn confidence_level(mut self, level: f64) -> Self {
        self.builder = self.builder.confidence_level(level);
        self
    }

    /// Set the rank tolerance for QR decomposition.
    pub fn rank_tolerance(mut self, tol: f64) -> Self {
        self.builder = self.builder.rank_tolerance(tol);
        self
    }

    /// Build the 2SLS regressor. Options are validated when fitting.
    pub fn build(self) -> IvRegressor {
        IvRegressor::new(self.builder.build_unchecked())
    }
}
