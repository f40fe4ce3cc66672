//! Anderson-Rubin confidence sets for a single endogenous regressor.
//!
//! The AR test of `H0: β = β0` regresses the restricted residual
//! `r = y1 − β0·y2` on the instruments and rejects when the excluded
//! instruments explain too much of it:
//!
//! ```text
//! F(β0) = [(RSS_Z − RSS_W) / (l − k)] / [RSS_W / (n − l)]
//! ```
//!
//! where `W` holds all `l` instruments and `Z` the `k` exogenous regressors.
//! The test does not depend on instrument strength, so inverting it gives
//! a confidence set with correct coverage even when instruments are weak.
//!
//! Accepting `F(β0) ≤ q` is equivalent to `Q(β0) = a·β0² + b·β0 + c ≥ 0` with
//! `cval = q·(l − k)/(n − l)` and
//!
//! ```text
//! a = cval·Σy2²   − (cval+1)·Σ y2·ŷ2_W + Σ y2·ŷ2_Z
//! b = −2cval·Σy1·y2 + 2(cval+1)·Σ y1·ŷ2_W − 2·Σ y1·ŷ2_Z
//! c = cval·Σy1²   − (cval+1)·Σ y1·ŷ1_W + Σ y1·ŷ1_Z
//! ```
//!
//! so the confidence set is obtained by solving a quadratic inequality.
//!
//! # Example
//!
//! ```rust,ignore
//! use ivregress::prelude::*;
//!
//! let fitted = IvRegressor::builder().build().fit(&design)?;
//! let ci = anderson_rubin_ci(&fitted, 0.95)?;
//! match ci {
//!     ConfidenceInterval::Bounded { lower, upper } => println!("[{lower}, {upper}]"),
//!     other => println!("{other}"),
//! }
//! ```

use crate::core::{
    ConfidenceInterval, IvModel, OptionsError, RegressionOptions, RegressionOptionsBuilder,
};
use crate::solvers::{project, RegressionError};
use crate::utils::{column, dot, select_columns};
use faer::{Col, Mat};
use statrs::distribution::{ContinuousCDF, FisherSnedecor};
use statrs::function::beta::inv_beta_reg;

/// Vectors and matrices extracted from an IV model for the AR computation.
#[derive(Debug, Clone)]
pub struct ArComponents {
    /// Outcome vector y1.
    pub y1: Col<f64>,
    /// The single endogenous regressor y2.
    pub y2: Col<f64>,
    /// Name of the endogenous regressor.
    pub endogenous: String,
    /// Regressor columns that are also instruments, n × k.
    pub z: Mat<f64>,
    /// Full instrument matrix, n × l.
    pub w: Mat<f64>,
    /// Number of observations.
    pub n: usize,
    /// Number of instruments.
    pub l: usize,
    /// Number of exogenous regressors.
    pub k: usize,
}

/// Split a fitted IV model into the pieces used by the AR test.
///
/// Regressor columns are classified by name: a column is exogenous when its
/// name appears among the instrument names and endogenous otherwise.
/// Exactly one endogenous column is required.
pub fn partition_model<M: IvModel + ?Sized>(model: &M) -> Result<ArComponents, RegressionError> {
    let y1 = model.outcome();
    let x = model.regressors();
    let w = model.instruments();
    let n = y1.nrows();

    if x.nrows() != n {
        return Err(RegressionError::DimensionMismatch {
            x_rows: x.nrows(),
            y_len: n,
        });
    }
    if w.nrows() != n {
        return Err(RegressionError::DimensionMismatch {
            x_rows: w.nrows(),
            y_len: n,
        });
    }
    if model.regressor_names().len() != x.ncols() {
        return Err(RegressionError::NameCountMismatch {
            what: "regressors",
            expected: x.ncols(),
            got: model.regressor_names().len(),
        });
    }
    if model.instrument_names().len() != w.ncols() {
        return Err(RegressionError::NameCountMismatch {
            what: "instruments",
            expected: w.ncols(),
            got: model.instrument_names().len(),
        });
    }

    let endogenous = model.endogenous_columns();
    if endogenous.len() != 1 {
        if endogenous.len() > 1 {
            let names: Vec<&str> = endogenous
                .iter()
                .map(|&j| model.regressor_names()[j].as_str())
                .collect();
            log::warn!("more than one endogenous regressor: {names:?}");
        }
        return Err(RegressionError::EndogenousCount {
            found: endogenous.len(),
        });
    }
    let exogenous = model.exogenous_columns();
    let j = endogenous[0];

    let components = ArComponents {
        y1: y1.clone(),
        y2: column(x, j),
        endogenous: model.regressor_names()[j].clone(),
        z: select_columns(x, &exogenous),
        w: w.clone(),
        n,
        l: w.ncols(),
        k: exogenous.len(),
    };
    log::debug!(
        "AR partition: endogenous = {}, n = {}, l = {}, k = {}",
        components.endogenous,
        components.n,
        components.l,
        components.k
    );
    Ok(components)
}

fn degrees_of_freedom(l: usize, k: usize, n: usize) -> Result<(f64, f64), RegressionError> {
    let df1 = l as i64 - k as i64;
    if df1 <= 0 {
        return Err(RegressionError::InvalidDegreesOfFreedom {
            parameter: "l - k",
            value: df1,
        });
    }
    let df2 = n as i64 - l as i64;
    if df2 <= 0 {
        return Err(RegressionError::InvalidDegreesOfFreedom {
            parameter: "n - l",
            value: df2,
        });
    }
    Ok((df1 as f64, df2 as f64))
}

/// Critical value `cval = q·(l − k)/(n − l)`, with `q` the `confidence_level`
/// quantile of `F(l − k, n − l)`.
pub fn critical_value(
    confidence_level: f64,
    l: usize,
    k: usize,
    n: usize,
) -> Result<f64, RegressionError> {
    if !(confidence_level > 0.0 && confidence_level < 1.0) {
        return Err(OptionsError::InvalidConfidenceLevel(confidence_level).into());
    }
    let (df1, df2) = degrees_of_freedom(l, k, n)?;
    FisherSnedecor::new(df1, df2).map_err(|e| RegressionError::NumericalError(e.to_string()))?;

    // F quantile through the inverse regularized incomplete beta function.
    let x = inv_beta_reg(df1 / 2.0, df2 / 2.0, confidence_level);
    let q = df2 * x / (df1 * (1.0 - x));
    if !q.is_finite() || q < 0.0 {
        return Err(RegressionError::NonFinite {
            quantity: "F quantile",
        });
    }

    let cval = q * df1 / df2;
    log::debug!("AR critical value: q = {q}, cval = {cval} (df = {df1}, {df2})");
    Ok(cval)
}

/// Fitted values of the four auxiliary projections.
#[derive(Debug, Clone)]
pub struct Projections {
    /// y2 projected on the instruments W.
    pub y2_on_w: Col<f64>,
    /// y2 projected on the exogenous regressors Z.
    pub y2_on_z: Col<f64>,
    /// y1 projected on the instruments W.
    pub y1_on_w: Col<f64>,
    /// y1 projected on the exogenous regressors Z.
    pub y1_on_z: Col<f64>,
}

impl Projections {
    /// Run the four least-squares projections.
    ///
    /// A rank-deficient W or Z is a [`RegressionError::SingularMatrix`].
    pub fn compute(
        components: &ArComponents,
        rank_tolerance: f64,
    ) -> Result<Self, RegressionError> {
        let ArComponents { y1, y2, z, w, .. } = components;
        Ok(Self {
            y2_on_w: project(y2, w, rank_tolerance)?,
            y2_on_z: project(y2, z, rank_tolerance)?,
            y1_on_w: project(y1, w, rank_tolerance)?,
            y1_on_z: project(y1, z, rank_tolerance)?,
        })
    }
}

fn ensure_finite(value: f64, quantity: &'static str) -> Result<f64, RegressionError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(RegressionError::NonFinite { quantity })
    }
}

/// The AR acceptance region `a·β0² + b·β0 + c ≥ 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadraticForm {
    /// Coefficient on β0².
    pub a: f64,
    /// Coefficient on β0.
    pub b: f64,
    /// Constant term.
    pub c: f64,
}

impl QuadraticForm {
    /// Create a form from raw coefficients.
    pub fn new(a: f64, b: f64, c: f64) -> Self {
        Self { a, b, c }
    }

    /// Assemble the coefficients from the projections and critical value.
    pub fn from_projections(
        cval: f64,
        components: &ArComponents,
        projections: &Projections,
    ) -> Result<Self, RegressionError> {
        let cval = ensure_finite(cval, "critical value")?;
        let ArComponents { y1, y2, .. } = components;

        let y2_y2 = ensure_finite(dot(y2, y2), "sum of y2^2")?;
        let y2_y2w = ensure_finite(dot(y2, &projections.y2_on_w), "sum of y2 * y2hat_w")?;
        let y2_y2z = ensure_finite(dot(y2, &projections.y2_on_z), "sum of y2 * y2hat_z")?;
        let y1_y2 = ensure_finite(dot(y1, y2), "sum of y1 * y2")?;
        let y1_y2w = ensure_finite(dot(y1, &projections.y2_on_w), "sum of y1 * y2hat_w")?;
        let y1_y2z = ensure_finite(dot(y1, &projections.y2_on_z), "sum of y1 * y2hat_z")?;
        let y1_y1 = ensure_finite(dot(y1, y1), "sum of y1^2")?;
        let y1_y1w = ensure_finite(dot(y1, &projections.y1_on_w), "sum of y1 * y1hat_w")?;
        let y1_y1z = ensure_finite(dot(y1, &projections.y1_on_z), "sum of y1 * y1hat_z")?;

        let a = cval * y2_y2 - (cval + 1.0) * y2_y2w + y2_y2z;
        let b = -2.0 * cval * y1_y2 + 2.0 * (cval + 1.0) * y1_y2w - 2.0 * y1_y2z;
        let c = cval * y1_y1 - (cval + 1.0) * y1_y1w + y1_y1z;

        let form = Self {
            a: ensure_finite(a, "coefficient on beta0^2")?,
            b: ensure_finite(b, "coefficient on beta0")?,
            c: ensure_finite(c, "constant term")?,
        };
        log::debug!(
            "AR quadratic: a = {}, b = {}, c = {}, D = {}",
            form.a,
            form.b,
            form.c,
            form.discriminant()
        );
        Ok(form)
    }

    /// Discriminant `b² − 4ac`.
    pub fn discriminant(&self) -> f64 {
        self.b * self.b - 4.0 * self.a * self.c
    }

    /// Value of the form at `beta0`; non-negative inside the confidence set.
    pub fn evaluate(&self, beta0: f64) -> f64 {
        (self.a * beta0 + self.b) * beta0 + self.c
    }

    /// Solve `a·β0² + b·β0 + c ≥ 0` and classify the solution set.
    ///
    /// The leading coefficient is compared with zero exactly, so the linear
    /// branch is taken only when `a == 0.0`.
    pub fn resolve(&self) -> Result<ConfidenceInterval, RegressionError> {
        let Self { a, b, c } = *self;
        for (value, quantity) in [
            (a, "coefficient on beta0^2"),
            (b, "coefficient on beta0"),
            (c, "constant term"),
        ] {
            ensure_finite(value, quantity)?;
        }

        let interval = if a == 0.0 {
            if b == 0.0 {
                if c >= 0.0 {
                    ConfidenceInterval::WholeRealLine
                } else {
                    ConfidenceInterval::EmptySet
                }
            } else {
                let root = ensure_finite(-c / b, "linear root")?;
                if b > 0.0 {
                    ConfidenceInterval::LowerBounded { lower: root }
                } else {
                    ConfidenceInterval::UpperBounded { upper: root }
                }
            }
        } else {
            let d = ensure_finite(self.discriminant(), "discriminant")?;
            if d > 0.0 {
                let sqrt_d = d.sqrt();
                let root1 = ensure_finite((-b + sqrt_d) / (2.0 * a), "quadratic root")?;
                let root2 = ensure_finite((-b - sqrt_d) / (2.0 * a), "quadratic root")?;
                let lower = root1.min(root2);
                let upper = root1.max(root2);
                if a < 0.0 {
                    ConfidenceInterval::Bounded { lower, upper }
                } else {
                    ConfidenceInterval::TwoHalfLines { lower, upper }
                }
            } else if d == 0.0 {
                ConfidenceInterval::WholeRealLine
            } else if a > 0.0 {
                // No real roots: the form keeps the sign of `a` everywhere.
                ConfidenceInterval::WholeRealLine
            } else {
                ConfidenceInterval::EmptySet
            }
        };

        log::debug!("AR confidence set: {interval}");
        Ok(interval)
    }
}

/// Result of the Anderson-Rubin test of `H0: β = β0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArTest {
    /// Hypothesized coefficient.
    pub beta0: f64,
    /// F statistic.
    pub statistic: f64,
    /// Upper-tail p-value under `F(df1, df2)`.
    pub p_value: f64,
    /// Numerator degrees of freedom, `l − k`.
    pub df1: f64,
    /// Denominator degrees of freedom, `n − l`.
    pub df2: f64,
}

impl ArTest {
    /// Compute the test from already projected components.
    ///
    /// Projections are linear, so the projections of `y1 − β0·y2` follow
    /// from those of `y1` and `y2`.
    pub fn from_projections(
        beta0: f64,
        components: &ArComponents,
        projections: &Projections,
    ) -> Result<Self, RegressionError> {
        let (df1, df2) = degrees_of_freedom(components.l, components.k, components.n)?;
        let ArComponents { y1, y2, .. } = components;

        let r = Col::from_fn(components.n, |i| y1[i] - beta0 * y2[i]);
        let r_w = Col::from_fn(components.n, |i| {
            projections.y1_on_w[i] - beta0 * projections.y2_on_w[i]
        });
        let r_z = Col::from_fn(components.n, |i| {
            projections.y1_on_z[i] - beta0 * projections.y2_on_z[i]
        });

        let rr = dot(&r, &r);
        let rss_w = rr - dot(&r, &r_w);
        let rss_z = rr - dot(&r, &r_z);

        let statistic = ensure_finite(
            ((rss_z - rss_w) / df1) / (rss_w / df2),
            "AR statistic",
        )?;
        let dist =
            FisherSnedecor::new(df1, df2).map_err(|e| RegressionError::NumericalError(e.to_string()))?;
        let p_value = 1.0 - dist.cdf(statistic.max(0.0));

        Ok(Self {
            beta0,
            statistic,
            p_value,
            df1,
            df2,
        })
    }

    /// Returns true if the test rejects at the given confidence level.
    pub fn rejects(&self, confidence_level: f64) -> bool {
        self.p_value < 1.0 - confidence_level
    }
}

/// Anderson-Rubin confidence set estimator.
///
/// # Example
///
/// ```rust,ignore
/// let ci = AndersonRubin::builder()
///     .confidence_level(0.90)
///     .build()
///     .confidence_interval(&fitted)?;
/// ```
#[derive(Debug, Clone)]
pub struct AndersonRubin {
    options: RegressionOptions,
}

impl Default for AndersonRubin {
    fn default() -> Self {
        Self::new(RegressionOptions::default())
    }
}

impl AndersonRubin {
    /// Create an estimator with the given options.
    pub fn new(options: RegressionOptions) -> Self {
        Self { options }
    }

    /// Create a builder for configuring the estimator.
    pub fn builder() -> AndersonRubinBuilder {
        AndersonRubinBuilder::default()
    }

    /// Confidence level of the set.
    pub fn confidence_level(&self) -> f64 {
        self.options.confidence_level
    }

    /// Quadratic form whose non-negative region is the confidence set.
    pub fn quadratic_form<M: IvModel + ?Sized>(
        &self,
        model: &M,
    ) -> Result<QuadraticForm, RegressionError> {
        self.options.validate()?;
        let components = partition_model(model)?;
        let cval = critical_value(
            self.options.confidence_level,
            components.l,
            components.k,
            components.n,
        )?;
        let projections = Projections::compute(&components, self.options.rank_tolerance)?;
        QuadraticForm::from_projections(cval, &components, &projections)
    }

    /// Invert the AR test into a confidence set for the endogenous coefficient.
    pub fn confidence_interval<M: IvModel + ?Sized>(
        &self,
        model: &M,
    ) -> Result<ConfidenceInterval, RegressionError> {
        self.quadratic_form(model)?.resolve()
    }

    /// Test `H0: β = beta0` for the endogenous coefficient.
    pub fn test<M: IvModel + ?Sized>(
        &self,
        model: &M,
        beta0: f64,
    ) -> Result<ArTest, RegressionError> {
        self.options.validate()?;
        let components = partition_model(model)?;
        let projections = Projections::compute(&components, self.options.rank_tolerance)?;
        ArTest::from_projections(beta0, &components, &projections)
    }
}

/// Builder for `AndersonRubin`.
#[derive(Debug, Clone, Default)]
pub struct AndersonRubinBuilder {
    builder: RegressionOptionsBuilder,
}

impl AndersonRubinBuilder {
    /// Create a new builder with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the confidence level (default 0.95).
    pub fn confidence_level(mut self, level: f64) -> Self {
        self.builder = self.builder.confidence_level(level);
        self
    }

    /// Set the rank tolerance used by the projections.
    pub fn rank_tolerance(mut self, tol: f64) -> Self {
        self.builder = self.builder.rank_tolerance(tol);
        self
    }

    /// Build the estimator. Options are validated when it is used.
    pub fn build(self) -> AndersonRubin {
        AndersonRubin::new(self.builder.build_unchecked())
    }
}

/// Anderson-Rubin confidence set for the single endogenous coefficient of `model`.
pub fn anderson_rubin_ci<M: IvModel + ?Sized>(
    model: &M,
    confidence_level: f64,
) -> Result<ConfidenceInterval, RegressionError> {
    AndersonRubin::builder()
        .confidence_level(confidence_level)
        .build()
        .confidence_interval(model)
}
