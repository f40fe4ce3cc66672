//! Coefficient inference calculations.

use faer::{Col, Mat};
use statrs::distribution::{ContinuousCDF, StudentsT};

/// Computes inference statistics for regression coefficients.
pub struct CoefficientInference;

impl CoefficientInference {
    /// Compute standard errors from a covariance design.
    ///
    /// SE(β_j) = sqrt(σ² * (X'X)^(-1)_{jj})
    ///
    /// For 2SLS, `x` is the first-stage projection X̂ and `mse` the structural σ².
    pub fn standard_errors(
        x: &Mat<f64>,
        mse: f64,
        aliased: &[bool],
    ) -> Result<Col<f64>, &'static str> {
        let xtx_inv = Self::compute_xtx_inverse(x, aliased)?;

        Ok(Col::from_fn(x.ncols(), |j| {
            if aliased[j] {
                f64::NAN
            } else {
                let var = mse * xtx_inv[(j, j)];
                if var >= 0.0 {
                    var.sqrt()
                } else {
                    f64::NAN
                }
            }
        }))
    }

    /// Compute t-statistics for coefficients.
    ///
    /// t_j = β_j / SE(β_j)
    pub fn t_statistics(coefficients: &Col<f64>, std_errors: &Col<f64>) -> Col<f64> {
        Col::from_fn(coefficients.nrows(), |j| {
            if std_errors[j].is_nan() || std_errors[j] == 0.0 {
                f64::NAN
            } else {
                coefficients[j] / std_errors[j]
            }
        })
    }

    /// Compute p-values from t-statistics.
    ///
    /// p_j = 2 * P(|T| > |t_j|) where T ~ t(df)
    pub fn p_values(t_statistics: &Col<f64>, df: f64) -> Col<f64> {
        let n = t_statistics.nrows();

        let t_dist = match StudentsT::new(0.0, 1.0, df) {
            Ok(dist) if df > 0.0 => dist,
            _ => return Col::from_fn(n, |_| f64::NAN),
        };

        Col::from_fn(n, |j| {
            if t_statistics[j].is_nan() {
                f64::NAN
            } else {
                2.0 * (1.0 - t_dist.cdf(t_statistics[j].abs()))
            }
        })
    }

    /// Compute confidence intervals for coefficients.
    ///
    /// CI_j = β_j ± t_{α/2, df} * SE(β_j)
    pub fn confidence_intervals(
        coefficients: &Col<f64>,
        std_errors: &Col<f64>,
        df: f64,
        confidence_level: f64,
    ) -> (Col<f64>, Col<f64>) {
        let n = coefficients.nrows();

        let t_dist = match StudentsT::new(0.0, 1.0, df) {
            Ok(dist) if df > 0.0 => dist,
            _ => return (Col::from_fn(n, |_| f64::NAN), Col::from_fn(n, |_| f64::NAN)),
        };
        let alpha = 1.0 - confidence_level;
        let t_crit = t_dist.inverse_cdf(1.0 - alpha / 2.0);

        let margin = |j: usize| t_crit * std_errors[j];
        let lower = Col::from_fn(n, |j| coefficients[j] - margin(j));
        let upper = Col::from_fn(n, |j| coefficients[j] + margin(j));

        (lower, upper)
    }

    /// Compute (X'X)^(-1) for non-aliased columns.
    fn compute_xtx_inverse(x: &Mat<f64>, aliased: &[bool]) -> Result<Mat<f64>, &'static str> {
        let n_features = x.ncols();
        let active: Vec<usize> = (0..n_features).filter(|&j| !aliased[j]).collect();
        let n_active = active.len();

        if n_active == 0 {
            return Err("All features are aliased");
        }

        let x_active = Mat::from_fn(x.nrows(), n_active, |i, j| x[(i, active[j])]);
        let xtx = x_active.transpose() * &x_active;

        let qr = xtx.qr();
        let q = qr.compute_Q();
        let r = qr.R();

        for i in 0..n_active {
            if r[(i, i)].abs() < 1e-10 {
                return Err("Matrix is singular");
            }
        }

        // Solve R * X = Q' column by column
        let mut xtx_inv_active = Mat::zeros(n_active, n_active);
        let qt = q.transpose();

        for col in 0..n_active {
            for i in (0..n_active).rev() {
                let mut sum = qt[(i, col)];
                for j in (i + 1)..n_active {
                    sum -= r[(i, j)] * xtx_inv_active[(j, col)];
                }
                xtx_inv_active[(i, col)] = sum / r[(i, i)];
            }
        }

        // Map back to full size
        let mut xtx_inv = Mat::zeros(n_features, n_features);
        for (ai, &i) in active.iter().enumerate() {
            for (aj, &j) in active.iter().enumerate() {
                xtx_inv[(i, j)] = xtx_inv_active[(ai, aj)];
            }
        }

        Ok(xtx_inv)
    }
}
