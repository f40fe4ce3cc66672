//! Common test utilities and data generators.
#![allow(dead_code)]

use faer::{Col, Mat};
use ivregress::solvers::IvDesign;

/// Deterministic LCG returning values in [-1, 1].
pub struct Lcg(u64);

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Self(seed)
    }

    pub fn next_f64(&mut self) -> f64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1);
        ((self.0 >> 33) as f64) / (u32::MAX as f64) * 2.0 - 1.0
    }
}

/// Generate simple linear data: y = x * beta + intercept + noise
pub fn generate_linear_data(
    n_samples: usize,
    n_features: usize,
    intercept: f64,
    noise_std: f64,
    seed: u64,
) -> (Mat<f64>, Col<f64>, Col<f64>) {
    let mut rng = Lcg::new(seed);

    let true_coefficients = Col::from_fn(n_features, |j| (j + 1) as f64);
    let mut x = Mat::zeros(n_samples, n_features);
    let mut y = Col::zeros(n_samples);

    for i in 0..n_samples {
        let mut yi = intercept;
        for j in 0..n_features {
            x[(i, j)] = rng.next_f64();
            yi += x[(i, j)] * true_coefficients[j];
        }
        yi += noise_std * rng.next_f64();
        y[i] = yi;
    }

    (x, y, true_coefficients)
}

/// Generate data with collinear features.
pub fn generate_collinear_data(n_samples: usize) -> (Mat<f64>, Col<f64>) {
    let x = Mat::from_fn(n_samples, 3, |i, j| match j {
        0 => i as f64,
        1 => 2.0 * i as f64,
        _ => (i * i) as f64,
    });
    let y = Col::from_fn(n_samples, |i| 1.0 + 2.0 * x[(i, 0)] + 3.0 * x[(i, 2)]);

    (x, y)
}

pub fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// Parameters of a simulated IV design.
#[derive(Debug, Clone, Copy)]
pub struct IvConfig {
    pub n: usize,
    /// Number of excluded instruments.
    pub n_instruments: usize,
    /// First-stage coefficient on each excluded instrument.
    pub strength: f64,
    /// Loading of the first-stage error on the structural error.
    pub endogeneity: f64,
    /// True coefficient on the endogenous regressor.
    pub beta: f64,
    pub seed: u64,
}

impl Default for IvConfig {
    fn default() -> Self {
        Self {
            n: 400,
            n_instruments: 2,
            strength: 1.0,
            endogeneity: 0.8,
            beta: 2.0,
            seed: 7,
        }
    }
}

/// Simulate `y = 1 + beta*d + 0.3*x1 + u`, `d = 0.5 + strength*Σz + 0.5*x1 + v`.
///
/// Regressors are `[const, d, x1]`, instruments `[const, z1.., x1]`.
pub fn generate_iv_data(config: IvConfig) -> IvDesign {
    let mut rng = Lcg::new(config.seed);
    let n = config.n;
    let m = config.n_instruments;

    let mut x1 = Col::zeros(n);
    let mut z = Mat::zeros(n, m);
    let mut d = Col::zeros(n);
    let mut y = Col::zeros(n);

    for i in 0..n {
        x1[i] = rng.next_f64();
        let mut zsum = 0.0;
        for j in 0..m {
            z[(i, j)] = rng.next_f64();
            zsum += z[(i, j)];
        }
        let v = 0.5 * rng.next_f64();
        let u = 0.5 * rng.next_f64() + config.endogeneity * v;

        d[i] = 0.5 + config.strength * zsum + 0.5 * x1[i] + v;
        y[i] = 1.0 + config.beta * d[i] + 0.3 * x1[i] + u;
    }

    let x = Mat::from_fn(n, 3, |i, j| match j {
        0 => 1.0,
        1 => d[i],
        _ => x1[i],
    });
    let w = Mat::from_fn(n, m + 2, |i, j| {
        if j == 0 {
            1.0
        } else if j <= m {
            z[(i, j - 1)]
        } else {
            x1[i]
        }
    });

    let mut w_names = vec!["const".to_string()];
    w_names.extend((1..=m).map(|j| format!("z{j}")));
    w_names.push("x1".to_string());

    IvDesign::new(y, x, names(&["const", "d", "x1"]), w, w_names).expect("valid design")
}
