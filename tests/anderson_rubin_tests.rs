//! Anderson-Rubin confidence set tests.

mod common;

use approx::assert_relative_eq;
use common::{generate_iv_data, names, IvConfig};
use faer::{Col, Mat};
use ivregress::core::{ConfidenceInterval, IvModel};
use ivregress::inference::{anderson_rubin_ci, AndersonRubin, QuadraticForm};
use ivregress::solvers::{IvDesign, IvRegressor, RegressionError};

/// Replace the outcome and the endogenous column of a simulated design.
fn transform(design: &IvDesign, f: impl Fn(f64, f64) -> (f64, f64)) -> IvDesign {
    let n = design.n_observations();
    let mut y = Col::zeros(n);
    let mut x = design.regressors().clone();
    for i in 0..n {
        let (yi, di) = f(design.outcome()[i], x[(i, 1)]);
        y[i] = yi;
        x[(i, 1)] = di;
    }
    IvDesign::new(
        y,
        x,
        design.regressor_names().to_vec(),
        design.instruments().clone(),
        design.instrument_names().to_vec(),
    )
    .unwrap()
}

/// Check set membership against the test itself on a grid of values.
fn assert_consistent_with_test(design: &IvDesign, level: f64) {
    let ar = AndersonRubin::builder().confidence_level(level).build();
    let ci = ar.confidence_interval(design).unwrap();
    let form = ar.quadratic_form(design).unwrap();

    for step in -40..=40 {
        let beta0 = 2.0 + 0.25 * step as f64;
        // Skip points numerically on the boundary.
        if form.evaluate(beta0).abs() < 1e-8 * (form.a.abs() + form.b.abs() + form.c.abs()) {
            continue;
        }
        let test = ar.test(design, beta0).unwrap();
        assert_eq!(
            ci.contains(beta0),
            !test.rejects(level),
            "beta0 = {beta0}, F = {}, p = {}, ci = {ci}",
            test.statistic,
            test.p_value
        );
    }
}

#[test]
fn test_strong_instruments_give_bounded_interval() {
    let design = generate_iv_data(IvConfig::default());
    let ci = anderson_rubin_ci(&design, 0.95).unwrap();

    let (lower, upper) = ci.bounds().expect("bounded interval");
    assert!(lower < upper);
    assert!(upper - lower < 1.0, "interval too wide: {ci}");
}

#[test]
fn test_just_identified_interval_contains_2sls_estimate() {
    let design = generate_iv_data(IvConfig {
        n_instruments: 1,
        ..IvConfig::default()
    });
    let beta_hat = IvRegressor::builder()
        .build()
        .fit(&design)
        .unwrap()
        .coefficient("d")
        .unwrap();

    let ci = anderson_rubin_ci(&design, 0.95).unwrap();
    assert!(ci.contains(beta_hat), "{ci} should contain {beta_hat}");
}

#[test]
fn test_fitted_model_and_design_agree() {
    let design = generate_iv_data(IvConfig::default());
    let fitted = IvRegressor::builder().build().fit(&design).unwrap();

    assert_eq!(
        anderson_rubin_ci(&design, 0.95).unwrap(),
        anderson_rubin_ci(&fitted, 0.95).unwrap()
    );
}

#[test]
fn test_membership_matches_test_strong() {
    assert_consistent_with_test(&generate_iv_data(IvConfig::default()), 0.95);
}

#[test]
fn test_membership_matches_test_weak() {
    for seed in [1, 2, 3] {
        let design = generate_iv_data(IvConfig {
            n: 150,
            strength: 0.02,
            seed,
            ..IvConfig::default()
        });
        assert_consistent_with_test(&design, 0.95);
    }
}

#[test]
fn test_higher_level_gives_wider_interval() {
    let design = generate_iv_data(IvConfig::default());
    let (lo90, hi90) = anderson_rubin_ci(&design, 0.90).unwrap().bounds().unwrap();
    let (lo95, hi95) = anderson_rubin_ci(&design, 0.95).unwrap().bounds().unwrap();
    let (lo99, hi99) = anderson_rubin_ci(&design, 0.99).unwrap().bounds().unwrap();

    assert!(lo99 <= lo95 && lo95 <= lo90);
    assert!(hi90 <= hi95 && hi95 <= hi99);
}

#[test]
fn test_rescaling_endogenous_regressor_rescales_interval() {
    let design = generate_iv_data(IvConfig::default());
    let scaled = transform(&design, |y, d| (y, 10.0 * d));

    let (lo, hi) = anderson_rubin_ci(&design, 0.95).unwrap().bounds().unwrap();
    let (lo_s, hi_s) = anderson_rubin_ci(&scaled, 0.95).unwrap().bounds().unwrap();

    assert_relative_eq!(lo_s, lo / 10.0, max_relative = 1e-8);
    assert_relative_eq!(hi_s, hi / 10.0, max_relative = 1e-8);
}

#[test]
fn test_shifting_outcome_shifts_interval() {
    let design = generate_iv_data(IvConfig::default());
    let shifted = transform(&design, |y, d| (y + 1.5 * d, d));

    let (lo, hi) = anderson_rubin_ci(&design, 0.95).unwrap().bounds().unwrap();
    let (lo_s, hi_s) = anderson_rubin_ci(&shifted, 0.95).unwrap().bounds().unwrap();

    assert_relative_eq!(lo_s, lo + 1.5, epsilon = 1e-7);
    assert_relative_eq!(hi_s, hi + 1.5, epsilon = 1e-7);
}

#[test]
fn test_deterministic() {
    let design = generate_iv_data(IvConfig {
        strength: 0.05,
        ..IvConfig::default()
    });
    let ar = AndersonRubin::default();
    assert_eq!(
        ar.confidence_interval(&design).unwrap(),
        ar.confidence_interval(&design).unwrap()
    );
    assert_eq!(
        ar.quadratic_form(&design).unwrap(),
        ar.quadratic_form(&design).unwrap()
    );
}

#[test]
fn test_no_excess_instruments_is_configuration_error() {
    // l == k: the instruments are exactly the exogenous regressors.
    let base = generate_iv_data(IvConfig::default());
    let n = base.n_observations();
    let w = Mat::from_fn(n, 2, |i, j| base.regressors()[(i, 2 * j)]);
    let design = IvDesign::new(
        base.outcome().clone(),
        base.regressors().clone(),
        base.regressor_names().to_vec(),
        w,
        names(&["const", "x1"]),
    )
    .unwrap();

    let err = anderson_rubin_ci(&design, 0.95).unwrap_err();
    assert!(matches!(
        err,
        RegressionError::InvalidDegreesOfFreedom {
            parameter: "l - k",
            value: 0
        }
    ));
    assert!(err.is_configuration());
}

#[test]
fn test_two_endogenous_regressors_rejected() {
    let base = generate_iv_data(IvConfig::default());
    let design = IvDesign::new(
        base.outcome().clone(),
        base.regressors().clone(),
        names(&["const", "d", "x1_endog"]),
        base.instruments().clone(),
        base.instrument_names().to_vec(),
    )
    .unwrap();

    let err = anderson_rubin_ci(&design, 0.95).unwrap_err();
    assert!(matches!(err, RegressionError::EndogenousCount { found: 2 }));
    assert!(err.is_configuration());
}

#[test]
fn test_invalid_confidence_level() {
    let design = generate_iv_data(IvConfig::default());
    for level in [0.0, 1.0, 1.5] {
        let err = anderson_rubin_ci(&design, level).unwrap_err();
        assert!(err.is_configuration(), "level {level}: {err}");
    }
}

#[test]
fn test_duplicate_instrument_is_numerical_error() {
    let base = generate_iv_data(IvConfig::default());
    let w = base.instruments();
    let w_dup = Mat::from_fn(w.nrows(), w.ncols() + 1, |i, j| {
        if j < w.ncols() {
            w[(i, j)]
        } else {
            w[(i, 1)]
        }
    });
    let mut w_names = base.instrument_names().to_vec();
    w_names.push("z1_copy".to_string());
    let design = IvDesign::new(
        base.outcome().clone(),
        base.regressors().clone(),
        base.regressor_names().to_vec(),
        w_dup,
        w_names,
    )
    .unwrap();

    let err = anderson_rubin_ci(&design, 0.95).unwrap_err();
    assert!(matches!(err, RegressionError::SingularMatrix));
    assert!(err.is_numerical());
}

#[test]
fn test_resolver_case_table() {
    let cases = [
        (0.0, 2.0, -1.0, ConfidenceInterval::LowerBounded { lower: 0.5 }),
        (0.0, -2.0, -1.0, ConfidenceInterval::UpperBounded { upper: -0.5 }),
        (0.0, 0.0, 1.0, ConfidenceInterval::WholeRealLine),
        (0.0, 0.0, -1.0, ConfidenceInterval::EmptySet),
        (
            -2.0,
            0.0,
            8.0,
            ConfidenceInterval::Bounded {
                lower: -2.0,
                upper: 2.0,
            },
        ),
        (
            2.0,
            0.0,
            -8.0,
            ConfidenceInterval::TwoHalfLines {
                lower: -2.0,
                upper: 2.0,
            },
        ),
        (1.0, 2.0, 1.0, ConfidenceInterval::WholeRealLine),
        (1.0, 0.0, 1.0, ConfidenceInterval::WholeRealLine),
        (-1.0, 0.0, -1.0, ConfidenceInterval::EmptySet),
    ];

    for (a, b, c, expected) in cases {
        let got = QuadraticForm::new(a, b, c).resolve().unwrap();
        assert_eq!(got, expected, "a = {a}, b = {b}, c = {c}");
    }
}
