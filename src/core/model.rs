//! The view of an instrumental-variables model consumed by inference routines.

use faer::{Col, Mat};

/// A linear IV model `y = Xβ + u` identified by the instrument matrix `W`.
///
/// Regressor columns whose names also appear among the instrument names are
/// exogenous (included instruments); the remaining columns are endogenous.
/// Columns are matched by name, never by position.
pub trait IvModel {
    /// Dependent variable, length n.
    fn outcome(&self) -> &Col<f64>;

    /// Full regressor matrix, n × p.
    fn regressors(&self) -> &Mat<f64>;

    /// Names of the regressor columns, length p.
    fn regressor_names(&self) -> &[String];

    /// Names of the instrument columns, length l.
    fn instrument_names(&self) -> &[String];

    /// Full instrument matrix, n × l.
    fn instruments(&self) -> &Mat<f64>;

    /// Indices of regressor columns not present among the instruments.
    fn endogenous_columns(&self) -> Vec<usize> {
        let instruments = self.instrument_names();
        self.regressor_names()
            .iter()
            .enumerate()
            .filter(|(_, name)| !instruments.contains(name))
            .map(|(j, _)| j)
            .collect()
    }

    /// Indices of regressor columns that are also instruments.
    fn exogenous_columns(&self) -> Vec<usize> {
        let instruments = self.instrument_names();
        self.regressor_names()
            .iter()
            .enumerate()
            .filter(|(_, name)| instruments.contains(name))
            .map(|(j, _)| j)
            .collect()
    }
}
