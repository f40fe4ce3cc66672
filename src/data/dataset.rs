//! Named numeric columns loaded from CSV.

use crate::solvers::{IvDesign, RegressionError};
use csv::ReaderBuilder;
use faer::{Col, Mat};
use std::io::Read;
use std::path::Path;
use thiserror::Error;

/// Name given to the constant column added by [`Dataset::matrix`].
pub const CONSTANT_NAME: &str = "const";

/// Errors raised while loading or querying a [`Dataset`].
#[derive(Debug, Error)]
pub enum DataError {
    #[error("failed to read csv: {0}")]
    Csv(#[from] csv::Error),

    #[error("csv has no header row")]
    NoHeaders,

    #[error("csv has no data rows")]
    NoRows,

    #[error("duplicate column name '{0}'")]
    DuplicateColumn(String),

    #[error("row {row}, column '{column}': cannot parse '{value}' as a number")]
    Parse {
        row: usize,
        column: String,
        value: String,
    },

    #[error("row {row}, column '{column}': missing or non-finite value")]
    Missing { row: usize, column: String },

    #[error("unknown column '{0}'")]
    UnknownColumn(String),

    #[error(transparent)]
    Design(#[from] RegressionError),
}

/// A table of equally long, named `f64` columns.
///
/// Missing cells are stored as NaN and only rejected when the column is
/// requested, so unused columns may have gaps.
#[derive(Debug, Clone)]
pub struct Dataset {
    names: Vec<String>,
    columns: Vec<Col<f64>>,
}

impl Dataset {
    /// Load a headered, comma-separated file.
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self, DataError> {
        let reader = ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_path(path)?;
        Self::from_csv_reader(reader)
    }

    /// Load headered CSV from any reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, DataError> {
        let reader = ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        Self::from_csv_reader(reader)
    }

    fn from_csv_reader<R: Read>(mut reader: csv::Reader<R>) -> Result<Self, DataError> {
        let names: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        if names.is_empty() {
            return Err(DataError::NoHeaders);
        }
        for (j, name) in names.iter().enumerate() {
            if names[..j].contains(name) {
                return Err(DataError::DuplicateColumn(name.clone()));
            }
        }

        let mut values: Vec<Vec<f64>> = vec![Vec::new(); names.len()];
        for (row, record) in reader.records().enumerate() {
            // Width mismatches are reported by the csv reader itself.
            let record = record?;
            for (j, raw) in record.iter().enumerate() {
                let value = parse_cell(raw).ok_or_else(|| DataError::Parse {
                    row: row + 1,
                    column: names[j].clone(),
                    value: raw.to_string(),
                })?;
                values[j].push(value);
            }
        }

        let n = values.first().map_or(0, Vec::len);
        if n == 0 {
            return Err(DataError::NoRows);
        }
        log::debug!("loaded dataset with {n} rows and {} columns", names.len());

        let columns = values
            .into_iter()
            .map(|v| Col::from_fn(v.len(), |i| v[i]))
            .collect();
        Ok(Self { names, columns })
    }

    /// Number of rows.
    pub fn n_rows(&self) -> usize {
        self.columns.first().map_or(0, |c| c.nrows())
    }

    /// Column names in file order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// The named column, which must be complete and finite.
    pub fn column(&self, name: &str) -> Result<&Col<f64>, DataError> {
        let col = self.raw_column(name)?;
        match col.iter().position(|v| !v.is_finite()) {
            Some(i) => Err(DataError::Missing {
                row: i + 1,
                column: name.to_string(),
            }),
            None => Ok(col),
        }
    }

    /// The named column as loaded, with missing cells as NaN.
    pub fn raw_column(&self, name: &str) -> Result<&Col<f64>, DataError> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|j| &self.columns[j])
            .ok_or_else(|| DataError::UnknownColumn(name.to_string()))
    }

    /// Number of missing or non-finite cells in the named column.
    pub fn missing_count(&self, name: &str) -> Result<usize, DataError> {
        Ok(self
            .raw_column(name)?
            .iter()
            .filter(|v| !v.is_finite())
            .count())
    }

    /// Stack the named columns into a matrix, optionally prepending a constant.
    ///
    /// Returns the matrix together with its column names; the constant column
    /// is named [`CONSTANT_NAME`].
    pub fn matrix(
        &self,
        names: &[&str],
        add_constant: bool,
    ) -> Result<(Mat<f64>, Vec<String>), DataError> {
        let cols = names
            .iter()
            .map(|name| self.column(name))
            .collect::<Result<Vec<_>, _>>()?;

        let offset = usize::from(add_constant);
        let mut out_names = Vec::with_capacity(names.len() + offset);
        if add_constant {
            out_names.push(CONSTANT_NAME.to_string());
        }
        out_names.extend(names.iter().map(|s| s.to_string()));

        let mat = Mat::from_fn(self.n_rows(), names.len() + offset, |i, j| {
            if j < offset {
                1.0
            } else {
                cols[j - offset][i]
            }
        });
        Ok((mat, out_names))
    }

    /// Build an IV design from named outcome, regressor and instrument columns.
    ///
    /// Exogenous regressors must be listed in both `regressors` and `instruments`.
    pub fn iv_design(
        &self,
        outcome: &str,
        regressors: &[&str],
        instruments: &[&str],
        add_constant: bool,
    ) -> Result<IvDesign, DataError> {
        let y = self.column(outcome)?.clone();
        let (x, x_names) = self.matrix(regressors, add_constant)?;
        let (w, w_names) = self.matrix(instruments, add_constant)?;
        Ok(IvDesign::new(y, x, x_names, w, w_names)?)
    }
}

/// Tokens read as a missing value.
const MISSING_TOKENS: [&str; 4] = ["", "NA", "NaN", "."];

/// Parse a numeric cell. Missing tokens become NaN; anything else that is
/// not a number is an error.
fn parse_cell(raw: &str) -> Option<f64> {
    if MISSING_TOKENS.iter().any(|t| raw.eq_ignore_ascii_case(t)) {
        return Some(f64::NAN);
    }
    raw.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::IvModel;

    const CSV: &str = "y, d, z, x1\n1.0, 2.0, 0.5, 3\n2.0, 2.5, 1.5, 4\n3.5, 4.0, 1.0, 1\n";

    #[test]
    fn test_from_reader() {
        let ds = Dataset::from_reader(CSV.as_bytes()).unwrap();
        assert_eq!(ds.n_rows(), 3);
        assert_eq!(ds.names(), &["y", "d", "z", "x1"]);
        assert_eq!(ds.column("d").unwrap()[2], 4.0);
        assert!(matches!(
            ds.column("nope"),
            Err(DataError::UnknownColumn(_))
        ));
    }

    #[test]
    fn test_matrix_with_constant() {
        let ds = Dataset::from_reader(CSV.as_bytes()).unwrap();
        let (m, names) = ds.matrix(&["x1", "z"], true).unwrap();
        assert_eq!(names, vec!["const", "x1", "z"]);
        assert_eq!(m.ncols(), 3);
        assert_eq!(m[(1, 0)], 1.0);
        assert_eq!(m[(1, 1)], 4.0);
        assert_eq!(m[(1, 2)], 1.5);
    }

    #[test]
    fn test_iv_design() {
        let ds = Dataset::from_reader(CSV.as_bytes()).unwrap();
        let design = ds.iv_design("y", &["d", "x1"], &["z", "x1"], true).unwrap();
        assert_eq!(design.regressor_names(), &["const", "d", "x1"]);
        assert_eq!(design.instrument_names(), &["const", "z", "x1"]);
        assert_eq!(design.endogenous_columns(), vec![1]);
    }

    #[test]
    fn test_parse_error_names_cell() {
        let err = Dataset::from_reader("a,b\n1,2\n1,abc\n".as_bytes()).unwrap_err();
        match err {
            DataError::Parse { row, column, value } => {
                assert_eq!(row, 2);
                assert_eq!(column, "b");
                assert_eq!(value, "abc");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_gaps_in_unused_column() {
        let csv = "lwage,educ,nearc4,iq\n1.0,12,1,\n2.0,16,0,100\n1.5,14,1,NA\n";
        let ds = Dataset::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(ds.n_rows(), 3);
        assert_eq!(ds.missing_count("iq").unwrap(), 2);
        assert_eq!(ds.missing_count("educ").unwrap(), 0);
        assert!(ds.raw_column("iq").unwrap()[0].is_nan());

        let design = ds.iv_design("lwage", &["educ"], &["nearc4"], true).unwrap();
        assert_eq!(design.n_observations(), 3);

        match ds.column("iq").unwrap_err() {
            DataError::Missing { row, column } => {
                assert_eq!(row, 1);
                assert_eq!(column, "iq");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(matches!(
            ds.iv_design("lwage", &["educ", "iq"], &["nearc4", "iq"], true),
            Err(DataError::Missing { .. })
        ));
    }

    #[test]
    fn test_non_finite_value_rejected_on_use() {
        let ds = Dataset::from_reader("a,b\n1,inf\n2,3\n".as_bytes()).unwrap();
        assert!(ds.column("a").is_ok());
        assert!(matches!(
            ds.matrix(&["a", "b"], false),
            Err(DataError::Missing { row: 1, .. })
        ));
    }

    #[test]
    fn test_empty_and_ragged_input() {
        assert!(matches!(
            Dataset::from_reader("a,b\n".as_bytes()),
            Err(DataError::NoRows)
        ));
        assert!(matches!(
            Dataset::from_reader("a,b\n1,2\n3\n".as_bytes()),
            Err(DataError::Csv(_))
        ));
        assert!(matches!(
            Dataset::from_reader("a,a\n1,2\n".as_bytes()),
            Err(DataError::DuplicateColumn(_))
        ));
    }
}
