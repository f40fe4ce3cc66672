//! Shared numeric helpers.

mod matrix;

pub use matrix::{center_columns, center_vector, column, detect_constant_columns, dot, select_columns};
