//! Loading tabular data into IV designs.

mod dataset;

pub use dataset::{DataError, Dataset, CONSTANT_NAME};
