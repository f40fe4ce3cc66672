//! Statistical inference (coefficient standard errors, Anderson-Rubin confidence sets).

mod anderson_rubin;
mod coefficient;

pub use anderson_rubin::{
    anderson_rubin_ci, critical_value, partition_model, AndersonRubin, AndersonRubinBuilder,
    ArComponents, ArTest, Projections, QuadraticForm,
};
pub use coefficient::CoefficientInference;
