//! Confidence set types produced by test inversion.

use std::fmt;

/// A confidence set for a scalar coefficient.
///
/// Inverting the Anderson-Rubin test does not always produce a bounded
/// interval: with weak instruments the accepted set can be unbounded,
/// the whole real line, or even empty. Every shape is a successful result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfidenceInterval {
    /// Closed bounded interval `[lower, upper]`.
    Bounded { lower: f64, upper: f64 },
    /// Half-line `[lower, +∞)`.
    LowerBounded { lower: f64 },
    /// Half-line `(-∞, upper]`.
    UpperBounded { upper: f64 },
    /// `(-∞, lower] ∪ [upper, +∞)` with `lower <= upper`.
    TwoHalfLines { lower: f64, upper: f64 },
    /// Every coefficient value is accepted.
    WholeRealLine,
    /// No coefficient value is accepted.
    EmptySet,
}

impl ConfidenceInterval {
    /// Returns true if `beta0` belongs to the set.
    pub fn contains(&self, beta0: f64) -> bool {
        match *self {
            Self::Bounded { lower, upper } => lower <= beta0 && beta0 <= upper,
            Self::LowerBounded { lower } => beta0 >= lower,
            Self::UpperBounded { upper } => beta0 <= upper,
            Self::TwoHalfLines { lower, upper } => beta0 <= lower || beta0 >= upper,
            Self::WholeRealLine => true,
            Self::EmptySet => false,
        }
    }

    /// Lower and upper bound of a bounded interval.
    pub fn bounds(&self) -> Option<(f64, f64)> {
        match *self {
            Self::Bounded { lower, upper } => Some((lower, upper)),
            _ => None,
        }
    }

    /// Returns true for the closed bounded interval shape.
    pub fn is_bounded(&self) -> bool {
        matches!(self, Self::Bounded { .. })
    }

    /// Returns true for the empty set.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::EmptySet)
    }

    /// Lebesgue measure of the set (`+∞` for any unbounded shape, 0 for the empty set).
    pub fn length(&self) -> f64 {
        match *self {
            Self::Bounded { lower, upper } => upper - lower,
            Self::EmptySet => 0.0,
            _ => f64::INFINITY,
        }
    }
}

impl fmt::Display for ConfidenceInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Bounded { lower, upper } => write!(f, "[{lower}, {upper}]"),
            Self::LowerBounded { lower } => write!(f, "[{lower}, Infinity]"),
            Self::UpperBounded { upper } => write!(f, "[-Infinity, {upper}]"),
            Self::TwoHalfLines { lower, upper } => {
                write!(f, "[-Infinity, {lower}] union [{upper}, Infinity]")
            }
            Self::WholeRealLine => f.write_str("Whole Real Line"),
            Self::EmptySet => f.write_str("Empty Set"),
        }
    }
}
