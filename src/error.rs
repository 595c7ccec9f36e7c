use thiserror::Error;

/// Unified error type for `pbsolve` operations.
#[derive(Debug, Error)]
pub enum SolverError {
    /// Raised when provided vectors have incompatible lengths.
    #[error("dimension mismatch in {context}: expected {expected} but found {found}")]
    DimensionMismatch {
        /// Human-readable context describing the operation.
        context: &'static str,
        /// The required length, usually implied by the grid size.
        expected: usize,
        /// The length that was actually supplied.
        found: usize,
    },

    /// Raised when a grid is too small to carry both boundary rows.
    #[error("grid must have at least 2 points, found {points}")]
    InvalidGrid { points: usize },

    /// Raised when elimination without pivoting meets a zero or non-finite pivot.
    #[error("tridiagonal factorization hit pivot {pivot} at row {index}")]
    NumericInstability {
        /// Row of the offending entry of the factored diagonal.
        index: usize,
        /// The pivot value that was about to be divided by.
        pivot: f64,
    },

    /// Raised when the dense Jacobian solve encounters a singular system.
    #[error("matrix in {context} is singular")]
    SingularMatrix { context: &'static str },

    /// Raised when hyperbolic source terms overflow or produce NaN.
    #[error("encountered non-finite value during {context}")]
    NonFinite { context: &'static str },

    /// Raised when the coupling parameter is not a finite number.
    #[error("coupling must be finite, found {mu}")]
    InvalidCoupling { mu: f64 },

    /// Raised when a bisection bracket is empty or not finite.
    #[error("invalid bracket [{lower}, {upper}]")]
    InvalidBracket { lower: f64, upper: f64 },

    /// Raised when solver options are out of range.
    #[error("invalid options: {reason}")]
    InvalidOptions { reason: &'static str },
}

impl SolverError {
    /// Helper to format a [`DimensionMismatch`](SolverError::DimensionMismatch) error.
    pub fn dimension_mismatch(context: &'static str, expected: usize, found: usize) -> Self {
        Self::DimensionMismatch {
            context,
            expected,
            found,
        }
    }

    /// Helper to raise when a dense factorization fails due to singularity.
    pub fn singular(context: &'static str) -> Self {
        Self::SingularMatrix { context }
    }

    /// Helper for non-finite values coming out of the nonlinear terms.
    pub fn non_finite(context: &'static str) -> Self {
        Self::NonFinite { context }
    }

    /// Whether this error means the iteration blew up rather than was misused.
    ///
    /// Outer loops turn these into a diverged status instead of failing.
    pub fn is_divergence_signal(&self) -> bool {
        matches!(
            self,
            Self::NonFinite { .. } | Self::NumericInstability { .. } | Self::SingularMatrix { .. }
        )
    }
}

/// Type alias for results returned by this crate.
pub type Result<T> = std::result::Result<T, SolverError>;
