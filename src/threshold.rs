//! Bisection for the coupling at which the Picard iteration stops converging.
//!
//! The search assumes that the iteration converges for every coupling below
//! the threshold and fails for every coupling above it. That ordering has
//! only been observed, not proven, and is not checked here.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SolverError};
use crate::options::ProblemOptions;
use crate::solving::run_fixed_point;

/// Bracket and stopping width for the threshold bisection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BisectionOptions {
    /// Coupling known to converge.
    pub lower: f64,
    /// Coupling known to diverge.
    pub upper: f64,
    /// Bisection continues while the bracket is wider than this.
    pub width: f64,
}

impl Default for BisectionOptions {
    fn default() -> Self {
        Self {
            lower: 0.0,
            upper: 7.0,
            width: 10e-6,
        }
    }
}

impl BisectionOptions {
    /// Override the starting bracket.
    pub fn with_bracket(mut self, lower: f64, upper: f64) -> Self {
        self.lower = lower;
        self.upper = upper;
        self
    }

    /// Override the stopping width.
    pub fn with_width(mut self, width: f64) -> Self {
        self.width = width;
        self
    }

    fn validate(&self) -> Result<()> {
        if !(self.lower.is_finite() && self.upper.is_finite()) || self.lower >= self.upper {
            return Err(SolverError::InvalidBracket {
                lower: self.lower,
                upper: self.upper,
            });
        }
        if !(self.width > 0.0) {
            return Err(SolverError::InvalidOptions {
                reason: "bisection width must be positive",
            });
        }
        Ok(())
    }
}

/// Outcome of the threshold bisection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ThresholdEstimate {
    /// Last midpoint evaluated.
    pub mu: f64,
    /// Final lower end of the bracket (converging side).
    pub lower: f64,
    /// Final upper end of the bracket (failing side).
    pub upper: f64,
    /// Number of oracle evaluations.
    pub evaluations: usize,
}

/// Bisects with an arbitrary convergence oracle.
///
/// `converges(m)` returning `false` moves the upper end to `m`, otherwise the
/// lower end moves. Returns the last midpoint.
pub fn bisect<F>(bisection: &BisectionOptions, mut converges: F) -> Result<ThresholdEstimate>
where
    F: FnMut(f64) -> Result<bool>,
{
    bisection.validate()?;

    let (mut lower, mut upper) = (bisection.lower, bisection.upper);
    let mut mid = 0.5 * (lower + upper);
    let mut evaluations = 0usize;

    while upper - lower > bisection.width {
        mid = 0.5 * (lower + upper);
        let converged = converges(mid)?;
        evaluations += 1;
        debug!("bisection at mu = {mid}: converged = {converged}");
        if converged {
            lower = mid;
        } else {
            upper = mid;
        }
    }

    Ok(ThresholdEstimate {
        mu: mid,
        lower,
        upper,
        evaluations,
    })
}

/// Locates the coupling at which the Picard iteration switches from
/// converging to capping out (or overflowing).
pub fn find_divergence_threshold(
    bisection: &BisectionOptions,
    options: &ProblemOptions,
) -> Result<ThresholdEstimate> {
    bisect(bisection, |mu| {
        run_fixed_point(mu, options).map(|solution| solution.converged())
    })
}
