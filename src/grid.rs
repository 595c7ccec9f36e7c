//! Uniform radial grid on which the boundary-value problems are discretized.

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SolverError};

/// Length of the radial domain.
pub const DOMAIN_LENGTH: f64 = 10.0;

/// Radius of the first grid point.
pub const LEFT_BOUNDARY: f64 = 1.0;

/// Grid of `n` points `x[i] = 1 + i·h` with spacing `h = 10 / n`.
///
/// Serializes as its point count; deserializing rebuilds it through
/// [`Grid::new`], so a stored grid is validated like a fresh one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub struct Grid {
    spacing: f64,
    points: DVector<f64>,
}

impl Grid {
    /// Builds the grid for `n` points. Both boundary rows need their own point,
    /// so `n` must be at least 2.
    pub fn new(n: usize) -> Result<Self> {
        if n < 2 {
            return Err(SolverError::InvalidGrid { points: n });
        }
        let spacing = DOMAIN_LENGTH / n as f64;
        let points = DVector::from_fn(n, |i, _| LEFT_BOUNDARY + i as f64 * spacing);
        Ok(Self { spacing, points })
    }

    /// Number of grid points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the grid has no points. Never true for a constructed grid.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Grid spacing `h`.
    pub fn spacing(&self) -> f64 {
        self.spacing
    }

    /// Grid coordinates.
    pub fn points(&self) -> &DVector<f64> {
        &self.points
    }

    /// Coefficient multiplying `u[i - 1]` in row `i`: `1 - h / (2 x_i)`.
    pub fn lower_coefficient(&self, i: usize) -> f64 {
        1.0 - self.spacing / (2.0 * self.points[i])
    }

    /// Coefficient multiplying `u[i + 1]` in row `i`: `1 + h / (2 x_i)`.
    ///
    /// Row 0 folds the image point of the Neumann condition into its neighbor
    /// and uses 2 instead.
    pub fn upper_coefficient(&self, i: usize) -> f64 {
        if i == 0 {
            2.0
        } else {
            1.0 + self.spacing / (2.0 * self.points[i])
        }
    }

    /// Checks that a vector carries one value per grid point.
    pub fn check_len(&self, context: &'static str, vector: &DVector<f64>) -> Result<()> {
        if vector.len() != self.len() {
            return Err(SolverError::dimension_mismatch(
                context,
                self.len(),
                vector.len(),
            ));
        }
        Ok(())
    }
}

impl TryFrom<usize> for Grid {
    type Error = SolverError;

    fn try_from(points: usize) -> Result<Self> {
        Self::new(points)
    }
}

impl From<Grid> for usize {
    fn from(grid: Grid) -> Self {
        grid.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn thousand_point_grid_has_unit_hundredth_spacing() {
        let grid = Grid::new(1000).unwrap();
        assert_eq!(grid.len(), 1000);
        assert_relative_eq!(grid.spacing(), 0.01, epsilon = 1e-15);
        for (i, x) in grid.points().iter().enumerate() {
            assert_relative_eq!(*x, 1.0 + i as f64 * grid.spacing(), epsilon = 1e-12);
        }
        assert_eq!(grid.points()[0], 1.0);
    }

    #[test]
    fn coefficients_follow_central_differences() {
        let grid = Grid::new(10).unwrap();
        assert_eq!(grid.upper_coefficient(0), 2.0);
        assert_relative_eq!(grid.lower_coefficient(1), 1.0 - 1.0 / 4.0);
        assert_relative_eq!(grid.upper_coefficient(1), 1.0 + 1.0 / 4.0);
        assert_relative_eq!(grid.lower_coefficient(9), 1.0 - 1.0 / 20.0);
    }

    #[test]
    fn rejects_degenerate_grids() {
        assert!(matches!(
            Grid::new(1),
            Err(SolverError::InvalidGrid { points: 1 })
        ));
        assert!(Grid::new(0).is_err());
    }

    #[test]
    fn serializes_as_point_count() {
        let grid = Grid::new(10).unwrap();
        assert_eq!(serde_json::to_string(&grid).unwrap(), "10");

        let restored: Grid = serde_json::from_str("10").unwrap();
        assert_eq!(restored, grid);
        assert_relative_eq!(restored.spacing(), 1.0);
    }

    #[test]
    fn deserialization_rejects_degenerate_grids() {
        assert!(serde_json::from_str::<Grid>("0").is_err());
        assert!(serde_json::from_str::<Grid>("1").is_err());
        assert!(serde_json::from_str::<Grid>("{\"spacing\":1.0,\"points\":[]}").is_err());
    }
}
