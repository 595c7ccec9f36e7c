//! Tridiagonal matrices and their LU factorization without pivoting (Thomas elimination).
//!
//! A tridiagonal matrix of order `n` is stored as three vectors: the
//! sub-diagonal (`n - 1` entries, `sub[i - 1] = A[i][i - 1]`), the main
//! diagonal (`n` entries) and the super-diagonal (`n - 1` entries,
//! `sup[i] = A[i][i + 1]`). Factoring it yields a unit lower-bidiagonal `L`
//! described by its multipliers `l` and an upper-bidiagonal `U` whose
//! super-diagonal is the original `sup` and whose diagonal is `v`.

use nalgebra::{DMatrix, DVector};

use crate::error::{Result, SolverError};

/// Square tridiagonal matrix stored by diagonals.
#[derive(Clone, Debug, PartialEq)]
pub struct TridiagonalMatrix {
    sub: DVector<f64>,
    diag: DVector<f64>,
    sup: DVector<f64>,
}

impl TridiagonalMatrix {
    /// Builds a matrix from its three diagonals, validating their lengths.
    pub fn new(sub: DVector<f64>, diag: DVector<f64>, sup: DVector<f64>) -> Result<Self> {
        let n = diag.len();
        if n == 0 {
            return Err(SolverError::dimension_mismatch("main diagonal", 1, 0));
        }
        if sub.len() != n - 1 {
            return Err(SolverError::dimension_mismatch(
                "sub-diagonal length",
                n - 1,
                sub.len(),
            ));
        }
        if sup.len() != n - 1 {
            return Err(SolverError::dimension_mismatch(
                "super-diagonal length",
                n - 1,
                sup.len(),
            ));
        }
        Ok(Self { sub, diag, sup })
    }

    /// Convenience constructor from slices.
    pub fn from_slices(sub: &[f64], diag: &[f64], sup: &[f64]) -> Result<Self> {
        Self::new(
            DVector::from_column_slice(sub),
            DVector::from_column_slice(diag),
            DVector::from_column_slice(sup),
        )
    }

    /// Order of the matrix.
    pub fn dim(&self) -> usize {
        self.diag.len()
    }

    /// Sub-diagonal entries, `sub[i - 1] = A[i][i - 1]`.
    pub fn sub(&self) -> &DVector<f64> {
        &self.sub
    }

    /// Main diagonal entries.
    pub fn diag(&self) -> &DVector<f64> {
        &self.diag
    }

    /// Super-diagonal entries, `sup[i] = A[i][i + 1]`.
    pub fn sup(&self) -> &DVector<f64> {
        &self.sup
    }

    /// Computes `A·u` directly from the diagonals.
    pub fn mul_vec(&self, u: &DVector<f64>) -> Result<DVector<f64>> {
        let n = self.dim();
        if u.len() != n {
            return Err(SolverError::dimension_mismatch(
                "tridiagonal product operand",
                n,
                u.len(),
            ));
        }

        let mut product = DVector::zeros(n);
        for i in 0..n {
            let mut row = self.diag[i] * u[i];
            if i > 0 {
                row += self.sub[i - 1] * u[i - 1];
            }
            if i + 1 < n {
                row += self.sup[i] * u[i + 1];
            }
            product[i] = row;
        }
        Ok(product)
    }

    /// Materializes the matrix densely. Only the general Jacobian solve needs this.
    pub fn to_dense(&self) -> DMatrix<f64> {
        let n = self.dim();
        let mut dense = DMatrix::zeros(n, n);
        for i in 0..n {
            dense[(i, i)] = self.diag[i];
            if i > 0 {
                dense[(i, i - 1)] = self.sub[i - 1];
            }
            if i + 1 < n {
                dense[(i, i + 1)] = self.sup[i];
            }
        }
        dense
    }

    /// Factors the matrix, see [`factorize`].
    pub fn factorize(&self) -> Result<LuFactors> {
        factorize(self)
    }

    /// Solves `A·x = rhs` by factorization followed by both substitution passes.
    pub fn solve(&self, rhs: &DVector<f64>) -> Result<DVector<f64>> {
        self.factorize()?.solve(&self.sup, rhs)
    }
}

/// LU factors of a [`TridiagonalMatrix`].
#[derive(Clone, Debug, PartialEq)]
pub struct LuFactors {
    l: DVector<f64>,
    v: DVector<f64>,
}

impl LuFactors {
    /// Multipliers below the unit diagonal of `L` (length `n - 1`).
    pub fn l(&self) -> &DVector<f64> {
        &self.l
    }

    /// Diagonal of `U` (length `n`).
    pub fn v(&self) -> &DVector<f64> {
        &self.v
    }

    /// Order of the factored matrix.
    pub fn dim(&self) -> usize {
        self.v.len()
    }

    /// Solves `L·y = z` in ascending index order.
    pub fn forward_substitution(&self, z: &DVector<f64>) -> Result<DVector<f64>> {
        let n = self.dim();
        if z.len() != n {
            return Err(SolverError::dimension_mismatch(
                "forward substitution right-hand side",
                n,
                z.len(),
            ));
        }

        let mut y = DVector::zeros(n);
        y[0] = z[0];
        for i in 1..n {
            y[i] = z[i] - self.l[i - 1] * y[i - 1];
        }
        Ok(y)
    }

    /// Solves `U·x = y` in descending index order, where `U` has diagonal `v`
    /// and super-diagonal `sup`.
    pub fn backward_substitution(
        &self,
        sup: &DVector<f64>,
        y: &DVector<f64>,
    ) -> Result<DVector<f64>> {
        let n = self.dim();
        if y.len() != n {
            return Err(SolverError::dimension_mismatch(
                "backward substitution right-hand side",
                n,
                y.len(),
            ));
        }
        if sup.len() != n - 1 {
            return Err(SolverError::dimension_mismatch(
                "backward substitution super-diagonal",
                n - 1,
                sup.len(),
            ));
        }

        let mut x = DVector::zeros(n);
        x[n - 1] = y[n - 1] / self.v[n - 1];
        for i in (0..n - 1).rev() {
            x[i] = (y[i] - sup[i] * x[i + 1]) / self.v[i];
        }
        Ok(x)
    }

    /// Forward then backward substitution.
    pub fn solve(&self, sup: &DVector<f64>, z: &DVector<f64>) -> Result<DVector<f64>> {
        let y = self.forward_substitution(z)?;
        self.backward_substitution(sup, &y)
    }
}

/// Factors a tridiagonal matrix as `L·U` without pivoting.
///
/// Fails with [`SolverError::NumericInstability`] as soon as a pivot `v[i]`
/// that has to be divided by is zero or not finite, including the last one
/// which the backward pass divides by.
pub fn factorize(matrix: &TridiagonalMatrix) -> Result<LuFactors> {
    let factors = factorize_unchecked(matrix);
    if let Some((index, pivot)) = factors
        .v
        .iter()
        .enumerate()
        .find(|(_, pivot)| **pivot == 0.0 || !pivot.is_finite())
    {
        return Err(SolverError::NumericInstability {
            index,
            pivot: *pivot,
        });
    }
    Ok(factors)
}

/// Factors a tridiagonal matrix without any pivot check.
///
/// A zero pivot propagates as `inf`/`NaN` through the factors exactly as
/// plain Thomas elimination would.
pub fn factorize_unchecked(matrix: &TridiagonalMatrix) -> LuFactors {
    let n = matrix.dim();
    let mut l = DVector::zeros(n - 1);
    let mut v = DVector::zeros(n);

    v[0] = matrix.diag[0];
    for i in 1..n {
        l[i - 1] = matrix.sub[i - 1] / v[i - 1];
        v[i] = matrix.diag[i] - l[i - 1] * matrix.sup[i - 1];
    }

    LuFactors { l, v }
}

/// Largest absolute entry of a vector. Any NaN entry makes the norm NaN.
pub fn infinity_norm(vector: &DVector<f64>) -> f64 {
    vector.iter().fold(0.0_f64, |acc, value| {
        if acc.is_nan() || value.is_nan() {
            f64::NAN
        } else {
            acc.max(value.abs())
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn hand_checked() -> TridiagonalMatrix {
        TridiagonalMatrix::from_slices(&[2.0, 6.0], &[1.0, 10.0, 10.0], &[4.0, 5.0]).unwrap()
    }

    #[test]
    fn factorizes_reference_fixture_exactly() {
        let matrix = TridiagonalMatrix::from_slices(
            &[-4.0, -3.0, -2.0, 2.0],
            &[-2.0, 5.0, -1.0, 4.0, -2.0],
            &[1.0, 2.0, -1.0, 1.0],
        )
        .unwrap();

        let factors = factorize(&matrix).unwrap();
        assert_eq!(factors.l().as_slice(), &[2.0, -1.0, -2.0, 1.0]);
        assert_eq!(factors.v().as_slice(), &[-2.0, 3.0, 1.0, 2.0, -3.0]);
    }

    #[test]
    fn substitution_passes_match_hand_computation() {
        let matrix = hand_checked();
        let factors = matrix.factorize().unwrap();
        assert_eq!(factors.l().as_slice(), &[2.0, 3.0]);
        assert_eq!(factors.v().as_slice(), &[1.0, 2.0, -5.0]);

        let z = DVector::from_vec(vec![3.0, 3.0, 3.0]);
        let y = factors.forward_substitution(&z).unwrap();
        assert_eq!(y.as_slice(), &[3.0, -3.0, 12.0]);

        let x = factors.backward_substitution(matrix.sup(), &y).unwrap();
        assert_relative_eq!(x, DVector::from_vec(vec![-15.0, 4.5, -2.4]), epsilon = 1e-12);
        assert_relative_eq!(matrix.mul_vec(&x).unwrap(), z, epsilon = 1e-12);
    }

    #[test]
    fn product_agrees_with_dense_matrix() {
        let matrix = hand_checked();
        let u = DVector::from_vec(vec![0.5, -1.0, 2.0]);
        let dense = matrix.to_dense() * &u;
        assert_relative_eq!(matrix.mul_vec(&u).unwrap(), dense, epsilon = 1e-14);
    }

    #[test]
    fn single_row_system_is_a_division() {
        let matrix = TridiagonalMatrix::from_slices(&[], &[4.0], &[]).unwrap();
        let x = matrix.solve(&DVector::from_vec(vec![2.0])).unwrap();
        assert_eq!(x[0], 0.5);
    }

    #[test]
    fn zero_pivot_is_reported() {
        let matrix = TridiagonalMatrix::from_slices(&[1.0], &[0.0, 1.0], &[1.0]).unwrap();
        match factorize(&matrix) {
            Err(SolverError::NumericInstability { index, pivot }) => {
                assert_eq!(index, 0);
                assert_eq!(pivot, 0.0);
            }
            other => panic!("expected numeric instability, got {other:?}"),
        }

        let raw = factorize_unchecked(&matrix);
        assert!(raw.l()[0].is_infinite());
    }

    #[test]
    fn rejects_inconsistent_diagonals() {
        let err = TridiagonalMatrix::from_slices(&[1.0, 1.0], &[2.0, 2.0], &[1.0]).unwrap_err();
        assert!(matches!(
            err,
            SolverError::DimensionMismatch {
                expected: 1,
                found: 2,
                ..
            }
        ));

        let factors = hand_checked().factorize().unwrap();
        let short = DVector::from_vec(vec![1.0, 2.0]);
        assert!(factors.forward_substitution(&short).is_err());
        assert!(hand_checked().mul_vec(&short).is_err());
    }

    #[test]
    fn infinity_norm_takes_largest_magnitude() {
        let v = DVector::from_vec(vec![1.0, -7.5, 3.0]);
        assert_eq!(infinity_norm(&v), 7.5);
    }

    #[test]
    fn infinity_norm_propagates_nan() {
        assert!(infinity_norm(&DVector::from_vec(vec![f64::NAN, f64::NAN])).is_nan());
        assert!(infinity_norm(&DVector::from_vec(vec![3.0, f64::NAN, 1.0])).is_nan());
        assert_eq!(
            infinity_norm(&DVector::from_vec(vec![f64::NEG_INFINITY, 2.0])),
            f64::INFINITY
        );
    }
}
