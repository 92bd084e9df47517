//! LU factorization with partial pivoting, and the solvers built on it.

use log::warn;

use crate::coefficient::Coefficient;
use crate::dense::DenseMatrix;
use crate::error::{MatrixError, Result};

use super::view::{MatrixView, ViewSpec};
use super::{materialize, require_square, FloatCoefficient};

/// Iterative refinement stops after this many correction steps.
const MAX_REFINEMENT_STEPS: usize = 5;

/// Converts a sequence of one-based row interchanges into a permutation: row `i` of `L * U`
/// is row `p[i]` of the factored matrix.
pub fn pivot_permutation(pivots: &[usize], rows: usize) -> Vec<usize> {
    let mut p: Vec<usize> = (0..rows).collect();
    for (i, &a) in pivots.iter().enumerate() {
        p.swap(i, a - 1);
    }
    p
}

/// The permutation matrix `P` with `A = P * L * U`: `P[p[i], i] = 1`.
pub fn pivot_matrix<T: Coefficient>(pivots: &[usize], rows: usize) -> DenseMatrix<T> {
    let mut m = DenseMatrix::zeros(rows, rows);
    for (i, p) in pivot_permutation(pivots, rows).into_iter().enumerate() {
        m.update(p, i, T::one());
    }
    m
}

/// The packed result of an LU factorization.
#[derive(Debug, Clone)]
pub struct LuFactors<T> {
    rows: usize,
    cols: usize,
    /// `L` strictly below the diagonal (unit diagonal implied), `U` on and above it.
    packed: Vec<T>,
    /// One-based row interchanges, one per eliminated column.
    pivots: Vec<usize>,
    singular: bool,
}

/// Factors `op(A)` as `P * L * U`.
///
/// A zero pivot column is skipped and marks the factorization singular rather than
/// failing, so `L` and `U` are always available.
pub fn factor<T: FloatCoefficient>(view: &MatrixView<'_, T>) -> LuFactors<T> {
    let (rows, cols) = view.dims();
    let mut a: Vec<T> = (0..cols)
        .flat_map(|j| (0..rows).map(move |i| view.get(i, j)))
        .collect();
    let steps = rows.min(cols);
    let mut pivots = Vec::with_capacity(steps);
    let mut singular = false;

    for k in 0..steps {
        let diagonal = k * rows + k;
        let mut p = k;
        let mut best = a[diagonal].magnitude();
        for i in k + 1..rows {
            let m = a[k * rows + i].magnitude();
            if m > best {
                p = i;
                best = m;
            }
        }
        pivots.push(p + 1);
        if best == 0.0 {
            singular = true;
            continue;
        }

        if p != k {
            for j in 0..cols {
                a.swap(j * rows + k, j * rows + p);
            }
        }

        let pivot = a[diagonal];
        for v in &mut a[diagonal + 1..(k + 1) * rows] {
            *v /= pivot;
        }
        for j in k + 1..cols {
            let factor = a[j * rows + k];
            if factor.is_zero() {
                continue;
            }
            for i in k + 1..rows {
                let l = a[k * rows + i];
                a[j * rows + i] -= l * factor;
            }
        }
    }

    LuFactors {
        rows,
        cols,
        packed: a,
        pivots,
        singular,
    }
}

impl<T: FloatCoefficient> LuFactors<T> {
    #[inline]
    pub fn pivots(&self) -> &[usize] {
        &self.pivots
    }

    /// True if some pivot was exactly zero.
    #[inline]
    pub fn is_singular(&self) -> bool {
        self.singular
    }

    #[inline]
    fn packed(&self, i: usize, j: usize) -> T {
        self.packed[j * self.rows + i]
    }

    /// The unit lower trapezoidal factor, `rows x min(rows, cols)`.
    pub fn lower(&self) -> DenseMatrix<T> {
        let k = self.rows.min(self.cols);
        DenseMatrix::from_fn(self.rows, k, |i, j| match i.cmp(&j) {
            std::cmp::Ordering::Greater => self.packed(i, j),
            std::cmp::Ordering::Equal => T::one(),
            std::cmp::Ordering::Less => T::zero(),
        })
    }

    /// The upper trapezoidal factor, `min(rows, cols) x cols`.
    pub fn upper(&self) -> DenseMatrix<T> {
        let k = self.rows.min(self.cols);
        DenseMatrix::from_fn(k, self.cols, |i, j| {
            if i <= j {
                self.packed(i, j)
            } else {
                T::zero()
            }
        })
    }

    pub fn pivot_matrix(&self) -> DenseMatrix<T> {
        pivot_matrix(&self.pivots, self.rows)
    }

    /// Determinant of a square factorization.
    pub fn determinant(&self) -> T {
        if self.singular {
            return T::zero();
        }
        let mut det = T::one();
        for (k, &p) in self.pivots.iter().enumerate() {
            det *= self.packed(k, k);
            if p - 1 != k {
                det = -det;
            }
        }
        det
    }

    /// Overwrites `b` with the solution of `A x = b` for a square, nonsingular factorization.
    pub fn solve_in_place(&self, b: &mut [T]) {
        let n = self.rows;
        for (k, &p) in self.pivots.iter().enumerate() {
            b.swap(k, p - 1);
        }
        for j in 0..n {
            let x = b[j];
            if x.is_zero() {
                continue;
            }
            for i in j + 1..n {
                b[i] -= self.packed(i, j) * x;
            }
        }
        for j in (0..n).rev() {
            b[j] /= self.packed(j, j);
            let x = b[j];
            for i in 0..j {
                b[i] -= self.packed(i, j) * x;
            }
        }
    }
}

/// `A = P * L * U`.
#[derive(Debug, Clone)]
pub struct Plu<T: Coefficient> {
    pub p: DenseMatrix<T>,
    pub l: DenseMatrix<T>,
    pub u: DenseMatrix<T>,
}

pub fn plu<T: FloatCoefficient>(view: &MatrixView<'_, T>) -> Plu<T> {
    let lu = factor(view);
    Plu {
        p: lu.pivot_matrix(),
        l: lu.lower(),
        u: lu.upper(),
    }
}

pub fn determinant<T: FloatCoefficient>(view: &MatrixView<'_, T>) -> Result<T> {
    require_square(view)?;
    Ok(factor(view).determinant())
}

pub fn inverse<T: FloatCoefficient>(view: &MatrixView<'_, T>) -> Result<DenseMatrix<T>> {
    let n = require_square(view)?;
    let lu = factor(view);
    if lu.is_singular() {
        return Err(MatrixError::Singular);
    }
    Ok(DenseMatrix::fill_columns(n, n, |j, column| {
        column[j] = T::one();
        lu.solve_in_place(column);
    }))
}

fn max_magnitude<T: Coefficient>(values: &[T]) -> f64 {
    values.iter().fold(0.0, |m: f64, v| m.max(v.magnitude()))
}

/// Solves `op(A) X = op(B)` with iterative refinement.
///
/// Returns an empty matrix if `op(A)` is singular.
pub fn solve<T: FloatCoefficient>(a: &MatrixView<'_, T>, b: &MatrixView<'_, T>) -> Result<DenseMatrix<T>> {
    let n = require_square(a)?;
    let (rows, cols) = b.dims();
    if rows != n {
        return Err(MatrixError::incompatible(a.dims(), b.dims()));
    }
    let lu = factor(a);
    if lu.is_singular() {
        warn!("solve: {}x{} system is singular", n, n);
        return Ok(DenseMatrix::zeros(0, 0));
    }

    let lhs = materialize(a);
    let rhs = materialize(b);
    Ok(DenseMatrix::fill_columns(n, cols, |j, x| {
        let target = rhs.column(j);
        x.copy_from_slice(target);
        lu.solve_in_place(x);

        let mut residual = vec![T::zero(); n];
        for _ in 0..MAX_REFINEMENT_STEPS {
            residual.copy_from_slice(target);
            for (k, &xk) in x.iter().enumerate() {
                for (r, &a) in residual.iter_mut().zip(lhs.column(k)) {
                    *r -= a * xk;
                }
            }
            lu.solve_in_place(&mut residual);
            for (v, &d) in x.iter_mut().zip(&residual) {
                *v += d;
            }
            if max_magnitude(&residual) <= f64::EPSILON * max_magnitude(x) {
                break;
            }
        }
    }))
}

impl<T: FloatCoefficient> DenseMatrix<T> {
    pub fn lu(&self) -> LuFactors<T> {
        factor(&self.view(ViewSpec::plain()))
    }

    pub fn plu(&self) -> Plu<T> {
        plu(&self.view(ViewSpec::plain()))
    }

    pub fn determinant(&self) -> Result<T> {
        determinant(&self.view(ViewSpec::plain()))
    }

    pub fn inverse(&self) -> Result<Self> {
        inverse(&self.view(ViewSpec::plain()))
    }

    /// Solves `self * X = rhs`; empty if `self` is singular.
    pub fn solve(&self, rhs: &Self) -> Result<Self> {
        solve(&self.view(ViewSpec::plain()), &rhs.view(ViewSpec::plain()))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::coefficient::Complex;
    use crate::dense::{ComplexMatrix, RealMatrix};
    use approx::assert_relative_eq;
    use rand::{rngs::SmallRng, SeedableRng};

    fn assert_close(a: &RealMatrix, b: &RealMatrix) {
        assert_eq!((a.rows(), a.cols()), (b.rows(), b.cols()));
        for (i, j, v) in a.iter() {
            assert_relative_eq!(v, b[(i, j)], epsilon = 1e-10);
        }
    }

    #[test]
    fn pivot_conversion() {
        assert_eq!(pivot_permutation(&[3, 3, 3], 3), vec![2, 0, 1]);
        let p: RealMatrix = pivot_matrix(&[3, 3, 3], 3);
        assert_eq!(
            p,
            RealMatrix::from_vec(&[vec![0.0, 1.0, 0.0], vec![0.0, 0.0, 1.0], vec![1.0, 0.0, 0.0]])
        );
    }

    #[test]
    fn reconstructs() {
        let mut rng = SmallRng::seed_from_u64(1);
        for (rows, cols) in [(4, 4), (6, 3), (3, 6), (1, 1)] {
            let a = RealMatrix::random(&mut rng, rows, cols);
            let Plu { p, l, u } = a.plu();
            let back = p.multiply(&l).unwrap().multiply(&u).unwrap();
            assert_close(&back, &a);
        }
    }

    #[test]
    fn determinant_and_inverse() {
        let a = RealMatrix::from_vec(&[vec![0.0, 2.0, 1.0], vec![1.0, 1.0, 0.0], vec![3.0, 0.0, 1.0]]);
        assert_relative_eq!(a.determinant().unwrap(), -5.0, epsilon = 1e-12);
        let inv = a.inverse().unwrap();
        assert_close(&a.multiply(&inv).unwrap(), &RealMatrix::identity(3, 3));

        let singular = RealMatrix::from_vec(&[vec![1.0, 2.0], vec![2.0, 4.0]]);
        assert!(matches!(singular.inverse(), Err(MatrixError::Singular)));
        assert_eq!(singular.determinant().unwrap(), 0.0);

        assert!(matches!(
            RealMatrix::zeros(2, 3).determinant(),
            Err(MatrixError::InvalidDimensions { rows: 2, cols: 3 })
        ));
    }

    #[test]
    fn solves() {
        let mut rng = SmallRng::seed_from_u64(2);
        let a = ComplexMatrix::random(&mut rng, 5, 5);
        let x = ComplexMatrix::random(&mut rng, 5, 2);
        let b = a.multiply(&x).unwrap();
        let solved = a.solve(&b).unwrap();
        for (i, j, v) in solved.iter() {
            assert!((v - x[(i, j)]).norm() < 1e-10);
        }

        let singular = ComplexMatrix::zeros(2, 2);
        let rhs = ComplexMatrix::ones(2, 1);
        assert!(singular.solve(&rhs).unwrap().is_empty());
        assert!(a.solve(&rhs).is_err());

        let det = ComplexMatrix::diagonal(&[Complex::new(0.0, 1.0), Complex::new(0.0, 1.0)])
            .determinant()
            .unwrap();
        assert!((det - Complex::new(-1.0, 0.0)).norm() < 1e-15);
    }
}
