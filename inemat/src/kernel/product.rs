//! Matrix products and inner products.

use crate::coefficient::Coefficient;
use crate::dense::DenseMatrix;
use crate::error::{MatrixError, Result};

use super::materialize;
use super::view::{MatrixView, ViewSpec};

/// Computes `alpha_a * op_a(A) * alpha_b * op_b(B)`.
///
/// Each output column is accumulated as a linear combination of the columns of `op_a(A)`.
pub fn multiply<T: Coefficient>(a: &MatrixView<'_, T>, b: &MatrixView<'_, T>) -> Result<DenseMatrix<T>> {
    let (rows, inner) = a.dims();
    let (inner_b, cols) = b.dims();
    if inner != inner_b {
        return Err(MatrixError::incompatible(a.dims(), b.dims()));
    }

    let lhs = materialize(a);
    Ok(DenseMatrix::fill_columns(rows, cols, |j, column| {
        for k in 0..inner {
            let factor = b.get(k, j);
            if factor.is_zero() {
                continue;
            }
            for (v, &x) in column.iter_mut().zip(lhs.column(k)) {
                *v += x * factor;
            }
        }
    }))
}

/// `sum x[i] * y[i]`.
pub fn dot<T: Coefficient>(x: &[T], y: &[T]) -> T {
    x.iter().zip(y).fold(T::zero(), |acc, (&a, &b)| acc + a * b)
}

/// `sum conj(x[i]) * y[i]`.
pub fn dotc<T: Coefficient>(x: &[T], y: &[T]) -> T {
    x.iter()
        .zip(y)
        .fold(T::zero(), |acc, (&a, &b)| acc + a.conjugated() * b)
}

impl<T: Coefficient> DenseMatrix<T> {
    /// The matrix product `self * other`.
    pub fn multiply(&self, other: &Self) -> Result<Self> {
        multiply(&self.view(ViewSpec::plain()), &other.view(ViewSpec::plain()))
    }

    /// The product `alpha * op(self) * op(other)`, with `alpha` taken from `spec_a`.
    pub fn multiply_with(&self, spec_a: ViewSpec<T>, other: &Self, spec_b: ViewSpec<T>) -> Result<Self> {
        multiply(&self.view(spec_a), &other.view(spec_b))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::coefficient::Complex;
    use crate::dense::{ComplexMatrix, IntegerMatrix, RealMatrix};
    use crate::kernel::view::Op;
    use rand::{rngs::SmallRng, SeedableRng};

    #[test]
    fn small_product() {
        let a = IntegerMatrix::from_vec(&[vec![1, 2], vec![3, 4]]);
        let b = IntegerMatrix::from_vec(&[vec![5, 6, 7], vec![8, 9, 10]]);
        let c = a.multiply(&b).unwrap();
        assert_eq!(
            c,
            IntegerMatrix::from_vec(&[vec![21, 24, 27], vec![47, 54, 61]])
        );
        assert!(c.residue_is_clear());
        assert!(matches!(
            b.multiply(&a),
            Err(MatrixError::IncompatibleDimensions { lhs_rows: 2, lhs_cols: 3, rhs_rows: 2, rhs_cols: 2 })
        ));
    }

    #[test]
    fn transposed_operands() {
        let mut rng = SmallRng::seed_from_u64(1);
        let a = RealMatrix::random(&mut rng, 5, 3);
        let b = RealMatrix::random(&mut rng, 5, 4);
        let lazy = a
            .multiply_with(ViewSpec::new(Op::Transpose, 2.0), &b, ViewSpec::plain())
            .unwrap();
        let eager = a.transpose().scaled(2.0).multiply(&b).unwrap();
        assert_eq!((lazy.rows(), lazy.cols()), (3, 4));
        for (i, j, v) in lazy.iter() {
            approx::assert_relative_eq!(v, eager[(i, j)], epsilon = 1e-12);
        }
    }

    #[test]
    fn adjoint_product_is_hermitian() {
        let mut rng = SmallRng::seed_from_u64(2);
        let a = ComplexMatrix::random(&mut rng, 6, 4);
        let g = a
            .multiply_with(ViewSpec::with_op(Op::Adjoint), &a, ViewSpec::plain())
            .unwrap();
        for (i, j, v) in g.iter() {
            let w = g[(j, i)].conj();
            assert!((v - w).norm() < 1e-12);
        }
        let x = [Complex::new(0.0, 1.0)];
        assert_eq!(dotc(&x, &x), Complex::new(1.0, 0.0));
        assert_eq!(dot(&x, &x), Complex::new(-1.0, 0.0));
    }
}
