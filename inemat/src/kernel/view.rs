//! Pointer-plus-stride views handed to the numerical kernels.

use nalgebra::DMatrix;

use crate::coefficient::Coefficient;
use crate::layout::element_index;

/// A deferred transform applied when a kernel reads a matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Op {
    #[default]
    None,
    Transpose,
    Conjugate,
    /// Conjugate transpose.
    Adjoint,
}

impl Op {
    #[inline]
    pub fn is_transposed(self) -> bool {
        matches!(self, Op::Transpose | Op::Adjoint)
    }

    #[inline]
    pub fn is_conjugated(self) -> bool {
        matches!(self, Op::Conjugate | Op::Adjoint)
    }

    /// Dimensions of `op(A)` for an `rows x cols` matrix `A`.
    #[inline]
    pub fn output_dims(self, rows: usize, cols: usize) -> (usize, usize) {
        if self.is_transposed() {
            (cols, rows)
        } else {
            (rows, cols)
        }
    }

    #[inline]
    pub fn apply<T: Coefficient>(self, value: T) -> T {
        if self.is_conjugated() {
            value.conjugated()
        } else {
            value
        }
    }
}

/// A lazy transform together with a scale factor: the view reads as `alpha * op(A)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewSpec<T> {
    pub op: Op,
    pub alpha: T,
}

impl<T: Coefficient> ViewSpec<T> {
    #[inline]
    pub fn new(op: Op, alpha: T) -> Self {
        ViewSpec { op, alpha }
    }

    /// `A` itself.
    #[inline]
    pub fn plain() -> Self {
        Self::new(Op::None, T::one())
    }

    #[inline]
    pub fn with_op(op: Op) -> Self {
        Self::new(op, T::one())
    }

    #[inline]
    pub fn scaled(alpha: T) -> Self {
        Self::new(Op::None, alpha)
    }
}

impl<T: Coefficient> Default for ViewSpec<T> {
    fn default() -> Self {
        Self::plain()
    }
}

/// Read-only access to a column-major block as `alpha * op(A)`.
///
/// `rows` and `cols` describe the stored block `A`; use [`MatrixView::dims`] for the
/// dimensions seen through the transform.
#[derive(Debug, Clone, Copy)]
pub struct MatrixView<'a, T> {
    pub rows: usize,
    pub cols: usize,
    pub data: &'a [T],
    /// Distance in coefficients between the starts of consecutive columns.
    pub column_stride: usize,
    pub spec: ViewSpec<T>,
}

impl<'a, T: Coefficient> MatrixView<'a, T> {
    #[inline]
    pub fn new(rows: usize, cols: usize, data: &'a [T], column_stride: usize, spec: ViewSpec<T>) -> Self {
        MatrixView {
            rows,
            cols,
            data,
            column_stride,
            spec,
        }
    }

    /// Dimensions of `op(A)`.
    #[inline]
    pub fn dims(&self) -> (usize, usize) {
        self.spec.op.output_dims(self.rows, self.cols)
    }

    /// Element `(i, j)` of the stored block, without the transform.
    #[inline]
    pub fn stored(&self, i: usize, j: usize) -> T {
        self.data[element_index(i, j, self.column_stride)]
    }

    /// Element `(i, j)` of `alpha * op(A)`.
    #[inline]
    pub fn get(&self, i: usize, j: usize) -> T {
        let value = if self.spec.op.is_transposed() {
            self.stored(j, i)
        } else {
            self.stored(i, j)
        };
        self.spec.alpha * self.spec.op.apply(value)
    }

    /// Materializes `alpha * op(A)` as an nalgebra matrix.
    pub fn to_dmatrix(&self) -> DMatrix<T> {
        let (rows, cols) = self.dims();
        DMatrix::from_fn(rows, cols, |i, j| self.get(i, j))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use num_complex::Complex64;

    #[test]
    fn ops() {
        assert_eq!(Op::Adjoint.output_dims(2, 3), (3, 2));
        assert_eq!(Op::Conjugate.output_dims(2, 3), (2, 3));
        let z = Complex64::new(1.0, 2.0);
        assert_eq!(Op::Adjoint.apply(z), z.conj());
        assert_eq!(Op::Transpose.apply(z), z);
    }

    #[test]
    fn strided_view() {
        // 2x3 stored with stride 4
        let data = [1.0, 2.0, 0.0, 0.0, 3.0, 4.0, 0.0, 0.0, 5.0, 6.0, 0.0, 0.0];
        let view = MatrixView::new(2, 3, &data, 4, ViewSpec::new(Op::Transpose, 2.0));
        assert_eq!(view.dims(), (3, 2));
        assert_eq!(view.get(2, 1), 12.0);
        let m = view.to_dmatrix();
        assert_eq!(m[(1, 0)], 6.0);
        assert_eq!(m.nrows(), 3);
    }
}
