//! Total ordering and equality of dense matrices.
//!
//! Matrices compare by matrix type, then rows, then columns, then the raw bytes of the
//! packed payload. Because all residue is zero, two matrices compare equal exactly when
//! they have the same kind, shape and elements (bit for bit, so `0.0 != -0.0` and a NaN
//! equals an identical NaN).

use std::cmp::Ordering;

use crate::boolean::BooleanMatrix;
use crate::coefficient::{Coefficient, CoefficientType};
use crate::dense::DenseMatrix;

/// The storage scheme and coefficient kind of a matrix, ordered as matrices compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MatrixType {
    BooleanDense,
    IntegerDense,
    RealDense,
    ComplexDense,
}

impl MatrixType {
    #[inline]
    pub fn coefficient_type(self) -> CoefficientType {
        match self {
            MatrixType::BooleanDense => CoefficientType::Boolean,
            MatrixType::IntegerDense => CoefficientType::Integer,
            MatrixType::RealDense => CoefficientType::Real,
            MatrixType::ComplexDense => CoefficientType::Complex,
        }
    }

    #[inline]
    pub fn dense(coefficient: CoefficientType) -> Self {
        match coefficient {
            CoefficientType::Boolean => MatrixType::BooleanDense,
            CoefficientType::Integer => MatrixType::IntegerDense,
            CoefficientType::Real => MatrixType::RealDense,
            CoefficientType::Complex => MatrixType::ComplexDense,
        }
    }
}

/// Compares two `(type, rows, cols, payload)` keys.
#[inline]
pub(crate) fn compare_keys(
    a: (MatrixType, usize, usize, &[u8]),
    b: (MatrixType, usize, usize, &[u8]),
) -> Ordering {
    a.cmp(&b)
}

impl BooleanMatrix {
    #[inline]
    pub fn matrix_type(&self) -> MatrixType {
        MatrixType::BooleanDense
    }

    #[inline]
    pub fn coefficient_type(&self) -> CoefficientType {
        CoefficientType::Boolean
    }

    #[inline]
    fn order_key(&self) -> (MatrixType, usize, usize, &[u8]) {
        (self.matrix_type(), self.rows(), self.cols(), self.used_bytes())
    }

    pub fn relative_order(&self, other: &BooleanMatrix) -> Ordering {
        compare_keys(self.order_key(), other.order_key())
    }
}

impl<T: Coefficient> DenseMatrix<T> {
    #[inline]
    pub fn matrix_type(&self) -> MatrixType {
        MatrixType::dense(T::TYPE)
    }

    #[inline]
    pub fn coefficient_type(&self) -> CoefficientType {
        T::TYPE
    }

    #[inline]
    fn order_key(&self) -> (MatrixType, usize, usize, &[u8]) {
        (self.matrix_type(), self.rows(), self.cols(), self.used_bytes())
    }

    pub fn relative_order(&self, other: &DenseMatrix<T>) -> Ordering {
        compare_keys(self.order_key(), other.order_key())
    }
}

impl PartialEq for BooleanMatrix {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.is_equal_to(other)
    }
}

impl Eq for BooleanMatrix {}

impl PartialOrd for BooleanMatrix {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BooleanMatrix {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        self.relative_order(other)
    }
}

impl<T: Coefficient> PartialEq for DenseMatrix<T> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.is_equal_to(other)
    }
}

impl<T: Coefficient> Eq for DenseMatrix<T> {}

impl<T: Coefficient> PartialOrd for DenseMatrix<T> {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: Coefficient> Ord for DenseMatrix<T> {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        self.relative_order(other)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::dense::{IntegerMatrix, RealMatrix};
    use rand::{rngs::SmallRng, SeedableRng};

    #[test]
    fn dimensions_first() {
        let a = IntegerMatrix::from_vec(&[vec![9, 9]]);
        let b = IntegerMatrix::from_vec(&[vec![0], vec![0]]);
        assert_eq!(a.relative_order(&b), Ordering::Less);
        assert_eq!(b.relative_order(&a), Ordering::Greater);

        let c = IntegerMatrix::from_vec(&[vec![1, 2]]);
        let d = IntegerMatrix::from_vec(&[vec![1, 3]]);
        assert_ne!(c.relative_order(&d), Ordering::Equal);
        assert_eq!(c.relative_order(&d), d.relative_order(&c).reverse());
    }

    #[test]
    fn equality_is_byte_exact() {
        let a = RealMatrix::from_vec(&[vec![0.0]]);
        let b = RealMatrix::from_vec(&[vec![-0.0]]);
        assert_ne!(a, b);
        let nan = RealMatrix::from_vec(&[vec![f64::NAN]]);
        assert_eq!(nan, nan.deep_copy());
    }

    #[test]
    fn total_order() {
        let mut rng = SmallRng::seed_from_u64(1);
        let mut ms: Vec<BooleanMatrix> = (0..40)
            .map(|k| BooleanMatrix::random(&mut rng, k % 3 + 1, k % 4 + 1))
            .collect();
        ms.push(ms[5].clone());
        ms.sort();
        for w in ms.windows(2) {
            assert_ne!(w[0].relative_order(&w[1]), Ordering::Greater);
            assert_eq!(w[0] == w[1], w[0].relative_order(&w[1]) == Ordering::Equal);
        }
        for a in &ms {
            for b in &ms {
                assert_eq!(a.relative_order(b), b.relative_order(a).reverse());
            }
        }
    }

    #[test]
    fn types() {
        assert!(MatrixType::BooleanDense < MatrixType::ComplexDense);
        for t in [CoefficientType::Integer, CoefficientType::Complex] {
            assert_eq!(MatrixType::dense(t).coefficient_type(), t);
        }
    }
}
