//! Conversions between the coefficient kinds.
//!
//! Widening conversions (`Boolean → Integer → Real → Complex`) are `From` impls. Narrowing
//! conversions are `TryFrom` impls that fail with [`MatrixError::TypeConversion`] at the first
//! element, in column-major order, that cannot be represented exactly. Any kind converts to
//! Boolean by testing for zero.

use crate::boolean::BooleanMatrix;
use crate::coefficient::{Coefficient, Complex, Integer, Real};
use crate::dense::{ComplexMatrix, DenseMatrix, IntegerMatrix, RealMatrix};
use crate::error::{MatrixError, Result};
use crate::layout::column_start;

fn convert<S, T, F>(m: &DenseMatrix<S>, f: F) -> DenseMatrix<T>
where
    S: Coefficient,
    T: Coefficient,
    F: Fn(S) -> T + Send + Sync,
{
    DenseMatrix::fill_columns(m.rows(), m.cols(), |c, column| {
        for (v, &x) in column.iter_mut().zip(m.column(c)) {
            *v = f(x);
        }
    })
}

fn try_convert<S, T>(m: &DenseMatrix<S>, f: impl Fn(S) -> Option<T>) -> Result<DenseMatrix<T>>
where
    S: Coefficient,
    T: Coefficient,
{
    let mut out = DenseMatrix::zeros(m.rows(), m.cols());
    for col in 0..m.cols() {
        let column = out.column_mut(col);
        for (row, (v, &x)) in column.iter_mut().zip(m.column(col)).enumerate() {
            *v = f(x).ok_or(MatrixError::TypeConversion { row, col })?;
        }
    }
    Ok(out)
}

/// The integer equal to `x`, if there is one.
fn exact_integer(x: Real) -> Option<Integer> {
    // i64::MAX is not representable; 2^63 is the first value out of range
    const LIMIT: Real = 9_223_372_036_854_775_808.0;
    if x.fract() == 0.0 && (-LIMIT..LIMIT).contains(&x) {
        Some(x as Integer)
    } else {
        None
    }
}

impl<T: Coefficient> From<&BooleanMatrix> for DenseMatrix<T> {
    fn from(m: &BooleanMatrix) -> Self {
        let spacing = m.column_spacing();
        let bits = m.bits();
        DenseMatrix::fill_columns(m.rows(), m.cols(), |c, column| {
            for (v, b) in column.iter_mut().zip(bits.iter(column_start(c, spacing), m.rows())) {
                *v = T::from_bool(b);
            }
        })
    }
}

impl<T: Coefficient> From<&DenseMatrix<T>> for BooleanMatrix {
    fn from(m: &DenseMatrix<T>) -> Self {
        BooleanMatrix::build(m.rows(), m.cols(), |r, c| !m[(r, c)].is_zero())
    }
}

impl From<&IntegerMatrix> for RealMatrix {
    fn from(m: &IntegerMatrix) -> Self {
        convert(m, |x| x as Real)
    }
}

impl From<&IntegerMatrix> for ComplexMatrix {
    fn from(m: &IntegerMatrix) -> Self {
        convert(m, |x| Complex::new(x as Real, 0.0))
    }
}

impl From<&RealMatrix> for ComplexMatrix {
    fn from(m: &RealMatrix) -> Self {
        convert(m, |x| Complex::new(x, 0.0))
    }
}

impl TryFrom<&RealMatrix> for IntegerMatrix {
    type Error = MatrixError;

    fn try_from(m: &RealMatrix) -> Result<Self> {
        try_convert(m, exact_integer)
    }
}

impl TryFrom<&ComplexMatrix> for IntegerMatrix {
    type Error = MatrixError;

    fn try_from(m: &ComplexMatrix) -> Result<Self> {
        try_convert(m, |z| if z.im == 0.0 { exact_integer(z.re) } else { None })
    }
}

impl TryFrom<&ComplexMatrix> for RealMatrix {
    type Error = MatrixError;

    fn try_from(m: &ComplexMatrix) -> Result<Self> {
        try_convert(m, |z| (z.im == 0.0).then_some(z.re))
    }
}

/// Rounding projections onto integers. Out-of-range values saturate and NaN maps to 0.
impl RealMatrix {
    /// Rounds toward zero.
    pub fn truncate(&self) -> IntegerMatrix {
        convert(self, |x| x.trunc() as Integer)
    }

    pub fn floor(&self) -> IntegerMatrix {
        convert(self, |x| x.floor() as Integer)
    }

    pub fn ceil(&self) -> IntegerMatrix {
        convert(self, |x| x.ceil() as Integer)
    }

    /// Rounds to the nearest integer, halfway cases away from zero.
    pub fn nint(&self) -> IntegerMatrix {
        convert(self, |x| x.round() as Integer)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::{rngs::SmallRng, SeedableRng};

    #[test]
    fn boolean_round_trip() {
        let mut rng = SmallRng::seed_from_u64(1);
        let b = BooleanMatrix::random(&mut rng, 70, 5);
        let z = IntegerMatrix::from(&b);
        assert!(z.residue_is_clear());
        assert!(BooleanMatrix::from(&z).is_equal_to(&b));
        assert_eq!(z.iter().map(|(_, _, v)| v).sum::<i64>(), b.count_ones() as i64);
    }

    #[test]
    fn integer_real_round_trip() {
        let mut rng = SmallRng::seed_from_u64(2);
        let z = IntegerMatrix::random(&mut rng, 9, 7);
        let r = RealMatrix::from(&z);
        assert!(IntegerMatrix::try_from(&r).unwrap().is_equal_to(&z));
    }

    #[test]
    fn narrowing_failures() {
        let r = RealMatrix::from_vec(&[vec![1.0, 2.0], vec![3.0, 4.5]]);
        assert!(matches!(
            IntegerMatrix::try_from(&r),
            Err(MatrixError::TypeConversion { row: 1, col: 1 })
        ));

        let mut z = ComplexMatrix::from(&r);
        assert!(RealMatrix::try_from(&z).unwrap().is_equal_to(&r));
        z.update(0, 1, Complex::new(2.0, 1.0));
        assert!(matches!(
            RealMatrix::try_from(&z),
            Err(MatrixError::TypeConversion { row: 0, col: 1 })
        ));
        assert!(IntegerMatrix::try_from(&z).is_err());

        let huge = RealMatrix::from_vec(&[vec![1e19]]);
        assert!(IntegerMatrix::try_from(&huge).is_err());
    }

    #[test]
    fn rounding() {
        let r = RealMatrix::from_vec(&[vec![-1.5, -0.4, 0.5, 2.7]]);
        let values = |m: IntegerMatrix| m.iter().map(|(_, _, v)| v).collect::<Vec<_>>();
        assert_eq!(values(r.truncate()), vec![-1, 0, 0, 2]);
        assert_eq!(values(r.floor()), vec![-2, -1, 0, 2]);
        assert_eq!(values(r.ceil()), vec![-1, 0, 1, 3]);
        assert_eq!(values(r.nint()), vec![-2, 0, 1, 3]);
    }

    #[test]
    fn to_boolean() {
        let z = ComplexMatrix::from_vec(&[vec![Complex::new(0.0, 0.0), Complex::new(0.0, 1.0)]]);
        let b = BooleanMatrix::from(&z);
        assert!(!b[(0, 0)]);
        assert!(b[(0, 1)]);
    }
}
