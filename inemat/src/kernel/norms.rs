//! Matrix norms and row/column equilibration.

use crate::coefficient::Coefficient;
use crate::dense::DenseMatrix;
use crate::error::{MatrixError, Result};

use super::view::{MatrixView, ViewSpec};
use super::FloatCoefficient;

/// Maximum absolute column sum.
pub fn one_norm<T: Coefficient>(view: &MatrixView<'_, T>) -> f64 {
    let (rows, cols) = view.dims();
    (0..cols)
        .map(|j| (0..rows).map(|i| view.get(i, j).magnitude()).sum::<f64>())
        .fold(0.0, f64::max)
}

/// Maximum absolute row sum.
pub fn infinity_norm<T: Coefficient>(view: &MatrixView<'_, T>) -> f64 {
    let (rows, cols) = view.dims();
    (0..rows)
        .map(|i| (0..cols).map(|j| view.get(i, j).magnitude()).sum::<f64>())
        .fold(0.0, f64::max)
}

/// Entrywise `p`-norm. An infinite `p` gives the largest magnitude.
pub fn p_norm<T: Coefficient>(view: &MatrixView<'_, T>, p: f64) -> Result<f64> {
    if p.is_nan() || p <= 0.0 {
        return Err(MatrixError::InvalidParameter(format!("norm exponent {}", p)));
    }
    let (rows, cols) = view.dims();
    let magnitudes = (0..cols).flat_map(|j| (0..rows).map(move |i| view.get(i, j).magnitude()));
    if p.is_infinite() {
        return Ok(magnitudes.fold(0.0, f64::max));
    }
    Ok(magnitudes.map(|m| m.powf(p)).sum::<f64>().powf(p.recip()))
}

/// Row and column scale factors that bring the largest entry of every row and column of
/// `diag(R) * A * diag(C)` close to one.
#[derive(Debug, Clone, PartialEq)]
pub struct Equilibration {
    pub row_scales: Vec<f64>,
    pub column_scales: Vec<f64>,
    /// Ratio of the smallest to the largest row scale.
    pub row_condition: f64,
    pub column_condition: f64,
    /// Largest magnitude in the matrix.
    pub max_abs: f64,
}

impl Equilibration {
    /// Applies the scale factors to `m`.
    pub fn apply<T: FloatCoefficient>(&self, m: &DenseMatrix<T>) -> Result<DenseMatrix<T>> {
        let rows: Vec<T> = self.row_scales.iter().map(|&s| T::from_real(s)).collect();
        let cols: Vec<T> = self.column_scales.iter().map(|&s| T::from_real(s)).collect();
        m.row_scale_multiply(&rows)?.column_scale_multiply(&cols)
    }
}

fn equilibrate_with<T: FloatCoefficient>(
    view: &MatrixView<'_, T>,
    round: impl Fn(f64) -> f64,
) -> Result<Equilibration> {
    let (rows, cols) = view.dims();
    let limits = T::scaling_limits();
    let clamp = |x: f64| x.max(limits.small).min(limits.big);

    let mut row_scales = vec![0.0f64; rows];
    for j in 0..cols {
        for (i, r) in row_scales.iter_mut().enumerate() {
            *r = r.max(view.get(i, j).magnitude());
        }
    }
    for r in &mut row_scales {
        *r = round(*r);
    }
    let row_min = row_scales.iter().copied().fold(f64::INFINITY, f64::min);
    let row_max = row_scales.iter().copied().fold(0.0, f64::max);
    if row_min == 0.0 {
        return Err(MatrixError::Singular);
    }
    for r in &mut row_scales {
        *r = clamp(*r).recip();
    }
    let row_condition = if rows == 0 {
        1.0
    } else {
        row_min.max(limits.small) / row_max.min(limits.big)
    };

    let mut column_scales = vec![0.0f64; cols];
    for (j, c) in column_scales.iter_mut().enumerate() {
        for (i, &r) in row_scales.iter().enumerate() {
            *c = c.max(view.get(i, j).magnitude() * r);
        }
        *c = round(*c);
    }
    let col_min = column_scales.iter().copied().fold(f64::INFINITY, f64::min);
    let col_max = column_scales.iter().copied().fold(0.0, f64::max);
    if col_min == 0.0 {
        return Err(MatrixError::Singular);
    }
    for c in &mut column_scales {
        *c = clamp(*c).recip();
    }
    let column_condition = if cols == 0 {
        1.0
    } else {
        col_min.max(limits.small) / col_max.min(limits.big)
    };

    Ok(Equilibration {
        row_scales,
        column_scales,
        row_condition,
        column_condition,
        max_abs: row_max,
    })
}

/// Computes equilibration scale factors. Fails with [`MatrixError::Singular`] if some row
/// or column is entirely zero.
pub fn equilibrate<T: FloatCoefficient>(view: &MatrixView<'_, T>) -> Result<Equilibration> {
    equilibrate_with(view, |x| x)
}

/// Like [`equilibrate`], with every scale factor rounded to a power of two so that scaling
/// introduces no rounding error.
pub fn equilibrate_power_of_two<T: FloatCoefficient>(view: &MatrixView<'_, T>) -> Result<Equilibration> {
    equilibrate_with(view, |x| if x > 0.0 { x.log2().trunc().exp2() } else { x })
}

impl<T: Coefficient> DenseMatrix<T> {
    pub fn one_norm(&self) -> f64 {
        one_norm(&self.view(ViewSpec::plain()))
    }

    pub fn infinity_norm(&self) -> f64 {
        infinity_norm(&self.view(ViewSpec::plain()))
    }

    pub fn p_norm(&self, p: f64) -> Result<f64> {
        p_norm(&self.view(ViewSpec::plain()), p)
    }
}

impl<T: FloatCoefficient> DenseMatrix<T> {
    pub fn equilibrate(&self) -> Result<Equilibration> {
        equilibrate(&self.view(ViewSpec::plain()))
    }

    pub fn equilibrate_power_of_two(&self) -> Result<Equilibration> {
        equilibrate_power_of_two(&self.view(ViewSpec::plain()))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::coefficient::Complex;
    use crate::dense::{ComplexMatrix, IntegerMatrix, RealMatrix};
    use approx::assert_relative_eq;

    #[test]
    fn norms() {
        let m = IntegerMatrix::from_vec(&[vec![1, -2], vec![-3, 4]]);
        assert_eq!(m.one_norm(), 6.0);
        assert_eq!(m.infinity_norm(), 7.0);
        assert_relative_eq!(m.p_norm(2.0).unwrap(), 30f64.sqrt(), epsilon = 1e-12);
        assert_eq!(m.p_norm(1.0).unwrap(), 10.0);
        assert_eq!(m.p_norm(f64::INFINITY).unwrap(), 4.0);
        assert!(matches!(m.p_norm(0.0), Err(MatrixError::InvalidParameter(_))));
        assert!(m.p_norm(f64::NAN).is_err());

        let c = ComplexMatrix::from_vec(&[vec![Complex::new(3.0, 4.0)]]);
        assert_eq!(c.one_norm(), 5.0);
        assert_eq!(RealMatrix::zeros(0, 0).one_norm(), 0.0);

        let lazy = m.view(ViewSpec::with_op(crate::kernel::view::Op::Transpose));
        assert_eq!(one_norm(&lazy), 7.0);
    }

    #[test]
    fn equilibration() {
        let m = RealMatrix::from_vec(&[vec![1e6, 2e6], vec![3e-3, 1e-3]]);
        let eq = m.equilibrate().unwrap();
        assert_relative_eq!(eq.max_abs, 2e6);
        let scaled = eq.apply(&m).unwrap();
        for i in 0..2 {
            let row_max = (0..2).map(|j| scaled[(i, j)].abs()).fold(0.0, f64::max);
            assert_relative_eq!(row_max, 1.0, epsilon = 1e-12);
        }
        assert!(eq.row_condition < 1e-8);

        let eq2 = m.equilibrate_power_of_two().unwrap();
        for s in eq2.row_scales.iter().chain(&eq2.column_scales) {
            assert_eq!(s.log2().fract(), 0.0);
        }

        let zero_row = RealMatrix::from_vec(&[vec![1.0, 2.0], vec![0.0, 0.0]]);
        assert!(matches!(zero_row.equilibrate(), Err(MatrixError::Singular)));
        let zero_col = RealMatrix::from_vec(&[vec![1.0, 0.0], vec![2.0, 0.0]]);
        assert!(matches!(zero_col.equilibrate(), Err(MatrixError::Singular)));
    }
}
