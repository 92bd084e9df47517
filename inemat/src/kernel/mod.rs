//! Numerical routines that consume matrices through [`view::MatrixView`]s.
//!
//! The LU family, products, norms, equilibration and the spectral transforms are
//! implemented here directly. SVD, QR, Cholesky, Hessenberg and Schur reductions are
//! delegated to `nalgebra` by materializing the view as a `DMatrix`.

pub mod decompose;
pub mod lu;
pub mod norms;
pub mod product;
pub mod spectral;
pub mod view;

use std::sync::OnceLock;

use nalgebra::{ComplexField, DMatrix};
use num_complex::Complex64;

use crate::coefficient::{Coefficient, Complex, Real};
use crate::dense::DenseMatrix;
use crate::error::{MatrixError, Result};
use view::MatrixView;

/// Underflow and overflow thresholds used when computing scale factors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScalingLimits {
    /// Smallest number whose reciprocal does not overflow.
    pub small: f64,
    pub big: f64,
}

impl ScalingLimits {
    fn machine() -> Self {
        let small = f64::MIN_POSITIVE;
        ScalingLimits {
            small,
            big: 1.0 / small,
        }
    }
}

static REAL_LIMITS: OnceLock<ScalingLimits> = OnceLock::new();
static COMPLEX_LIMITS: OnceLock<ScalingLimits> = OnceLock::new();

/// Coefficients with floating point arithmetic, for which the full kernel set is available.
pub trait FloatCoefficient: Coefficient + ComplexField<RealField = f64> {
    #[doc(hidden)]
    fn limits_slot() -> &'static OnceLock<ScalingLimits>;

    fn to_complex(self) -> Complex64;

    /// Process-wide scaling limits, computed on first use.
    #[inline]
    fn scaling_limits() -> ScalingLimits {
        *Self::limits_slot().get_or_init(ScalingLimits::machine)
    }
}

impl FloatCoefficient for Real {
    fn limits_slot() -> &'static OnceLock<ScalingLimits> {
        &REAL_LIMITS
    }

    #[inline]
    fn to_complex(self) -> Complex64 {
        Complex64::new(self, 0.0)
    }
}

impl FloatCoefficient for Complex {
    fn limits_slot() -> &'static OnceLock<ScalingLimits> {
        &COMPLEX_LIMITS
    }

    #[inline]
    fn to_complex(self) -> Complex64 {
        self
    }
}

/// Copies `alpha * op(A)` into a new dense matrix.
pub fn materialize<T: Coefficient>(view: &MatrixView<'_, T>) -> DenseMatrix<T> {
    let (rows, cols) = view.dims();
    DenseMatrix::fill_columns(rows, cols, |j, column| {
        for (i, v) in column.iter_mut().enumerate() {
            *v = view.get(i, j);
        }
    })
}

/// Copies an nalgebra matrix into dense storage.
pub fn from_dmatrix<T: Coefficient>(m: &DMatrix<T>) -> DenseMatrix<T> {
    DenseMatrix::fill_columns(m.nrows(), m.ncols(), |j, column| {
        for (i, v) in column.iter_mut().enumerate() {
            *v = m[(i, j)];
        }
    })
}

pub(crate) fn require_square<T: Coefficient>(view: &MatrixView<'_, T>) -> Result<usize> {
    let (rows, cols) = view.dims();
    if rows != cols {
        return Err(MatrixError::InvalidDimensions { rows, cols });
    }
    Ok(rows)
}

impl<T: Coefficient> DenseMatrix<T> {
    /// Copies the matrix into an nalgebra matrix.
    pub fn to_dmatrix(&self) -> DMatrix<T> {
        self.view(Default::default()).to_dmatrix()
    }
}
