//! Orthogonal and triangular decompositions delegated to nalgebra, plus the eigenvector
//! pipeline built on the complex Schur form.
//!
//! Failures to converge are not errors: the affected result comes back empty and a
//! warning is logged.

use log::warn;
use nalgebra::DMatrix;

use crate::coefficient::{Coefficient, Complex};
use crate::dense::{ComplexMatrix, DenseMatrix, RealMatrix};
use crate::error::{MatrixError, Result};

use super::view::{MatrixView, ViewSpec};
use super::{from_dmatrix, require_square, FloatCoefficient};

/// Radix of the balancing scale factors.
const BALANCE_RADIX: f64 = 2.0;

fn empty<T: Coefficient>() -> DenseMatrix<T> {
    DenseMatrix::zeros(0, 0)
}

/// `A = U * diag(s) * V^H`.
#[derive(Debug, Clone)]
pub struct Svd<T: Coefficient> {
    pub u: DenseMatrix<T>,
    /// Singular values as a column, in descending order.
    pub singular_values: RealMatrix,
    pub v_adjoint: DenseMatrix<T>,
}

impl<T: Coefficient> Svd<T> {
    /// True if the decomposition did not converge.
    pub fn is_empty(&self) -> bool {
        self.singular_values.is_empty() && self.u.is_empty()
    }
}

pub fn svd<T: FloatCoefficient>(view: &MatrixView<'_, T>) -> Svd<T> {
    let (rows, cols) = view.dims();
    let failed = || {
        warn!("svd of {}x{} matrix did not converge", rows, cols);
        Svd {
            u: empty(),
            singular_values: empty(),
            v_adjoint: empty(),
        }
    };
    let Some(svd) = view.to_dmatrix().try_svd(true, true, f64::EPSILON, 0) else {
        return failed();
    };
    let (Some(u), Some(v_t)) = (&svd.u, &svd.v_t) else {
        return failed();
    };
    let s = &svd.singular_values;
    Svd {
        u: from_dmatrix(u),
        singular_values: RealMatrix::from_fn(s.len(), 1, |i, _| s[i]),
        v_adjoint: from_dmatrix(v_t),
    }
}

/// Minimum norm solution of `op(A) X ~ op(B)`; empty if the underlying SVD fails.
pub fn least_squares<T: FloatCoefficient>(
    a: &MatrixView<'_, T>,
    b: &MatrixView<'_, T>,
) -> Result<DenseMatrix<T>> {
    let (rows, cols) = a.dims();
    if b.dims().0 != rows {
        return Err(MatrixError::incompatible(a.dims(), b.dims()));
    }
    let Some(svd) = a.to_dmatrix().try_svd(true, true, f64::EPSILON, 0) else {
        warn!("least squares: svd of {}x{} matrix did not converge", rows, cols);
        return Ok(empty());
    };
    let largest = svd.singular_values.iter().fold(0.0, |m: f64, &s| m.max(s));
    let cutoff = f64::EPSILON * rows.max(cols) as f64 * largest;
    match svd.solve(&b.to_dmatrix(), cutoff) {
        Ok(x) => Ok(from_dmatrix(&x)),
        Err(e) => {
            warn!("least squares failed: {}", e);
            Ok(empty())
        }
    }
}

/// `A = Q * R` with `Q` of orthonormal columns.
#[derive(Debug, Clone)]
pub struct Qr<T: Coefficient> {
    pub q: DenseMatrix<T>,
    pub r: DenseMatrix<T>,
}

pub fn qr<T: FloatCoefficient>(view: &MatrixView<'_, T>) -> Qr<T> {
    let qr = view.to_dmatrix().qr();
    Qr {
        q: from_dmatrix(&qr.q()),
        r: from_dmatrix(&qr.r()),
    }
}

/// Lower triangular `L` with `A = L * L^H`; empty if `A` is not positive definite.
pub fn cholesky<T: FloatCoefficient>(view: &MatrixView<'_, T>) -> Result<DenseMatrix<T>> {
    let n = require_square(view)?;
    match view.to_dmatrix().cholesky() {
        Some(c) => Ok(from_dmatrix(&c.l())),
        None => {
            warn!("cholesky: {}x{} matrix is not positive definite", n, n);
            Ok(empty())
        }
    }
}

/// Upper triangular `U` with `A = U^H * U`; empty if `A` is not positive definite.
pub fn upper_cholesky<T: FloatCoefficient>(view: &MatrixView<'_, T>) -> Result<DenseMatrix<T>> {
    Ok(cholesky(view)?.adjoint())
}

/// `A = Q * H * Q^H` with `H` upper Hessenberg.
#[derive(Debug, Clone)]
pub struct Hessenberg<T: Coefficient> {
    pub q: DenseMatrix<T>,
    pub h: DenseMatrix<T>,
}

pub fn hessenberg<T: FloatCoefficient>(view: &MatrixView<'_, T>) -> Result<Hessenberg<T>> {
    require_square(view)?;
    let (q, h) = view.to_dmatrix().hessenberg().unpack();
    Ok(Hessenberg {
        q: from_dmatrix(&q),
        h: from_dmatrix(&h),
    })
}

/// `A = Q * T * Q^H`. `T` is upper triangular for complex input and quasi upper
/// triangular (2x2 blocks for conjugate pairs) for real input.
#[derive(Debug, Clone)]
pub struct Schur<T: Coefficient> {
    pub q: DenseMatrix<T>,
    pub t: DenseMatrix<T>,
}

pub fn schur<T: FloatCoefficient>(view: &MatrixView<'_, T>) -> Result<Schur<T>> {
    let n = require_square(view)?;
    match view.to_dmatrix().try_schur(f64::EPSILON, 0) {
        Some(s) => {
            let (q, t) = s.unpack();
            Ok(Schur {
                q: from_dmatrix(&q),
                t: from_dmatrix(&t),
            })
        }
        None => {
            warn!("schur: {}x{} reduction did not converge", n, n);
            Ok(Schur { q: empty(), t: empty() })
        }
    }
}

/// A diagonal similarity `B = D^-1 A D` with power-of-two entries that evens out row and
/// column norms.
#[derive(Debug, Clone)]
pub struct Balanced {
    pub matrix: ComplexMatrix,
    /// The diagonal of `D`.
    pub scales: Vec<f64>,
}

fn balance_in_place(a: &mut DMatrix<Complex>) -> Vec<f64> {
    let n = a.nrows();
    let mut scales = vec![1.0; n];
    let radix2 = BALANCE_RADIX * BALANCE_RADIX;
    let mut converged = false;
    while !converged {
        converged = true;
        for i in 0..n {
            let mut c = 0.0;
            let mut r = 0.0;
            for j in (0..n).filter(|&j| j != i) {
                c += a[(j, i)].l1_norm();
                r += a[(i, j)].l1_norm();
            }
            if c == 0.0 || r == 0.0 {
                continue;
            }
            let total = c + r;
            let mut f = 1.0;
            let mut g = r / BALANCE_RADIX;
            while c < g {
                f *= BALANCE_RADIX;
                c *= radix2;
            }
            g = r * BALANCE_RADIX;
            while c > g {
                f /= BALANCE_RADIX;
                c /= radix2;
            }
            if (c + r) / f < 0.95 * total {
                converged = false;
                scales[i] *= f;
                for j in 0..n {
                    a[(i, j)] /= f;
                    a[(j, i)] *= f;
                }
            }
        }
    }
    scales
}

/// Balances `op(A)` ahead of an eigenvalue computation.
pub fn balance<T: FloatCoefficient>(view: &MatrixView<'_, T>) -> Result<Balanced> {
    let n = require_square(view)?;
    let mut a = DMatrix::from_fn(n, n, |i, j| view.get(i, j).to_complex());
    let scales = balance_in_place(&mut a);
    Ok(Balanced {
        matrix: from_dmatrix(&a),
        scales,
    })
}

/// Maps eigenvectors of a balanced matrix back to the original one and renormalizes them.
pub fn unbalance(vectors: &ComplexMatrix, scales: &[f64]) -> Result<ComplexMatrix> {
    if scales.len() != vectors.rows() {
        return Err(MatrixError::incompatible(
            (scales.len(), 1),
            (vectors.rows(), vectors.cols()),
        ));
    }
    Ok(DenseMatrix::fill_columns(vectors.rows(), vectors.cols(), |j, column| {
        for (i, v) in column.iter_mut().enumerate() {
            *v = vectors[(i, j)] * scales[i];
        }
        normalize(column);
    }))
}

fn normalize(column: &mut [Complex]) {
    let norm = column.iter().map(|v| v.norm_sqr()).sum::<f64>().sqrt();
    if norm > 0.0 {
        for v in column {
            *v /= norm;
        }
    }
}

/// Eigenvalues as a column and unit eigenvectors as the columns of `vectors`.
#[derive(Debug, Clone)]
pub struct Eigen {
    pub values: ComplexMatrix,
    pub vectors: ComplexMatrix,
}

/// Solves `(T - t_kk I) x = 0` for every `k` by back substitution on the upper triangular
/// `t`, then maps each `x` through `q`.
fn back_transform(q: &DMatrix<Complex>, t: &DMatrix<Complex>) -> ComplexMatrix {
    let n = t.nrows();
    let tiny = f64::EPSILON * t.iter().fold(0.0, |m: f64, v| m.max(v.norm())).max(f64::MIN_POSITIVE);
    DenseMatrix::fill_columns(n, n, |k, column| {
        let lambda = t[(k, k)];
        let mut x = vec![Complex::new(0.0, 0.0); k + 1];
        x[k] = Complex::new(1.0, 0.0);
        for i in (0..k).rev() {
            let mut s = Complex::new(0.0, 0.0);
            for (j, &xj) in x.iter().enumerate().skip(i + 1) {
                s += t[(i, j)] * xj;
            }
            let mut d = t[(i, i)] - lambda;
            if d.norm() < tiny {
                d = Complex::new(tiny, 0.0);
            }
            x[i] = -s / d;
        }
        for (r, v) in column.iter_mut().enumerate() {
            *v = (0..=k).map(|j| q[(r, j)] * x[j]).sum();
        }
        normalize(column);
    })
}

/// Eigen decomposition of `op(A)`: balance, complex Schur, triangular eigenvectors,
/// back-transform and unbalance. Both parts are empty if the Schur reduction fails.
pub fn eigenvectors<T: FloatCoefficient>(view: &MatrixView<'_, T>) -> Result<Eigen> {
    let Balanced { matrix, scales } = balance(view)?;
    let n = matrix.rows();
    let Some(schur) = matrix.to_dmatrix().try_schur(f64::EPSILON, 0) else {
        warn!("eigenvectors: {}x{} schur reduction did not converge", n, n);
        return Ok(Eigen {
            values: empty(),
            vectors: empty(),
        });
    };
    let (q, t) = schur.unpack();
    let values = ComplexMatrix::from_fn(n, 1, |i, _| t[(i, i)]);
    let vectors = unbalance(&back_transform(&q, &t), &scales)?;
    Ok(Eigen { values, vectors })
}

impl<T: FloatCoefficient> DenseMatrix<T> {
    pub fn svd(&self) -> Svd<T> {
        svd(&self.view(ViewSpec::plain()))
    }

    pub fn qr(&self) -> Qr<T> {
        qr(&self.view(ViewSpec::plain()))
    }

    pub fn cholesky(&self) -> Result<Self> {
        cholesky(&self.view(ViewSpec::plain()))
    }

    pub fn upper_cholesky(&self) -> Result<Self> {
        upper_cholesky(&self.view(ViewSpec::plain()))
    }

    pub fn hessenberg(&self) -> Result<Hessenberg<T>> {
        hessenberg(&self.view(ViewSpec::plain()))
    }

    pub fn schur(&self) -> Result<Schur<T>> {
        schur(&self.view(ViewSpec::plain()))
    }

    pub fn eigenvectors(&self) -> Result<Eigen> {
        eigenvectors(&self.view(ViewSpec::plain()))
    }

    /// Minimum norm least squares solution of `self * X ~ rhs`.
    pub fn least_squares(&self, rhs: &Self) -> Result<Self> {
        least_squares(&self.view(ViewSpec::plain()), &rhs.view(ViewSpec::plain()))
    }
}
