//! `inemat` is a dense matrix storage engine for boolean, integer, real and complex
//! coefficients. Some features include:
//! - packed column-major storage with cache-line aligned columns and an always-zero residue
//! - bit-packed boolean matrices with word-level combine, reverse and transpose
//! - shared, copy-on-write storage with in-place resizing when the allocation allows it
//! - lossless interconversion between coefficient kinds and a total order on matrices
//! - the `INEBIN` binary format and delimited text files
//! - an in-crate numerical kernel (LU, SVD, QR, Cholesky, Schur, eigenvectors,
//!   equilibration, Fourier and cosine transforms) fed through lazy [`ViewSpec`] views
//!
//! The engines are [`BooleanMatrix`] and [`DenseMatrix`] (aliased as [`IntegerMatrix`],
//! [`RealMatrix`] and [`ComplexMatrix`]). [`Matrix`] holds any one of them.

#![allow(
    clippy::needless_range_loop,
    clippy::uninlined_format_args,
    clippy::bool_assert_comparison,
    clippy::cast_possible_truncation,
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::bool_to_int_with_if
)]
pub mod bits;
pub mod boolean;
pub mod codec;
pub mod coefficient;
pub mod convert;
pub mod dense;
pub mod error;
pub mod kernel;
pub mod layout;
pub mod matrix;
pub mod order;
pub mod storage;

pub use boolean::BooleanMatrix;
pub use codec::{FileFormat, MatrixFile};
pub use coefficient::{Boolean, Coefficient, CoefficientType, Complex, Integer, Real};
pub use dense::{ComplexMatrix, DenseMatrix, IntegerMatrix, RealMatrix};
pub use error::{MatrixError, Result};
pub use kernel::view::{MatrixView, Op, ViewSpec};
pub use kernel::FloatCoefficient;
pub use matrix::{DenseOps, Element, Matrix};
pub use order::MatrixType;
