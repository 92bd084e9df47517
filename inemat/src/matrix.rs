//! A matrix of any coefficient kind.
//!
//! [`Matrix`] wraps one of the four engines and forwards the operations they share through
//! [`DenseOps`]. Binary operations on different kinds widen both operands to the larger
//! kind first.

use std::{cmp::Ordering, fmt, io::Write, path::Path};

use log::debug;

use crate::boolean::BooleanMatrix;
use crate::codec::{self, binary, FileFormat, MatrixFile};
use crate::coefficient::{Coefficient, CoefficientType, Complex, Integer, Real};
use crate::dense::{ComplexMatrix, DenseMatrix, IntegerMatrix, RealMatrix};
use crate::error::{MatrixError, Result};
use crate::order::MatrixType;

/// Observers and builders shared by every engine.
pub trait DenseOps: Clone + Sized {
    fn matrix_type(&self) -> MatrixType;
    fn rows(&self) -> usize;
    fn cols(&self) -> usize;
    fn column_spacing(&self) -> usize;
    fn is_empty(&self) -> bool;
    fn residue_is_clear(&self) -> bool;

    fn combine_left_to_right(&self, other: &Self) -> Self;
    fn combine_top_to_bottom(&self, other: &Self) -> Self;
    fn column_reverse(&self) -> Self;
    fn row_reverse(&self) -> Self;
    /// The transpose.
    fn apply_transform(&self) -> Self;

    fn resize_in_place_to(&mut self, rows: usize, cols: usize) -> bool;
    fn resize_to(self, rows: usize, cols: usize) -> Self;

    fn relative_order(&self, other: &Self) -> Ordering;
    fn is_equal_to(&self, other: &Self) -> bool;
}

impl DenseOps for BooleanMatrix {
    fn matrix_type(&self) -> MatrixType {
        MatrixType::BooleanDense
    }

    fn rows(&self) -> usize {
        BooleanMatrix::rows(self)
    }

    fn cols(&self) -> usize {
        BooleanMatrix::cols(self)
    }

    fn column_spacing(&self) -> usize {
        BooleanMatrix::column_spacing(self)
    }

    fn is_empty(&self) -> bool {
        BooleanMatrix::is_empty(self)
    }

    fn residue_is_clear(&self) -> bool {
        BooleanMatrix::residue_is_clear(self)
    }

    fn combine_left_to_right(&self, other: &Self) -> Self {
        BooleanMatrix::combine_left_to_right(self, other)
    }

    fn combine_top_to_bottom(&self, other: &Self) -> Self {
        BooleanMatrix::combine_top_to_bottom(self, other)
    }

    fn column_reverse(&self) -> Self {
        BooleanMatrix::column_reverse(self)
    }

    fn row_reverse(&self) -> Self {
        BooleanMatrix::row_reverse(self)
    }

    fn apply_transform(&self) -> Self {
        self.transposed()
    }

    fn resize_in_place_to(&mut self, rows: usize, cols: usize) -> bool {
        BooleanMatrix::resize_in_place_to(self, rows, cols)
    }

    fn resize_to(self, rows: usize, cols: usize) -> Self {
        BooleanMatrix::resize_to(self, rows, cols)
    }

    fn relative_order(&self, other: &Self) -> Ordering {
        BooleanMatrix::relative_order(self, other)
    }

    fn is_equal_to(&self, other: &Self) -> bool {
        BooleanMatrix::is_equal_to(self, other)
    }
}

impl<T: Coefficient> DenseOps for DenseMatrix<T> {
    fn matrix_type(&self) -> MatrixType {
        MatrixType::dense(T::TYPE)
    }

    fn rows(&self) -> usize {
        DenseMatrix::rows(self)
    }

    fn cols(&self) -> usize {
        DenseMatrix::cols(self)
    }

    fn column_spacing(&self) -> usize {
        DenseMatrix::column_spacing(self)
    }

    fn is_empty(&self) -> bool {
        DenseMatrix::is_empty(self)
    }

    fn residue_is_clear(&self) -> bool {
        DenseMatrix::residue_is_clear(self)
    }

    fn combine_left_to_right(&self, other: &Self) -> Self {
        DenseMatrix::combine_left_to_right(self, other)
    }

    fn combine_top_to_bottom(&self, other: &Self) -> Self {
        DenseMatrix::combine_top_to_bottom(self, other)
    }

    fn column_reverse(&self) -> Self {
        DenseMatrix::column_reverse(self)
    }

    fn row_reverse(&self) -> Self {
        DenseMatrix::row_reverse(self)
    }

    fn apply_transform(&self) -> Self {
        self.transpose()
    }

    fn resize_in_place_to(&mut self, rows: usize, cols: usize) -> bool {
        DenseMatrix::resize_in_place_to(self, rows, cols)
    }

    fn resize_to(self, rows: usize, cols: usize) -> Self {
        DenseMatrix::resize_to(self, rows, cols)
    }

    fn relative_order(&self, other: &Self) -> Ordering {
        DenseMatrix::relative_order(self, other)
    }

    fn is_equal_to(&self, other: &Self) -> bool {
        DenseMatrix::is_equal_to(self, other)
    }
}

/// A single element of a [`Matrix`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Element {
    Boolean(bool),
    Integer(Integer),
    Real(Real),
    Complex(Complex),
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Element::Boolean(b) => write!(f, "{}", u8::from(*b)),
            Element::Integer(v) => write!(f, "{}", v),
            Element::Real(v) => write!(f, "{}", v),
            Element::Complex(v) => write!(f, "{}", v),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Matrix {
    Boolean(BooleanMatrix),
    Integer(IntegerMatrix),
    Real(RealMatrix),
    Complex(ComplexMatrix),
}

/// Evaluates `$body` with `$m` bound to the engine inside `$matrix`.
macro_rules! dispatch {
    ($matrix:expr, $m:ident => $body:expr) => {
        match $matrix {
            Matrix::Boolean($m) => $body,
            Matrix::Integer($m) => $body,
            Matrix::Real($m) => $body,
            Matrix::Complex($m) => $body,
        }
    };
}

/// Like [`dispatch!`], rewrapping the result in the same variant.
macro_rules! map_engine {
    ($matrix:expr, $m:ident => $body:expr) => {
        match $matrix {
            Matrix::Boolean($m) => Matrix::Boolean($body),
            Matrix::Integer($m) => Matrix::Integer($body),
            Matrix::Real($m) => Matrix::Real($body),
            Matrix::Complex($m) => Matrix::Complex($body),
        }
    };
}

impl From<BooleanMatrix> for Matrix {
    fn from(m: BooleanMatrix) -> Self {
        Matrix::Boolean(m)
    }
}

impl From<IntegerMatrix> for Matrix {
    fn from(m: IntegerMatrix) -> Self {
        Matrix::Integer(m)
    }
}

impl From<RealMatrix> for Matrix {
    fn from(m: RealMatrix) -> Self {
        Matrix::Real(m)
    }
}

impl From<ComplexMatrix> for Matrix {
    fn from(m: ComplexMatrix) -> Self {
        Matrix::Complex(m)
    }
}

#[derive(Debug, Clone, Copy)]
enum Join {
    LeftToRight,
    TopToBottom,
}

fn join<M: DenseOps>(a: &M, b: &M, how: Join) -> M {
    match how {
        Join::LeftToRight => a.combine_left_to_right(b),
        Join::TopToBottom => a.combine_top_to_bottom(b),
    }
}

fn join_same_kind(a: &Matrix, b: &Matrix, how: Join) -> Result<Matrix> {
    Ok(match (a, b) {
        (Matrix::Boolean(a), Matrix::Boolean(b)) => join(a, b, how).into(),
        (Matrix::Integer(a), Matrix::Integer(b)) => join(a, b, how).into(),
        (Matrix::Real(a), Matrix::Real(b)) => join(a, b, how).into(),
        (Matrix::Complex(a), Matrix::Complex(b)) => join(a, b, how).into(),
        _ => {
            return Err(MatrixError::InvalidParameter(format!(
                "cannot combine {} and {} matrices",
                a.coefficient_type(),
                b.coefficient_type()
            )))
        }
    })
}

impl Matrix {
    /// A zero matrix of the given kind.
    pub fn zeros(kind: CoefficientType, rows: usize, cols: usize) -> Self {
        match kind {
            CoefficientType::Boolean => BooleanMatrix::zeros(rows, cols).into(),
            CoefficientType::Integer => IntegerMatrix::zeros(rows, cols).into(),
            CoefficientType::Real => RealMatrix::zeros(rows, cols).into(),
            CoefficientType::Complex => ComplexMatrix::zeros(rows, cols).into(),
        }
    }

    pub fn identity(kind: CoefficientType, rows: usize, cols: usize) -> Self {
        match kind {
            CoefficientType::Boolean => BooleanMatrix::identity(rows, cols).into(),
            CoefficientType::Integer => IntegerMatrix::identity(rows, cols).into(),
            CoefficientType::Real => RealMatrix::identity(rows, cols).into(),
            CoefficientType::Complex => ComplexMatrix::identity(rows, cols).into(),
        }
    }

    pub fn ones(kind: CoefficientType, rows: usize, cols: usize) -> Self {
        match kind {
            CoefficientType::Boolean => BooleanMatrix::ones(rows, cols).into(),
            CoefficientType::Integer => IntegerMatrix::ones(rows, cols).into(),
            CoefficientType::Real => RealMatrix::ones(rows, cols).into(),
            CoefficientType::Complex => ComplexMatrix::ones(rows, cols).into(),
        }
    }

    pub fn matrix_type(&self) -> MatrixType {
        dispatch!(self, m => DenseOps::matrix_type(m))
    }

    pub fn coefficient_type(&self) -> CoefficientType {
        self.matrix_type().coefficient_type()
    }

    pub fn rows(&self) -> usize {
        dispatch!(self, m => DenseOps::rows(m))
    }

    pub fn cols(&self) -> usize {
        dispatch!(self, m => DenseOps::cols(m))
    }

    pub fn column_spacing(&self) -> usize {
        dispatch!(self, m => DenseOps::column_spacing(m))
    }

    pub fn is_empty(&self) -> bool {
        dispatch!(self, m => DenseOps::is_empty(m))
    }

    pub fn residue_is_clear(&self) -> bool {
        dispatch!(self, m => DenseOps::residue_is_clear(m))
    }

    /// # Panics
    ///
    /// Panics if the index is out of range.
    pub fn at(&self, row: usize, col: usize) -> Element {
        match self {
            Matrix::Boolean(m) => Element::Boolean(m.at(row, col)),
            Matrix::Integer(m) => Element::Integer(m.at(row, col)),
            Matrix::Real(m) => Element::Real(m.at(row, col)),
            Matrix::Complex(m) => Element::Complex(m.at(row, col)),
        }
    }

    /// Converts to another coefficient kind. Narrowing conversions fail with
    /// [`crate::MatrixError::TypeConversion`] at the first element that does not fit.
    pub fn convert_to(&self, kind: CoefficientType) -> Result<Matrix> {
        use CoefficientType as K;
        Ok(match (self, kind) {
            (m, k) if m.coefficient_type() == k => m.clone(),
            (Matrix::Boolean(m), K::Integer) => IntegerMatrix::from(m).into(),
            (Matrix::Boolean(m), K::Real) => RealMatrix::from(m).into(),
            (Matrix::Boolean(m), K::Complex) => ComplexMatrix::from(m).into(),
            (Matrix::Integer(m), K::Boolean) => BooleanMatrix::from(m).into(),
            (Matrix::Integer(m), K::Real) => RealMatrix::from(m).into(),
            (Matrix::Integer(m), K::Complex) => ComplexMatrix::from(m).into(),
            (Matrix::Real(m), K::Boolean) => BooleanMatrix::from(m).into(),
            (Matrix::Real(m), K::Integer) => IntegerMatrix::try_from(m)?.into(),
            (Matrix::Real(m), K::Complex) => ComplexMatrix::from(m).into(),
            (Matrix::Complex(m), K::Boolean) => BooleanMatrix::from(m).into(),
            (Matrix::Complex(m), K::Integer) => IntegerMatrix::try_from(m)?.into(),
            (Matrix::Complex(m), K::Real) => RealMatrix::try_from(m)?.into(),
            (m, _) => m.clone(),
        })
    }

    /// Widens both operands to the larger of their kinds.
    fn widened(&self, other: &Matrix) -> Result<(Matrix, Matrix)> {
        let kind = self.coefficient_type().max(other.coefficient_type());
        Ok((self.convert_to(kind)?, other.convert_to(kind)?))
    }

    fn combine(&self, other: &Matrix, how: Join) -> Result<Matrix> {
        if self.coefficient_type() == other.coefficient_type() {
            return join_same_kind(self, other, how);
        }
        let (a, b) = self.widened(other)?;
        join_same_kind(&a, &b, how)
    }

    pub fn combine_left_to_right(&self, other: &Matrix) -> Result<Matrix> {
        self.combine(other, Join::LeftToRight)
    }

    pub fn combine_top_to_bottom(&self, other: &Matrix) -> Result<Matrix> {
        self.combine(other, Join::TopToBottom)
    }

    pub fn column_reverse(&self) -> Matrix {
        map_engine!(self, m => DenseOps::column_reverse(m))
    }

    pub fn row_reverse(&self) -> Matrix {
        map_engine!(self, m => DenseOps::row_reverse(m))
    }

    pub fn apply_transform(&self) -> Matrix {
        map_engine!(self, m => DenseOps::apply_transform(m))
    }

    pub fn resize_in_place_to(&mut self, rows: usize, cols: usize) -> bool {
        dispatch!(self, m => DenseOps::resize_in_place_to(m, rows, cols))
    }

    pub fn resize_to(self, rows: usize, cols: usize) -> Matrix {
        map_engine!(self, m => DenseOps::resize_to(m, rows, cols))
    }

    /// Orders by kind first, then as the engines order themselves.
    pub fn relative_order(&self, other: &Matrix) -> Ordering {
        match (self, other) {
            (Matrix::Boolean(a), Matrix::Boolean(b)) => a.relative_order(b),
            (Matrix::Integer(a), Matrix::Integer(b)) => a.relative_order(b),
            (Matrix::Real(a), Matrix::Real(b)) => a.relative_order(b),
            (Matrix::Complex(a), Matrix::Complex(b)) => a.relative_order(b),
            _ => self.matrix_type().cmp(&other.matrix_type()),
        }
    }

    pub fn is_equal_to(&self, other: &Matrix) -> bool {
        self.relative_order(other) == Ordering::Equal
    }

    pub fn write_to<W: Write>(&self, writer: W, format: FileFormat) -> Result<()> {
        dispatch!(self, m => m.write_to(writer, format))
    }

    pub fn to_file<P: AsRef<Path>>(&self, path: P, format: FileFormat) -> Result<()> {
        dispatch!(self, m => m.to_file(path, format))
    }

    /// Decodes a matrix of whatever kind `bytes` holds.
    ///
    /// Binary data carries its kind. Delimited text loads as an integer matrix when every
    /// field is an integer and as a real matrix otherwise.
    pub fn read_from_bytes(bytes: &[u8]) -> Result<Matrix> {
        match codec::detect(bytes) {
            FileFormat::Binary => {
                let mut payload = bytes;
                let header = binary::read_header(&mut payload)?;
                debug!("binary {} matrix {}x{}", header.kind, header.rows, header.cols);
                Ok(match header.kind {
                    CoefficientType::Boolean => binary::read_boolean_payload(&header, payload)?.into(),
                    CoefficientType::Integer => binary::read_dense_payload::<Integer>(&header, payload)?.into(),
                    CoefficientType::Real => binary::read_dense_payload::<Real>(&header, payload)?.into(),
                    CoefficientType::Complex => binary::read_dense_payload::<Complex>(&header, payload)?.into(),
                })
            }
            FileFormat::Csv => {
                let text = codec::text(bytes)?;
                let table = codec::csv::Table::parse(text)?;
                if table.tokens.iter().all(|t| t.parse::<Integer>().is_ok()) {
                    Ok(codec::csv::read_dense::<Integer>(text)?.into())
                } else {
                    Ok(codec::csv::read_dense::<Real>(text)?.into())
                }
            }
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Matrix> {
        Self::read_from_bytes(&codec::read_file(path.as_ref())?)
    }
}

impl PartialEq for Matrix {
    fn eq(&self, other: &Self) -> bool {
        self.is_equal_to(other)
    }
}

impl Eq for Matrix {}

impl PartialOrd for Matrix {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Matrix {
    fn cmp(&self, other: &Self) -> Ordering {
        self.relative_order(other)
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        dispatch!(self, m => fmt::Display::fmt(m, f))
    }
}
