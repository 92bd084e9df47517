//! Column-major dense matrices over integer, real and complex coefficients.

use log::debug;
use rand::Rng;
use std::{
    fmt, mem,
    ops::{Index, Mul, Neg},
};

use crate::coefficient::{Coefficient, Complex, Integer, Real};
use crate::error::{MatrixError, Result};
use crate::kernel::view::{MatrixView, Op, ViewSpec};
use crate::layout::{column_start, element_index, numeric_allocation, numeric_column_spacing};
use crate::storage::Storage;

cfg_if::cfg_if! {
    if #[cfg(feature = "multithread")] {
        use rayon::prelude::*;

        /// Matrices with fewer elements than this are filled on the calling thread.
        const PARALLEL_THRESHOLD: usize = 1 << 14;
    }
}

/// A dense matrix stored column by column with cache-line aligned columns.
///
/// Element `(r, c)` lives at coefficient `c * column_spacing + r`. The coefficients between
/// `rows` and `column_spacing` in each column, and everything past the last column, are
/// zero at all times.
#[derive(Clone, Debug)]
pub struct DenseMatrix<T: Coefficient> {
    rows: usize,
    cols: usize,
    column_spacing: usize,
    storage: Storage<T>,
}

pub type IntegerMatrix = DenseMatrix<Integer>;
pub type RealMatrix = DenseMatrix<Real>;
pub type ComplexMatrix = DenseMatrix<Complex>;

/// Runs `f` on the logical part of every column of `data`.
fn for_each_column<T, F>(data: &mut [T], rows: usize, cols: usize, spacing: usize, f: F)
where
    T: Coefficient,
    F: Fn(usize, &mut [T]) + Send + Sync,
{
    if rows == 0 || cols == 0 {
        return;
    }
    let columns = &mut data[..cols * spacing];

    cfg_if::cfg_if! {
        if #[cfg(feature = "multithread")] {
            if rows * cols >= PARALLEL_THRESHOLD {
                columns
                    .par_chunks_mut(spacing)
                    .enumerate()
                    .for_each(|(c, column)| f(c, &mut column[..rows]));
                return;
            }
        }
    }

    for (c, column) in columns.chunks_mut(spacing).enumerate() {
        f(c, &mut column[..rows]);
    }
}

impl<T: Coefficient> DenseMatrix<T> {
    #[inline]
    fn spacing_for(rows: usize) -> usize {
        numeric_column_spacing(rows, mem::size_of::<T>())
    }

    #[inline]
    fn allocation_for(rows: usize, cols: usize) -> usize {
        numeric_allocation(rows, cols, mem::size_of::<T>())
    }

    fn check_dimensions(rows: usize, cols: usize) -> Result<()> {
        if rows > u32::MAX as usize || cols > u32::MAX as usize {
            return Err(MatrixError::InvalidDimensions { rows, cols });
        }
        Ok(())
    }

    /// Creates a zero matrix whose allocation holds at least `capacity` coefficients, so it
    /// can later grow in place.
    pub fn try_with_capacity(rows: usize, cols: usize, capacity: usize) -> Result<Self> {
        Self::check_dimensions(rows, cols)?;
        let capacity = capacity.max(Self::allocation_for(rows, cols));
        Ok(DenseMatrix {
            rows,
            cols,
            column_spacing: Self::spacing_for(rows),
            storage: Storage::try_acquire(capacity)?,
        })
    }

    /// # Panics
    ///
    /// Panics if either dimension exceeds `u32::MAX`.
    pub fn with_capacity(rows: usize, cols: usize, capacity: usize) -> Self {
        assert!(
            Self::check_dimensions(rows, cols).is_ok(),
            "matrix dimensions {}x{} out of range",
            rows,
            cols
        );
        DenseMatrix {
            rows,
            cols,
            column_spacing: Self::spacing_for(rows),
            storage: Storage::acquire(capacity.max(Self::allocation_for(rows, cols))),
        }
    }

    #[inline]
    pub fn try_zeros(rows: usize, cols: usize) -> Result<Self> {
        Self::try_with_capacity(rows, cols, 0)
    }

    #[inline]
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self::with_capacity(rows, cols, 0)
    }

    /// Creates a matrix whose contents are unspecified until written. The residue is still
    /// guaranteed to be zero.
    #[inline]
    pub fn uninitialized(rows: usize, cols: usize) -> Self {
        Self::zeros(rows, cols)
    }

    /// Builds a matrix column by column, possibly in parallel.
    pub(crate) fn fill_columns<F>(rows: usize, cols: usize, f: F) -> Self
    where
        F: Fn(usize, &mut [T]) + Send + Sync,
    {
        let mut m = Self::zeros(rows, cols);
        let spacing = m.column_spacing;
        for_each_column(m.storage.make_mut(), rows, cols, spacing, f);
        m
    }

    pub fn from_fn(rows: usize, cols: usize, mut f: impl FnMut(usize, usize) -> T) -> Self {
        let mut m = Self::zeros(rows, cols);
        let spacing = m.column_spacing;
        let data = m.storage.make_mut();
        for c in 0..cols {
            for r in 0..rows {
                data[element_index(r, c, spacing)] = f(r, c);
            }
        }
        m
    }

    #[inline]
    pub fn build(rows: usize, cols: usize, f: impl FnMut(usize, usize) -> T) -> Self {
        Self::from_fn(rows, cols, f)
    }

    /// Creates a matrix from `rows * cols` values listed column after column.
    pub fn from_column_major(rows: usize, cols: usize, values: &[T]) -> Result<Self> {
        if values.len() != rows * cols {
            return Err(MatrixError::InvalidDimensions { rows, cols });
        }
        Ok(Self::fill_columns(rows, cols, |c, column| {
            column.copy_from_slice(&values[c * rows..(c + 1) * rows])
        }))
    }

    /// Creates a matrix from `rows * cols` values listed row after row.
    pub fn from_row_major(rows: usize, cols: usize, values: &[T]) -> Result<Self> {
        if values.len() != rows * cols {
            return Err(MatrixError::InvalidDimensions { rows, cols });
        }
        Ok(Self::fill_columns(rows, cols, |c, column| {
            for (r, v) in column.iter_mut().enumerate() {
                *v = values[r * cols + c];
            }
        }))
    }

    /// Creates a matrix from a vector of rows.
    ///
    /// # Panics
    ///
    /// Panics if the rows have differing lengths.
    pub fn from_vec(data: &[Vec<T>]) -> Self {
        let rows = data.len();
        let cols = data.first().map_or(0, |row| row.len());
        assert!(
            data.iter().all(|row| row.len() == cols),
            "all rows must have the same length"
        );
        Self::from_fn(rows, cols, |r, c| data[r][c])
    }

    pub fn identity(rows: usize, cols: usize) -> Self {
        let mut m = Self::zeros(rows, cols);
        for i in 0..rows.min(cols) {
            m.update(i, i, T::one());
        }
        m
    }

    /// Square matrix with `entries` on the diagonal.
    pub fn diagonal(entries: &[T]) -> Self {
        let n = entries.len();
        let mut m = Self::zeros(n, n);
        for (i, &v) in entries.iter().enumerate() {
            m.update(i, i, v);
        }
        m
    }

    pub fn ones(rows: usize, cols: usize) -> Self {
        if rows == 1 {
            // row vectors are dense
            let mut m = Self::zeros(rows, cols);
            m.storage.make_mut()[..cols].fill(T::one());
            return m;
        }
        Self::fill_columns(rows, cols, |_, column| column.fill(T::one()))
    }

    #[inline]
    pub fn random(rng: &mut impl Rng, rows: usize, cols: usize) -> Self {
        Self::from_fn(rows, cols, |_, _| T::sample(rng))
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Distance in coefficients between the starts of consecutive columns.
    #[inline]
    pub fn column_spacing(&self) -> usize {
        self.column_spacing
    }

    /// Number of coefficients allocated for the payload.
    #[inline]
    pub fn allocation_size(&self) -> usize {
        self.storage.capacity()
    }

    /// The raw payload, residue included.
    #[inline]
    pub fn data(&self) -> &[T] {
        self.storage.as_slice()
    }

    /// The bytes of the logical region, residue between columns included.
    pub(crate) fn used_bytes(&self) -> &[u8] {
        let used = if self.is_empty() {
            0
        } else {
            self.cols * self.column_spacing * mem::size_of::<T>()
        };
        &self.storage.as_bytes()[..used]
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows == 0 || self.cols == 0
    }

    #[inline]
    pub fn is_square(&self) -> bool {
        self.rows == self.cols
    }

    #[inline]
    pub fn reference_count(&self) -> u32 {
        self.storage.reference_count()
    }

    #[inline]
    pub fn deep_copy(&self) -> Self {
        DenseMatrix {
            storage: self.storage.deep_copy(),
            ..*self
        }
    }

    /// The logical part of column `col`.
    #[inline]
    pub fn column(&self, col: usize) -> &[T] {
        assert!(col < self.cols, "column {} out of bounds", col);
        let start = column_start(col, self.column_spacing);
        &self.data()[start..start + self.rows]
    }

    /// The logical part of column `col`, detaching from other handles first if shared.
    pub fn column_mut(&mut self, col: usize) -> &mut [T] {
        assert!(col < self.cols, "column {} out of bounds", col);
        let start = column_start(col, self.column_spacing);
        let rows = self.rows;
        &mut self.storage.make_mut()[start..start + rows]
    }

    /// Iterates over `(row, col, value)` in column-major order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, T)> + '_ {
        (0..self.cols).flat_map(move |c| {
            self.column(c)
                .iter()
                .enumerate()
                .map(move |(r, &v)| (r, c, v))
        })
    }

    /// Reads the matrix as `alpha * op(self)`.
    #[inline]
    pub fn view(&self, spec: ViewSpec<T>) -> MatrixView<'_, T> {
        MatrixView::new(self.rows, self.cols, self.data(), self.column_spacing, spec)
    }

    #[inline]
    fn check_index(&self, row: usize, col: usize) {
        assert!(
            row < self.rows && col < self.cols,
            "index ({}, {}) out of bounds for {}x{} matrix",
            row,
            col,
            self.rows,
            self.cols
        );
    }

    /// # Panics
    ///
    /// Panics if the index is out of range.
    #[inline]
    pub fn at(&self, row: usize, col: usize) -> T {
        self.check_index(row, col);
        self.data()[element_index(row, col, self.column_spacing)]
    }

    /// Sets the element at `(row, col)`, detaching from other handles first if shared.
    ///
    /// # Panics
    ///
    /// Panics if the index is out of range.
    #[inline]
    pub fn update(&mut self, row: usize, col: usize, value: T) {
        self.check_index(row, col);
        let index = element_index(row, col, self.column_spacing);
        self.storage.make_mut()[index] = value;
    }

    /// Returns true if every coefficient outside the logical matrix is zero.
    pub fn residue_is_clear(&self) -> bool {
        let data = self.data();
        let spacing = self.column_spacing;
        let columns = (0..self.cols).all(|c| {
            let start = column_start(c, spacing);
            data[start + self.rows.min(spacing)..start + spacing]
                .iter()
                .all(|v| v.is_zero())
        });
        let used = if self.is_empty() { 0 } else { self.cols * spacing };
        columns && data[used..].iter().all(|v| v.is_zero())
    }

    /// Element-wise map into a new matrix.
    pub fn map<F>(&self, f: F) -> Self
    where
        F: Fn(T) -> T + Send + Sync,
    {
        let spacing = self.column_spacing;
        let src = self.data();
        Self::fill_columns(self.rows, self.cols, |c, column| {
            let from = &src[column_start(c, spacing)..];
            for (v, &x) in column.iter_mut().zip(from) {
                *v = f(x);
            }
        })
    }

    /// Materializes `alpha * op(self)`.
    pub fn scaled_copy(&self, spec: ViewSpec<T>) -> Self {
        let view = self.view(spec);
        let (rows, cols) = view.dims();
        if !spec.op.is_transposed() {
            return self.map(move |x| spec.alpha * spec.op.apply(x));
        }
        Self::fill_columns(rows, cols, |j, column| {
            for (i, v) in column.iter_mut().enumerate() {
                *v = view.get(i, j);
            }
        })
    }

    #[inline]
    pub fn transpose(&self) -> Self {
        self.scaled_copy(ViewSpec::with_op(Op::Transpose))
    }

    /// Element-wise complex conjugate; a copy for integer and real matrices.
    #[inline]
    pub fn conjugate(&self) -> Self {
        self.scaled_copy(ViewSpec::with_op(Op::Conjugate))
    }

    /// Conjugate transpose.
    #[inline]
    pub fn adjoint(&self) -> Self {
        self.scaled_copy(ViewSpec::with_op(Op::Adjoint))
    }

    #[inline]
    pub fn apply_transform(&self) -> Self {
        self.transpose()
    }

    #[inline]
    pub fn scaled(&self, alpha: T) -> Self {
        self.scaled_copy(ViewSpec::scaled(alpha))
    }

    /// Divides every element by `alpha`.
    ///
    /// # Panics
    ///
    /// Panics on integer division by zero.
    #[inline]
    pub fn divided(&self, alpha: T) -> Self {
        self.map(move |x| x / alpha)
    }

    /// Computes `op_a(self) + op_b(other)`, each side scaled by its view's `alpha`.
    pub fn add_scaled(&self, spec_a: ViewSpec<T>, other: &Self, spec_b: ViewSpec<T>) -> Result<Self> {
        let a = self.view(spec_a);
        let b = other.view(spec_b);
        let (rows, cols) = a.dims();
        if (rows, cols) != b.dims() {
            return Err(MatrixError::incompatible(a.dims(), b.dims()));
        }
        Ok(Self::fill_columns(rows, cols, |j, column| {
            for (i, v) in column.iter_mut().enumerate() {
                *v = a.get(i, j) + b.get(i, j);
            }
        }))
    }

    fn check_same_dims(&self, other: &Self) -> Result<()> {
        if self.rows != other.rows || self.cols != other.cols {
            return Err(MatrixError::incompatible(
                (self.rows, self.cols),
                (other.rows, other.cols),
            ));
        }
        Ok(())
    }

    /// Element-wise product.
    pub fn hadamard(&self, other: &Self) -> Result<Self> {
        self.check_same_dims(other)?;
        Ok(Self::fill_columns(self.rows, self.cols, |c, column| {
            for ((v, &x), &y) in column.iter_mut().zip(self.column(c)).zip(other.column(c)) {
                *v = x * y;
            }
        }))
    }

    pub fn kronecker(&self, other: &Self) -> Self {
        let (rb, cb) = (other.rows, other.cols);
        Self::fill_columns(self.rows * rb, self.cols * cb, |j, column| {
            let a = self.column(j / cb);
            let b = other.column(j % cb);
            for (i, v) in column.iter_mut().enumerate() {
                *v = a[i / rb] * b[i % rb];
            }
        })
    }

    /// Multiplies row `i` by `scales[i]`.
    pub fn row_scale_multiply(&self, scales: &[T]) -> Result<Self> {
        if scales.len() != self.rows {
            return Err(MatrixError::incompatible(
                (self.rows, self.cols),
                (scales.len(), 1),
            ));
        }
        Ok(Self::fill_columns(self.rows, self.cols, |c, column| {
            for ((v, &x), &s) in column.iter_mut().zip(self.column(c)).zip(scales) {
                *v = s * x;
            }
        }))
    }

    /// Multiplies column `j` by `scales[j]`.
    pub fn column_scale_multiply(&self, scales: &[T]) -> Result<Self> {
        if scales.len() != self.cols {
            return Err(MatrixError::incompatible(
                (self.rows, self.cols),
                (1, scales.len()),
            ));
        }
        Ok(Self::fill_columns(self.rows, self.cols, |c, column| {
            for (v, &x) in column.iter_mut().zip(self.column(c)) {
                *v = scales[c] * x;
            }
        }))
    }

    /// Places `other` to the right of `self`. The shorter operand is padded with zero rows.
    pub fn combine_left_to_right(&self, other: &Self) -> Self {
        let left = self.cols;
        Self::fill_columns(self.rows.max(other.rows), self.cols + other.cols, |c, column| {
            let source = if c < left {
                self.column(c)
            } else {
                other.column(c - left)
            };
            column[..source.len()].copy_from_slice(source);
        })
    }

    /// Places `other` below `self`. The narrower operand is padded with zero columns.
    pub fn combine_top_to_bottom(&self, other: &Self) -> Self {
        let top = self.rows;
        Self::fill_columns(self.rows + other.rows, self.cols.max(other.cols), |c, column| {
            if c < self.cols {
                column[..top].copy_from_slice(self.column(c));
            }
            if c < other.cols {
                column[top..].copy_from_slice(other.column(c));
            }
        })
    }

    pub fn column_reverse(&self) -> Self {
        let last = self.cols.saturating_sub(1);
        Self::fill_columns(self.rows, self.cols, |c, column| {
            column.copy_from_slice(self.column(last - c))
        })
    }

    pub fn row_reverse(&self) -> Self {
        Self::fill_columns(self.rows, self.cols, |c, column| {
            for (v, &x) in column.iter_mut().zip(self.column(c).iter().rev()) {
                *v = x;
            }
        })
    }

    fn reallocated(&self, rows: usize, cols: usize) -> Self {
        let keep = rows.min(self.rows);
        let kept_cols = self.cols;
        Self::fill_columns(rows, cols, |c, column| {
            if c < kept_cols {
                column[..keep].copy_from_slice(&self.column(c)[..keep]);
            }
        })
    }

    /// Attempts to resize without reallocating.
    ///
    /// Succeeds only when the matrix is not shared, the column spacing for the new row count
    /// is unchanged and the new size fits the current allocation. Coefficients exposed by
    /// shrinking are zeroed. Returns false, leaving the matrix untouched, otherwise.
    pub fn resize_in_place_to(&mut self, rows: usize, cols: usize) -> bool {
        let spacing = self.column_spacing;
        if Self::spacing_for(rows) != spacing
            || Self::allocation_for(rows, cols) > self.storage.capacity()
            || Self::check_dimensions(rows, cols).is_err()
        {
            return false;
        }
        let Some(data) = self.storage.get_mut() else {
            return false;
        };

        if rows < self.rows {
            for c in 0..cols.min(self.cols) {
                let start = column_start(c, spacing);
                data[start + rows..start + self.rows].fill(T::zero());
            }
        }
        if cols < self.cols {
            data[column_start(cols, spacing)..column_start(self.cols, spacing)].fill(T::zero());
        }
        self.rows = rows;
        self.cols = cols;
        true
    }

    /// Resizes the matrix, keeping the overlapping elements and zeroing everything else.
    ///
    /// Returns the matrix holding the result, which is `self` when the resize could be done
    /// in place and a new allocation otherwise.
    pub fn resize(mut self, rows: usize, cols: usize, always_reallocate: bool) -> Self {
        if always_reallocate {
            debug!("resize {}x{} -> {}x{}: forced reallocation", self.rows, self.cols, rows, cols);
            return self.reallocated(rows, cols);
        }
        if rows == self.rows && cols == self.cols {
            return self;
        }
        if self.resize_in_place_to(rows, cols) {
            debug!("resize to {}x{}: in place", rows, cols);
            return self;
        }
        debug!("resize {}x{} -> {}x{}: reallocating", self.rows, self.cols, rows, cols);
        self.reallocated(rows, cols)
    }

    #[inline]
    pub fn resize_to(self, rows: usize, cols: usize) -> Self {
        self.resize(rows, cols, false)
    }

    /// Byte-exact comparison of dimensions and contents.
    pub fn is_equal_to(&self, other: &Self) -> bool {
        self.rows == other.rows && self.cols == other.cols && self.used_bytes() == other.used_bytes()
    }
}

impl ComplexMatrix {
    pub fn real_part(&self) -> RealMatrix {
        RealMatrix::fill_columns(self.rows, self.cols, |c, column| {
            for (v, x) in column.iter_mut().zip(self.column(c)) {
                *v = x.re;
            }
        })
    }

    pub fn imag_part(&self) -> RealMatrix {
        RealMatrix::fill_columns(self.rows, self.cols, |c, column| {
            for (v, x) in column.iter_mut().zip(self.column(c)) {
                *v = x.im;
            }
        })
    }

    /// Combines a real and an imaginary part of equal dimensions.
    pub fn from_parts(re: &RealMatrix, im: &RealMatrix) -> Result<Self> {
        re.check_same_dims(im)?;
        Ok(Self::fill_columns(re.rows, re.cols, |c, column| {
            for ((v, &x), &y) in column.iter_mut().zip(re.column(c)).zip(im.column(c)) {
                *v = Complex::new(x, y);
            }
        }))
    }
}

impl<T: Coefficient> Index<(usize, usize)> for DenseMatrix<T> {
    type Output = T;

    #[inline]
    fn index(&self, index: (usize, usize)) -> &Self::Output {
        self.check_index(index.0, index.1);
        &self.data()[element_index(index.0, index.1, self.column_spacing)]
    }
}

impl<T: Coefficient> Neg for &DenseMatrix<T> {
    type Output = DenseMatrix<T>;

    fn neg(self) -> Self::Output {
        self.map(|x| -x)
    }
}

impl<T: Coefficient> Neg for DenseMatrix<T> {
    type Output = DenseMatrix<T>;

    fn neg(self) -> Self::Output {
        -&self
    }
}

impl<T: Coefficient> Mul<T> for &DenseMatrix<T> {
    type Output = DenseMatrix<T>;

    fn mul(self, rhs: T) -> Self::Output {
        self.scaled(rhs)
    }
}

impl<T: Coefficient> Mul<T> for DenseMatrix<T> {
    type Output = DenseMatrix<T>;

    fn mul(self, rhs: T) -> Self::Output {
        self.scaled(rhs)
    }
}

impl<T: Coefficient> fmt::Display for DenseMatrix<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in 0..self.rows {
            for j in 0..self.cols {
                if j != 0 {
                    write!(f, "\t")?;
                }
                write!(f, "{}", self[(i, j)])?;
            }
            writeln!(f)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use num_complex::Complex64;
    use rand::{rngs::SmallRng, SeedableRng};

    const SIZES: [usize; 8] = [0, 1, 2, 3, 5, 8, 13, 40];

    fn check<T: Coefficient>(m: &DenseMatrix<T>, f: impl Fn(usize, usize) -> T) {
        assert!(m.residue_is_clear());
        for i in 0..m.rows() {
            for j in 0..m.cols() {
                assert_eq!(m[(i, j)], f(i, j), "mismatch at ({}, {})", i, j);
            }
        }
    }

    #[test]
    fn constructors() {
        for rows in SIZES {
            for cols in SIZES {
                check(&RealMatrix::zeros(rows, cols), |_, _| 0.0);
                check(&IntegerMatrix::ones(rows, cols), |_, _| 1);
                check(&ComplexMatrix::identity(rows, cols), |i, j| {
                    if i == j {
                        Complex64::new(1.0, 0.0)
                    } else {
                        Complex64::new(0.0, 0.0)
                    }
                });
            }
        }
        check(&IntegerMatrix::diagonal(&[1, 2, 3]), |i, j| if i == j { i as i64 + 1 } else { 0 });
    }

    #[test]
    fn row_and_column_major() {
        let r = IntegerMatrix::from_row_major(2, 3, &[1, 2, 3, 4, 5, 6]).unwrap();
        let c = IntegerMatrix::from_column_major(2, 3, &[1, 4, 2, 5, 3, 6]).unwrap();
        assert!(r.is_equal_to(&c));
        assert_eq!(r.column(1), &[2, 5]);
        assert!(IntegerMatrix::from_row_major(2, 3, &[1]).is_err());
        let values: Vec<_> = r.iter().map(|(_, _, v)| v).collect();
        assert_eq!(values, vec![1, 4, 2, 5, 3, 6]);
    }

    #[test]
    fn update_detaches_shared() {
        let mut a = RealMatrix::zeros(3, 3);
        let b = a.clone();
        a.update(2, 1, 5.0);
        assert_eq!(a[(2, 1)], 5.0);
        assert_eq!(b[(2, 1)], 0.0);
    }

    #[test]
    fn transforms() {
        let mut rng = SmallRng::seed_from_u64(1);
        for rows in SIZES {
            for cols in SIZES {
                let m = ComplexMatrix::random(&mut rng, rows, cols);
                check(&m.transpose(), |i, j| m[(j, i)]);
                check(&m.adjoint(), |i, j| m[(j, i)].conj());
                check(&m.conjugate(), |i, j| m[(i, j)].conj());
                check(&m.row_reverse(), |i, j| m[(rows - 1 - i, j)]);
                check(&m.column_reverse(), |i, j| m[(i, cols - 1 - j)]);
                assert!(m.transpose().transpose().is_equal_to(&m));
                assert!(m.row_reverse().row_reverse().is_equal_to(&m));
                assert!(m.column_reverse().column_reverse().is_equal_to(&m));
            }
        }
    }

    #[test]
    fn large_parallel_fill() {
        let mut rng = SmallRng::seed_from_u64(2);
        let m = RealMatrix::random(&mut rng, 300, 90);
        let t = m.transpose();
        check(&t, |i, j| m[(j, i)]);
        check(&-&m, |i, j| -m[(i, j)]);
    }

    #[test]
    fn combine() {
        let a = IntegerMatrix::from_vec(&[vec![1, 2], vec![3, 4]]);
        let b = IntegerMatrix::from_vec(&[vec![5], vec![6]]);
        let lr = a.combine_left_to_right(&b);
        assert!(lr.is_equal_to(&IntegerMatrix::from_vec(&[vec![1, 2, 5], vec![3, 4, 6]])));

        let c = IntegerMatrix::from_vec(&[vec![7]]);
        let tb = a.combine_top_to_bottom(&c);
        check(&tb, |i, j| [[1, 2], [3, 4], [7, 0]][i][j]);

        let mut rng = SmallRng::seed_from_u64(3);
        for (ra, rb) in [(0, 3), (1, 1), (4, 9), (9, 1)] {
            let a = RealMatrix::random(&mut rng, ra, 3);
            let b = RealMatrix::random(&mut rng, rb, 2);
            check(&a.combine_left_to_right(&b), |i, j| {
                if j < 3 {
                    if i < ra { a[(i, j)] } else { 0.0 }
                } else if i < rb {
                    b[(i, j - 3)]
                } else {
                    0.0
                }
            });
        }
    }

    #[test]
    fn kernels() {
        let a = IntegerMatrix::from_vec(&[vec![1, 2], vec![3, 4]]);
        let b = IntegerMatrix::from_vec(&[vec![0, 1], vec![1, 0]]);
        check(&a.hadamard(&b).unwrap(), |i, j| [[0, 2], [3, 0]][i][j]);
        check(&a.kronecker(&b), |i, j| a[(i / 2, j / 2)] * b[(i % 2, j % 2)]);
        check(&(&a * 3), |i, j| 3 * a[(i, j)]);
        check(&a.scaled(2).divided(2), |i, j| a[(i, j)]);
        check(&a.row_scale_multiply(&[1, 10]).unwrap(), |i, j| [[1, 2], [30, 40]][i][j]);
        check(&a.column_scale_multiply(&[1, 10]).unwrap(), |i, j| [[1, 20], [3, 40]][i][j]);
        assert!(a.row_scale_multiply(&[1]).is_err());

        let sum = a
            .add_scaled(ViewSpec::plain(), &b, ViewSpec::new(Op::Transpose, -1))
            .unwrap();
        check(&sum, |i, j| a[(i, j)] - b[(j, i)]);
        assert!(matches!(
            a.add_scaled(ViewSpec::plain(), &IntegerMatrix::zeros(2, 3), ViewSpec::plain()),
            Err(MatrixError::IncompatibleDimensions { .. })
        ));
    }

    #[test]
    fn complex_parts() {
        let mut rng = SmallRng::seed_from_u64(4);
        let z = ComplexMatrix::random(&mut rng, 5, 4);
        let back = ComplexMatrix::from_parts(&z.real_part(), &z.imag_part()).unwrap();
        assert!(back.is_equal_to(&z));
    }

    #[test]
    fn resize_in_place_grows_into_capacity() {
        let mut m = RealMatrix::with_capacity(2, 2, 24);
        m.update(0, 0, 1.0);
        m.update(0, 1, 2.0);
        m.update(1, 0, 3.0);
        m.update(1, 1, 4.0);
        let before = m.data().as_ptr();
        let m = m.resize_to(3, 3);
        assert_eq!(m.data().as_ptr(), before);
        check(&m, |i, j| [[1.0, 2.0, 0.0], [3.0, 4.0, 0.0], [0.0, 0.0, 0.0]][i][j]);
    }

    #[test]
    fn resize_preserves_overlap() {
        let mut rng = SmallRng::seed_from_u64(5);
        for (rows, cols) in [(0, 0), (1, 6), (3, 3), (6, 2), (20, 9), (4, 4)] {
            let m = IntegerMatrix::random(&mut rng, 4, 6);
            let r = m.clone().resize_to(rows, cols);
            assert_eq!((r.rows(), r.cols()), (rows, cols));
            check(&r, |i, j| if i < 4 && j < 6 { m[(i, j)] } else { 0 });
        }

        let mut m = IntegerMatrix::ones(4, 6);
        assert!(m.resize_in_place_to(3, 2));
        assert!(m.resize_in_place_to(4, 6));
        check(&m, |i, j| if i < 3 && j < 2 { 1 } else { 0 });
        assert!(!m.resize_in_place_to(40, 6));
    }
}
