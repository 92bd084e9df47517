//! Bit-packed dense boolean matrices.

use log::{debug, trace};
use rand::Rng;
use std::{fmt, ops::Index};

use crate::bits::{reverse_field, reverse_word, BitSlice};
use crate::error::{MatrixError, Result};
use crate::layout::{
    boolean_allocation, boolean_used_units, column_start, element_index, low_mask,
    recommended_column_size, units_for_bits, StorageUnit, UNIT_BITS,
};
use crate::storage::Storage;

/// A dense matrix of bits stored column by column.
///
/// Each column occupies `column_spacing` bits of a little-endian stream of [`StorageUnit`]s,
/// so element `(r, c)` is bit `c * column_spacing + r`. Columns shorter than a unit are
/// padded to a power of two and never straddle a unit; longer columns are padded to a whole
/// number of units. Every bit outside the logical matrix is kept at 0.
///
/// Cloning is cheap and shares the underlying block; mutators detach first.
#[derive(Clone, Debug)]
pub struct BooleanMatrix {
    /// the number of logical rows in the matrix
    rows: usize,

    /// the number of logical columns in the matrix
    cols: usize,

    /// distance in bits between the starts of consecutive columns
    column_spacing: usize,

    storage: Storage<StorageUnit>,
}

impl BooleanMatrix {
    fn check_dimensions(rows: usize, cols: usize) -> Result<()> {
        if rows > u32::MAX as usize || cols > u32::MAX as usize {
            return Err(MatrixError::InvalidDimensions { rows, cols });
        }
        Ok(())
    }

    /// Creates a zero matrix, reporting allocation failure instead of aborting.
    pub fn try_zeros(rows: usize, cols: usize) -> Result<Self> {
        Self::check_dimensions(rows, cols)?;
        let storage = Storage::try_acquire(boolean_allocation(rows, cols))?;
        Ok(BooleanMatrix {
            rows,
            cols,
            column_spacing: recommended_column_size(rows),
            storage,
        })
    }

    /// Creates a zero matrix.
    ///
    /// # Panics
    ///
    /// Panics if either dimension exceeds `u32::MAX`.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        assert!(
            Self::check_dimensions(rows, cols).is_ok(),
            "matrix dimensions {}x{} out of range",
            rows,
            cols
        );
        BooleanMatrix {
            rows,
            cols,
            column_spacing: recommended_column_size(rows),
            storage: Storage::acquire(boolean_allocation(rows, cols)),
        }
    }

    /// Creates a matrix whose contents are unspecified until written. The residue is still
    /// guaranteed to be clear.
    #[inline]
    pub fn uninitialized(rows: usize, cols: usize) -> Self {
        Self::zeros(rows, cols)
    }

    pub fn build(rows: usize, cols: usize, mut f: impl FnMut(usize, usize) -> bool) -> Self {
        let mut m = Self::zeros(rows, cols);
        let spacing = m.column_spacing;
        let bits = m.bits_mut();
        for c in 0..cols {
            for r in 0..rows {
                if f(r, c) {
                    bits.set_bit(element_index(r, c, spacing), true);
                }
            }
        }
        m
    }

    /// Creates a matrix from `rows * cols` values listed in row-major order.
    pub fn from_row_major(rows: usize, cols: usize, values: &[bool]) -> Result<Self> {
        if values.len() != rows * cols {
            return Err(MatrixError::InvalidDimensions { rows, cols });
        }
        Ok(Self::build(rows, cols, |r, c| values[r * cols + c]))
    }

    /// Creates a matrix from a vector of rows.
    ///
    /// # Panics
    ///
    /// Panics if the rows have differing lengths.
    pub fn from_bool_vec(data: &[Vec<bool>]) -> Self {
        let rows = data.len();
        let cols = data.first().map_or(0, |row| row.len());
        assert!(
            data.iter().all(|row| row.len() == cols),
            "all rows must have the same length"
        );
        Self::build(rows, cols, |r, c| data[r][c])
    }

    pub fn identity(rows: usize, cols: usize) -> Self {
        let mut m = Self::zeros(rows, cols);
        let spacing = m.column_spacing;
        let bits = m.bits_mut();
        for i in 0..rows.min(cols) {
            bits.set_bit(element_index(i, i, spacing), true);
        }
        m
    }

    /// Creates a matrix with every element set.
    pub fn ones(rows: usize, cols: usize) -> Self {
        let mut m = Self::zeros(rows, cols);
        if m.is_empty() {
            return m;
        }

        let spacing = m.column_spacing;
        let total = cols * spacing;
        let units = m.storage.make_mut();
        if rows == spacing {
            // columns are packed back to back
            BitSlice::new_mut(units).set_bits(0, total);
        } else if spacing <= UNIT_BITS {
            let field = low_mask(rows);
            let pattern = (0..UNIT_BITS / spacing).fold(0, |p, k| p | (field << (k * spacing)));
            let full = total / UNIT_BITS;
            units[..full].fill(pattern);
            let rem = total % UNIT_BITS;
            if rem != 0 {
                units[full] = pattern & low_mask(rem);
            }
        } else {
            let words = spacing / UNIT_BITS;
            let full = rows / UNIT_BITS;
            let rem = rows % UNIT_BITS;
            for c in 0..cols {
                let column = &mut units[c * words..(c + 1) * words];
                column[..full].fill(StorageUnit::MAX);
                if rem != 0 {
                    column[full] = low_mask(rem);
                }
            }
        }
        m
    }

    #[inline]
    pub fn random(rng: &mut impl Rng, rows: usize, cols: usize) -> Self {
        Self::build(rows, cols, |_, _| rng.random())
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Distance in bits between the starts of consecutive columns.
    #[inline]
    pub fn column_spacing(&self) -> usize {
        self.column_spacing
    }

    /// Number of storage units allocated for the payload.
    #[inline]
    pub fn allocation_size(&self) -> usize {
        self.storage.capacity()
    }

    /// The raw payload, residue included.
    #[inline]
    pub fn data(&self) -> &[StorageUnit] {
        self.storage.as_slice()
    }

    /// The bytes of the logical region, residue between columns included.
    pub(crate) fn used_bytes(&self) -> &[u8] {
        let units = boolean_used_units(self.rows, self.cols);
        &self.storage.as_bytes()[..units * std::mem::size_of::<StorageUnit>()]
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows == 0 || self.cols == 0
    }

    #[inline]
    pub fn is_square(&self) -> bool {
        self.rows == self.cols
    }

    /// Number of handles sharing this matrix's storage.
    #[inline]
    pub fn reference_count(&self) -> u32 {
        self.storage.reference_count()
    }

    /// Returns an independent copy that shares nothing with `self`.
    #[inline]
    pub fn deep_copy(&self) -> Self {
        BooleanMatrix {
            storage: self.storage.deep_copy(),
            ..*self
        }
    }

    #[inline]
    pub(crate) fn bits(&self) -> &BitSlice {
        BitSlice::new(self.storage.as_slice())
    }

    #[inline]
    pub(crate) fn bits_mut(&mut self) -> &mut BitSlice {
        BitSlice::new_mut(self.storage.make_mut())
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

    /// Returns the element at `(row, col)`.
    ///
    /// # Panics
    ///
    /// Panics if the index is out of range.
    #[inline]
    pub fn at(&self, row: usize, col: usize) -> bool {
        self.check_index(row, col);
        self.bits().bit(element_index(row, col, self.column_spacing))
    }

    /// Sets the element at `(row, col)`, detaching from other handles first if shared.
    ///
    /// # Panics
    ///
    /// Panics if the index is out of range.
    #[inline]
    pub fn update(&mut self, row: usize, col: usize, value: bool) {
        self.check_index(row, col);
        let index = element_index(row, col, self.column_spacing);
        self.bits_mut().set_bit(index, value);
    }

    /// Returns the number of set elements.
    #[inline]
    pub fn count_ones(&self) -> u32 {
        self.bits().count_ones()
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.data().iter().all(|&unit| unit == 0)
    }

    /// Returns true if every bit outside the logical matrix is clear.
    pub fn residue_is_clear(&self) -> bool {
        let bits = self.bits();
        if self.is_empty() {
            return bits.count_ones() == 0;
        }
        let spacing = self.column_spacing;
        let column_residue = (0..self.cols).all(|c| {
            let start = column_start(c, spacing);
            bits.iter(start + self.rows, spacing - self.rows.min(spacing))
                .all(|b| !b)
        });
        let used = self.cols * spacing;
        column_residue && bits.iter(used, bits.num_bits() - used).all(|b| !b)
    }

    /// Writes the columns of `source` into `dest` starting at column `first_col`.
    ///
    /// The strategy depends on how the source and destination spacings relate to a unit:
    /// matching unit-aligned spacings copy whole units, short source columns are extracted
    /// as a single masked field, and short destination columns are streamed field by field.
    fn place_columns(dest: &mut BitSlice, dest_spacing: usize, source: &BooleanMatrix, first_col: usize) {
        if source.is_empty() {
            return;
        }
        let spacing = source.column_spacing;
        let src = source.bits();
        let n = source.cols;

        if spacing == dest_spacing && spacing % UNIT_BITS == 0 {
            trace!("placing {} columns by unit copy", n);
            let words = spacing / UNIT_BITS;
            dest.units_mut()[first_col * words..(first_col + n) * words]
                .copy_from_slice(&src.units()[..n * words]);
        } else if dest_spacing % UNIT_BITS == 0 && spacing < UNIT_BITS {
            trace!("placing {} columns as masked fields", n);
            let words = dest_spacing / UNIT_BITS;
            for c in 0..n {
                let value = src.read_bits(column_start(c, spacing), source.rows);
                dest.units_mut()[(first_col + c) * words] = value;
            }
        } else if dest_spacing % UNIT_BITS == 0 {
            trace!("placing {} columns by partial unit copy", n);
            let source_words = spacing / UNIT_BITS;
            let dest_words = dest_spacing / UNIT_BITS;
            let used = units_for_bits(source.rows);
            for c in 0..n {
                let from = c * source_words;
                let to = (first_col + c) * dest_words;
                dest.units_mut()[to..to + used].copy_from_slice(&src.units()[from..from + used]);
            }
        } else {
            trace!("placing {} columns by streaming fields", n);
            let mut reader = src.reader(0);
            let mut writer = dest.writer(column_start(first_col, dest_spacing));
            for _ in 0..n {
                writer.write(reader.read(spacing), dest_spacing);
            }
        }
    }

    /// Places `other` to the right of `self`. The shorter operand is padded with zero rows.
    pub fn combine_left_to_right(&self, other: &BooleanMatrix) -> Self {
        let mut result = Self::zeros(self.rows.max(other.rows), self.cols + other.cols);
        let spacing = result.column_spacing;
        let dest = result.bits_mut();
        Self::place_columns(dest, spacing, self, 0);
        Self::place_columns(dest, spacing, other, self.cols);
        result
    }

    /// Places `other` below `self`. The narrower operand is padded with zero columns.
    pub fn combine_top_to_bottom(&self, other: &BooleanMatrix) -> Self {
        let mut result = Self::zeros(self.rows + other.rows, self.cols.max(other.cols));
        let spacing = result.column_spacing;
        let dest = result.bits_mut();
        for c in 0..self.cols {
            dest.copy_bits_from(
                column_start(c, spacing),
                self.bits(),
                column_start(c, self.column_spacing),
                self.rows,
            );
        }
        for c in 0..other.cols {
            dest.copy_bits_from(
                column_start(c, spacing) + self.rows,
                other.bits(),
                column_start(c, other.column_spacing),
                other.rows,
            );
        }
        result
    }

    /// Returns a copy with the order of the columns reversed.
    pub fn column_reverse(&self) -> Self {
        let mut result = Self::zeros(self.rows, self.cols);
        if self.is_empty() {
            return result;
        }
        let spacing = self.column_spacing;
        let cols = self.cols;
        let src = self.bits();
        let dest = result.bits_mut();

        if spacing % UNIT_BITS == 0 {
            let words = spacing / UNIT_BITS;
            for c in 0..cols {
                let to = (cols - 1 - c) * words;
                dest.units_mut()[to..to + words]
                    .copy_from_slice(&src.units()[c * words..(c + 1) * words]);
            }
        } else {
            let mut writer = dest.writer(0);
            for c in (0..cols).rev() {
                writer.write(src.read_bits(column_start(c, spacing), spacing), spacing);
            }
        }
        result
    }

    /// Returns a copy with the order of the rows reversed.
    pub fn row_reverse(&self) -> Self {
        let mut result = Self::zeros(self.rows, self.cols);
        if self.is_empty() {
            return result;
        }
        let spacing = self.column_spacing;
        let rows = self.rows;
        let src = self.bits();
        let dest = result.bits_mut();

        if spacing % UNIT_BITS == 0 {
            // reversing a whole column leaves the residue at the bottom; shift it back out
            let words = spacing / UNIT_BITS;
            let shift = spacing - rows;
            for c in 0..self.cols {
                let from = &src.units()[c * words..(c + 1) * words];
                let to = &mut dest.units_mut()[c * words..(c + 1) * words];
                for j in 0..words {
                    to[j] = reverse_word(from[words - 1 - j]);
                }
                BitSlice::new_mut(to).shift_down(shift);
            }
        } else {
            let mut reader = src.reader(0);
            let mut writer = dest.writer(0);
            for _ in 0..self.cols {
                writer.write(reverse_field(reader.read(spacing), rows), spacing);
            }
        }
        result
    }

    /// Transposes a 64x64 block held as 64 columns of one unit each.
    fn transpose_block(block: &mut [StorageUnit; UNIT_BITS]) {
        let mut width = UNIT_BITS / 2;
        let mut mask: StorageUnit = low_mask(width);
        while width != 0 {
            for base in (0..UNIT_BITS).step_by(2 * width) {
                for k in base..base + width {
                    let t = ((block[k] >> width) ^ block[k + width]) & mask;
                    block[k + width] ^= t;
                    block[k] ^= t << width;
                }
            }
            width >>= 1;
            mask ^= mask << width;
        }
    }

    /// Returns the transpose of the matrix.
    pub fn transposed(&self) -> Self {
        let mut result = Self::zeros(self.cols, self.rows);
        if self.is_empty() {
            return result;
        }
        let src_spacing = self.column_spacing;
        let dest_spacing = result.column_spacing;
        let src = self.bits();
        let dest = result.bits_mut();

        if src_spacing % UNIT_BITS == 0 && dest_spacing % UNIT_BITS == 0 {
            let src_words = src_spacing / UNIT_BITS;
            let dest_words = dest_spacing / UNIT_BITS;
            let mut buffer = [0; UNIT_BITS];
            for block_col in 0..dest_words {
                for block_row in 0..src_words {
                    for (k, slot) in buffer.iter_mut().enumerate() {
                        let c = block_col * UNIT_BITS + k;
                        *slot = if c < self.cols {
                            src.units()[c * src_words + block_row]
                        } else {
                            0
                        };
                    }
                    Self::transpose_block(&mut buffer);
                    for (k, &unit) in buffer.iter().enumerate() {
                        let c = block_row * UNIT_BITS + k;
                        if c < self.rows {
                            dest.units_mut()[c * dest_words + block_col] = unit;
                        }
                    }
                }
            }
        } else {
            let mut writer = dest.writer(0);
            for j in 0..self.rows {
                for i in 0..self.cols {
                    let bit = src.bit(element_index(j, i, src_spacing));
                    writer.write(bit as StorageUnit, 1);
                }
                writer.skip(dest_spacing - self.cols.min(dest_spacing));
            }
        }
        result
    }

    fn reallocated(&self, rows: usize, cols: usize) -> Self {
        let mut result = Self::zeros(rows, cols);
        let spacing = result.column_spacing;
        let keep_rows = rows.min(self.rows);
        if keep_rows == 0 {
            return result;
        }
        let dest = result.bits_mut();
        for c in 0..cols.min(self.cols) {
            dest.copy_bits_from(
                column_start(c, spacing),
                self.bits(),
                column_start(c, self.column_spacing),
                keep_rows,
            );
        }
        result
    }

    /// Attempts to resize without reallocating.
    ///
    /// Succeeds only when the matrix is not shared, the column spacing for the new row count
    /// is unchanged and the current allocation is large enough. Bits exposed by shrinking
    /// are cleared. Returns false, leaving the matrix untouched, otherwise.
    pub fn resize_in_place_to(&mut self, rows: usize, cols: usize) -> bool {
        let spacing = self.column_spacing;
        if recommended_column_size(rows) != spacing
            || boolean_used_units(rows, cols) > self.storage.capacity()
            || Self::check_dimensions(rows, cols).is_err()
        {
            return false;
        }
        let Some(units) = self.storage.get_mut() else {
            return false;
        };

        let bits = BitSlice::new_mut(units);
        if rows < self.rows {
            for c in 0..cols.min(self.cols) {
                bits.clear_bits(column_start(c, spacing) + rows, self.rows - rows);
            }
        }
        if cols < self.cols && self.rows > 0 {
            bits.clear_bits(column_start(cols, spacing), (self.cols - cols) * spacing);
        }
        self.rows = rows;
        self.cols = cols;
        true
    }

    /// Resizes the matrix, keeping the overlapping elements and clearing everything else.
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

    /// Compares dimensions and then the packed bits, masking the final partial unit.
    pub fn is_equal_to(&self, other: &BooleanMatrix) -> bool {
        if self.rows != other.rows || self.cols != other.cols {
            return false;
        }
        if self.is_empty() {
            return true;
        }
        let total = self.cols * self.column_spacing;
        let full = total / UNIT_BITS;
        let rem = total % UNIT_BITS;
        let (a, b) = (self.data(), other.data());
        a[..full] == b[..full] && (rem == 0 || (a[full] ^ b[full]) & low_mask(rem) == 0)
    }

    fn zip_units(
        &self,
        other: &BooleanMatrix,
        f: impl Fn(StorageUnit, StorageUnit) -> StorageUnit,
    ) -> Result<Self> {
        if self.rows != other.rows || self.cols != other.cols {
            return Err(MatrixError::incompatible(
                (self.rows, self.cols),
                (other.rows, other.cols),
            ));
        }
        let mut result = Self::zeros(self.rows, self.cols);
        let used = boolean_used_units(self.rows, self.cols);
        let units = result.storage.make_mut();
        for (i, unit) in units[..used].iter_mut().enumerate() {
            *unit = f(self.data()[i], other.data()[i]);
        }
        Ok(result)
    }

    /// Element-wise logical AND.
    pub fn and(&self, other: &BooleanMatrix) -> Result<Self> {
        self.zip_units(other, |a, b| a & b)
    }

    /// Element-wise logical OR.
    pub fn or(&self, other: &BooleanMatrix) -> Result<Self> {
        self.zip_units(other, |a, b| a | b)
    }

    /// Element-wise exclusive OR.
    pub fn xor(&self, other: &BooleanMatrix) -> Result<Self> {
        self.zip_units(other, |a, b| a ^ b)
    }
}

impl Index<(usize, usize)> for BooleanMatrix {
    type Output = bool;

    #[inline]
    fn index(&self, index: (usize, usize)) -> &Self::Output {
        if self.at(index.0, index.1) {
            &true
        } else {
            &false
        }
    }
}

impl fmt::Display for BooleanMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in 0..self.rows {
            for j in 0..self.cols {
                write!(f, " {} ", if self[(i, j)] { 1 } else { 0 })?;
            }
            writeln!(f)?;
        }

        Ok(())
    }
}
