//! Packed column-major layout model.
//!
//! Numeric matrices store element `(r, c)` at coefficient index `c * spacing + r`. Boolean
//! matrices store it at bit `c * spacing + r` of a little-endian stream of [`StorageUnit`]s.
//! [`element_index`] and [`column_start`] are the only places that multiply by the column
//! spacing.

/// The atom of boolean packed storage.
pub type StorageUnit = u64;

/// Number of bits in a [`StorageUnit`].
pub const UNIT_BITS: usize = 64;

/// Column starts of numeric matrices are aligned to this many bytes.
pub const CACHE_LINE_BYTES: usize = 64;

/// Widest vector register (in bytes) the kernels may touch past the end of a column.
pub const SIMD_BYTES: usize = 32;

#[inline]
pub const fn round_up(value: usize, multiple: usize) -> usize {
    value.div_ceil(multiple) * multiple
}

/// Mask selecting the low `width` bits of a storage unit. `width` may be 0 through 64.
#[inline]
pub const fn low_mask(width: usize) -> StorageUnit {
    if width >= UNIT_BITS {
        StorageUnit::MAX
    } else {
        (1 << width) - 1
    }
}

/// Number of storage units needed to hold `bits` bits.
#[inline]
pub const fn units_for_bits(bits: usize) -> usize {
    bits.div_ceil(UNIT_BITS)
}

/// Column spacing, in bits, of a boolean matrix with `rows` rows.
///
/// Short columns are rounded up to a power of two so they never straddle a storage unit;
/// long columns are rounded up to a whole number of units.
#[inline]
pub const fn recommended_column_size(rows: usize) -> usize {
    if rows <= 1 {
        1
    } else if rows < UNIT_BITS {
        rows.next_power_of_two()
    } else {
        round_up(rows, UNIT_BITS)
    }
}

/// Storage units covered by the columns of a boolean matrix; 0 when it is empty.
#[inline]
pub const fn boolean_used_units(rows: usize, cols: usize) -> usize {
    if rows == 0 || cols == 0 {
        return 0;
    }
    units_for_bits(recommended_column_size(rows) * cols)
}

/// Storage units allocated for a boolean matrix.
#[inline]
pub const fn boolean_allocation(rows: usize, cols: usize) -> usize {
    boolean_used_units(rows, cols)
}

/// Coefficients per cache line for a coefficient of `size` bytes.
#[inline]
pub const fn line_coefficients(size: usize) -> usize {
    if size >= CACHE_LINE_BYTES {
        1
    } else {
        CACHE_LINE_BYTES / size
    }
}

/// Number of trailing coefficients a vector kernel may read past the end of a column.
#[inline]
pub const fn simd_tail(size: usize) -> usize {
    if size >= SIMD_BYTES {
        1
    } else {
        SIMD_BYTES / size
    }
}

/// Column spacing, in coefficients, of a numeric matrix with `rows` rows and coefficients
/// of `size` bytes.
///
/// Row vectors (and empty matrices) are stored densely, so for them the spacing is `rows`
/// rather than `rows + simd_tail`; their SIMD tail sits once after the last column (see
/// [`numeric_allocation`]). Otherwise every column starts on a cache line and leaves at
/// least a SIMD tail of zeroed residue.
#[inline]
pub const fn numeric_column_spacing(rows: usize, size: usize) -> usize {
    if rows <= 1 {
        rows
    } else {
        round_up(rows + simd_tail(size), line_coefficients(size))
    }
}

/// Coefficients allocated for a numeric matrix.
#[inline]
pub const fn numeric_allocation(rows: usize, cols: usize, size: usize) -> usize {
    if rows == 0 || cols == 0 {
        return 0;
    }
    let spacing = numeric_column_spacing(rows, size);
    let tail = if rows <= 1 { simd_tail(size) } else { 0 };
    round_up(spacing * cols + tail, line_coefficients(size))
}

/// Offset of the first coefficient (or bit) of column `col`.
#[inline(always)]
pub const fn column_start(col: usize, spacing: usize) -> usize {
    col * spacing
}

/// Offset of element `(row, col)`.
#[inline(always)]
pub const fn element_index(row: usize, col: usize, spacing: usize) -> usize {
    column_start(col, spacing) + row
}
