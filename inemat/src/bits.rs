//! Bit utilities for the boolean engine.
//!
//! Bits are numbered LSB-first within each [`StorageUnit`], and units are numbered in
//! memory order, so bit `i` of a stream lives in unit `i / 64` at position `i % 64`.

use ref_cast::RefCast;
use std::fmt;

use crate::layout::{low_mask, StorageUnit, UNIT_BITS};

/// Bit-reversal of every byte value.
pub const BYTE_REVERSE: [u8; 256] = build_byte_reverse();

const fn build_byte_reverse() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        let mut byte = i as u8;
        let mut reversed = 0u8;
        let mut k = 0;
        while k < 8 {
            reversed = (reversed << 1) | (byte & 1);
            byte >>= 1;
            k += 1;
        }
        table[i] = reversed;
        i += 1;
    }
    table
}

/// Reverses the order of all 64 bits of `word`.
#[inline]
pub fn reverse_word(word: StorageUnit) -> StorageUnit {
    let bytes = word.to_le_bytes();
    let mut reversed = [0u8; 8];
    for (i, &b) in bytes.iter().enumerate() {
        reversed[7 - i] = BYTE_REVERSE[b as usize];
    }
    StorageUnit::from_le_bytes(reversed)
}

/// Reverses the low `width` bits of `value`, for `width` in `1..=64`. Higher bits of the
/// input are ignored and the result has no bits set above `width`.
#[inline]
pub fn reverse_field(value: StorageUnit, width: usize) -> StorageUnit {
    debug_assert!((1..=UNIT_BITS).contains(&width));
    reverse_word(value) >> (UNIT_BITS - width)
}

/// A view of a run of storage units as a stream of bits.
#[derive(RefCast, PartialEq, Eq, Debug)]
#[repr(transparent)]
pub struct BitSlice([StorageUnit]);

impl BitSlice {
    #[inline]
    pub fn new(units: &[StorageUnit]) -> &Self {
        BitSlice::ref_cast(units)
    }

    #[inline]
    pub fn new_mut(units: &mut [StorageUnit]) -> &mut Self {
        BitSlice::ref_cast_mut(units)
    }

    #[inline]
    pub fn units(&self) -> &[StorageUnit] {
        &self.0
    }

    #[inline]
    pub fn units_mut(&mut self) -> &mut [StorageUnit] {
        &mut self.0
    }

    #[inline]
    pub fn num_bits(&self) -> usize {
        self.0.len() * UNIT_BITS
    }

    /// Returns the bit at `index`.
    ///
    /// # Panics
    ///
    /// Panics if the index is out of range.
    #[inline]
    pub fn bit(&self, index: usize) -> bool {
        (self.0[index / UNIT_BITS] >> (index % UNIT_BITS)) & 1 == 1
    }

    /// Sets or clears the bit at `index`, leaving every other bit untouched.
    ///
    /// # Panics
    ///
    /// Panics if the index is out of range.
    #[inline]
    pub fn set_bit(&mut self, index: usize, value: bool) {
        let unit = &mut self.0[index / UNIT_BITS];
        let mask = 1 << (index % UNIT_BITS);
        if value {
            *unit |= mask;
        } else {
            *unit &= !mask;
        }
    }

    /// Reads `width` bits (at most 64) starting at bit `offset`, which may straddle two units.
    #[inline]
    pub fn read_bits(&self, offset: usize, width: usize) -> StorageUnit {
        debug_assert!(width <= UNIT_BITS);
        if width == 0 {
            return 0;
        }
        let index = offset / UNIT_BITS;
        let shift = offset % UNIT_BITS;
        let mut value = self.0[index] >> shift;
        if shift + width > UNIT_BITS {
            value |= self.0[index + 1] << (UNIT_BITS - shift);
        }
        value & low_mask(width)
    }

    /// ORs the low `width` bits of `value` into the stream at bit `offset`, spilling into the
    /// next unit when the field crosses a unit boundary.
    #[inline]
    pub fn or_bits(&mut self, offset: usize, width: usize, value: StorageUnit) {
        debug_assert!(width <= UNIT_BITS);
        if width == 0 {
            return;
        }
        let value = value & low_mask(width);
        let index = offset / UNIT_BITS;
        let shift = offset % UNIT_BITS;
        self.0[index] |= value << shift;
        if shift + width > UNIT_BITS {
            self.0[index + 1] |= value >> (UNIT_BITS - shift);
        }
    }

    /// ORs `len` bits of `source` starting at `source_offset` into `self` at `offset`.
    ///
    /// The destination range is expected to be clear; the copy works a unit at a time,
    /// shifting each source unit by the destination offset.
    pub fn copy_bits_from(
        &mut self,
        offset: usize,
        source: &BitSlice,
        source_offset: usize,
        len: usize,
    ) {
        let mut done = 0;
        while done < len {
            let width = (len - done).min(UNIT_BITS);
            let value = source.read_bits(source_offset + done, width);
            self.or_bits(offset + done, width, value);
            done += width;
        }
    }

    fn update_range(&mut self, offset: usize, len: usize, mut f: impl FnMut(&mut StorageUnit, StorageUnit)) {
        let mut offset = offset;
        let mut remaining = len;
        while remaining > 0 {
            let shift = offset % UNIT_BITS;
            let width = remaining.min(UNIT_BITS - shift);
            f(&mut self.0[offset / UNIT_BITS], low_mask(width) << shift);
            offset += width;
            remaining -= width;
        }
    }

    /// Clears `len` bits starting at `offset`.
    pub fn clear_bits(&mut self, offset: usize, len: usize) {
        self.update_range(offset, len, |unit, mask| *unit &= !mask);
    }

    /// Sets `len` bits starting at `offset`.
    pub fn set_bits(&mut self, offset: usize, len: usize) {
        self.update_range(offset, len, |unit, mask| *unit |= mask);
    }

    /// Counts the bits set to 1 in the entire slice.
    #[inline]
    pub fn count_ones(&self) -> u32 {
        self.0.iter().fold(0, |c, unit| c + unit.count_ones())
    }

    /// Shifts the whole stream `amount` bits towards bit 0, filling the top with zeros.
    pub fn shift_down(&mut self, amount: usize) {
        let units = self.0.len();
        let skip = amount / UNIT_BITS;
        let shift = amount % UNIT_BITS;
        for i in 0..units {
            let lo = self.0.get(i + skip).copied().unwrap_or(0);
            let hi = self.0.get(i + skip + 1).copied().unwrap_or(0);
            self.0[i] = if shift == 0 {
                lo
            } else {
                (lo >> shift) | (hi << (UNIT_BITS - shift))
            };
        }
    }

    #[inline]
    pub fn reader(&self, offset: usize) -> FieldReader<'_> {
        FieldReader::new(&self.0, offset)
    }

    #[inline]
    pub fn writer(&mut self, offset: usize) -> FieldWriter<'_> {
        FieldWriter::new(&mut self.0, offset)
    }

    /// Returns an iterator over `len` bits starting at `offset`.
    #[inline]
    pub fn iter(&self, offset: usize, len: usize) -> impl Iterator<Item = bool> + '_ {
        (offset..offset + len).map(move |i| self.bit(i))
    }
}

impl fmt::Display for BitSlice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in 0..self.num_bits() {
            write!(f, "{}", if self.bit(i) { 1 } else { 0 })?;
        }
        Ok(())
    }
}

/// Sequential reader of variable-width bit fields.
///
/// Holds the current unit in `word`; when the cursor crosses a unit boundary the next unit
/// is loaded. Reads past the end of the slice yield zeros.
pub struct FieldReader<'a> {
    units: &'a [StorageUnit],
    index: usize,
    word: StorageUnit,
    cursor: usize,
}

impl<'a> FieldReader<'a> {
    pub fn new(units: &'a [StorageUnit], offset: usize) -> Self {
        let index = offset / UNIT_BITS;
        FieldReader {
            units,
            index,
            word: units.get(index).copied().unwrap_or(0),
            cursor: offset % UNIT_BITS,
        }
    }

    #[inline]
    fn advance(&mut self) {
        self.index += 1;
        self.word = self.units.get(self.index).copied().unwrap_or(0);
        self.cursor = 0;
    }

    /// Extracts the next `width` bits (`0..=64`).
    #[inline]
    pub fn read(&mut self, width: usize) -> StorageUnit {
        debug_assert!(width <= UNIT_BITS);
        if width == 0 {
            return 0;
        }
        let available = UNIT_BITS - self.cursor;
        if width < available {
            let value = (self.word >> self.cursor) & low_mask(width);
            self.cursor += width;
            value
        } else if width == available {
            let value = self.word >> self.cursor;
            self.advance();
            value
        } else {
            let low = self.word >> self.cursor;
            self.advance();
            let rest = width - available;
            let high = self.word & low_mask(rest);
            self.cursor = rest;
            low | (high << available)
        }
    }

    /// Skips `len` bits.
    pub fn skip(&mut self, len: usize) {
        let total = self.cursor + len;
        if total < UNIT_BITS {
            self.cursor = total;
        } else {
            self.index += total / UNIT_BITS - 1;
            self.advance();
            self.cursor = total % UNIT_BITS;
        }
    }
}

/// Sequential writer of variable-width bit fields.
///
/// Fields accumulate in `word`; when the cursor crosses a unit boundary the word is ORed
/// into the destination and a fresh word is started. The final partial word is flushed
/// on drop.
pub struct FieldWriter<'a> {
    units: &'a mut [StorageUnit],
    index: usize,
    word: StorageUnit,
    cursor: usize,
}

impl<'a> FieldWriter<'a> {
    pub fn new(units: &'a mut [StorageUnit], offset: usize) -> Self {
        FieldWriter {
            units,
            index: offset / UNIT_BITS,
            word: 0,
            cursor: offset % UNIT_BITS,
        }
    }

    #[inline]
    fn flush(&mut self) {
        if self.word != 0 {
            self.units[self.index] |= self.word;
        }
        self.index += 1;
        self.word = 0;
    }

    /// Appends the low `width` bits (`0..=64`) of `value`.
    #[inline]
    pub fn write(&mut self, value: StorageUnit, width: usize) {
        debug_assert!(width <= UNIT_BITS);
        if width == 0 {
            return;
        }
        let value = value & low_mask(width);
        self.word |= value << self.cursor;
        let available = UNIT_BITS - self.cursor;
        if width < available {
            self.cursor += width;
        } else {
            self.flush();
            self.word = if width > available {
                value >> available
            } else {
                0
            };
            self.cursor = width - available;
        }
    }

    /// Advances the cursor by `len` bits without writing anything.
    pub fn skip(&mut self, len: usize) {
        let total = self.cursor + len;
        if total < UNIT_BITS {
            self.cursor = total;
        } else {
            self.flush();
            self.index += total / UNIT_BITS - 1;
            self.cursor = total % UNIT_BITS;
        }
    }
}

impl Drop for FieldWriter<'_> {
    fn drop(&mut self) {
        if self.word != 0 {
            self.units[self.index] |= self.word;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::{rngs::SmallRng, Rng, SeedableRng};

    #[test]
    fn byte_table() {
        for b in 0..=255u8 {
            assert_eq!(BYTE_REVERSE[b as usize], b.reverse_bits());
        }
    }

    #[test]
    fn reverse() {
        let mut rng = SmallRng::seed_from_u64(1);
        for _ in 0..1000 {
            let w: u64 = rng.random();
            assert_eq!(reverse_word(w), w.reverse_bits());
            let n = rng.random_range(1..=64);
            let v = w & low_mask(n);
            let r = reverse_field(v, n);
            for i in 0..n {
                assert_eq!((v >> i) & 1, (r >> (n - 1 - i)) & 1);
            }
            assert_eq!(r & !low_mask(n), 0);
        }
    }

    #[test]
    fn bit_get_set() {
        let mut units = vec![0u64; 4];
        let bits = vec![0, 3, 63, 64, 100, 201, 255];
        let slice = BitSlice::new_mut(&mut units);
        for &b in &bits {
            slice.set_bit(b, true);
        }
        for i in 0..slice.num_bits() {
            assert_eq!(slice.bit(i), bits.contains(&i));
        }
        slice.set_bit(64, false);
        assert!(!slice.bit(64));
        assert_eq!(slice.count_ones(), bits.len() as u32 - 1);
    }

    #[test]
    fn read_write_fields() {
        let mut rng = SmallRng::seed_from_u64(2);
        let widths: Vec<usize> = (0..200).map(|_| rng.random_range(0..=64)).collect();
        let values: Vec<u64> = widths.iter().map(|&w| rng.random::<u64>() & low_mask(w)).collect();
        let total: usize = widths.iter().sum();

        let start = 13;
        let mut units = vec![0u64; (start + total).div_ceil(64) + 1];
        {
            let mut writer = FieldWriter::new(&mut units, start);
            for (&v, &w) in values.iter().zip(&widths) {
                writer.write(v, w);
            }
        }

        let slice = BitSlice::new(&units);
        let mut reader = slice.reader(start);
        let mut offset = start;
        for (&v, &w) in values.iter().zip(&widths) {
            assert_eq!(slice.read_bits(offset, w), v);
            assert_eq!(reader.read(w), v);
            offset += w;
        }
        // nothing written before the start offset or after the end
        assert_eq!(units[0] & low_mask(start), 0);
        assert_eq!(slice.read_bits(offset, 64.min(slice.num_bits() - offset)), 0);
    }

    #[test]
    fn skip_fields() {
        let mut units = vec![0u64; 4];
        {
            let mut writer = FieldWriter::new(&mut units, 0);
            writer.write(0b101, 3);
            writer.skip(130);
            writer.write(1, 1);
        }
        let slice = BitSlice::new(&units);
        assert!(slice.bit(0) && !slice.bit(1) && slice.bit(2));
        assert!(slice.bit(133));
        assert_eq!(slice.count_ones(), 3);

        let mut reader = slice.reader(0);
        assert_eq!(reader.read(3), 0b101);
        reader.skip(130);
        assert_eq!(reader.read(1), 1);
    }

    #[test]
    fn copy_bits() {
        let mut rng = SmallRng::seed_from_u64(3);
        let source: Vec<u64> = (0..6).map(|_| rng.random()).collect();
        let source = BitSlice::new(&source);
        for _ in 0..200 {
            let len = rng.random_range(0..200);
            let from = rng.random_range(0..(384 - len));
            let to = rng.random_range(0..(384 - len));
            let mut dest = vec![0u64; 6];
            let dest_slice = BitSlice::new_mut(&mut dest);
            dest_slice.copy_bits_from(to, source, from, len);
            for i in 0..384 {
                let expected = i >= to && i < to + len && source.bit(from + i - to);
                assert_eq!(dest_slice.bit(i), expected);
            }
        }
    }

    #[test]
    fn set_clear_ranges() {
        let mut units = vec![0u64; 3];
        let slice = BitSlice::new_mut(&mut units);
        slice.set_bits(5, 150);
        assert_eq!(slice.count_ones(), 150);
        slice.clear_bits(60, 10);
        for i in 0..192 {
            assert_eq!(slice.bit(i), (5..155).contains(&i) && !(60..70).contains(&i));
        }
    }

    #[test]
    fn shift_down() {
        let mut units = vec![0u64; 3];
        let slice = BitSlice::new_mut(&mut units);
        slice.set_bit(130, true);
        slice.set_bit(70, true);
        slice.shift_down(67);
        assert_eq!(slice.count_ones(), 2);
        assert!(slice.bit(63) && slice.bit(3));
        slice.shift_down(64);
        assert_eq!(slice.count_ones(), 0);
    }
}
