//! The INEBIN format.
//!
//! A 16 byte little-endian header (`"INEBIN"`, a reserved zero byte, the kind tag, then
//! `u32` rows and columns) followed by the elements in row-major order. Booleans are packed
//! eight to a byte, least significant bit first; other kinds use 8 bytes per real component.

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::boolean::BooleanMatrix;
use crate::coefficient::{Coefficient, CoefficientType};
use crate::dense::DenseMatrix;
use crate::error::{read_subcode, MatrixError, Result};

pub const MAGIC: &[u8; 6] = b"INEBIN";

pub const HEADER_BYTES: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinaryHeader {
    pub kind: CoefficientType,
    pub rows: u32,
    pub cols: u32,
}

fn write_error(source: std::io::Error) -> MatrixError {
    MatrixError::FileWrite { source }
}

fn dimension(value: usize) -> Result<u32> {
    u32::try_from(value).map_err(|_| MatrixError::InvalidParameter(format!(
        "dimension {} does not fit the binary header",
        value
    )))
}

impl BinaryHeader {
    pub fn new(kind: CoefficientType, rows: usize, cols: usize) -> Result<Self> {
        Ok(BinaryHeader {
            kind,
            rows: dimension(rows)?,
            cols: dimension(cols)?,
        })
    }

    /// Number of elements announced, or `None` if it does not fit a `usize`.
    #[inline]
    pub fn elements(&self) -> Option<usize> {
        (self.rows as usize).checked_mul(self.cols as usize)
    }

    /// Number of payload bytes that follow the header, or `None` on overflow.
    pub fn payload_bytes(&self) -> Option<usize> {
        let elements = self.elements()?;
        match self.kind {
            CoefficientType::Boolean => Some(elements.div_ceil(8)),
            CoefficientType::Integer | CoefficientType::Real => elements.checked_mul(8),
            CoefficientType::Complex => elements.checked_mul(16),
        }
    }

    fn checked_payload_bytes(&self) -> Result<usize> {
        self.payload_bytes()
            .ok_or(MatrixError::read(read_subcode::BAD_HEADER))
    }

    pub fn write<W: Write + ?Sized>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(MAGIC).map_err(write_error)?;
        writer.write_u8(0).map_err(write_error)?;
        writer.write_u8(self.kind.binary_tag()).map_err(write_error)?;
        writer.write_u32::<LittleEndian>(self.rows).map_err(write_error)?;
        writer.write_u32::<LittleEndian>(self.cols).map_err(write_error)
    }

    pub fn read<R: Read + ?Sized>(reader: &mut R) -> Result<Self> {
        let mut magic = [0; 6];
        reader.read_exact(&mut magic).map_err(MatrixError::from_read)?;
        let reserved = reader.read_u8().map_err(MatrixError::from_read)?;
        if &magic != MAGIC || reserved != 0 {
            return Err(MatrixError::read(read_subcode::BAD_HEADER));
        }
        let tag = reader.read_u8().map_err(MatrixError::from_read)?;
        let kind = CoefficientType::from_binary_tag(tag)
            .ok_or(MatrixError::read(read_subcode::BAD_HEADER))?;
        let rows = reader.read_u32::<LittleEndian>().map_err(MatrixError::from_read)?;
        let cols = reader.read_u32::<LittleEndian>().map_err(MatrixError::from_read)?;
        Ok(BinaryHeader { kind, rows, cols })
    }

    /// Fails with a kind mismatch unless the header announces `kind`.
    pub fn expect(&self, kind: CoefficientType) -> Result<()> {
        if self.kind != kind {
            return Err(MatrixError::read(read_subcode::KIND_MISMATCH));
        }
        Ok(())
    }
}

/// Reads a header and checks that `remaining` bytes can hold its payload.
pub(crate) fn read_header(bytes: &mut &[u8]) -> Result<BinaryHeader> {
    let header = BinaryHeader::read(bytes)?;
    if bytes.len() < header.checked_payload_bytes()? {
        return Err(MatrixError::read(read_subcode::TRUNCATED));
    }
    Ok(header)
}

pub fn write_boolean<W: Write + ?Sized>(m: &BooleanMatrix, writer: &mut W) -> Result<()> {
    BinaryHeader::new(CoefficientType::Boolean, m.rows(), m.cols())?.write(writer)?;
    let mut payload = vec![0u8; (m.rows() * m.cols()).div_ceil(8)];
    for r in 0..m.rows() {
        for c in 0..m.cols() {
            if m.at(r, c) {
                let k = r * m.cols() + c;
                payload[k / 8] |= 1 << (k % 8);
            }
        }
    }
    writer.write_all(&payload).map_err(write_error)
}

pub fn write_dense<T: Coefficient, W: Write + ?Sized>(m: &DenseMatrix<T>, writer: &mut W) -> Result<()> {
    BinaryHeader::new(T::TYPE, m.rows(), m.cols())?.write(writer)?;
    for r in 0..m.rows() {
        for c in 0..m.cols() {
            m.at(r, c).write_le(writer).map_err(write_error)?;
        }
    }
    Ok(())
}

/// Decodes a boolean payload described by `header` from the front of `bytes`.
pub(crate) fn read_boolean_payload(header: &BinaryHeader, bytes: &[u8]) -> Result<BooleanMatrix> {
    header.expect(CoefficientType::Boolean)?;
    let (rows, cols) = (header.rows as usize, header.cols as usize);
    let payload = bytes
        .get(..header.checked_payload_bytes()?)
        .ok_or(MatrixError::read(read_subcode::TRUNCATED))?;
    if rows == 0 || cols == 0 {
        return Ok(BooleanMatrix::zeros(rows, cols));
    }
    Ok(BooleanMatrix::build(rows, cols, |r, c| {
        let k = r * cols + c;
        (payload[k / 8] >> (k % 8)) & 1 == 1
    }))
}

/// Decodes a numeric payload described by `header` from the front of `bytes`.
pub(crate) fn read_dense_payload<T: Coefficient>(
    header: &BinaryHeader,
    mut bytes: &[u8],
) -> Result<DenseMatrix<T>> {
    header.expect(T::TYPE)?;
    let (rows, cols) = (header.rows as usize, header.cols as usize);
    if bytes.len() < header.checked_payload_bytes()? {
        return Err(MatrixError::read(read_subcode::TRUNCATED));
    }
    let values = (0..rows * cols)
        .map(|_| T::read_le(&mut bytes))
        .collect::<std::io::Result<Vec<T>>>()
        .map_err(MatrixError::from_read)?;
    DenseMatrix::from_row_major(rows, cols, &values)
}

pub fn read_boolean(mut bytes: &[u8]) -> Result<BooleanMatrix> {
    let header = read_header(&mut bytes)?;
    read_boolean_payload(&header, bytes)
}

pub fn read_dense<T: Coefficient>(mut bytes: &[u8]) -> Result<DenseMatrix<T>> {
    let header = read_header(&mut bytes)?;
    read_dense_payload(&header, bytes)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::coefficient::Complex;
    use crate::dense::{ComplexMatrix, IntegerMatrix, RealMatrix};
    use rand::{rngs::SmallRng, SeedableRng};

    #[test]
    fn complex_layout() {
        let m = ComplexMatrix::from_vec(&[vec![Complex::new(1.0, 2.0)]]);
        let mut bytes = vec![];
        write_dense(&m, &mut bytes).unwrap();
        assert_eq!(bytes.len(), 32);
        assert_eq!(&bytes[..16], b"INEBIN\0C\x01\x00\x00\x00\x01\x00\x00\x00");
        assert_eq!(&bytes[16..24], &1.0f64.to_le_bytes());
        assert_eq!(&bytes[24..], &2.0f64.to_le_bytes());
        assert_eq!(read_dense::<Complex>(&bytes).unwrap(), m);
    }

    #[test]
    fn row_major_payload() {
        let m = IntegerMatrix::from_vec(&[vec![1, 2], vec![3, 4]]);
        let mut bytes = vec![];
        write_dense(&m, &mut bytes).unwrap();
        let second = i64::from_le_bytes(bytes[24..32].try_into().unwrap());
        assert_eq!(second, 2);

        let b = BooleanMatrix::from_bool_vec(&[vec![true, false, false], vec![true, true, false]]);
        let mut bytes = vec![];
        write_boolean(&b, &mut bytes).unwrap();
        assert_eq!(bytes.len(), 17);
        assert_eq!(bytes[7], b'B');
        assert_eq!(bytes[16], 0b011001);
    }

    #[test]
    fn round_trips() {
        let mut rng = SmallRng::seed_from_u64(1);
        for (rows, cols) in [(0, 0), (1, 9), (7, 3), (70, 5)] {
            let b = BooleanMatrix::random(&mut rng, rows, cols);
            let mut bytes = vec![];
            write_boolean(&b, &mut bytes).unwrap();
            assert_eq!(read_boolean(&bytes).unwrap(), b);

            let r = RealMatrix::random(&mut rng, rows, cols);
            let mut bytes = vec![];
            write_dense(&r, &mut bytes).unwrap();
            assert_eq!(read_dense::<f64>(&bytes).unwrap(), r);
        }
    }

    #[test]
    fn failures() {
        let m = RealMatrix::ones(2, 2);
        let mut bytes = vec![];
        write_dense(&m, &mut bytes).unwrap();

        let err = read_dense::<i64>(&bytes).unwrap_err();
        assert_eq!(err.read_subcode(), Some(read_subcode::KIND_MISMATCH));

        let err = read_dense::<f64>(&bytes[..bytes.len() - 1]).unwrap_err();
        assert_eq!(err.read_subcode(), Some(read_subcode::TRUNCATED));

        let mut bad = bytes.clone();
        bad[6] = 1;
        assert_eq!(read_dense::<f64>(&bad).unwrap_err().read_subcode(), Some(read_subcode::BAD_HEADER));
        bad[6] = 0;
        bad[7] = b'Q';
        assert_eq!(read_dense::<f64>(&bad).unwrap_err().read_subcode(), Some(read_subcode::BAD_HEADER));

        let err = read_boolean(&bytes[..10]).unwrap_err();
        assert_eq!(err.read_subcode(), Some(read_subcode::TRUNCATED));

        // element or byte counts that overflow are rejected, not computed
        let huge = header_bytes(b'R', 1 << 31, 1 << 31);
        let err = read_dense::<f64>(&huge).unwrap_err();
        assert_eq!(err.read_subcode(), Some(read_subcode::BAD_HEADER));
        let huge = header_bytes(b'C', u32::MAX, u32::MAX);
        let err = read_dense::<Complex>(&huge).unwrap_err();
        assert_eq!(err.read_subcode(), Some(read_subcode::BAD_HEADER));
        let huge = header_bytes(b'B', u32::MAX, u32::MAX);
        let err = read_boolean(&huge).unwrap_err();
        assert_eq!(err.read_subcode(), Some(read_subcode::TRUNCATED));
    }

    fn header_bytes(tag: u8, rows: u32, cols: u32) -> Vec<u8> {
        let mut bytes = b"INEBIN\0".to_vec();
        bytes.push(tag);
        bytes.extend_from_slice(&rows.to_le_bytes());
        bytes.extend_from_slice(&cols.to_le_bytes());
        bytes
    }

    #[test]
    fn empty_headers_allocate_nothing() {
        let b = read_boolean(&header_bytes(b'B', 0, u32::MAX)).unwrap();
        assert_eq!((b.rows(), b.cols()), (0, u32::MAX as usize));
        assert!(b.data().is_empty());
        assert!(b.residue_is_clear());

        let r = read_dense::<f64>(&header_bytes(b'R', u32::MAX, 0)).unwrap();
        assert_eq!((r.rows(), r.cols()), (u32::MAX as usize, 0));
        assert!(r.data().is_empty());
    }
}
