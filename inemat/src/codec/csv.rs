//! Delimited text.
//!
//! Matrices are written one row per line with tab separated fields. The reader is more
//! lenient and splits on tabs, spaces, commas, semicolons, pipes and colons.

use std::io::Write;

use csv::WriterBuilder;

use crate::boolean::BooleanMatrix;
use crate::coefficient::{parse_boolean, Coefficient};
use crate::dense::DenseMatrix;
use crate::error::{read_subcode, MatrixError, Result};

pub const SEPARATORS: [char; 6] = ['\t', ' ', ',', ';', '|', ':'];

/// Writes `rows` records produced by `record`, each into a reused field buffer.
fn write_records<W: Write>(
    writer: W,
    rows: usize,
    cols: usize,
    mut record: impl FnMut(usize, &mut Vec<String>),
) -> Result<()> {
    let mut writer = WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_writer(writer);
    if cols != 0 {
        let mut fields = Vec::new();
        for r in 0..rows {
            fields.clear();
            record(r, &mut fields);
            writer
                .write_record(&fields)
                .map_err(|e| MatrixError::FileWrite { source: e.into() })?;
        }
    }
    writer
        .flush()
        .map_err(|source| MatrixError::FileWrite { source })
}

pub fn write_boolean<W: Write>(m: &BooleanMatrix, writer: W) -> Result<()> {
    write_records(writer, m.rows(), m.cols(), |r, fields| {
        fields.extend((0..m.cols()).map(|c| (if m.at(r, c) { "1" } else { "0" }).to_string()))
    })
}

pub fn write_dense<T: Coefficient, W: Write>(m: &DenseMatrix<T>, writer: W) -> Result<()> {
    write_records(writer, m.rows(), m.cols(), |r, fields| {
        for c in 0..m.cols() {
            m.at(r, c).push_csv_fields(fields);
        }
    })
}

/// Tokenized text: every non-blank line with the same number of fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table<'a> {
    pub rows: usize,
    pub fields: usize,
    /// Tokens in row-major order.
    pub tokens: Vec<&'a str>,
}

impl<'a> Table<'a> {
    pub fn parse(text: &'a str) -> Result<Self> {
        let mut table = Table {
            rows: 0,
            fields: 0,
            tokens: Vec::new(),
        };
        for line in text.lines().filter(|line| !line.trim().is_empty()) {
            let before = table.tokens.len();
            table
                .tokens
                .extend(line.split(&SEPARATORS[..]).filter(|t| !t.is_empty()));
            let count = table.tokens.len() - before;
            if table.rows == 0 {
                table.fields = count;
            } else if count != table.fields {
                return Err(MatrixError::read(read_subcode::RAGGED));
            }
            table.rows += 1;
        }
        Ok(table)
    }

    #[inline]
    pub fn row(&self, r: usize) -> &[&'a str] {
        &self.tokens[r * self.fields..(r + 1) * self.fields]
    }
}

pub fn read_boolean(text: &str) -> Result<BooleanMatrix> {
    let table = Table::parse(text)?;
    let values = table
        .tokens
        .iter()
        .map(|t| parse_boolean(t).ok_or(MatrixError::read(read_subcode::GENERIC)))
        .collect::<Result<Vec<bool>>>()?;
    BooleanMatrix::from_row_major(table.rows, table.fields, &values)
}

pub fn read_dense<T: Coefficient>(text: &str) -> Result<DenseMatrix<T>> {
    let table = Table::parse(text)?;
    if table.fields % T::CSV_FIELDS != 0 {
        return Err(MatrixError::read(read_subcode::GENERIC));
    }
    let values = table
        .tokens
        .chunks(T::CSV_FIELDS)
        .map(|chunk| T::parse_csv(chunk).ok_or(MatrixError::read(read_subcode::GENERIC)))
        .collect::<Result<Vec<T>>>()?;
    DenseMatrix::from_row_major(table.rows, table.fields / T::CSV_FIELDS, &values)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::coefficient::Complex;
    use crate::dense::{ComplexMatrix, IntegerMatrix, RealMatrix};
    use rand::{rngs::SmallRng, SeedableRng};

    fn to_text(f: impl FnOnce(&mut Vec<u8>) -> Result<()>) -> String {
        let mut out = vec![];
        f(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn formats() {
        let z = IntegerMatrix::from_vec(&[vec![1, -2], vec![30, 4]]);
        assert_eq!(to_text(|w| write_dense(&z, w)), "1\t-2\n30\t4\n");

        let b = BooleanMatrix::from_bool_vec(&[vec![true, false]]);
        assert_eq!(to_text(|w| write_boolean(&b, w)), "1\t0\n");

        let c = ComplexMatrix::from_vec(&[vec![Complex::new(0.5, -1.0)]]);
        assert_eq!(
            to_text(|w| write_dense(&c, w)),
            "5.0000000000000000e-1\t-1.0000000000000000e0\n"
        );
    }

    #[test]
    fn lenient_separators() {
        let m: IntegerMatrix = read_dense("1, 2;3\n\n4|5:6\n7\t8  9\n").unwrap();
        assert_eq!(m, IntegerMatrix::from_row_major(3, 3, &[1, 2, 3, 4, 5, 6, 7, 8, 9]).unwrap());

        let b = read_boolean("true 0\nFALSE 1\n").unwrap();
        assert_eq!(b, BooleanMatrix::from_bool_vec(&[vec![true, false], vec![false, true]]));
    }

    #[test]
    fn round_trips() {
        let mut rng = SmallRng::seed_from_u64(1);
        let r = RealMatrix::random(&mut rng, 6, 4);
        assert_eq!(read_dense::<f64>(&to_text(|w| write_dense(&r, w))).unwrap(), r);

        let c = ComplexMatrix::random(&mut rng, 3, 5);
        assert_eq!(read_dense::<Complex>(&to_text(|w| write_dense(&c, w))).unwrap(), c);

        let b = BooleanMatrix::random(&mut rng, 9, 70);
        assert_eq!(read_boolean(&to_text(|w| write_boolean(&b, w))).unwrap(), b);
    }

    #[test]
    fn failures() {
        let err = read_dense::<i64>("1 2\n3\n").unwrap_err();
        assert_eq!(err.read_subcode(), Some(read_subcode::RAGGED));

        let err = read_dense::<i64>("1 x\n").unwrap_err();
        assert_eq!(err.read_subcode(), Some(read_subcode::GENERIC));

        let err = read_dense::<Complex>("1 2 3\n").unwrap_err();
        assert_eq!(err.read_subcode(), Some(read_subcode::GENERIC));

        let empty = read_dense::<f64>("\n\n").unwrap();
        assert!(empty.is_empty());
    }
}
