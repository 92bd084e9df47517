//! The coefficient kinds and their scalar behaviour.

use std::{
    fmt,
    io::{self, Read, Write},
    ops::Neg,
};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use num_complex::Complex64;
use num_traits::{Num, NumAssign};
use rand::Rng;

use crate::storage::Unit;

pub type Boolean = bool;
pub type Integer = i64;
pub type Real = f64;
pub type Complex = Complex64;

/// The four coefficient kinds, ordered as they compare in [`crate::order`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CoefficientType {
    Boolean,
    Integer,
    Real,
    Complex,
}

impl CoefficientType {
    /// The kind tag used by the INEBIN file format.
    #[inline]
    pub const fn binary_tag(self) -> u8 {
        match self {
            CoefficientType::Boolean => b'B',
            CoefficientType::Integer => b'Z',
            CoefficientType::Real => b'R',
            CoefficientType::Complex => b'C',
        }
    }

    #[inline]
    pub const fn from_binary_tag(tag: u8) -> Option<Self> {
        match tag {
            b'B' => Some(CoefficientType::Boolean),
            b'Z' => Some(CoefficientType::Integer),
            b'R' => Some(CoefficientType::Real),
            b'C' => Some(CoefficientType::Complex),
            _ => None,
        }
    }
}

impl fmt::Display for CoefficientType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CoefficientType::Boolean => "boolean",
            CoefficientType::Integer => "integer",
            CoefficientType::Real => "real",
            CoefficientType::Complex => "complex",
        };
        f.write_str(name)
    }
}

/// A numeric coefficient stored one per slot in a column-major word layout.
///
/// Implemented for [`Integer`], [`Real`] and [`Complex`]. Booleans are bit-packed and live
/// in [`crate::boolean::BooleanMatrix`] instead.
pub trait Coefficient:
    Unit + Num + NumAssign + Neg<Output = Self> + PartialEq + fmt::Debug + fmt::Display
{
    const TYPE: CoefficientType;

    /// Number of CSV fields one coefficient occupies.
    const CSV_FIELDS: usize;

    /// Complex conjugate; the identity for integer and real coefficients.
    fn conjugated(self) -> Self;

    /// Absolute value (modulus for complex coefficients).
    fn magnitude(self) -> f64;

    #[inline]
    fn from_bool(value: bool) -> Self {
        if value {
            Self::one()
        } else {
            Self::zero()
        }
    }

    fn write_le<W: Write + ?Sized>(self, writer: &mut W) -> io::Result<()>;

    fn read_le<R: Read + ?Sized>(reader: &mut R) -> io::Result<Self>;

    /// Appends the CSV representation of the coefficient to `out`.
    fn push_csv_fields(self, out: &mut Vec<String>);

    /// Parses exactly [`Self::CSV_FIELDS`] fields.
    fn parse_csv(fields: &[&str]) -> Option<Self>;

    /// A random coefficient, as used by the `random` constructors.
    fn sample<R: Rng>(rng: &mut R) -> Self;
}

#[inline]
fn format_real(value: f64) -> String {
    format!("{:.16e}", value)
}

impl Coefficient for Integer {
    const TYPE: CoefficientType = CoefficientType::Integer;
    const CSV_FIELDS: usize = 1;

    #[inline]
    fn conjugated(self) -> Self {
        self
    }

    #[inline]
    fn magnitude(self) -> f64 {
        self.unsigned_abs() as f64
    }

    fn write_le<W: Write + ?Sized>(self, writer: &mut W) -> io::Result<()> {
        writer.write_i64::<LittleEndian>(self)
    }

    fn read_le<R: Read + ?Sized>(reader: &mut R) -> io::Result<Self> {
        reader.read_i64::<LittleEndian>()
    }

    fn push_csv_fields(self, out: &mut Vec<String>) {
        out.push(self.to_string());
    }

    fn parse_csv(fields: &[&str]) -> Option<Self> {
        match fields {
            [field] => field.parse().ok(),
            _ => None,
        }
    }

    fn sample<R: Rng>(rng: &mut R) -> Self {
        rng.random_range(-100..=100)
    }
}

impl Coefficient for Real {
    const TYPE: CoefficientType = CoefficientType::Real;
    const CSV_FIELDS: usize = 1;

    #[inline]
    fn conjugated(self) -> Self {
        self
    }

    #[inline]
    fn magnitude(self) -> f64 {
        self.abs()
    }

    fn write_le<W: Write + ?Sized>(self, writer: &mut W) -> io::Result<()> {
        writer.write_f64::<LittleEndian>(self)
    }

    fn read_le<R: Read + ?Sized>(reader: &mut R) -> io::Result<Self> {
        reader.read_f64::<LittleEndian>()
    }

    fn push_csv_fields(self, out: &mut Vec<String>) {
        out.push(format_real(self));
    }

    fn parse_csv(fields: &[&str]) -> Option<Self> {
        match fields {
            [field] => field.parse().ok(),
            _ => None,
        }
    }

    fn sample<R: Rng>(rng: &mut R) -> Self {
        rng.random()
    }
}

impl Coefficient for Complex {
    const TYPE: CoefficientType = CoefficientType::Complex;
    const CSV_FIELDS: usize = 2;

    #[inline]
    fn conjugated(self) -> Self {
        self.conj()
    }

    #[inline]
    fn magnitude(self) -> f64 {
        self.norm()
    }

    fn write_le<W: Write + ?Sized>(self, writer: &mut W) -> io::Result<()> {
        writer.write_f64::<LittleEndian>(self.re)?;
        writer.write_f64::<LittleEndian>(self.im)
    }

    fn read_le<R: Read + ?Sized>(reader: &mut R) -> io::Result<Self> {
        let re = reader.read_f64::<LittleEndian>()?;
        let im = reader.read_f64::<LittleEndian>()?;
        Ok(Complex64::new(re, im))
    }

    fn push_csv_fields(self, out: &mut Vec<String>) {
        out.push(format_real(self.re));
        out.push(format_real(self.im));
    }

    fn parse_csv(fields: &[&str]) -> Option<Self> {
        match fields {
            [re, im] => Some(Complex64::new(re.parse().ok()?, im.parse().ok()?)),
            _ => None,
        }
    }

    fn sample<R: Rng>(rng: &mut R) -> Self {
        Complex64::new(rng.random(), rng.random())
    }
}

/// Parses a boolean CSV token.
pub(crate) fn parse_boolean(token: &str) -> Option<bool> {
    match token {
        "0" => Some(false),
        "1" => Some(true),
        t if t.eq_ignore_ascii_case("false") => Some(false),
        t if t.eq_ignore_ascii_case("true") => Some(true),
        _ => None,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn tags() {
        for t in [
            CoefficientType::Boolean,
            CoefficientType::Integer,
            CoefficientType::Real,
            CoefficientType::Complex,
        ] {
            assert_eq!(CoefficientType::from_binary_tag(t.binary_tag()), Some(t));
        }
        assert_eq!(CoefficientType::from_binary_tag(b'X'), None);
        assert!(CoefficientType::Boolean < CoefficientType::Complex);
    }

    #[test]
    fn csv_fields() {
        let mut out = vec![];
        0.1f64.push_csv_fields(&mut out);
        assert_eq!(f64::parse_csv(&[&out[0]]), Some(0.1));

        let mut out = vec![];
        Complex64::new(1.0, -2.5).push_csv_fields(&mut out);
        let fields: Vec<&str> = out.iter().map(|s| s.as_str()).collect();
        assert_eq!(Complex::parse_csv(&fields), Some(Complex64::new(1.0, -2.5)));

        assert_eq!(Integer::parse_csv(&["-42"]), Some(-42));
        assert_eq!(Integer::parse_csv(&["4.2"]), None);
        assert_eq!(parse_boolean("TRUE"), Some(true));
        assert_eq!(parse_boolean("2"), None);
    }

    #[test]
    fn little_endian() {
        let mut bytes = vec![];
        Complex64::new(1.0, 2.0).write_le(&mut bytes).unwrap();
        assert_eq!(&bytes[..8], &1.0f64.to_le_bytes());
        assert_eq!(&bytes[8..], &2.0f64.to_le_bytes());
        let back = Complex::read_le(&mut bytes.as_slice()).unwrap();
        assert_eq!(back, Complex64::new(1.0, 2.0));
    }
}
