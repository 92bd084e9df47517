//! File persistence in the INEBIN binary format and as delimited text.
//!
//! Readers detect the format from the first bytes of the file, so only writers take a
//! [`FileFormat`].

pub mod binary;
pub mod csv;

use std::{
    fmt,
    fs::File,
    io::{BufWriter, Read, Write},
    path::Path,
    str::FromStr,
};

use log::debug;

use crate::boolean::BooleanMatrix;
use crate::coefficient::Coefficient;
use crate::dense::DenseMatrix;
use crate::error::{read_subcode, MatrixError, Result};

/// On-disk representation selected when saving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FileFormat {
    #[default]
    Binary,
    Csv,
}

impl FromStr for FileFormat {
    type Err = MatrixError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(FileFormat::Csv),
            "binary" | "inebin" => Ok(FileFormat::Binary),
            _ => Err(MatrixError::InvalidParameter(format!("unknown file format {:?}", s))),
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileFormat::Binary => f.write_str("binary"),
            FileFormat::Csv => f.write_str("csv"),
        }
    }
}

/// Guesses the format of a file from its leading bytes.
pub fn detect(bytes: &[u8]) -> FileFormat {
    let prefix = &bytes[..bytes.len().min(binary::HEADER_BYTES / 2)];
    if prefix.starts_with(binary::MAGIC) {
        FileFormat::Binary
    } else {
        FileFormat::Csv
    }
}

pub(crate) fn text(bytes: &[u8]) -> Result<&str> {
    std::str::from_utf8(bytes).map_err(|_| MatrixError::read(read_subcode::GENERIC))
}

pub(crate) fn read_file(path: &Path) -> Result<Vec<u8>> {
    let mut file = File::open(path).map_err(|source| MatrixError::FileOpen {
        path: path.to_path_buf(),
        source,
    })?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(MatrixError::from_read)?;
    debug!("read {} bytes from {:?} ({})", bytes.len(), path, detect(&bytes));
    Ok(bytes)
}

/// Creates `path`, hands a buffered writer to `write`, then flushes and syncs the file.
pub(crate) fn write_file(
    path: &Path,
    write: impl FnOnce(&mut BufWriter<File>) -> Result<()>,
) -> Result<()> {
    let file = File::create(path).map_err(|source| MatrixError::FileOpen {
        path: path.to_path_buf(),
        source,
    })?;
    let mut writer = BufWriter::new(file);
    write(&mut writer)?;
    let file = writer
        .into_inner()
        .map_err(|e| MatrixError::FileWrite { source: e.into_error() })?;
    file.sync_all().map_err(|source| MatrixError::FileClose { source })
}

/// Saving to and loading from files and byte buffers.
pub trait MatrixFile: Sized {
    /// Writes the matrix in `format`.
    fn write_to<W: Write>(&self, writer: W, format: FileFormat) -> Result<()>;

    /// Decodes a matrix of this kind, detecting the format.
    fn read_from_bytes(bytes: &[u8]) -> Result<Self>;

    fn to_file<P: AsRef<Path>>(&self, path: P, format: FileFormat) -> Result<()> {
        let path = path.as_ref();
        debug!("writing {:?} as {}", path, format);
        write_file(path, |writer| self.write_to(writer, format))
    }

    /// Loads a matrix of this kind. A file holding another kind fails with
    /// `FileRead` subcode [`read_subcode::KIND_MISMATCH`].
    fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::read_from_bytes(&read_file(path.as_ref())?)
    }
}

impl MatrixFile for BooleanMatrix {
    fn write_to<W: Write>(&self, mut writer: W, format: FileFormat) -> Result<()> {
        match format {
            FileFormat::Binary => binary::write_boolean(self, &mut writer),
            FileFormat::Csv => self::csv::write_boolean(self, writer),
        }
    }

    fn read_from_bytes(bytes: &[u8]) -> Result<Self> {
        match detect(bytes) {
            FileFormat::Binary => binary::read_boolean(bytes),
            FileFormat::Csv => self::csv::read_boolean(text(bytes)?),
        }
    }
}

impl<T: Coefficient> MatrixFile for DenseMatrix<T> {
    fn write_to<W: Write>(&self, mut writer: W, format: FileFormat) -> Result<()> {
        match format {
            FileFormat::Binary => binary::write_dense(self, &mut writer),
            FileFormat::Csv => self::csv::write_dense(self, writer),
        }
    }

    fn read_from_bytes(bytes: &[u8]) -> Result<Self> {
        match detect(bytes) {
            FileFormat::Binary => binary::read_dense(bytes),
            FileFormat::Csv => self::csv::read_dense(text(bytes)?),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::dense::{IntegerMatrix, RealMatrix};

    #[test]
    fn formats() {
        assert_eq!("CSV".parse::<FileFormat>().unwrap(), FileFormat::Csv);
        assert_eq!("inebin".parse::<FileFormat>().unwrap(), FileFormat::Binary);
        assert!(matches!(
            "xml".parse::<FileFormat>(),
            Err(MatrixError::InvalidParameter(_))
        ));
        assert_eq!(detect(b"INEBIN\0R"), FileFormat::Binary);
        assert_eq!(detect(b"INEB"), FileFormat::Csv);
        assert_eq!(detect(b"1\t2\n"), FileFormat::Csv);
    }

    #[test]
    fn files() {
        let dir = tempfile::tempdir().unwrap();
        let m = IntegerMatrix::from_vec(&[vec![1, 2, 3], vec![4, 5, 6]]);
        for format in [FileFormat::Binary, FileFormat::Csv] {
            let path = dir.path().join(format!("m.{}", format));
            m.to_file(&path, format).unwrap();
            assert_eq!(IntegerMatrix::from_file(&path).unwrap(), m);
        }

        let err = RealMatrix::from_file(dir.path().join("m.binary")).unwrap_err();
        assert_eq!(err.read_subcode(), Some(read_subcode::KIND_MISMATCH));

        let err = IntegerMatrix::from_file(dir.path().join("missing")).unwrap_err();
        assert!(matches!(err, MatrixError::FileOpen { .. }));

        let err = m.to_file(dir.path().join("no/such/dir"), FileFormat::Csv).unwrap_err();
        assert!(matches!(err, MatrixError::FileOpen { .. }));
    }
}
