use std::{io, path::PathBuf};

use thiserror::Error;

/// Subcodes carried by [`MatrixError::FileRead`].
pub mod read_subcode {
    /// Generic parse or I/O failure.
    pub const GENERIC: u32 = 0;
    /// The file holds a different coefficient kind than the one requested.
    pub const KIND_MISMATCH: u32 = 1;
    /// The payload ended before the header said it would.
    pub const TRUNCATED: u32 = 2;
    /// Bad magic, reserved byte or kind tag.
    pub const BAD_HEADER: u32 = 3;
    /// CSV rows with differing field counts.
    pub const RAGGED: u32 = 4;
}

/// Every failure the engine can surface to a caller.
#[derive(Debug, Error)]
pub enum MatrixError {
    #[error("invalid dimensions {rows}x{cols}")]
    InvalidDimensions { rows: usize, cols: usize },

    #[error("incompatible dimensions {lhs_rows}x{lhs_cols} and {rhs_rows}x{rhs_cols}")]
    IncompatibleDimensions {
        lhs_rows: usize,
        lhs_cols: usize,
        rhs_rows: usize,
        rhs_cols: usize,
    },

    #[error("matrix is singular")]
    Singular,

    #[error("coefficient at ({row}, {col}) cannot be converted without loss")]
    TypeConversion { row: usize, col: usize },

    #[error("could not open {path:?}")]
    FileOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not read matrix file (subcode {subcode})")]
    FileRead {
        subcode: u32,
        #[source]
        source: Option<io::Error>,
    },

    #[error("could not write matrix file")]
    FileWrite {
        #[source]
        source: io::Error,
    },

    #[error("could not close matrix file")]
    FileClose {
        #[source]
        source: io::Error,
    },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("could not allocate {bytes} bytes")]
    InsufficientMemory { bytes: usize },
}

pub type Result<T> = std::result::Result<T, MatrixError>;

impl MatrixError {
    #[inline]
    pub(crate) fn incompatible(lhs: (usize, usize), rhs: (usize, usize)) -> Self {
        MatrixError::IncompatibleDimensions {
            lhs_rows: lhs.0,
            lhs_cols: lhs.1,
            rhs_rows: rhs.0,
            rhs_cols: rhs.1,
        }
    }

    #[inline]
    pub(crate) fn read(subcode: u32) -> Self {
        MatrixError::FileRead {
            subcode,
            source: None,
        }
    }

    /// Maps a read failure, treating an unexpected end of file as truncation.
    pub(crate) fn from_read(err: io::Error) -> Self {
        let subcode = if err.kind() == io::ErrorKind::UnexpectedEof {
            read_subcode::TRUNCATED
        } else {
            read_subcode::GENERIC
        };
        MatrixError::FileRead {
            subcode,
            source: Some(err),
        }
    }

    /// Returns the read subcode if this is a [`MatrixError::FileRead`].
    pub fn read_subcode(&self) -> Option<u32> {
        match self {
            MatrixError::FileRead { subcode, .. } => Some(*subcode),
            _ => None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn eof_maps_to_truncated() {
        let err = MatrixError::from_read(io::Error::from(io::ErrorKind::UnexpectedEof));
        assert_eq!(err.read_subcode(), Some(read_subcode::TRUNCATED));

        let err = MatrixError::from_read(io::Error::from(io::ErrorKind::PermissionDenied));
        assert_eq!(err.read_subcode(), Some(read_subcode::GENERIC));
    }

    #[test]
    fn display() {
        let err = MatrixError::incompatible((2, 3), (4, 5));
        assert_eq!(err.to_string(), "incompatible dimensions 2x3 and 4x5");
        assert_eq!(
            MatrixError::InvalidDimensions { rows: 2, cols: 3 }.to_string(),
            "invalid dimensions 2x3"
        );
    }
}
