use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PileError>;

/// Everything that can go wrong while reading, writing or converting a Pile
/// world.
#[derive(Debug, Error)]
pub enum PileError {
    #[error("invalid magic number: got {got:#010X}, want 0x50696C65")]
    InvalidMagic { got: u32 },

    #[error("unsupported format version: {0} (max supported: 1)")]
    UnsupportedVersion(i16),

    #[error("invalid length: {0}")]
    InvalidLength(String),

    #[error("unexpected end of stream")]
    UnexpectedEof,

    #[error("compression: {0}")]
    Compression(String),

    #[error("chunk not found")]
    NotFound,

    #[error("io: {0}")]
    Io(io::Error),

    #[error("column conversion: {0}")]
    Conversion(String),
}

impl From<io::Error> for PileError {
    fn from(err: io::Error) -> Self {
        // read_exact reports a short stream through the error kind; surface it
        // as the dedicated variant so decoders can tell truncation apart from
        // real I/O failures.
        if err.kind() == io::ErrorKind::UnexpectedEof {
            PileError::UnexpectedEof
        } else {
            PileError::Io(err)
        }
    }
}
