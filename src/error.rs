//! Error types for pdfdoc.

use std::io;
use thiserror::Error;

/// Result type alias for pdfdoc operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while opening or querying a document.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading the input file.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The file content is not recognized as PDF.
    #[error("Unknown file format: not a valid PDF")]
    UnknownFormat,

    /// The engine was asked to open a format other than PDF.
    #[error("Unsupported document format: {0}")]
    UnsupportedFormat(String),

    /// Error parsing PDF structure.
    #[error("PDF parsing error: {0}")]
    PdfParse(String),

    /// A required PDF object is missing.
    #[error("Missing required object: {0}")]
    MissingObject(String),

    /// `unlock` was called on a document that is not locked.
    #[error("Document is not locked")]
    NotLocked,

    /// The document uses a security handler or cipher that cannot be decrypted.
    #[error("Unsupported encryption: {0}")]
    UnsupportedEncryption(String),

    /// The provided password is incorrect.
    #[error("Invalid password")]
    InvalidPassword,

    /// The operation needs an open document.
    #[error("No document is open")]
    NotOpen,
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(e) => Error::Io(e),
            _ => Error::PdfParse(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidPassword;
        assert_eq!(err.to_string(), "Invalid password");

        let err = Error::MissingObject("Root".to_string());
        assert_eq!(err.to_string(), "Missing required object: Root");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
