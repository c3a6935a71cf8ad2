//! Error types for panelkit.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for panelkit operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while processing comic pages and panels.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The layout file is not valid layout JSON.
    #[error("Invalid layout data: {0}")]
    InvalidLayout(String),

    /// A panel entry is not an `[x, y, width, height]` quadruple.
    #[error("Invalid panel entry: {0}")]
    InvalidPanel(String),

    /// Page area is zero, so coverage cannot be computed.
    #[error("Page area cannot be zero ({0}x{1})")]
    ZeroPageArea(u32, u32),

    /// Error decoding or encoding a raster image.
    #[error("Image error: {0}")]
    Image(String),

    /// Error reading or writing a PDF document.
    #[error("PDF error: {0}")]
    Pdf(String),

    /// Error reading or writing a zip-based container (CBZ, EPUB).
    #[error("Archive error: {0}")]
    Archive(String),

    /// The container format is not recognized.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// An external program exited unsuccessfully.
    #[error("External tool `{program}` failed ({status}): {stderr}")]
    ExternalTool {
        /// Program that was invoked
        program: String,
        /// Exit status description
        status: String,
        /// Captured standard error
        stderr: String,
    },

    /// None of the input images could be read, so no document was written.
    #[error("No readable images for {}", .0.display())]
    NoReadableImages(PathBuf),

    /// A directory was expected.
    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        if err.is_io() {
            Error::Io(err.into())
        } else {
            Error::InvalidLayout(err.to_string())
        }
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::IoError(e) => Error::Io(e),
            _ => Error::Image(err.to_string()),
        }
    }
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        Error::Pdf(err.to_string())
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(e) => Error::Io(e),
            _ => Error::Archive(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::ZeroPageArea(0, 1200);
        assert_eq!(err.to_string(), "Page area cannot be zero (0x1200)");

        let err = Error::NotADirectory(PathBuf::from("pages"));
        assert_eq!(err.to_string(), "Not a directory: pages");

        let err = Error::NoReadableImages(PathBuf::from("book.pdf"));
        assert_eq!(err.to_string(), "No readable images for book.pdf");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<Vec<u32>>("[1, 2").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::InvalidLayout(_)));
    }

    #[test]
    fn test_external_tool_display() {
        let err = Error::ExternalTool {
            program: "7z".to_string(),
            status: "exit status: 2".to_string(),
            stderr: "cannot open file".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "External tool `7z` failed (exit status: 2): cannot open file"
        );
    }
}
