//! Container format detection for comic archives.

use crate::error::{Error, Result};
use crate::naming::extension_lower;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Comic container formats that can be unpacked into page images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerFormat {
    /// Zip archive of page images (`.cbz`)
    Cbz,
    /// RAR archive of page images (`.cbr`)
    Cbr,
    /// PDF document with one raster per page
    Pdf,
}

impl ContainerFormat {
    /// Format implied by a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "cbz" | "zip" => Some(ContainerFormat::Cbz),
            "cbr" | "rar" => Some(ContainerFormat::Cbr),
            "pdf" => Some(ContainerFormat::Pdf),
            _ => None,
        }
    }
}

impl std::fmt::Display for ContainerFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ContainerFormat::Cbz => "CBZ",
            ContainerFormat::Cbr => "CBR",
            ContainerFormat::Pdf => "PDF",
        };
        write!(f, "{}", name)
    }
}

/// Zip local file header
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
/// Empty zip archive (end of central directory only)
const ZIP_EMPTY_MAGIC: &[u8] = b"PK\x05\x06";
/// RAR 4 and RAR 5 share this prefix
const RAR_MAGIC: &[u8] = b"Rar!\x1a\x07";
const PDF_MAGIC: &[u8] = b"%PDF-";
const HEADER_LEN: usize = 8;

/// Detect the container format from leading bytes.
///
/// # Returns
/// * `Ok(ContainerFormat)` when a known signature is found
/// * `Err(Error::UnsupportedFormat)` otherwise
pub fn detect_format_from_bytes(data: &[u8]) -> Result<ContainerFormat> {
    if data.starts_with(ZIP_MAGIC) || data.starts_with(ZIP_EMPTY_MAGIC) {
        Ok(ContainerFormat::Cbz)
    } else if data.starts_with(RAR_MAGIC) {
        Ok(ContainerFormat::Cbr)
    } else if data.starts_with(PDF_MAGIC) {
        Ok(ContainerFormat::Pdf)
    } else {
        Err(Error::UnsupportedFormat("unknown file signature".to_string()))
    }
}

/// Detect the container format of a file.
///
/// The file signature wins over the extension, so a RAR archive saved as
/// `.cbz` is still handled as CBR. The extension is only used when the
/// signature is unknown.
///
/// # Example
/// ```no_run
/// use panelkit::detect::detect_format_from_path;
///
/// let format = detect_format_from_path("issue-01.cbz").unwrap();
/// println!("container: {}", format);
/// ```
pub fn detect_format_from_path<P: AsRef<Path>>(path: P) -> Result<ContainerFormat> {
    let path = path.as_ref();
    let mut header = Vec::with_capacity(HEADER_LEN);
    File::open(path)?
        .take(HEADER_LEN as u64)
        .read_to_end(&mut header)?;

    detect_format_from_bytes(&header).or_else(|_| {
        extension_lower(path)
            .and_then(|ext| ContainerFormat::from_extension(&ext))
            .ok_or_else(|| Error::UnsupportedFormat(path.display().to_string()))
    })
}

/// Check if a file is a supported comic container.
pub fn is_container<P: AsRef<Path>>(path: P) -> bool {
    detect_format_from_path(path).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_zip() {
        let format = detect_format_from_bytes(b"PK\x03\x04\x14\x00\x00\x00").unwrap();
        assert_eq!(format, ContainerFormat::Cbz);
    }

    #[test]
    fn test_detect_rar() {
        let format = detect_format_from_bytes(b"Rar!\x1a\x07\x01\x00").unwrap();
        assert_eq!(format, ContainerFormat::Cbr);
    }

    #[test]
    fn test_detect_pdf() {
        let format = detect_format_from_bytes(b"%PDF-1.7\n").unwrap();
        assert_eq!(format, ContainerFormat::Pdf);
    }

    #[test]
    fn test_detect_unknown() {
        let result = detect_format_from_bytes(b"<!DOCTYPE html>");
        assert!(matches!(result, Err(Error::UnsupportedFormat(_))));
        assert!(detect_format_from_bytes(b"").is_err());
    }

    #[test]
    fn test_from_extension() {
        assert_eq!(ContainerFormat::from_extension("CBZ"), Some(ContainerFormat::Cbz));
        assert_eq!(ContainerFormat::from_extension("cbr"), Some(ContainerFormat::Cbr));
        assert_eq!(ContainerFormat::from_extension("epub"), None);
    }

    #[test]
    fn test_signature_beats_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mislabeled.cbz");
        std::fs::write(&path, b"Rar!\x1a\x07\x00rest").unwrap();
        assert_eq!(detect_format_from_path(&path).unwrap(), ContainerFormat::Cbr);
    }

    #[test]
    fn test_extension_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.pdf");
        std::fs::write(&path, b"%P").unwrap();
        assert_eq!(detect_format_from_path(&path).unwrap(), ContainerFormat::Pdf);

        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"hello").unwrap();
        assert!(!is_container(&path));
    }
}
