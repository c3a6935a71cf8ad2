//! Unpacking comic containers (CBZ, CBR, PDF) into page image folders.
//!
//! # Example
//!
//! ```no_run
//! use panelkit::unpack::Unpacker;
//!
//! let report = Unpacker::new().unpack("issue-01.cbz", "pages")?;
//! println!("{} files in {}", report.files.len(), report.output_dir.display());
//! # Ok::<(), panelkit::Error>(())
//! ```

mod cbr;
mod cbz;
mod pdf;

use std::fs;
use std::path::{Path, PathBuf};

use crate::detect::{detect_format_from_path, ContainerFormat};
use crate::error::Result;
use crate::naming::file_stem;

/// Files produced by unpacking one container.
#[derive(Debug, Clone)]
pub struct UnpackReport {
    /// Detected container format
    pub format: ContainerFormat,

    /// Folder the pages were written to
    pub output_dir: PathBuf,

    /// Written files, in write order
    pub files: Vec<PathBuf>,
}

/// Unpacks comic containers into `<output root>/<container stem>/`.
#[derive(Debug, Clone)]
pub struct Unpacker {
    /// 7-Zip executable used for CBR archives
    pub seven_zip: String,
}

impl Unpacker {
    /// Create an unpacker with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the 7-Zip executable.
    pub fn with_seven_zip(mut self, program: impl Into<String>) -> Self {
        self.seven_zip = program.into();
        self
    }

    /// Unpack one container.
    pub fn unpack<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        archive: P,
        output_root: Q,
    ) -> Result<UnpackReport> {
        let archive = archive.as_ref();
        let format = detect_format_from_path(archive)?;
        let output_dir = output_root.as_ref().join(file_stem(archive));
        fs::create_dir_all(&output_dir)?;

        let files = match format {
            ContainerFormat::Cbz => cbz::extract(archive, &output_dir)?,
            ContainerFormat::Cbr => cbr::extract(&self.seven_zip, archive, &output_dir)?,
            ContainerFormat::Pdf => pdf::extract(archive, &output_dir)?,
        };

        log::info!(
            "extracted {} ({}): {} files into {}",
            archive.display(),
            format,
            files.len(),
            output_dir.display()
        );
        Ok(UnpackReport {
            format,
            output_dir,
            files,
        })
    }

    /// Unpack every supported container directly inside `input_dir`.
    ///
    /// Unsupported files are logged and skipped; a failing container aborts.
    pub fn unpack_dir<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        input_dir: P,
        output_root: Q,
    ) -> Result<Vec<UnpackReport>> {
        let mut entries: Vec<PathBuf> = fs::read_dir(input_dir.as_ref())?
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| p.is_file())
            .collect();
        entries.sort();

        let mut reports = Vec::new();
        for path in entries {
            if detect_format_from_path(&path).is_err() {
                log::warn!("unsupported format: {}", path.display());
                continue;
            }
            reports.push(self.unpack(&path, output_root.as_ref())?);
        }
        Ok(reports)
    }
}

impl Default for Unpacker {
    fn default() -> Self {
        Self {
            seven_zip: "7z".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unpacker_builder() {
        let unpacker = Unpacker::new().with_seven_zip("/usr/bin/7za");
        assert_eq!(unpacker.seven_zip, "/usr/bin/7za");
        assert_eq!(Unpacker::default().seven_zip, "7z");
    }

    #[test]
    fn test_unpack_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        fs::write(&path, b"plain text").unwrap();
        assert!(Unpacker::new().unpack(&path, dir.path()).is_err());
    }
}
