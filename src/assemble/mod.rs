//! Reassembly of cropped panels into paginated documents.
//!
//! The immediate subdirectories of a base directory are chapters; the image
//! files inside each are pages. Both are taken in lexicographic order.
//!
//! # Example
//!
//! ```no_run
//! use panelkit::assemble::{AssembleOptions, AssemblerRegistry};
//!
//! let registry = AssemblerRegistry::with_defaults();
//! let options = AssembleOptions::new().with_title("Issue 1");
//! let report = registry.assemble_to("panels".as_ref(), "issue1.epub".as_ref(), &options)?;
//! println!("{} pages", report.pages_written);
//! # Ok::<(), panelkit::Error>(())
//! ```

mod epub;
mod pdf;

pub use epub::EpubAssembler;
pub use pdf::PdfAssembler;

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::model::{Chapter, OutputDocument};
use crate::naming::extension_lower;

/// Image extensions picked up as panel pages.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "tif", "tiff", "webp"];

/// Options for document assembly.
#[derive(Debug, Clone)]
pub struct AssembleOptions {
    /// Document title (defaults to the base directory name)
    pub title: Option<String>,

    /// Language tag written to EPUB metadata
    pub language: String,

    /// Author written to document metadata
    pub author: Option<String>,
}

impl AssembleOptions {
    /// Create new assembly options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the document title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the language tag.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Set the author.
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }
}

impl Default for AssembleOptions {
    fn default() -> Self {
        Self {
            title: None,
            language: "en".to_string(),
            author: None,
        }
    }
}

/// Result of an assembly pass.
#[derive(Debug, Clone, Default)]
pub struct AssemblyReport {
    /// Output file
    pub output: PathBuf,

    /// Pages (PDF) or chapters (EPUB) written
    pub pages_written: usize,

    /// Images that could not be read and were left out
    pub skipped: Vec<PathBuf>,
}

impl AssemblyReport {
    /// Create an empty report for `output`.
    pub fn new(output: impl Into<PathBuf>) -> Self {
        Self {
            output: output.into(),
            pages_written: 0,
            skipped: Vec::new(),
        }
    }

    /// Record an image that was left out.
    pub fn skip(&mut self, path: &Path, reason: impl std::fmt::Display) {
        log::warn!("skipping {}: {}", path.display(), reason);
        self.skipped.push(path.to_path_buf());
    }
}

/// Trait for output document writers.
///
/// Implement this trait to add a new output format.
pub trait PanelAssembler: Send + Sync {
    /// Short format name (e.g. `"pdf"`).
    fn name(&self) -> &str;

    /// Output file extension, lowercase without the dot.
    fn extension(&self) -> &str;

    /// Serialize `document` to `output`.
    fn assemble(
        &self,
        document: &OutputDocument,
        output: &Path,
        options: &AssembleOptions,
    ) -> Result<AssemblyReport>;
}

/// Registry of assemblers keyed by output extension.
pub struct AssemblerRegistry {
    assemblers: HashMap<String, Arc<dyn PanelAssembler>>,
}

impl AssemblerRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            assemblers: HashMap::new(),
        }
    }

    /// Create a registry with the PDF and EPUB assemblers.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(PdfAssembler::new()));
        registry.register(Arc::new(EpubAssembler::new()));
        registry
    }

    /// Register an assembler for its extension.
    pub fn register(&mut self, assembler: Arc<dyn PanelAssembler>) {
        self.assemblers
            .insert(assembler.extension().to_lowercase(), assembler);
    }

    /// Get an assembler by extension or name.
    pub fn get(&self, ext: &str) -> Option<Arc<dyn PanelAssembler>> {
        let ext = ext.to_lowercase();
        self.assemblers.get(&ext).cloned().or_else(|| {
            self.assemblers
                .values()
                .find(|a| a.name().eq_ignore_ascii_case(&ext))
                .cloned()
        })
    }

    /// Check if an extension is supported.
    pub fn supports(&self, ext: &str) -> bool {
        self.get(ext).is_some()
    }

    /// Collect chapters under `base` and write them to `output`,
    /// choosing the format from the output extension.
    pub fn assemble_to(
        &self,
        base: &Path,
        output: &Path,
        options: &AssembleOptions,
    ) -> Result<AssemblyReport> {
        let ext = extension_lower(output)
            .ok_or_else(|| Error::Other(format!("{} has no extension", output.display())))?;
        let assembler = self
            .get(&ext)
            .ok_or_else(|| Error::UnsupportedFormat(format!("no assembler for .{}", ext)))?;

        let document = collect_chapters(base, options)?;
        assembler.assemble(&document, output, options)
    }
}

impl Default for AssemblerRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Collect chapter folders and their panel images under `base`.
pub fn collect_chapters(base: &Path, options: &AssembleOptions) -> Result<OutputDocument> {
    if !base.is_dir() {
        return Err(Error::NotADirectory(base.to_path_buf()));
    }

    let title = options.title.clone().unwrap_or_else(|| {
        base.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Untitled".to_string())
    });
    let mut document = OutputDocument::new(title);

    for folder in sorted_entries(base)?.into_iter().filter(|p| p.is_dir()) {
        let name = folder
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut chapter = Chapter::new(name);

        for file in sorted_entries(&folder)?.into_iter().filter(|p| p.is_file()) {
            if is_image_path(&file) {
                chapter.images.push(file);
            } else {
                log::debug!("ignoring non-image {}", file.display());
            }
        }

        document.add_chapter(chapter);
    }

    log::debug!(
        "collected {} chapters, {} images under {}",
        document.chapters.len(),
        document.image_count(),
        base.display()
    );
    Ok(document)
}

fn is_image_path(path: &Path) -> bool {
    extension_lower(path)
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// Directory entries sorted by file name.
pub(crate) fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_with_defaults() {
        let registry = AssemblerRegistry::with_defaults();
        assert!(registry.supports("pdf"));
        assert!(registry.supports("EPUB"));
        assert!(!registry.supports("cbz"));
        assert_eq!(registry.get("epub").unwrap().name(), "epub");
    }

    #[test]
    fn test_assemble_options_builder() {
        let options = AssembleOptions::new()
            .with_title("Vol. 1")
            .with_language("pt-BR")
            .with_author("Someone");
        assert_eq!(options.title.as_deref(), Some("Vol. 1"));
        assert_eq!(options.language, "pt-BR");
        assert_eq!(options.author.as_deref(), Some("Someone"));
    }

    #[test]
    fn test_collect_chapters_order_and_filter() {
        let base = tempfile::tempdir().unwrap();
        for dir in ["02", "01"] {
            fs::create_dir(base.path().join(dir)).unwrap();
        }
        fs::write(base.path().join("01/b.png"), b"").unwrap();
        fs::write(base.path().join("01/a.jpg"), b"").unwrap();
        fs::write(base.path().join("01/notes.txt"), b"").unwrap();
        fs::write(base.path().join("02/z.PNG"), b"").unwrap();
        fs::write(base.path().join("loose.png"), b"").unwrap();

        let doc = collect_chapters(base.path(), &AssembleOptions::new().with_title("T")).unwrap();
        assert_eq!(doc.title, "T");
        assert_eq!(doc.chapters.len(), 2);
        assert_eq!(doc.chapters[0].name, "01");
        let names: Vec<_> = doc.chapters[0]
            .images
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.jpg", "b.png"]);
        assert_eq!(doc.image_count(), 3);
    }

    #[test]
    fn test_collect_chapters_not_a_directory() {
        let result = collect_chapters(Path::new("/nonexistent/panels"), &AssembleOptions::new());
        assert!(matches!(result, Err(Error::NotADirectory(_))));
    }

    #[test]
    fn test_assemble_to_unknown_extension() {
        let base = tempfile::tempdir().unwrap();
        let registry = AssemblerRegistry::with_defaults();
        let result = registry.assemble_to(
            base.path(),
            &base.path().join("out.docx"),
            &AssembleOptions::new(),
        );
        assert!(matches!(result, Err(Error::UnsupportedFormat(_))));
    }
}
