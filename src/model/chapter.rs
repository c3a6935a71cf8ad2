//! Chapter grouping for reassembled documents.

use std::path::{Path, PathBuf};

/// A folder of panel images treated as one ordered unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chapter {
    /// Folder name
    pub name: String,

    /// Panel images in reading order
    pub images: Vec<PathBuf>,
}

impl Chapter {
    /// Create an empty chapter.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            images: Vec::new(),
        }
    }

    /// Number of images in the chapter.
    pub fn len(&self) -> usize {
        self.images.len()
    }

    /// Check if the chapter has no images.
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

/// Ordered chapters to be serialized into one paginated artifact.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputDocument {
    /// Document title
    pub title: String,

    /// Chapters in reading order
    pub chapters: Vec<Chapter>,
}

impl OutputDocument {
    /// Create an empty document.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            chapters: Vec::new(),
        }
    }

    /// Add a chapter.
    pub fn add_chapter(&mut self, chapter: Chapter) {
        self.chapters.push(chapter);
    }

    /// Total number of images across all chapters.
    pub fn image_count(&self) -> usize {
        self.chapters.iter().map(Chapter::len).sum()
    }

    /// Iterate `(chapter, image)` pairs in reading order.
    pub fn images(&self) -> impl Iterator<Item = (&Chapter, &Path)> {
        self.chapters
            .iter()
            .flat_map(|c| c.images.iter().map(move |p| (c, p.as_path())))
    }
}
