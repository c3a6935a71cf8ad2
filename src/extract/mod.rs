//! Panel extraction: crop layout rectangles out of page images.
//!
//! Per-item problems (a malformed panel entry, a missing or undecodable
//! page image) are logged and skipped; only failing to write output is
//! fatal.
//!
//! # Example
//!
//! ```no_run
//! use panelkit::extract::{ExtractOptions, PanelExtractor};
//! use panelkit::layout::load_layout;
//!
//! let pages = load_layout("layout.json")?;
//! let extractor = PanelExtractor::new(ExtractOptions::new().with_scale(2.0));
//! let stats = extractor.extract(&pages, "pages", "panels")?;
//! println!("{} panels written", stats.panels_written);
//! # Ok::<(), panelkit::Error>(())
//! ```

mod locate;
mod mask;
mod options;

pub use locate::{locate_page_image, page_image_candidates};
pub use mask::PanelMasker;
pub use options::{BoundsPolicy, ExtractOptions, PanelFormat};

use std::fs;
use std::path::Path;

use image::{DynamicImage, GenericImageView};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{PageRecord, PanelRect};
use crate::naming::{digit_width, file_stem, padded};

/// Counters collected during extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionStats {
    /// Pages whose image was found and decoded
    pub pages_processed: usize,

    /// Panel images written
    pub panels_written: usize,

    /// Panel entries skipped (malformed, out of bounds, empty)
    pub panels_skipped: usize,

    /// Pages skipped because the image was missing or unreadable
    pub pages_missing: usize,
}

impl ExtractionStats {
    /// Create new empty statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge counters from another run.
    pub fn merge(&mut self, other: &ExtractionStats) {
        self.pages_processed += other.pages_processed;
        self.panels_written += other.panels_written;
        self.panels_skipped += other.panels_skipped;
        self.pages_missing += other.pages_missing;
    }
}

/// Crops panels described by page records into per-page folders.
#[derive(Debug, Clone, Default)]
pub struct PanelExtractor {
    options: ExtractOptions,
}

impl PanelExtractor {
    /// Create an extractor with the given options.
    pub fn new(options: ExtractOptions) -> Self {
        Self { options }
    }

    /// Extraction options.
    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    /// Extract every panel of every page.
    ///
    /// Panels of a page go to `output_dir/<page image stem>/panel_<NN>.<ext>`,
    /// where `NN` is the 1-based position of the entry in the page's panel
    /// list. Existing files with the same name are overwritten.
    pub fn extract<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        pages: &[PageRecord],
        pages_dir: P,
        output_dir: Q,
    ) -> Result<ExtractionStats> {
        let pages_dir = pages_dir.as_ref();
        let output_dir = output_dir.as_ref();
        fs::create_dir_all(output_dir)?;

        let mut stats = ExtractionStats::new();
        for page in pages {
            let page_stats = self.extract_page(page, pages_dir, output_dir)?;
            stats.merge(&page_stats);
        }

        log::info!(
            "extracted {} panels from {} pages ({} panels skipped, {} pages missing)",
            stats.panels_written,
            stats.pages_processed,
            stats.panels_skipped,
            stats.pages_missing
        );
        Ok(stats)
    }

    /// Extract the panels of one page.
    pub fn extract_page(
        &self,
        page: &PageRecord,
        pages_dir: &Path,
        output_dir: &Path,
    ) -> Result<ExtractionStats> {
        let mut stats = ExtractionStats::new();

        let Some((image_path, image)) = open_page_image(page, pages_dir, &self.options) else {
            stats.pages_missing += 1;
            return Ok(stats);
        };
        stats.pages_processed += 1;

        let (width, height) = image.dimensions();
        let page_dir = output_dir.join(file_stem(&image_path));
        fs::create_dir_all(&page_dir)?;

        let width_digits = digit_width(page.panel_count()).max(2);
        let extension = self.options.format.extension();

        for (index, entry) in page.panels.iter().enumerate() {
            let rect = match entry.rect() {
                Ok(rect) => rect,
                Err(e) => {
                    log::warn!("{}: panel {} skipped: {}", page.filename, index + 1, e);
                    stats.panels_skipped += 1;
                    continue;
                }
            };

            let Some(rect) = place_rect(rect, width, height, &self.options) else {
                log::warn!(
                    "{}: panel {} {:?} does not fit the {}x{} page, skipped",
                    page.filename,
                    index + 1,
                    rect.to_array(),
                    width,
                    height
                );
                stats.panels_skipped += 1;
                continue;
            };

            let panel = image.crop_imm(rect.x, rect.y, rect.width, rect.height);
            let name = format!("panel_{}.{}", padded(index + 1, width_digits), extension);
            let path = page_dir.join(name);
            self.write_panel(panel, &path)?;
            log::debug!("saved {}", path.display());
            stats.panels_written += 1;
        }

        Ok(stats)
    }

    fn write_panel(&self, panel: DynamicImage, path: &Path) -> Result<()> {
        let panel = match self.options.format {
            // JPEG has no alpha channel
            PanelFormat::Jpeg => DynamicImage::ImageRgb8(panel.to_rgb8()),
            PanelFormat::Png => panel,
        };
        panel.save_with_format(path, self.options.format.image_format())?;
        Ok(())
    }
}

/// Locate and decode the page image of a record, logging why when it fails.
pub(crate) fn open_page_image(
    page: &PageRecord,
    pages_dir: &Path,
    options: &ExtractOptions,
) -> Option<(std::path::PathBuf, DynamicImage)> {
    let Some(path) = locate_page_image(pages_dir, &page.filename, &options.image_extensions) else {
        log::warn!(
            "page image for {} not found in {}, skipping",
            page.filename,
            pages_dir.display()
        );
        return None;
    };

    match image::open(&path) {
        Ok(image) => {
            log::info!(
                "processing {} ({}x{})",
                path.display(),
                image.width(),
                image.height()
            );
            Some((path, image))
        }
        Err(e) => {
            log::warn!("failed to load {}: {}, skipping", path.display(), e);
            None
        }
    }
}

/// Scale a layout rectangle and fit it to the page according to the options.
pub(crate) fn place_rect(
    rect: PanelRect,
    width: u32,
    height: u32,
    options: &ExtractOptions,
) -> Option<PanelRect> {
    let rect = if options.scale == 1.0 {
        rect
    } else {
        rect.scaled(options.scale)
    };

    match options.bounds {
        BoundsPolicy::Clamp => rect.clamp_to(width, height),
        BoundsPolicy::Skip if rect.fits_within(width, height) && !rect.is_empty() => Some(rect),
        BoundsPolicy::Skip => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn write_page(dir: &Path, name: &str, width: u32, height: u32) {
        let img = RgbImage::from_fn(width, height, |x, y| Rgb([x as u8, y as u8, 128]));
        img.save(dir.join(name)).unwrap();
    }

    #[test]
    fn test_place_rect_clamp_and_skip() {
        let rect = PanelRect::new(50, 50, 100, 100);
        let clamp = ExtractOptions::new();
        assert_eq!(
            place_rect(rect, 120, 120, &clamp),
            Some(PanelRect::new(50, 50, 70, 70))
        );

        let skip = ExtractOptions::new().strict_bounds();
        assert_eq!(place_rect(rect, 120, 120, &skip), None);
        assert_eq!(place_rect(rect, 150, 150, &skip), Some(rect));
    }

    #[test]
    fn test_place_rect_scaled() {
        let options = ExtractOptions::new().with_scale(2.0);
        let rect = PanelRect::new(10, 10, 20, 20);
        assert_eq!(
            place_rect(rect, 100, 100, &options),
            Some(PanelRect::new(20, 20, 40, 40))
        );
    }

    #[test]
    fn test_extract_page_writes_numbered_panels() {
        let pages = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        write_page(pages.path(), "page_1.png", 100, 80);

        let page = PageRecord::new("001.jpg", 100, 80)
            .with_panel(PanelRect::new(0, 0, 50, 40))
            .with_panel(PanelRect::new(50, 40, 50, 40));

        let stats = PanelExtractor::default()
            .extract_page(&page, pages.path(), out.path())
            .unwrap();

        assert_eq!(stats.panels_written, 2);
        let first = image::open(out.path().join("page_1/panel_01.png")).unwrap();
        assert_eq!(first.dimensions(), (50, 40));
        assert!(out.path().join("page_1/panel_02.png").is_file());
    }

    #[test]
    fn test_extract_page_missing_image() {
        let pages = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let page = PageRecord::new("404.jpg", 10, 10).with_panel(PanelRect::new(0, 0, 5, 5));

        let stats = PanelExtractor::default()
            .extract_page(&page, pages.path(), out.path())
            .unwrap();
        assert_eq!(stats.pages_missing, 1);
        assert_eq!(stats.panels_written, 0);
    }

    #[test]
    fn test_extract_jpeg_output() {
        let pages = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        write_page(pages.path(), "a.png", 40, 40);
        let page = PageRecord::new("a.png", 40, 40).with_panel(PanelRect::new(0, 0, 20, 20));

        let extractor = PanelExtractor::new(ExtractOptions::new().with_format(PanelFormat::Jpeg));
        let stats = extractor.extract(&[page], pages.path(), out.path()).unwrap();
        assert_eq!(stats.panels_written, 1);
        assert!(out.path().join("a/panel_01.jpg").is_file());
    }
}
