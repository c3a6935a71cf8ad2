//! Built-in panel detection from panel borders.
//!
//! Pages are binarized against a light background, the outer borders of
//! the ink are traced with `imageproc`, and the bounding boxes large enough
//! to be panels become the page's layout. This covers the common case of
//! framed panels on a white page without running an external detector.
//!
//! # Example
//!
//! ```no_run
//! use panelkit::contour::{ContourDetector, ContourOptions};
//!
//! let detector = ContourDetector::new(ContourOptions::new().with_min_size(80));
//! let pages = detector.detect_dir_to("pages/issue-01", "issue-01.json")?;
//! println!("{} pages", pages.len());
//! # Ok::<(), panelkit::Error>(())
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use image::{DynamicImage, GrayImage, Luma};
use imageproc::contours::{find_contours, BorderType, Contour};

use crate::assemble::IMAGE_EXTENSIONS;
use crate::error::{Error, Result};
use crate::external::nested_folders;
use crate::layout::{write_json, JsonFormat};
use crate::model::{PageRecord, PanelRect};
use crate::naming::{extension_lower, sorted_by_page_number};

/// Options for [`ContourDetector`].
#[derive(Debug, Clone)]
pub struct ContourOptions {
    /// Gray levels at or below this count as ink (default 220)
    pub threshold: u8,

    /// Boxes must be wider and taller than this many pixels (default 100)
    pub min_size: u32,

    /// Boxes covering more than this share of both page dimensions are
    /// reported as the whole page (default 0.8)
    pub full_page_ratio: f64,

    /// Order panels right-to-left within a row
    pub rtl: bool,
}

impl ContourOptions {
    /// Create options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the ink threshold.
    pub fn with_threshold(mut self, threshold: u8) -> Self {
        self.threshold = threshold;
        self
    }

    /// Set the minimum panel width and height.
    pub fn with_min_size(mut self, min_size: u32) -> Self {
        self.min_size = min_size;
        self
    }

    /// Set the share above which a box becomes the whole page.
    pub fn with_full_page_ratio(mut self, ratio: f64) -> Self {
        self.full_page_ratio = ratio;
        self
    }

    /// Enable or disable right-to-left order.
    pub fn with_rtl(mut self, rtl: bool) -> Self {
        self.rtl = rtl;
        self
    }
}

impl Default for ContourOptions {
    fn default() -> Self {
        Self {
            threshold: 220,
            min_size: 100,
            full_page_ratio: 0.8,
            rtl: false,
        }
    }
}

/// Finds framed panels on page images.
#[derive(Debug, Clone, Default)]
pub struct ContourDetector {
    options: ContourOptions,
}

impl ContourDetector {
    /// Create a detector.
    pub fn new(options: ContourOptions) -> Self {
        Self { options }
    }

    /// Panel rectangles of one page, in reading order.
    pub fn detect_image(&self, image: &DynamicImage) -> Vec<PanelRect> {
        let (width, height) = (image.width(), image.height());
        let ink = binarize(&image.to_luma8(), self.options.threshold);
        let contours: Vec<Contour<u32>> = find_contours(&ink);

        let mut panels: Vec<PanelRect> = contours
            .iter()
            .filter(|c| matches!(c.border_type, BorderType::Outer) && c.parent.is_none())
            .filter_map(bounding_box)
            .filter(|r| r.width > self.options.min_size && r.height > self.options.min_size)
            .map(|r| {
                if self.covers_page(&r, width, height) {
                    PanelRect::new(0, 0, width, height)
                } else {
                    r
                }
            })
            .collect();
        panels.dedup();

        reading_order(&mut panels, self.options.rtl);
        panels
    }

    fn covers_page(&self, rect: &PanelRect, width: u32, height: u32) -> bool {
        let ratio = self.options.full_page_ratio;
        f64::from(rect.width) > f64::from(width) * ratio
            && f64::from(rect.height) > f64::from(height) * ratio
    }

    /// Layout record of one page image.
    pub fn detect_file(&self, path: &Path) -> Result<PageRecord> {
        let image = image::open(path)?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut record = PageRecord::new(filename, image.width(), image.height());
        for rect in self.detect_image(&image) {
            record = record.with_panel(rect);
        }
        log::debug!("{}: {} panels", path.display(), record.panel_count());
        Ok(record)
    }

    /// Layout records for the page images directly in `dir`, in page-number order.
    ///
    /// Images that cannot be opened are logged and left out.
    pub fn detect_dir<P: AsRef<Path>>(&self, dir: P) -> Result<Vec<PageRecord>> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(Error::NotADirectory(dir.to_path_buf()));
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            let is_image = extension_lower(&path)
                .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()));
            if entry.file_type()?.is_file() && is_image {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }

        let mut pages = Vec::new();
        for name in sorted_by_page_number(names) {
            let path = dir.join(&name);
            match self.detect_file(&path) {
                Ok(record) => pages.push(record),
                Err(e) => log::warn!("skipping {}: {}", path.display(), e),
            }
        }
        log::info!("{}: {} pages", dir.display(), pages.len());
        Ok(pages)
    }

    /// Detect `dir` and write the layout JSON to `output_json`.
    pub fn detect_dir_to<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        dir: P,
        output_json: Q,
    ) -> Result<Vec<PageRecord>> {
        let pages = self.detect_dir(dir)?;
        let output_json = output_json.as_ref();
        if let Some(parent) = output_json.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        write_json(output_json, &pages, JsonFormat::Pretty)?;
        Ok(pages)
    }

    /// Detect every folder below `root`, writing `<output_dir>/<folder name>.json` for each.
    pub fn detect_tree(&self, root: &Path, output_dir: &Path) -> Result<Vec<PathBuf>> {
        if !root.is_dir() {
            return Err(Error::NotADirectory(root.to_path_buf()));
        }
        fs::create_dir_all(output_dir)?;

        let mut written = Vec::new();
        for folder in nested_folders(root)? {
            let name = folder
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let output = output_dir.join(format!("{}.json", name));
            self.detect_dir_to(&folder, &output)?;
            written.push(output);
        }
        Ok(written)
    }
}

/// Ink as foreground (255), background as 0.
fn binarize(gray: &GrayImage, threshold: u8) -> GrayImage {
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        if gray.get_pixel(x, y)[0] <= threshold {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

fn bounding_box(contour: &Contour<u32>) -> Option<PanelRect> {
    let min_x = contour.points.iter().map(|p| p.x).min()?;
    let max_x = contour.points.iter().map(|p| p.x).max()?;
    let min_y = contour.points.iter().map(|p| p.y).min()?;
    let max_y = contour.points.iter().map(|p| p.y).max()?;
    Some(PanelRect::new(min_x, min_y, max_x - min_x + 1, max_y - min_y + 1))
}

fn row_middle(first: &PanelRect) -> u64 {
    u64::from(first.y) + u64::from(first.height) / 2
}

/// Rows top to bottom; within a row, left to right (or right to left).
///
/// A panel joins the current row when its top is above the vertical
/// middle of the row's first panel.
fn reading_order(panels: &mut Vec<PanelRect>, rtl: bool) {
    panels.sort_by_key(|p| (p.y, p.x));

    let mut rows: Vec<Vec<PanelRect>> = Vec::new();
    for panel in panels.drain(..) {
        match rows.last_mut() {
            Some(row) if u64::from(panel.y) < row_middle(&row[0]) => row.push(panel),
            _ => rows.push(vec![panel]),
        }
    }

    for mut row in rows {
        row.sort_by_key(|p| p.x);
        if rtl {
            row.reverse();
        }
        panels.extend(row);
    }
}
