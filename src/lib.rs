//! # panelkit
//!
//! Comic archive utilities: unpack containers, read panel layouts, crop
//! panels, and reassemble them into PDF or EPUB.
//!
//! ## Quick Start
//!
//! ```no_run
//! use panelkit::{extract_panels, assemble, ExtractOptions, AssembleOptions};
//!
//! fn main() -> panelkit::Result<()> {
//!     // Crop the panels described by a detector layout file
//!     let stats = extract_panels("layout.json", "pages", "panels", ExtractOptions::default())?;
//!     println!("{} panels", stats.panels_written);
//!
//!     // One chapter per folder under `panels`
//!     let options = AssembleOptions::new().with_title("Issue 1");
//!     assemble("panels", "issue-1.epub", &options)?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Pipeline
//!
//! - **Unpack**: CBZ, CBR (through 7-Zip) and PDF containers into page folders
//! - **Detect**: trace framed panels with the built-in contour detector, or
//!   run an external detector; both produce layout JSON
//! - **Coverage**: share of each page covered by panels
//! - **Extract**: one image per panel, plus masked "unused area" pages
//! - **Assemble**: panel folders into a PDF or a fixed-layout EPUB

pub mod assemble;
pub mod contour;
pub mod detect;
pub mod error;
pub mod external;
pub mod extract;
pub mod geometry;
pub mod histogram;
pub mod layout;
pub mod model;
pub mod naming;
pub mod organize;
pub mod unpack;

// Re-export commonly used types
pub use assemble::{
    AssembleOptions, AssemblerRegistry, AssemblyReport, EpubAssembler, PanelAssembler,
    PdfAssembler,
};
pub use contour::{ContourDetector, ContourOptions};
pub use detect::{detect_format_from_bytes, detect_format_from_path, ContainerFormat};
pub use error::{Error, Result};
pub use external::PanelDetector;
pub use extract::{BoundsPolicy, ExtractOptions, ExtractionStats, PanelExtractor, PanelFormat};
pub use geometry::{compute_percentages, panel_percentage, CoverageSummary};
pub use layout::{load_layout, JsonFormat};
pub use model::{Chapter, OutputDocument, PageRecord, PanelEntry, PanelRect, PercentageRecord};
pub use unpack::{UnpackReport, Unpacker};

use std::path::Path;

/// Crop every panel listed in a layout file.
///
/// # Example
///
/// ```no_run
/// use panelkit::{extract_panels, ExtractOptions};
///
/// let options = ExtractOptions::new().with_scale(2.0);
/// let stats = extract_panels("layout.json", "pages", "panels", options).unwrap();
/// println!("{} written, {} skipped", stats.panels_written, stats.panels_skipped);
/// ```
pub fn extract_panels<L, P, O>(
    layout: L,
    pages_dir: P,
    output_dir: O,
    options: ExtractOptions,
) -> Result<ExtractionStats>
where
    L: AsRef<Path>,
    P: AsRef<Path>,
    O: AsRef<Path>,
{
    let pages = load_layout(layout)?;
    PanelExtractor::new(options).extract(&pages, pages_dir, output_dir)
}

/// Compute panel coverage for a layout file and write the report as JSON.
pub fn coverage_report<L: AsRef<Path>, O: AsRef<Path>>(
    layout: L,
    output: O,
) -> Result<Vec<PercentageRecord>> {
    geometry::write_percentage_report(layout, output)
}

/// Assemble the chapter folders under `base` into `output`.
///
/// The format follows the output extension (`.pdf` or `.epub`).
///
/// # Example
///
/// ```no_run
/// use panelkit::{assemble, AssembleOptions};
///
/// let report = assemble("panels", "issue.pdf", &AssembleOptions::default()).unwrap();
/// println!("{} pages", report.pages_written);
/// ```
pub fn assemble<B: AsRef<Path>, O: AsRef<Path>>(
    base: B,
    output: O,
    options: &AssembleOptions,
) -> Result<AssemblyReport> {
    AssemblerRegistry::with_defaults().assemble_to(base.as_ref(), output.as_ref(), options)
}

/// Unpack one comic container into `output_root/<container stem>/`.
pub fn unpack<A: AsRef<Path>, O: AsRef<Path>>(archive: A, output_root: O) -> Result<UnpackReport> {
    Unpacker::new().unpack(archive, output_root)
}
