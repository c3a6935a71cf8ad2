//! Panel coverage of page area.

use std::path::Path;

use crate::error::{Error, Result};
use crate::layout::{load_layout, write_json, JsonFormat};
use crate::model::{PageRecord, PanelRect, PercentageRecord};

/// Percentage of the page area covered by `panels`, rounded to 2 decimals.
///
/// Panel areas are summed as given; overlapping panels are counted twice
/// and the result can exceed 100.
///
/// # Errors
///
/// `Error::ZeroPageArea` when either page dimension is zero.
///
/// # Example
///
/// ```
/// use panelkit::geometry::panel_percentage;
/// use panelkit::PanelRect;
///
/// let pct = panel_percentage((100, 100), &[PanelRect::new(0, 0, 50, 50)])?;
/// assert_eq!(pct, 25.0);
/// # Ok::<(), panelkit::Error>(())
/// ```
pub fn panel_percentage(size: (u32, u32), panels: &[PanelRect]) -> Result<f64> {
    let (width, height) = size;
    let page_area = u64::from(width) * u64::from(height);
    if page_area == 0 {
        return Err(Error::ZeroPageArea(width, height));
    }

    let covered: u64 = panels.iter().map(PanelRect::area).sum();
    let percentage = covered as f64 / page_area as f64 * 100.0;
    Ok(round2(percentage))
}

/// Coverage of one page record, ignoring malformed panel entries.
pub fn page_percentage(page: &PageRecord) -> Result<f64> {
    panel_percentage(page.size, &page.rects())
}

/// Coverage rows for every page, in input order.
pub fn compute_percentages(pages: &[PageRecord]) -> Result<Vec<PercentageRecord>> {
    pages
        .iter()
        .map(|page| {
            Ok(PercentageRecord {
                filename: page.filename.clone(),
                size: page.size,
                panel_percentage: page_percentage(page)?,
            })
        })
        .collect()
}

/// Read a layout file and write its per-page coverage report.
pub fn write_percentage_report<P: AsRef<Path>, Q: AsRef<Path>>(
    layout: P,
    output: Q,
) -> Result<Vec<PercentageRecord>> {
    let pages = load_layout(layout)?;
    let report = compute_percentages(&pages)?;
    write_json(output.as_ref(), &report, JsonFormat::Pretty)?;
    log::info!("wrote {}", output.as_ref().display());
    Ok(report)
}

/// Summary statistics over a coverage report.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoverageSummary {
    /// Number of pages
    pub pages: usize,
    /// Lowest coverage
    pub min: f64,
    /// Highest coverage
    pub max: f64,
    /// Mean coverage, rounded to 2 decimals
    pub mean: f64,
}

impl CoverageSummary {
    /// Summarize a report. Returns `None` for an empty report.
    pub fn from_records(records: &[PercentageRecord]) -> Option<Self> {
        if records.is_empty() {
            return None;
        }
        let values = records.iter().map(|r| r.panel_percentage);
        let min = values.clone().fold(f64::INFINITY, f64::min);
        let max = values.clone().fold(f64::NEG_INFINITY, f64::max);
        let mean = values.sum::<f64>() / records.len() as f64;
        Some(Self {
            pages: records.len(),
            min,
            max,
            mean: round2(mean),
        })
    }
}

/// Round to 2 decimals on the exact binary value, ties to even.
fn round2(value: f64) -> f64 {
    format!("{:.2}", value).parse().unwrap_or(value)
}
