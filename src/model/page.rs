//! Page-level layout records.

use super::{PanelEntry, PanelRect};
use serde::{Deserialize, Serialize};

/// Layout descriptor of a single page, as produced by the panel detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRecord {
    /// Page image filename as recorded by the detector
    pub filename: String,

    /// Page size in pixels, `[width, height]` in JSON
    pub size: (u32, u32),

    /// Panel entries in reading order
    #[serde(default)]
    pub panels: Vec<PanelEntry>,
}

impl PageRecord {
    /// Create a record with no panels.
    pub fn new(filename: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            filename: filename.into(),
            size: (width, height),
            panels: Vec::new(),
        }
    }

    /// Add a panel rectangle.
    pub fn with_panel(mut self, rect: PanelRect) -> Self {
        self.panels.push(rect.into());
        self
    }

    /// Page width in pixels.
    pub fn width(&self) -> u32 {
        self.size.0
    }

    /// Page height in pixels.
    pub fn height(&self) -> u32 {
        self.size.1
    }

    /// Page area in square pixels.
    pub fn area(&self) -> u64 {
        u64::from(self.size.0) * u64::from(self.size.1)
    }

    /// Valid panel rectangles, in order. Malformed entries are logged and left out.
    pub fn rects(&self) -> Vec<PanelRect> {
        self.panels
            .iter()
            .filter_map(|entry| match entry.rect() {
                Ok(rect) => Some(rect),
                Err(e) => {
                    log::warn!("{}: skipping panel: {}", self.filename, e);
                    None
                }
            })
            .collect()
    }

    /// Number of panel entries, valid or not.
    pub fn panel_count(&self) -> usize {
        self.panels.len()
    }
}

/// Panel coverage of one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PercentageRecord {
    /// Page image filename
    pub filename: String,

    /// Page size in pixels
    pub size: (u32, u32),

    /// Share of the page area covered by panels, in percent (2 decimals)
    pub panel_percentage: f64,
}
