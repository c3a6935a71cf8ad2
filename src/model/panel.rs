//! Panel rectangles and raw panel entries.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// A panel rectangle in page pixel space.
///
/// `(x, y)` is the top-left corner; `width` and `height` extend right and
/// down from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PanelRect {
    /// Left edge in pixels
    pub x: u32,
    /// Top edge in pixels
    pub y: u32,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl PanelRect {
    /// Create a new rectangle.
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Area in square pixels.
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Exclusive right edge.
    pub fn right(&self) -> u64 {
        u64::from(self.x) + u64::from(self.width)
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> u64 {
        u64::from(self.y) + u64::from(self.height)
    }

    /// Whether the rectangle has no area.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Whether the rectangle lies entirely inside a `width` x `height` page.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.right() <= u64::from(width) && self.bottom() <= u64::from(height)
    }

    /// Multiply every component by `factor`, rounding to the nearest pixel.
    pub fn scaled(&self, factor: f64) -> Self {
        let scale = |v: u32| -> u32 {
            let scaled = (f64::from(v) * factor).round();
            if scaled <= 0.0 {
                0
            } else if scaled >= f64::from(u32::MAX) {
                u32::MAX
            } else {
                scaled as u32
            }
        };
        Self::new(
            scale(self.x),
            scale(self.y),
            scale(self.width),
            scale(self.height),
        )
    }

    /// Intersect with a `width` x `height` page.
    ///
    /// Returns `None` when nothing of the rectangle is left on the page.
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<Self> {
        if self.x >= width || self.y >= height {
            return None;
        }
        let right = self.right().min(u64::from(width)) as u32;
        let bottom = self.bottom().min(u64::from(height)) as u32;
        let clamped = Self::new(self.x, self.y, right - self.x, bottom - self.y);
        if clamped.is_empty() {
            None
        } else {
            Some(clamped)
        }
    }

    /// The `[x, y, width, height]` quadruple used in layout files.
    pub fn to_array(&self) -> [u32; 4] {
        [self.x, self.y, self.width, self.height]
    }
}

impl From<[u32; 4]> for PanelRect {
    fn from(v: [u32; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

/// One raw entry of a page's `panels` array.
///
/// Entries are kept as loaded so one malformed entry does not reject the
/// whole layout file; validation happens in [`PanelEntry::rect`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PanelEntry(pub serde_json::Value);

impl PanelEntry {
    /// Validate the entry as an `[x, y, width, height]` quadruple.
    pub fn rect(&self) -> Result<PanelRect> {
        let values = self
            .0
            .as_array()
            .ok_or_else(|| Error::InvalidPanel(format!("expected an array, got {}", self.0)))?;

        if values.len() != 4 {
            return Err(Error::InvalidPanel(format!(
                "expected 4 values, got {} in {}",
                values.len(),
                self.0
            )));
        }

        let mut parts = [0u32; 4];
        for (slot, value) in parts.iter_mut().zip(values) {
            *slot = pixel_value(value).ok_or_else(|| {
                Error::InvalidPanel(format!("{} is not a pixel coordinate in {}", value, self.0))
            })?;
        }

        Ok(PanelRect::from(parts))
    }
}

impl From<PanelRect> for PanelEntry {
    fn from(rect: PanelRect) -> Self {
        PanelEntry(serde_json::json!(rect.to_array()))
    }
}

/// Non-negative integer (integral floats accepted) that fits in `u32`.
fn pixel_value(value: &serde_json::Value) -> Option<u32> {
    let n = value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|f| *f >= 0.0 && f.fract() == 0.0)
            .map(|f| f as u64)
    })?;
    u32::try_from(n).ok()
}
