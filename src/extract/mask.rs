//! Page masks with panel areas blacked out.

use std::fs;
use std::path::Path;

use image::Rgba;
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;

use super::{open_page_image, place_rect, ExtractOptions};
use crate::error::Result;
use crate::model::PageRecord;
use crate::naming::file_stem;

const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Writes page copies with every panel filled black, leaving only the
/// area no panel covers visible.
#[derive(Debug, Clone, Default)]
pub struct PanelMasker {
    options: ExtractOptions,
}

impl PanelMasker {
    /// Create a masker. Scale, bounds and lookup extensions come from `options`.
    pub fn new(options: ExtractOptions) -> Self {
        Self { options }
    }

    /// Write `<page stem>_unused.png` for every page found. Returns the number written.
    pub fn mask<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        pages: &[PageRecord],
        pages_dir: P,
        output_dir: Q,
    ) -> Result<usize> {
        let pages_dir = pages_dir.as_ref();
        let output_dir = output_dir.as_ref();
        fs::create_dir_all(output_dir)?;

        let mut written = 0;
        for page in pages {
            let Some((path, image)) = open_page_image(page, pages_dir, &self.options) else {
                continue;
            };

            let mut canvas = image.to_rgba8();
            let (width, height) = canvas.dimensions();
            for rect in page.rects() {
                if let Some(rect) = place_rect(rect, width, height, &self.options) {
                    let area = Rect::at(rect.x as i32, rect.y as i32)
                        .of_size(rect.width, rect.height);
                    draw_filled_rect_mut(&mut canvas, area, BLACK);
                }
            }

            let target = output_dir.join(format!("{}_unused.png", file_stem(&path)));
            canvas.save(&target)?;
            log::debug!("saved {}", target.display());
            written += 1;
        }

        log::info!("masked images written to {}", output_dir.display());
        Ok(written)
    }
}
