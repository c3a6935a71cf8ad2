//! Per-channel color histograms of page images.

use std::fs;
use std::path::Path;

use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::layout::{write_json, JsonFormat};
use crate::naming::extension_lower;

/// Extensions considered by [`histogram_dir`].
pub const HISTOGRAM_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tiff"];

/// Which pixels are counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistogramMode {
    /// Every pixel
    AllPixels,
    /// Skip pixels with any channel at 0 or 255 (line art and paper)
    #[default]
    ExcludeExtremes,
}

impl HistogramMode {
    fn counts(self, rgb: [u8; 3]) -> bool {
        match self {
            HistogramMode::AllPixels => true,
            HistogramMode::ExcludeExtremes => rgb.iter().all(|&c| c != 0 && c != 255),
        }
    }
}

/// 256-bin histograms for the red, green and blue channels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorHistogram {
    pub red: Vec<u64>,
    pub green: Vec<u64>,
    pub blue: Vec<u64>,
    /// Number of pixels counted
    pub pixels: u64,
}

impl ColorHistogram {
    fn empty() -> Self {
        Self {
            red: vec![0; 256],
            green: vec![0; 256],
            blue: vec![0; 256],
            pixels: 0,
        }
    }

    /// Histogram of an RGB image.
    pub fn from_image(image: &RgbImage, mode: HistogramMode) -> Self {
        let mut hist = Self::empty();
        for pixel in image.pixels() {
            let [r, g, b] = pixel.0;
            if !mode.counts(pixel.0) {
                continue;
            }
            hist.red[r as usize] += 1;
            hist.green[g as usize] += 1;
            hist.blue[b as usize] += 1;
            hist.pixels += 1;
        }
        hist
    }
}

/// Histogram of the image at `path`.
pub fn histogram_image(path: &Path, mode: HistogramMode) -> Result<ColorHistogram> {
    let image = image::open(path)?.to_rgb8();
    Ok(ColorHistogram::from_image(&image, mode))
}

/// Write `histogram_<file name>.json` into `output_dir` for each image
/// directly inside `input_dir`. Returns the number of files written.
pub fn histogram_dir(input_dir: &Path, output_dir: &Path, mode: HistogramMode) -> Result<usize> {
    if !input_dir.is_dir() {
        return Err(Error::NotADirectory(input_dir.to_path_buf()));
    }
    fs::create_dir_all(output_dir)?;

    let mut files: Vec<_> = fs::read_dir(input_dir)?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.is_file())
        .filter(|p| {
            extension_lower(p).is_some_and(|ext| HISTOGRAM_EXTENSIONS.contains(&ext.as_str()))
        })
        .collect();
    files.sort();

    let mut written = 0;
    for path in files {
        let hist = match histogram_image(&path, mode) {
            Ok(hist) => hist,
            Err(e) => {
                log::warn!("could not load {}: {}, skipped", path.display(), e);
                continue;
            }
        };
        if hist.pixels == 0 {
            log::info!("no colored pixels in {}, skipped", path.display());
            continue;
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let output = output_dir.join(format!("histogram_{}.json", name));
        write_json(&output, &hist, JsonFormat::Compact)?;
        log::info!("histogram saved: {}", output.display());
        written += 1;
    }
    Ok(written)
}
