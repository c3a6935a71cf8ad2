//! Page rasters embedded in PDF documents.
//!
//! Scanned comics carry one image per page; that image is written out as
//! the page. Pages without an embedded raster would need rendering, which
//! is not done here: they are logged and skipped, as are images whose
//! filters or color space cannot be decoded faithfully.

use std::collections::HashSet;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use flate2::read::ZlibDecoder;
use image::{DynamicImage, GrayImage, RgbImage};
use lopdf::{Dictionary, Document as LopdfDocument, Object, ObjectId, Stream};

use crate::error::{Error, Result};
use crate::naming::{digit_width, padded};

/// Color space of an image XObject, resolved through the document.
#[derive(Debug, Clone, PartialEq)]
enum ColorSpace {
    Gray,
    Rgb,
    Cmyk,
    /// Palette of `base` colors indexed by one byte per pixel
    Indexed {
        base: Box<ColorSpace>,
        palette: Vec<u8>,
    },
    Unknown(String),
}

impl ColorSpace {
    fn resolve(doc: &LopdfDocument, obj: &Object) -> Self {
        let obj = doc.dereference(obj).map(|(_, o)| o).unwrap_or(obj);
        match obj {
            Object::Name(name) => Self::from_family(&String::from_utf8_lossy(name)),
            Object::Array(arr) => {
                let family = arr
                    .first()
                    .and_then(|o| o.as_name_str().ok())
                    .unwrap_or_default();
                match family {
                    "ICCBased" => arr
                        .get(1)
                        .and_then(|o| doc.dereference(o).ok())
                        .and_then(|(_, o)| o.as_stream().ok())
                        .and_then(|s| s.dict.get(b"N").and_then(Object::as_i64).ok())
                        .map(Self::from_components)
                        .unwrap_or_else(|| Self::Unknown(family.to_string())),
                    "Indexed" | "I" => {
                        let base = arr
                            .get(1)
                            .map(|o| Self::resolve(doc, o))
                            .unwrap_or_else(|| Self::Unknown(String::new()));
                        match arr.get(3).and_then(|o| palette_bytes(doc, o)) {
                            Some(palette) => Self::Indexed {
                                base: Box::new(base),
                                palette,
                            },
                            None => Self::Unknown("Indexed without lookup".to_string()),
                        }
                    }
                    other => Self::from_family(other),
                }
            }
            _ => Self::Unknown(String::new()),
        }
    }

    fn from_family(name: &str) -> Self {
        match name {
            "DeviceGray" | "CalGray" | "G" => Self::Gray,
            "DeviceRGB" | "CalRGB" | "RGB" => Self::Rgb,
            "DeviceCMYK" | "CMYK" => Self::Cmyk,
            other => Self::Unknown(other.to_string()),
        }
    }

    fn from_components(n: i64) -> Self {
        match n {
            1 => Self::Gray,
            3 => Self::Rgb,
            4 => Self::Cmyk,
            other => Self::Unknown(format!("ICCBased N={}", other)),
        }
    }

    /// Bytes per pixel at 8 bits per component.
    fn components(&self) -> Option<usize> {
        match self {
            Self::Gray | Self::Indexed { .. } => Some(1),
            Self::Rgb => Some(3),
            Self::Cmyk => Some(4),
            Self::Unknown(_) => None,
        }
    }

    /// One color of this space as RGB.
    fn to_rgb(&self, color: &[u8]) -> Option<[u8; 3]> {
        match (self, color) {
            (Self::Gray, [v]) => Some([*v, *v, *v]),
            (Self::Rgb, [r, g, b]) => Some([*r, *g, *b]),
            (Self::Cmyk, [_, _, _, _]) => Some(cmyk_pixel(color)),
            _ => None,
        }
    }
}

/// Lookup table of an Indexed color space: a string or a stream.
fn palette_bytes(doc: &LopdfDocument, obj: &Object) -> Option<Vec<u8>> {
    match doc.dereference(obj).ok()?.1 {
        Object::String(bytes, _) => Some(bytes.clone()),
        Object::Stream(stream) => stream.get_plain_content().ok(),
        _ => None,
    }
}

/// An image XObject found on a page.
struct PageImage<'a> {
    stream: &'a Stream,
    width: u32,
    height: u32,
}

impl PageImage<'_> {
    fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    fn color_space(&self, doc: &LopdfDocument) -> ColorSpace {
        match self.stream.dict.get(b"ColorSpace") {
            Ok(obj) => ColorSpace::resolve(doc, obj),
            Err(_) => ColorSpace::Unknown(String::new()),
        }
    }

    fn bits_per_component(&self) -> i64 {
        self.stream
            .dict
            .get(b"BitsPerComponent")
            .ok()
            .and_then(|b| b.as_i64().ok())
            .unwrap_or(8)
    }
}

/// Encoded page image ready to be written.
enum PageOutput {
    /// Bytes usable as-is, with their file extension
    Raw(Vec<u8>, &'static str),
    /// Decoded pixels to be saved as PNG
    Decoded(DynamicImage),
}

pub(super) fn extract(archive: &Path, dest: &Path) -> Result<Vec<PathBuf>> {
    let doc = LopdfDocument::load(archive)?;
    let pages = doc.get_pages();
    let width = digit_width(pages.len());
    let mut written = Vec::new();

    for (page_num, page_id) in pages {
        let Some(image) = largest_image(&doc, page_id) else {
            log::warn!("page {}: no embedded image, skipped", page_num);
            continue;
        };

        let output = match decode(&doc, &image) {
            Ok(output) => output,
            Err(e) => {
                log::warn!("page {}: {}, skipped", page_num, e);
                continue;
            }
        };

        let stem = format!("page_{}", padded(page_num as usize, width));
        let path = match output {
            PageOutput::Raw(bytes, ext) => {
                let path = dest.join(format!("{}.{}", stem, ext));
                fs::write(&path, bytes)?;
                path
            }
            PageOutput::Decoded(img) => {
                let path = dest.join(format!("{}.png", stem));
                img.save(&path)?;
                path
            }
        };
        log::info!("page {} saved as {}", page_num, path.display());
        written.push(path);
    }

    Ok(written)
}

/// Resources of a page, inherited from the nearest ancestor that has them.
fn page_resources(doc: &LopdfDocument, page_id: ObjectId) -> Option<&Dictionary> {
    let mut seen = HashSet::new();
    let mut node_id = page_id;
    while seen.insert(node_id) {
        let node = doc.get_dictionary(node_id).ok()?;
        let resources = match node.get(b"Resources") {
            Ok(Object::Reference(id)) => doc.get_dictionary(*id).ok(),
            Ok(Object::Dictionary(dict)) => Some(dict),
            _ => None,
        };
        if let Some(resources) = resources.filter(|r| r.has(b"XObject")) {
            return Some(resources);
        }
        node_id = node.get(b"Parent").and_then(Object::as_reference).ok()?;
    }
    None
}

/// The largest image XObject referenced by a page's resources.
fn largest_image(doc: &LopdfDocument, page_id: ObjectId) -> Option<PageImage<'_>> {
    let res_dict = page_resources(doc, page_id)?;
    let xobj_dict = match res_dict.get(b"XObject").ok()? {
        Object::Reference(r) => doc.get_dictionary(*r).ok()?,
        Object::Dictionary(d) => d,
        _ => return None,
    };

    xobj_dict
        .iter()
        .filter_map(|(_, obj)| {
            let obj_ref = obj.as_reference().ok()?;
            let Object::Stream(stream) = doc.get_object(obj_ref).ok()? else {
                return None;
            };
            let dict = &stream.dict;
            if dict.get(b"Subtype").ok()?.as_name_str().ok()? != "Image" {
                return None;
            }
            let width = dict.get(b"Width").ok()?.as_i64().ok()?;
            let height = dict.get(b"Height").ok()?.as_i64().ok()?;
            Some(PageImage {
                stream,
                width: u32::try_from(width).ok()?,
                height: u32::try_from(height).ok()?,
            })
        })
        .max_by_key(PageImage::area)
}

/// Undo the stream's transport filters.
///
/// Returns the remaining bytes and, when the chain ends in an image codec
/// (`DCTDecode`, `JPXDecode`), that codec's name.
fn unfilter(stream: &Stream) -> Result<(Vec<u8>, Option<String>)> {
    let filters = if stream.dict.has(b"Filter") {
        stream.filters()?
    } else {
        Vec::new()
    };
    let predictor = stream
        .dict
        .get(b"DecodeParms")
        .and_then(Object::as_dict)
        .and_then(|p| p.get(b"Predictor"))
        .and_then(Object::as_i64)
        .unwrap_or(1);

    let mut data = stream.content.clone();
    let last = filters.len().saturating_sub(1);
    for (i, filter) in filters.iter().enumerate() {
        match filter.as_str() {
            "FlateDecode" | "Fl" if predictor <= 1 => data = inflate(&data)?,
            "DCTDecode" | "DCT" | "JPXDecode" if i == last => {
                let codec = if filter == "JPXDecode" { "JPXDecode" } else { "DCTDecode" };
                return Ok((data, Some(codec.to_string())));
            }
            other => {
                return Err(Error::Pdf(format!(
                    "unsupported image filter {} (predictor {})",
                    other, predictor
                )))
            }
        }
    }
    Ok((data, None))
}

fn inflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(data.len() * 2);
    ZlibDecoder::new(data)
        .read_to_end(&mut out)
        .map_err(|e| Error::Pdf(format!("corrupt FlateDecode data: {}", e)))?;
    Ok(out)
}

fn decode(doc: &LopdfDocument, image: &PageImage<'_>) -> Result<PageOutput> {
    let (data, codec) = unfilter(image.stream)?;
    match codec.as_deref() {
        Some("DCTDecode") if data.starts_with(&[0xFF, 0xD8]) => {
            return Ok(PageOutput::Raw(data, "jpg"))
        }
        Some("DCTDecode") => return Err(Error::Image("DCTDecode data is not a JPEG".to_string())),
        Some(_) => return Ok(PageOutput::Raw(data, "jp2")),
        None => {}
    }

    let color_space = image.color_space(doc);
    let decoded = match image.bits_per_component() {
        8 => raw_pixels(&color_space, image.width, image.height, &data),
        1 if color_space == ColorSpace::Gray => bilevel(image.width, image.height, &data),
        _ => None,
    };
    if let Some(img) = decoded {
        return Ok(PageOutput::Decoded(img));
    }

    image::load_from_memory(&data)
        .map(PageOutput::Decoded)
        .map_err(|e| {
            Error::Image(format!(
                "undecodable page image ({:?}, {} bpc): {}",
                color_space,
                image.bits_per_component(),
                e
            ))
        })
}

/// Interpret 8-bit samples in `space`; `None` when they don't fit.
fn raw_pixels(space: &ColorSpace, width: u32, height: u32, data: &[u8]) -> Option<DynamicImage> {
    let len = width as usize * height as usize * space.components()?;
    let data = data.get(..len)?;

    match space {
        ColorSpace::Gray => {
            GrayImage::from_raw(width, height, data.to_vec()).map(DynamicImage::ImageLuma8)
        }
        ColorSpace::Rgb => {
            RgbImage::from_raw(width, height, data.to_vec()).map(DynamicImage::ImageRgb8)
        }
        ColorSpace::Cmyk => Some(DynamicImage::ImageRgb8(cmyk_to_rgb(width, height, data))),
        ColorSpace::Indexed { base, palette } => {
            let n = base.components()?;
            let mut rgb = RgbImage::new(width, height);
            for (pixel, &index) in rgb.pixels_mut().zip(data) {
                let start = usize::from(index) * n;
                pixel.0 = palette
                    .get(start..start + n)
                    .and_then(|color| base.to_rgb(color))
                    .unwrap_or([0, 0, 0]);
            }
            Some(DynamicImage::ImageRgb8(rgb))
        }
        ColorSpace::Unknown(_) => None,
    }
}

/// 1-bit gray, rows padded to whole bytes.
fn bilevel(width: u32, height: u32, data: &[u8]) -> Option<DynamicImage> {
    let row_bytes = (width as usize).div_ceil(8);
    if data.len() < row_bytes * height as usize {
        return None;
    }
    let img = GrayImage::from_fn(width, height, |x, y| {
        let byte = data[y as usize * row_bytes + x as usize / 8];
        let bit = (byte >> (7 - (x % 8))) & 1;
        image::Luma([if bit == 1 { 255 } else { 0 }])
    });
    Some(DynamicImage::ImageLuma8(img))
}

fn cmyk_pixel(cmyk: &[u8]) -> [u8; 3] {
    let k = 255 - u16::from(cmyk[3]);
    let channel = |v: u8| ((255 - u16::from(v)) * k / 255) as u8;
    [channel(cmyk[0]), channel(cmyk[1]), channel(cmyk[2])]
}

fn cmyk_to_rgb(width: u32, height: u32, data: &[u8]) -> RgbImage {
    let mut rgb = RgbImage::new(width, height);
    for (pixel, cmyk) in rgb.pixels_mut().zip(data.chunks_exact(4)) {
        pixel.0 = cmyk_pixel(cmyk);
    }
    rgb
}
