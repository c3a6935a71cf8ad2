//! PDF output: one page per panel image, page size = image size.

use std::io::Write;
use std::path::Path;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};

use super::{AssembleOptions, AssemblyReport, PanelAssembler};
use crate::error::{Error, Result};
use crate::model::OutputDocument;

/// Writes each panel image as a full-bleed PDF page.
///
/// Page MediaBox is `[0 0 width height]` in the image's pixel units, so
/// viewers show panels at their native aspect ratio.
#[derive(Debug, Clone, Default)]
pub struct PdfAssembler {
    _private: (),
}

impl PdfAssembler {
    /// Create a new PDF assembler.
    pub fn new() -> Self {
        Self { _private: () }
    }

    fn add_image_page(
        &self,
        doc: &mut Document,
        pages_id: ObjectId,
        image: &image::DynamicImage,
    ) -> Result<ObjectId> {
        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();
        let (width, height) = (i64::from(width), i64::from(height));

        let image_stream = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width,
                "Height" => height,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8i64,
                "Filter" => "FlateDecode",
            },
            deflate(rgb.as_raw())?,
        )
        .with_compression(false);
        let image_id = doc.add_object(image_stream);

        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        Object::Integer(width),
                        Object::Integer(0),
                        Object::Integer(0),
                        Object::Integer(height),
                        Object::Integer(0),
                        Object::Integer(0),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
                Operation::new("Q", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(width),
                Object::Integer(height),
            ],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => dictionary! {
                    "Im0" => image_id,
                },
            },
        });

        Ok(page_id)
    }
}

impl PanelAssembler for PdfAssembler {
    fn name(&self) -> &str {
        "pdf"
    }

    fn extension(&self) -> &str {
        "pdf"
    }

    fn assemble(
        &self,
        document: &OutputDocument,
        output: &Path,
        options: &AssembleOptions,
    ) -> Result<AssemblyReport> {
        let mut report = AssemblyReport::new(output);
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let mut kids: Vec<Object> = Vec::new();

        for (_, path) in document.images() {
            let image = match image::open(path) {
                Ok(image) => image,
                Err(e) => {
                    report.skip(path, e);
                    continue;
                }
            };
            let page_id = self.add_image_page(&mut doc, pages_id, &image)?;
            kids.push(page_id.into());
            report.pages_written += 1;
        }

        if kids.is_empty() {
            return Err(Error::NoReadableImages(output.to_path_buf()));
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut info = dictionary! {
            "Title" => text_string(&document.title),
            "Producer" => text_string(concat!("panelkit ", env!("CARGO_PKG_VERSION"))),
        };
        if let Some(ref author) = options.author {
            info.set("Author", text_string(author));
        }
        let info_id = doc.add_object(info);
        doc.trailer.set("Info", info_id);

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        doc.save(output)?;
        log::info!(
            "wrote {} ({} pages, {} skipped)",
            output.display(),
            report.pages_written,
            report.skipped.len()
        );
        Ok(report)
    }
}

fn deflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// PDF text string: plain for ASCII, UTF-16BE with BOM otherwise.
fn text_string(text: &str) -> Object {
    if text.is_ascii() {
        Object::string_literal(text)
    } else {
        let mut bytes = vec![0xFE, 0xFF];
        bytes.extend(text.encode_utf16().flat_map(|u| u.to_be_bytes()));
        Object::String(bytes, StringFormat::Hexadecimal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pdf_assembler_name() {
        let assembler = PdfAssembler::new();
        assert_eq!(assembler.name(), "pdf");
        assert_eq!(assembler.extension(), "pdf");
    }

    #[test]
    fn test_text_string_encoding() {
        assert!(matches!(
            text_string("Issue 1"),
            Object::String(ref b, StringFormat::Literal) if b == b"Issue 1"
        ));
        match text_string("Edição") {
            Object::String(bytes, StringFormat::Hexadecimal) => {
                assert_eq!(&bytes[..2], &[0xFE, 0xFF]);
                assert_eq!(bytes.len(), 2 + 6 * 2);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_deflate_roundtrip() {
        use flate2::read::ZlibDecoder;
        use std::io::Read;

        let packed = deflate(&[7u8; 300]).unwrap();
        let mut out = Vec::new();
        ZlibDecoder::new(&packed[..]).read_to_end(&mut out).unwrap();
        assert_eq!(out, vec![7u8; 300]);
    }
}
