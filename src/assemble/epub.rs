//! EPUB 3 output: one fixed-layout chapter per panel image.

use std::fs::File;
use std::io::{Cursor, Seek, Write};
use std::path::Path;

use image::{GenericImageView, ImageFormat};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::{AssembleOptions, AssemblyReport, PanelAssembler};
use crate::error::{Error, Result};
use crate::model::OutputDocument;
use crate::naming::file_stem;

const CONTAINER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>
"#;

/// One chapter of the book, ready to be written.
struct EpubChapter {
    title: String,
    image_file: String,
    media_type: &'static str,
    width: u32,
    height: u32,
}

impl EpubChapter {
    fn id(index: usize) -> String {
        format!("chapter_{:04}", index + 1)
    }

    fn xhtml(&self, language: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops" xml:lang="{lang}">
<head>
  <title>{title}</title>
  <meta name="viewport" content="width={w}, height={h}"/>
  <style>body {{ margin: 0; padding: 0; }} img {{ width: 100%; height: 100%; }}</style>
</head>
<body>
  <img src="../images/{src}" alt="{title}"/>
</body>
</html>
"#,
            lang = escape_xml(language),
            title = escape_xml(&self.title),
            w = self.width,
            h = self.height,
            src = self.image_file,
        )
    }
}

/// Writes panel images as an EPUB 3 book, one chapter per image.
///
/// Spine, navigation document and NCX all list chapters in the same order.
#[derive(Debug, Clone, Default)]
pub struct EpubAssembler {
    _private: (),
}

impl EpubAssembler {
    /// Create a new EPUB assembler.
    pub fn new() -> Self {
        Self { _private: () }
    }

    /// Write the book to any seekable writer.
    pub fn write_to<W: Write + Seek>(
        &self,
        writer: W,
        document: &OutputDocument,
        options: &AssembleOptions,
        report: &mut AssemblyReport,
    ) -> Result<W> {
        let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        let mut zip = ZipWriter::new(writer);

        // Must be the first entry, uncompressed
        zip.start_file("mimetype", stored)?;
        zip.write_all(b"application/epub+zip")?;

        zip.start_file("META-INF/container.xml", deflated)?;
        zip.write_all(CONTAINER_XML.as_bytes())?;

        let mut chapters = Vec::new();
        for (chapter, path) in document.images() {
            let bytes = match std::fs::read(path) {
                Ok(bytes) => bytes,
                Err(e) => {
                    report.skip(path, e);
                    continue;
                }
            };
            let (data, format) = match prepare_image(bytes) {
                Ok(prepared) => prepared,
                Err(e) => {
                    report.skip(path, e);
                    continue;
                }
            };

            let index = chapters.len();
            let (media_type, ext) = media_type(format);
            let image_file = format!("image_{:04}.{}", index + 1, ext);

            // Already-compressed formats gain nothing from deflate
            zip.start_file(format!("OEBPS/images/{}", image_file), stored)?;
            zip.write_all(&data.bytes)?;

            let epub_chapter = EpubChapter {
                title: format!("{} - {}", chapter.name, file_stem(path)),
                image_file,
                media_type,
                width: data.width,
                height: data.height,
            };
            zip.start_file(
                format!("OEBPS/text/{}.xhtml", EpubChapter::id(index)),
                deflated,
            )?;
            zip.write_all(epub_chapter.xhtml(&options.language).as_bytes())?;
            chapters.push(epub_chapter);
        }

        if chapters.is_empty() {
            return Err(Error::NoReadableImages(report.output.clone()));
        }

        zip.start_file("OEBPS/nav.xhtml", deflated)?;
        zip.write_all(nav_xhtml(document, options, &chapters).as_bytes())?;

        zip.start_file("OEBPS/toc.ncx", deflated)?;
        zip.write_all(toc_ncx(document, &chapters).as_bytes())?;

        zip.start_file("OEBPS/content.opf", deflated)?;
        zip.write_all(content_opf(document, options, &chapters).as_bytes())?;

        report.pages_written = chapters.len();
        Ok(zip.finish()?)
    }
}

impl PanelAssembler for EpubAssembler {
    fn name(&self) -> &str {
        "epub"
    }

    fn extension(&self) -> &str {
        "epub"
    }

    fn assemble(
        &self,
        document: &OutputDocument,
        output: &Path,
        options: &AssembleOptions,
    ) -> Result<AssemblyReport> {
        let mut report = AssemblyReport::new(output);
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(output)?;
        if let Err(e) = self.write_to(file, document, options, &mut report) {
            // Don't leave a truncated book behind
            if let Err(remove_err) = std::fs::remove_file(output) {
                log::warn!("could not remove {}: {}", output.display(), remove_err);
            }
            return Err(e);
        }
        log::info!(
            "wrote {} ({} chapters, {} skipped)",
            output.display(),
            report.pages_written,
            report.skipped.len()
        );
        Ok(report)
    }
}

struct ImageData {
    bytes: Vec<u8>,
    width: u32,
    height: u32,
}

/// Validate image bytes; formats EPUB readers may not support become PNG.
fn prepare_image(bytes: Vec<u8>) -> Result<(ImageData, ImageFormat)> {
    let format = image::guess_format(&bytes)?;
    let decoded = image::load_from_memory_with_format(&bytes, format)?;
    let (width, height) = decoded.dimensions();

    match format {
        ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::Gif => Ok((
            ImageData {
                bytes,
                width,
                height,
            },
            format,
        )),
        _ => {
            let mut png = Vec::new();
            decoded.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
            Ok((
                ImageData {
                    bytes: png,
                    width,
                    height,
                },
                ImageFormat::Png,
            ))
        }
    }
}

fn media_type(format: ImageFormat) -> (&'static str, &'static str) {
    match format {
        ImageFormat::Jpeg => ("image/jpeg", "jpg"),
        ImageFormat::Gif => ("image/gif", "gif"),
        _ => ("image/png", "png"),
    }
}

fn nav_xhtml(document: &OutputDocument, options: &AssembleOptions, chapters: &[EpubChapter]) -> String {
    let items: String = chapters
        .iter()
        .enumerate()
        .map(|(i, c)| {
            format!(
                "      <li><a href=\"text/{}.xhtml\">{}</a></li>\n",
                EpubChapter::id(i),
                escape_xml(&c.title)
            )
        })
        .collect();

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops" xml:lang="{lang}">
<head>
  <title>{title}</title>
</head>
<body>
  <nav epub:type="toc" id="toc">
    <h1>{title}</h1>
    <ol>
{items}    </ol>
  </nav>
</body>
</html>
"#,
        lang = escape_xml(&options.language),
        title = escape_xml(&document.title),
        items = items,
    )
}

fn toc_ncx(document: &OutputDocument, chapters: &[EpubChapter]) -> String {
    let points: String = chapters
        .iter()
        .enumerate()
        .map(|(i, c)| {
            format!(
                "    <navPoint id=\"nav_{id}\" playOrder=\"{order}\">\n      <navLabel><text>{title}</text></navLabel>\n      <content src=\"text/{id}.xhtml\"/>\n    </navPoint>\n",
                id = EpubChapter::id(i),
                order = i + 1,
                title = escape_xml(&c.title)
            )
        })
        .collect();

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head>
    <meta name="dtb:uid" content="{uid}"/>
    <meta name="dtb:depth" content="1"/>
    <meta name="dtb:totalPageCount" content="0"/>
    <meta name="dtb:maxPageNumber" content="0"/>
  </head>
  <docTitle><text>{title}</text></docTitle>
  <navMap>
{points}  </navMap>
</ncx>
"#,
        uid = escape_xml(&book_identifier(document)),
        title = escape_xml(&document.title),
        points = points,
    )
}

fn content_opf(document: &OutputDocument, options: &AssembleOptions, chapters: &[EpubChapter]) -> String {
    let modified = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");

    let mut manifest = String::new();
    manifest.push_str(
        "    <item id=\"nav\" href=\"nav.xhtml\" media-type=\"application/xhtml+xml\" properties=\"nav\"/>\n",
    );
    manifest.push_str(
        "    <item id=\"ncx\" href=\"toc.ncx\" media-type=\"application/x-dtbncx+xml\"/>\n",
    );
    let mut spine = String::new();

    for (i, c) in chapters.iter().enumerate() {
        let id = EpubChapter::id(i);
        let cover = if i == 0 { " properties=\"cover-image\"" } else { "" };
        manifest.push_str(&format!(
            "    <item id=\"img_{id}\" href=\"images/{file}\" media-type=\"{mt}\"{cover}/>\n",
            id = id,
            file = c.image_file,
            mt = c.media_type,
            cover = cover
        ));
        manifest.push_str(&format!(
            "    <item id=\"{id}\" href=\"text/{id}.xhtml\" media-type=\"application/xhtml+xml\"/>\n",
            id = id
        ));
        spine.push_str(&format!("    <itemref idref=\"{}\"/>\n", id));
    }

    let author = options
        .author
        .as_deref()
        .map(|a| format!("    <dc:creator>{}</dc:creator>\n", escape_xml(a)))
        .unwrap_or_default();

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="book-id">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:identifier id="book-id">{uid}</dc:identifier>
    <dc:title>{title}</dc:title>
    <dc:language>{lang}</dc:language>
{author}    <meta property="dcterms:modified">{modified}</meta>
    <meta property="rendition:layout">pre-paginated</meta>
    <meta property="rendition:spread">none</meta>
  </metadata>
  <manifest>
{manifest}  </manifest>
  <spine toc="ncx">
{spine}  </spine>
</package>
"#,
        uid = escape_xml(&book_identifier(document)),
        title = escape_xml(&document.title),
        lang = escape_xml(&options.language),
        author = author,
        modified = modified,
        manifest = manifest,
        spine = spine,
    )
}

fn book_identifier(document: &OutputDocument) -> String {
    let slug: String = document
        .title
        .chars()
        .map(|c| if c.is_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect();
    format!("urn:panelkit:{}", slug.trim_matches('-'))
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Chapter;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("Tom & Jerry <1>"), "Tom &amp; Jerry &lt;1&gt;");
        assert_eq!(escape_xml("\"it's\""), "&quot;it&apos;s&quot;");
    }

    #[test]
    fn test_book_identifier() {
        let doc = OutputDocument::new("Vol. 1: Start");
        assert_eq!(book_identifier(&doc), "urn:panelkit:vol--1--start");
    }

    #[test]
    fn test_prepare_image_keeps_png() {
        let mut png = Vec::new();
        RgbImage::from_pixel(3, 2, Rgb([1, 2, 3]))
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .unwrap();
        let (data, format) = prepare_image(png.clone()).unwrap();
        assert_eq!(format, ImageFormat::Png);
        assert_eq!(data.bytes, png);
        assert_eq!((data.width, data.height), (3, 2));
    }

    #[test]
    fn test_prepare_image_reencodes_bmp() {
        let mut bmp = Vec::new();
        RgbImage::from_pixel(4, 4, Rgb([9, 9, 9]))
            .write_to(&mut Cursor::new(&mut bmp), ImageFormat::Bmp)
            .unwrap();
        let (data, format) = prepare_image(bmp).unwrap();
        assert_eq!(format, ImageFormat::Png);
        assert_eq!(image::guess_format(&data.bytes).unwrap(), ImageFormat::Png);
    }

    #[test]
    fn test_prepare_image_rejects_garbage() {
        assert!(prepare_image(b"definitely not an image".to_vec()).is_err());
    }

    #[test]
    fn test_write_to_memory() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("panel_01.png");
        RgbImage::from_pixel(3, 2, Rgb([1, 2, 3])).save(&image).unwrap();
        let mut chapter = Chapter::new("page_1");
        chapter.images.push(image);
        let mut doc = OutputDocument::new("Memory");
        doc.add_chapter(chapter);

        let mut report = AssemblyReport::new("mem.epub");
        let cursor = EpubAssembler::new()
            .write_to(
                Cursor::new(Vec::new()),
                &doc,
                &AssembleOptions::new(),
                &mut report,
            )
            .unwrap();
        let bytes = cursor.into_inner();
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.by_index(0).unwrap().name(), "mimetype");
        assert!(archive.by_name("OEBPS/content.opf").is_ok());
        assert_eq!(report.pages_written, 1);
    }

    #[test]
    fn test_write_to_without_images_fails() {
        let doc = OutputDocument::new("Empty");
        let mut report = AssemblyReport::new("mem.epub");
        let result = EpubAssembler::new().write_to(
            Cursor::new(Vec::new()),
            &doc,
            &AssembleOptions::new(),
            &mut report,
        );
        assert!(matches!(result, Err(Error::NoReadableImages(_))));
    }
}
