//! Integration tests for PDF/EPUB assembly and PDF unpacking.

use std::fs::{self, File};
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use image::{Rgb, RgbImage};
use panelkit::assemble::{collect_chapters, PanelAssembler};
use panelkit::error::Result;
use panelkit::{
    AssembleOptions, AssemblerRegistry, AssemblyReport, ContainerFormat, OutputDocument, Unpacker,
};
use tempfile::TempDir;

/// Builds `base/<chapter>/<panel>.png` with distinct sizes per panel.
fn panel_tree(chapters: usize, panels: usize) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for c in 0..chapters {
        let chapter = dir.path().join(format!("page_{}", c + 1));
        fs::create_dir_all(&chapter).unwrap();
        for p in 0..panels {
            let width = 20 + (c * panels + p) as u32;
            RgbImage::from_pixel(width, 30, Rgb([200, 40, 40]))
                .save(chapter.join(format!("panel_{:02}.png", p + 1)))
                .unwrap();
        }
    }
    dir
}

fn read_entry(archive: &mut zip::ZipArchive<File>, name: &str) -> String {
    let mut text = String::new();
    archive
        .by_name(name)
        .unwrap()
        .read_to_string(&mut text)
        .unwrap();
    text
}

struct CountingAssembler;

impl PanelAssembler for CountingAssembler {
    fn name(&self) -> &str {
        "count"
    }

    fn extension(&self) -> &str {
        "txt"
    }

    fn assemble(
        &self,
        document: &OutputDocument,
        output: &Path,
        _options: &AssembleOptions,
    ) -> Result<AssemblyReport> {
        fs::write(output, document.image_count().to_string())?;
        let mut report = AssemblyReport::new(output);
        report.pages_written = document.image_count();
        Ok(report)
    }
}

#[test]
fn test_pdf_page_per_panel() {
    let base = panel_tree(2, 3);
    let out = tempfile::tempdir().unwrap();
    let output = out.path().join("book.pdf");

    let report = panelkit::assemble(base.path(), &output, &AssembleOptions::default()).unwrap();
    assert_eq!(report.pages_written, 6);
    assert!(report.skipped.is_empty());

    let doc = lopdf::Document::load(&output).unwrap();
    let pages = doc.get_pages();
    assert_eq!(pages.len(), 6);

    // Chapter-major order: page_1/panel_01..03, then page_2/panel_01..03
    let widths: Vec<i64> = pages
        .values()
        .map(|&page_id| {
            let media_box = doc
                .get_dictionary(page_id)
                .unwrap()
                .get(b"MediaBox")
                .unwrap()
                .as_array()
                .unwrap()
                .iter()
                .map(|o| o.as_i64().unwrap())
                .collect::<Vec<_>>();
            assert_eq!(media_box[..2], [0, 0]);
            assert_eq!(media_box[3], 30);
            media_box[2]
        })
        .collect();
    assert_eq!(widths, vec![20, 21, 22, 23, 24, 25]);
}

#[test]
fn test_pdf_skips_corrupt_image() {
    let base = panel_tree(1, 2);
    fs::write(base.path().join("page_1/panel_03.png"), b"garbage").unwrap();
    let out = tempfile::tempdir().unwrap();

    let report =
        panelkit::assemble(base.path(), out.path().join("book.pdf"), &AssembleOptions::default())
            .unwrap();
    assert_eq!(report.pages_written, 2);
    assert_eq!(report.skipped.len(), 1);
}

#[test]
fn test_epub_structure() {
    let base = panel_tree(2, 2);
    let out = tempfile::tempdir().unwrap();
    let output = out.path().join("book.epub");
    let options = AssembleOptions::new()
        .with_title("Test Comic")
        .with_author("Someone");

    let report = panelkit::assemble(base.path(), &output, &options).unwrap();
    assert_eq!(report.pages_written, 4);

    let mut archive = zip::ZipArchive::new(File::open(&output).unwrap()).unwrap();
    assert_eq!(archive.by_index(0).unwrap().name(), "mimetype");
    assert_eq!(read_entry(&mut archive, "mimetype"), "application/epub+zip");

    let opf = read_entry(&mut archive, "OEBPS/content.opf");
    assert_eq!(opf.matches("<itemref").count(), 4);
    assert!(opf.contains("Test Comic"));
    assert!(opf.contains("Someone"));

    let nav = read_entry(&mut archive, "OEBPS/nav.xhtml");
    assert_eq!(nav.matches("<li>").count(), 4);
    assert!(archive.by_name("OEBPS/text/chapter_0004.xhtml").is_ok());
    assert!(archive.by_name("OEBPS/images/image_0001.png").is_ok());

    let ncx = read_entry(&mut archive, "OEBPS/toc.ncx");
    assert_eq!(ncx.matches("<navPoint").count(), 4);
    assert!(ncx.contains("playOrder=\"4\""));
}

#[test]
fn test_epub_reading_order() {
    let base = panel_tree(2, 2);
    let out = tempfile::tempdir().unwrap();
    let output = out.path().join("book.epub");
    panelkit::assemble(base.path(), &output, &AssembleOptions::default()).unwrap();

    let mut archive = zip::ZipArchive::new(File::open(&output).unwrap()).unwrap();
    let expected = [
        "page_1 - panel_01",
        "page_1 - panel_02",
        "page_2 - panel_01",
        "page_2 - panel_02",
    ];

    for entry in ["OEBPS/nav.xhtml", "OEBPS/toc.ncx"] {
        let text = read_entry(&mut archive, entry);
        let positions: Vec<usize> = expected
            .iter()
            .map(|title| text.find(title).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{} out of order", entry);
    }

    let opf = read_entry(&mut archive, "OEBPS/content.opf");
    let spine: Vec<&str> = opf
        .match_indices("<itemref idref=\"")
        .map(|(i, m)| &opf[i + m.len()..i + m.len() + "chapter_0001".len()])
        .collect();
    assert_eq!(
        spine,
        vec!["chapter_0001", "chapter_0002", "chapter_0003", "chapter_0004"]
    );

    // Panel widths encode their position in the tree
    for (i, width) in (20..24).enumerate() {
        let mut bytes = Vec::new();
        archive
            .by_name(&format!("OEBPS/images/image_{:04}.png", i + 1))
            .unwrap()
            .read_to_end(&mut bytes)
            .unwrap();
        assert_eq!(image::load_from_memory(&bytes).unwrap().width(), width);

        let chapter = read_entry(&mut archive, &format!("OEBPS/text/chapter_{:04}.xhtml", i + 1));
        assert!(chapter.contains(expected[i]));
        assert!(chapter.contains(&format!("image_{:04}.png", i + 1)));
    }
}

#[test]
fn test_all_corrupt_images_write_nothing() {
    let base = tempfile::tempdir().unwrap();
    let chapter = base.path().join("page_1");
    fs::create_dir_all(&chapter).unwrap();
    fs::write(chapter.join("panel_01.png"), b"not a png").unwrap();
    fs::write(chapter.join("panel_02.jpg"), b"not a jpeg").unwrap();
    let out = tempfile::tempdir().unwrap();

    for name in ["book.pdf", "book.epub"] {
        let output = out.path().join(name);
        let result = panelkit::assemble(base.path(), &output, &AssembleOptions::default());
        assert!(
            matches!(result, Err(panelkit::Error::NoReadableImages(ref p)) if p == &output),
            "{}: {:?}",
            name,
            result
        );
        assert!(!output.exists(), "{} should not be written", name);
    }
}

#[test]
fn test_unknown_output_extension() {
    let base = panel_tree(1, 1);
    let out = tempfile::tempdir().unwrap();
    let result = panelkit::assemble(base.path(), out.path().join("book.cbz"), &AssembleOptions::default());
    assert!(result.is_err());
}

#[test]
fn test_registry_custom_assembler() {
    let base = panel_tree(1, 2);
    let out = tempfile::tempdir().unwrap();
    let output = out.path().join("count.txt");

    let mut registry = AssemblerRegistry::with_defaults();
    registry.register(Arc::new(CountingAssembler));
    assert!(registry.supports("txt"));

    let report = registry
        .assemble_to(base.path(), &output, &AssembleOptions::default())
        .unwrap();
    assert_eq!(report.pages_written, 2);
    assert_eq!(fs::read_to_string(&output).unwrap(), "2");
}

#[test]
fn test_collect_chapters_order() {
    let base = panel_tree(3, 1);
    fs::write(base.path().join("page_2/notes.txt"), b"x").unwrap();
    fs::write(base.path().join("stray.png"), b"x").unwrap();

    let document = collect_chapters(base.path(), &AssembleOptions::default()).unwrap();
    let names: Vec<_> = document.chapters.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["page_1", "page_2", "page_3"]);
    assert_eq!(document.image_count(), 3);
}

#[test]
fn test_unpack_assembled_pdf() {
    let base = panel_tree(1, 3);
    let out = tempfile::tempdir().unwrap();
    let pdf = out.path().join("issue.pdf");
    panelkit::assemble(base.path(), &pdf, &AssembleOptions::default()).unwrap();

    let report = Unpacker::new().unpack(&pdf, out.path().join("pages")).unwrap();
    assert_eq!(report.format, ContainerFormat::Pdf);
    assert_eq!(report.output_dir, out.path().join("pages/issue"));
    assert_eq!(report.files.len(), 3);

    let first = report.output_dir.join("page_1.png");
    let img = image::open(&first).unwrap();
    assert_eq!((img.width(), img.height()), (20, 30));
}
