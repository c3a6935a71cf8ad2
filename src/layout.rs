//! Layout descriptor loading and JSON output.

use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::model::PageRecord;

/// JSON output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonFormat {
    /// Pretty-printed JSON with 4-space indentation
    #[default]
    Pretty,
    /// Compact JSON without extra whitespace
    Compact,
}

/// Load a layout file (UTF-8 JSON array of page records).
///
/// A missing file or malformed JSON is fatal for the run.
///
/// # Example
///
/// ```no_run
/// use panelkit::layout::load_layout;
///
/// let pages = load_layout("layout.json")?;
/// println!("{} pages", pages.len());
/// # Ok::<(), panelkit::Error>(())
/// ```
pub fn load_layout<P: AsRef<Path>>(path: P) -> Result<Vec<PageRecord>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    parse_layout(&text).map_err(|e| match e {
        Error::InvalidLayout(msg) => Error::InvalidLayout(format!("{}: {}", path.display(), msg)),
        other => other,
    })
}

/// Parse layout JSON from a string.
pub fn parse_layout(text: &str) -> Result<Vec<PageRecord>> {
    let pages: Vec<PageRecord> = serde_json::from_str(text)?;
    log::debug!("loaded {} page records", pages.len());
    Ok(pages)
}

/// Serialize a value to JSON.
pub fn to_json<T: Serialize + ?Sized>(value: &T, format: JsonFormat) -> Result<String> {
    let bytes = match format {
        JsonFormat::Pretty => {
            let mut buf = Vec::new();
            let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
            let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
            value.serialize(&mut ser)?;
            buf
        }
        JsonFormat::Compact => serde_json::to_vec(value)?,
    };

    String::from_utf8(bytes).map_err(|e| Error::Other(format!("JSON output is not UTF-8: {}", e)))
}

/// Serialize a value to a JSON file, creating parent directories.
pub fn write_json<T: Serialize + ?Sized, P: AsRef<Path>>(
    path: P,
    value: &T,
    format: JsonFormat,
) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, to_json(value, format)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PercentageRecord;

    #[test]
    fn test_parse_layout() {
        let text = r#"[
            {"filename": "01.jpg", "size": [100, 200], "panels": [[0, 0, 50, 50]]},
            {"filename": "02.jpg", "size": [100, 200], "panels": []}
        ]"#;
        let pages = parse_layout(text).unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].filename, "01.jpg");
        assert_eq!(pages[1].panel_count(), 0);
    }

    #[test]
    fn test_parse_layout_malformed() {
        let result = parse_layout("[{\"filename\": \"01.jpg\"");
        assert!(matches!(result, Err(Error::InvalidLayout(_))));

        let result = parse_layout("{\"filename\": \"01.jpg\"}");
        assert!(matches!(result, Err(Error::InvalidLayout(_))));
    }

    #[test]
    fn test_load_layout_missing_file() {
        let result = load_layout("/nonexistent/layout.json");
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_to_json_pretty_indent() {
        let rows = vec![PercentageRecord {
            filename: "página.jpg".to_string(),
            size: (10, 10),
            panel_percentage: 12.5,
        }];
        let json = to_json(&rows, JsonFormat::Pretty).unwrap();
        assert!(json.contains("\n    {\n        \"filename\": \"página.jpg\""));
        assert!(json.contains("\"panel_percentage\": 12.5"));
    }

    #[test]
    fn test_to_json_compact() {
        let json = to_json(&vec![1, 2, 3], JsonFormat::Compact).unwrap();
        assert_eq!(json, "[1,2,3]");
    }
}
