//! Integration tests for layout loading and coverage reports.

use std::fs;

use panelkit::layout::{load_layout, to_json, JsonFormat};
use panelkit::naming::sorted_by_page_number;
use panelkit::{coverage_report, CoverageSummary, Error, PageRecord, PanelRect, PercentageRecord};

#[test]
fn test_coverage_report_file() {
    let dir = tempfile::tempdir().unwrap();
    let layout = dir.path().join("layout.json");
    fs::write(
        &layout,
        r#"[
            {"filename": "página-1.jpg", "size": [100, 200], "panels": [[0, 0, 50, 100], [50, 100, 50, 100]]},
            {"filename": "002.jpg", "size": [300, 300], "panels": [[0, 0, 100, 100]]},
            {"filename": "003.jpg", "size": [10, 10], "panels": []}
        ]"#,
    )
    .unwrap();
    let output = dir.path().join("report/coverage.json");

    let records = coverage_report(&layout, &output).unwrap();
    let values: Vec<f64> = records.iter().map(|r| r.panel_percentage).collect();
    assert_eq!(values, vec![50.0, 11.11, 0.0]);

    let text = fs::read_to_string(&output).unwrap();
    assert!(text.contains("página-1.jpg"));
    assert!(text.contains("\n    {"));
    assert!(text.contains("\"panel_percentage\": 11.11"));

    let reloaded: Vec<PercentageRecord> = serde_json::from_str(&text).unwrap();
    assert_eq!(reloaded, records);
}

#[test]
fn test_zero_area_page_fails() {
    let dir = tempfile::tempdir().unwrap();
    let layout = dir.path().join("layout.json");
    fs::write(
        &layout,
        r#"[{"filename": "blank.jpg", "size": [0, 500], "panels": [[0, 0, 1, 1]]}]"#,
    )
    .unwrap();

    let result = coverage_report(&layout, dir.path().join("out.json"));
    assert!(matches!(result, Err(Error::ZeroPageArea(0, 500))));
    assert!(!dir.path().join("out.json").exists());
}

#[test]
fn test_invalid_layout() {
    let dir = tempfile::tempdir().unwrap();
    let layout = dir.path().join("layout.json");
    fs::write(&layout, r#"{"filename": "not an array"}"#).unwrap();
    assert!(matches!(load_layout(&layout), Err(Error::InvalidLayout(_))));

    assert!(matches!(
        load_layout(dir.path().join("absent.json")),
        Err(Error::Io(_))
    ));
}

#[test]
fn test_layout_written_and_reloaded() {
    let dir = tempfile::tempdir().unwrap();
    let pages = vec![
        PageRecord::new("001.jpg", 800, 1200).with_panel(PanelRect::new(10, 10, 380, 580)),
        PageRecord::new("002.jpg", 800, 1200),
    ];
    let path = dir.path().join("layout.json");
    fs::write(&path, to_json(&pages, JsonFormat::Compact).unwrap()).unwrap();

    let loaded = load_layout(&path).unwrap();
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded[0].rects(), vec![PanelRect::new(10, 10, 380, 580)]);
    assert_eq!(loaded[1].panel_count(), 0);
}

#[test]
fn test_summary_of_report() {
    let records = vec![
        PercentageRecord {
            filename: "a".into(),
            size: (10, 10),
            panel_percentage: 20.0,
        },
        PercentageRecord {
            filename: "b".into(),
            size: (10, 10),
            panel_percentage: 70.0,
        },
    ];
    let summary = CoverageSummary::from_records(&records).unwrap();
    assert_eq!(summary.pages, 2);
    assert_eq!(summary.mean, 45.0);
}

#[test]
fn test_page_number_ordering() {
    let names = sorted_by_page_number(["page10.json", "page2.json", "cover.json", "page1.json"]);
    assert_eq!(
        names,
        vec!["page1.json", "page2.json", "page10.json", "cover.json"]
    );
}
