//! File naming conventions shared by the pipeline steps.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

fn number_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\d+").expect("static pattern"))
}

/// First run of digits in `name`, used to order page files numerically.
///
/// Names without digits sort after every numbered name.
pub fn numeric_key(name: &str) -> u64 {
    number_pattern()
        .find(name)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(u64::MAX)
}

/// Sort names by [`numeric_key`], keeping lexicographic order among ties.
pub fn sort_by_page_number(names: &mut [String]) {
    names.sort_by(|a, b| numeric_key(a).cmp(&numeric_key(b)).then_with(|| a.cmp(b)));
}

/// Owned, page-number-sorted copy of `names`.
pub fn sorted_by_page_number<I, S>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut names: Vec<String> = names.into_iter().map(Into::into).collect();
    sort_by_page_number(&mut names);
    names
}

/// Page image basename for a detector filename.
///
/// Drops a leading `-`, the extension and leading zeros, then prefixes
/// `page_`: `-003.jpg` becomes `page_3`.
pub fn page_basename(filename: &str) -> String {
    let name = Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(filename);
    let name = name.trim_start_matches('-');
    let stem = match name.rsplit_once('.') {
        Some((stem, _)) => stem,
        None => name,
    };
    let number = stem.trim_start_matches('0');
    let number = if number.is_empty() && !stem.is_empty() {
        "0"
    } else {
        number
    };
    format!("page_{}", number)
}

/// Digits needed to print `count` (at least 1).
pub fn digit_width(count: usize) -> usize {
    count.max(1).to_string().len()
}

/// `index` zero-padded to `width` digits.
pub fn padded(index: usize, width: usize) -> String {
    format!("{:0width$}", index, width = width)
}

/// File stem of `path` as UTF-8, lossy.
pub fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Lowercase extension of `path`, without the dot.
pub fn extension_lower(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}
