//! Page image lookup by filename convention.

use std::path::{Path, PathBuf};

use crate::naming::page_basename;

/// Candidate paths for a detector filename, in lookup order.
///
/// The filename itself comes first, then `page_<n>.<ext>` for every
/// extension in `extensions`.
pub fn page_image_candidates(pages_dir: &Path, filename: &str, extensions: &[String]) -> Vec<PathBuf> {
    let mut candidates = vec![pages_dir.join(filename)];
    let base = page_basename(filename);
    candidates.extend(
        extensions
            .iter()
            .map(|ext| pages_dir.join(format!("{}.{}", base, ext.trim_start_matches('.')))),
    );
    candidates
}

/// First existing page image for `filename`, if any.
pub fn locate_page_image(pages_dir: &Path, filename: &str, extensions: &[String]) -> Option<PathBuf> {
    page_image_candidates(pages_dir, filename, extensions)
        .into_iter()
        .find(|p| p.is_file())
}
