//! CBZ (zip) extraction.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use zip::ZipArchive;

use crate::error::Result;

/// Extract every file entry of a zip archive into `dest`.
///
/// Entries whose names would escape `dest` are skipped.
pub(super) fn extract(archive: &Path, dest: &Path) -> Result<Vec<PathBuf>> {
    let mut zip = ZipArchive::new(File::open(archive)?)?;
    let mut written = Vec::new();

    for index in 0..zip.len() {
        let mut entry = zip.by_index(index)?;
        let Some(relative) = entry.enclosed_name() else {
            log::warn!("{}: unsafe entry name {:?}, skipped", archive.display(), entry.name());
            continue;
        };
        let target = dest.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&target)?;
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut out = File::create(&target)?;
        io::copy(&mut entry, &mut out)?;
        written.push(target);
    }

    Ok(written)
}
