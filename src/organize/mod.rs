//! Archive folder housekeeping: interactive renames and folder flattening.
//!
//! Renames go through the [`Prompt`] trait so the walk can be driven by a
//! terminal, a script, or a test.

mod flatten;

pub use flatten::{flatten_folder, FlattenOutcome};

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Source of new names during an interactive rename.
pub trait Prompt {
    /// Ask for a value, offering `default` as the pre-filled answer.
    fn ask(&mut self, message: &str, default: &str) -> Result<String>;
}

/// Outcome of a rename walk.
#[derive(Debug, Clone, Default)]
pub struct RenameReport {
    /// `(old, new)` paths of successful renames
    pub renamed: Vec<(PathBuf, PathBuf)>,

    /// Paths whose rename failed, with the error text
    pub failed: Vec<(PathBuf, String)>,
}

impl RenameReport {
    fn record(&mut self, from: PathBuf, to: PathBuf, result: std::io::Result<()>) -> bool {
        match result {
            Ok(()) => {
                log::info!("renamed {} -> {}", from.display(), to.display());
                self.renamed.push((from, to));
                true
            }
            Err(e) => {
                log::warn!("could not rename {}: {}", from.display(), e);
                self.failed.push((from, e.to_string()));
                false
            }
        }
    }
}

/// Trimmed answer if it names something other than `current`.
fn accepted_answer(answer: &str, current: &str) -> Option<String> {
    let answer = answer.trim();
    (!answer.is_empty() && answer != current).then(|| answer.to_string())
}

/// Folders (or everything else) directly in `dir`. Symlinks never count as folders.
fn sorted_children(dir: &Path, want_dirs: bool) -> Result<Vec<PathBuf>> {
    let mut children = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() == want_dirs {
            children.push(entry.path());
        }
    }
    children.sort();
    Ok(children)
}

fn ensure_dir(root: &Path) -> Result<()> {
    if root.is_dir() {
        Ok(())
    } else {
        Err(Error::NotADirectory(root.to_path_buf()))
    }
}

/// Offer a new name for every folder below `root`, top-down.
///
/// Subfolders of a renamed folder are visited under the new name.
pub fn rename_folders(root: &Path, prompt: &mut dyn Prompt) -> Result<RenameReport> {
    ensure_dir(root)?;
    let mut report = RenameReport::default();
    rename_folders_in(root, prompt, &mut report)?;
    Ok(report)
}

fn rename_folders_in(dir: &Path, prompt: &mut dyn Prompt, report: &mut RenameReport) -> Result<()> {
    for folder in sorted_children(dir, true)? {
        let name = folder
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let answer = prompt.ask(&format!("New name for folder {}:", folder.display()), &name)?;

        let mut current = folder;
        if let Some(new_name) = accepted_answer(&answer, &name) {
            let target = dir.join(new_name);
            let result = fs::rename(&current, &target);
            if report.record(current.clone(), target.clone(), result) {
                current = target;
            }
        }
        rename_folders_in(&current, prompt, report)?;
    }
    Ok(())
}

/// Offer a new base name for every file below `root`; extensions are kept.
pub fn rename_files(root: &Path, prompt: &mut dyn Prompt) -> Result<RenameReport> {
    ensure_dir(root)?;
    let mut report = RenameReport::default();
    rename_files_in(root, prompt, &mut report)?;
    Ok(report)
}

fn rename_files_in(dir: &Path, prompt: &mut dyn Prompt, report: &mut RenameReport) -> Result<()> {
    for file in sorted_children(dir, false)? {
        let stem = file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let answer = prompt.ask(&format!("New name for file {}:", file.display()), &stem)?;

        if let Some(new_stem) = accepted_answer(&answer, &stem) {
            let new_name = match file.extension() {
                Some(ext) => format!("{}.{}", new_stem, ext.to_string_lossy()),
                None => new_stem,
            };
            let target = dir.join(new_name);
            let result = fs::rename(&file, &target);
            report.record(file, target, result);
        }
    }
    for folder in sorted_children(dir, true)? {
        rename_files_in(&folder, prompt, report)?;
    }
    Ok(())
}
