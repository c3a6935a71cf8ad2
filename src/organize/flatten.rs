use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Result of [`flatten_folder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlattenOutcome {
    /// The chain ended in an empty folder; nothing moved
    Empty,
    /// `main` already holds the content
    Unchanged,
    /// Entries moved up into `main`
    Flattened {
        /// Number of moved entries
        moved: usize,
    },
}

fn entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .collect();
    entries.sort();
    Ok(entries)
}

/// A folder that is not reached through a symlink.
fn is_real_dir(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok_and(|m| m.is_dir())
}

/// Collapse a chain of single-folder wrappers below `main`.
///
/// `main/a/b/{pages}` becomes `main/{pages}`; `a` and `b` are removed.
pub fn flatten_folder(main: &Path) -> Result<FlattenOutcome> {
    if !main.is_dir() {
        return Err(Error::NotADirectory(main.to_path_buf()));
    }

    let mut current = main.to_path_buf();
    let deepest = loop {
        let content = entries(&current)?;
        match content.as_slice() {
            [] => {
                log::info!("{} is empty", current.display());
                if current == main {
                    return Ok(FlattenOutcome::Empty);
                }
                break current;
            }
            [only] if is_real_dir(only) => current = only.clone(),
            _ => break current,
        }
    };

    if deepest == main {
        log::info!("nothing to flatten in {}", main.display());
        return Ok(FlattenOutcome::Unchanged);
    }

    let content = entries(&deepest)?;
    if content.is_empty() {
        // Nothing to move; the chain is left in place.
        return Ok(FlattenOutcome::Empty);
    }

    // The top of the chain may share a name with a moved entry.
    let top = deepest
        .strip_prefix(main)
        .ok()
        .and_then(|rel| rel.components().next())
        .map(|c| main.join(c))
        .ok_or_else(|| Error::Other(format!("{} is not below {}", deepest.display(), main.display())))?;
    let staging = main.join(format!(".panelkit-flatten-{}", std::process::id()));
    fs::rename(&top, &staging)?;
    let deepest = staging.join(deepest.strip_prefix(&top).unwrap_or(Path::new("")));

    let mut moved = 0;
    for item in entries(&deepest)? {
        let Some(name) = item.file_name() else {
            continue;
        };
        let target = main.join(name);
        fs::rename(&item, &target)?;
        log::info!("moved {} -> {}", item.display(), target.display());
        moved += 1;
    }

    fs::remove_dir_all(&staging)?;
    Ok(FlattenOutcome::Flattened { moved })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flatten_chain() {
        let dir = tempfile::tempdir().unwrap();
        let main = dir.path().join("Series");
        fs::create_dir_all(main.join("a/b")).unwrap();
        fs::write(main.join("a/b/001.jpg"), b"1").unwrap();
        fs::write(main.join("a/b/002.jpg"), b"2").unwrap();

        let outcome = flatten_folder(&main).unwrap();
        assert_eq!(outcome, FlattenOutcome::Flattened { moved: 2 });
        assert!(main.join("001.jpg").exists());
        assert!(!main.join("a").exists());
    }

    #[test]
    fn test_flatten_name_collision() {
        let dir = tempfile::tempdir().unwrap();
        let main = dir.path().join("Series");
        fs::create_dir_all(main.join("pages/pages")).unwrap();
        fs::write(main.join("pages/pages/001.jpg"), b"1").unwrap();
        fs::write(main.join("pages/pages/002.jpg"), b"2").unwrap();

        let outcome = flatten_folder(&main).unwrap();
        assert_eq!(outcome, FlattenOutcome::Flattened { moved: 2 });
        assert!(main.join("001.jpg").is_file());
    }

    #[test]
    fn test_flatten_unchanged_and_empty() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.jpg"), b"").unwrap();
        fs::write(dir.path().join("b.jpg"), b"").unwrap();
        assert_eq!(flatten_folder(dir.path()).unwrap(), FlattenOutcome::Unchanged);

        let empty = tempfile::tempdir().unwrap();
        assert_eq!(flatten_folder(empty.path()).unwrap(), FlattenOutcome::Empty);
    }

    #[test]
    fn test_flatten_single_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("only.jpg"), b"").unwrap();
        assert_eq!(flatten_folder(dir.path()).unwrap(), FlattenOutcome::Unchanged);
    }

    #[cfg(unix)]
    #[test]
    fn test_flatten_stops_at_symlinked_folder() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("wrap")).unwrap();
        std::os::unix::fs::symlink(dir.path(), dir.path().join("wrap/self")).unwrap();

        let outcome = flatten_folder(dir.path()).unwrap();
        assert_eq!(outcome, FlattenOutcome::Flattened { moved: 1 });
        let moved = fs::symlink_metadata(dir.path().join("self")).unwrap();
        assert!(moved.file_type().is_symlink());
        assert!(!dir.path().join("wrap").exists());
    }
}
