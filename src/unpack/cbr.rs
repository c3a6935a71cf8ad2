//! CBR (rar) extraction through an external 7-Zip.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::external::run_tool;

/// 7-Zip arguments: extract with paths into `dest`, assume yes.
fn arguments(archive: &Path, dest: &Path) -> Vec<OsString> {
    let mut output = OsString::from("-o");
    output.push(dest.as_os_str());
    vec![
        OsString::from("x"),
        output,
        archive.as_os_str().to_owned(),
        OsString::from("-y"),
    ]
}

pub(super) fn extract(seven_zip: &str, archive: &Path, dest: &Path) -> Result<Vec<PathBuf>> {
    run_tool(seven_zip, arguments(archive, dest))?;
    list_files(dest)
}

/// Files under `dir`, sorted, recursively. Symlinked folders are not entered.
fn list_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        entries.push((entry.path(), entry.file_type()?.is_dir()));
    }
    entries.sort();
    for (path, is_dir) in entries {
        if is_dir {
            files.extend(list_files(&path)?);
        } else {
            files.push(path);
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arguments() {
        let args = arguments(Path::new("comic.cbr"), Path::new("out/comic"));
        let args: Vec<_> = args.iter().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(args, vec!["x", "-oout/comic", "comic.cbr", "-y"]);
    }

    #[test]
    fn test_list_files_recursive() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("b.jpg"), b"").unwrap();
        fs::write(dir.path().join("sub/a.jpg"), b"").unwrap();
        let files = list_files(dir.path()).unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0], dir.path().join("b.jpg"));
    }

    #[cfg(unix)]
    #[test]
    fn test_list_files_does_not_follow_symlink_loop() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/a.jpg"), b"").unwrap();
        std::os::unix::fs::symlink(dir.path(), dir.path().join("sub/loop")).unwrap();

        let files = list_files(dir.path()).unwrap();
        assert_eq!(
            files,
            vec![dir.path().join("sub/a.jpg"), dir.path().join("sub/loop")]
        );
    }

    #[test]
    fn test_missing_seven_zip() {
        let dir = tempfile::tempdir().unwrap();
        let result = extract("panelkit-missing-7z", Path::new("x.cbr"), dir.path());
        assert!(result.is_err());
    }
}
