//! External program invocation: the panel-boundary detector and friends.
//!
//! Programs run to completion; output is captured and logged. A non-zero
//! exit is reported as [`Error::ExternalTool`] and never retried.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{Error, Result};

/// Captured output of a finished program.
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    /// Standard output, lossy UTF-8
    pub stdout: String,
    /// Standard error, lossy UTF-8
    pub stderr: String,
}

/// Run `program` with `args`, failing on a non-zero exit.
pub fn run_tool<I, S>(program: &str, args: I) -> Result<ToolOutput>
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
{
    let args: Vec<OsString> = args.into_iter().map(Into::into).collect();
    log::info!(
        "running {} {}",
        program,
        args.iter()
            .map(|a| a.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ")
    );

    let output = Command::new(program).args(&args).output().map_err(|e| {
        Error::ExternalTool {
            program: program.to_string(),
            status: "not started".to_string(),
            stderr: e.to_string(),
        }
    })?;

    let result = ToolOutput {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    };

    if !result.stdout.trim().is_empty() {
        log::info!("{} output:\n{}", program, result.stdout.trim_end());
    }
    if !result.stderr.trim().is_empty() {
        log::warn!("{} errors:\n{}", program, result.stderr.trim_end());
    }

    if !output.status.success() {
        return Err(Error::ExternalTool {
            program: program.to_string(),
            status: output.status.to_string(),
            stderr: result.stderr.trim().to_string(),
        });
    }

    Ok(result)
}

/// Runner for the external panel-boundary detector (kumiko).
///
/// The detector reads a directory of page images and writes a layout JSON
/// array of `{filename, size, panels}` records.
#[derive(Debug, Clone)]
pub struct PanelDetector {
    /// Program to execute
    pub program: String,

    /// Arguments placed before the input/output arguments
    pub base_args: Vec<String>,

    /// Sort panels right-to-left (manga reading order)
    pub rtl: bool,
}

impl PanelDetector {
    /// Create a detector runner with defaults (`python kumiko`).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the program and its leading arguments.
    pub fn with_command<I, S>(mut self, program: impl Into<String>, base_args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.program = program.into();
        self.base_args = base_args.into_iter().map(Into::into).collect();
        self
    }

    /// Parse a whitespace-separated command line (`"python kumiko"`).
    pub fn from_command_line(command: &str) -> Result<Self> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .ok_or_else(|| Error::Other("empty detector command".to_string()))?;
        Ok(Self::new().with_command(program, parts))
    }

    /// Enable or disable right-to-left panel order.
    pub fn with_rtl(mut self, rtl: bool) -> Self {
        self.rtl = rtl;
        self
    }

    /// Arguments for one detector run.
    pub fn arguments(&self, input_dir: &Path, output_json: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = self.base_args.iter().map(OsString::from).collect();
        args.push("-i".into());
        args.push(input_dir.as_os_str().to_owned());
        args.push("-o".into());
        args.push(output_json.as_os_str().to_owned());
        if self.rtl {
            args.push("--rtl".into());
        }
        args
    }

    /// Run the detector on one directory of page images.
    pub fn detect_dir(&self, input_dir: &Path, output_json: &Path) -> Result<ToolOutput> {
        if !input_dir.is_dir() {
            return Err(Error::NotADirectory(input_dir.to_path_buf()));
        }
        if let Some(parent) = output_json.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        run_tool(&self.program, self.arguments(input_dir, output_json))
    }

    /// Run the detector on every folder below `root`, writing
    /// `<output_dir>/<folder name>.json` for each.
    ///
    /// Stops at the first failing run.
    pub fn detect_tree(&self, root: &Path, output_dir: &Path) -> Result<Vec<PathBuf>> {
        if !root.is_dir() {
            return Err(Error::NotADirectory(root.to_path_buf()));
        }
        fs::create_dir_all(output_dir)?;

        let mut written = Vec::new();
        for folder in nested_folders(root)? {
            let name = folder
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let output = output_dir.join(format!("{}.json", name));
            self.detect_dir(&folder, &output)?;
            written.push(output);
        }
        Ok(written)
    }
}

impl Default for PanelDetector {
    fn default() -> Self {
        Self {
            program: "python".to_string(),
            base_args: vec!["kumiko".to_string()],
            rtl: false,
        }
    }
}

/// All folders below `root`, top-down, siblings in name order.
///
/// Symlinks are not followed.
pub(crate) fn nested_folders(root: &Path) -> Result<Vec<PathBuf>> {
    let mut folders = Vec::new();
    let mut children = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            children.push(entry.path());
        }
    }
    children.sort();
    for child in children {
        let nested = nested_folders(&child)?;
        folders.push(child);
        folders.extend(nested);
    }
    Ok(folders)
}
