//! Staged change inspection.
//!
//! Reads the staged diff and staged file contents from the working copy by
//! shelling out to `git`. Tool failures degrade to "nothing staged" here;
//! the gate only fails closed once inference has started.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, warn};

use crate::error::Error;

/// Placeholder for files that are not valid UTF-8.
pub const BINARY_SENTINEL: &str = "[Binary File - Content Skipped]";

/// Placeholder for files that vanished after staging.
pub const MISSING_SENTINEL: &str = "[File Missing - Content Skipped]";

/// Source of the staged change under review.
pub trait StagedSource {
    /// Unified diff of all staged hunks; empty when nothing is staged.
    fn staged_diff(&self) -> String;

    /// Staged paths in git's order, excluding pure deletions.
    fn staged_files(&self) -> Vec<String>;

    /// Current content of a staged path, or a sentinel.
    fn read_file(&self, path: &str) -> String;
}

/// Inspector over the git working copy rooted at a directory.
#[derive(Debug, Clone)]
pub struct GitInspector {
    root: PathBuf,
}

impl GitInspector {
    /// Open the repository rooted at `root`.
    pub fn open(root: &Path) -> Result<Self, Error> {
        if !root.join(".git").exists() {
            return Err(Error::NotARepository(root.to_path_buf()));
        }
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// Repository root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Run git and return raw stdout, or empty on any failure.
    ///
    /// Paths are never quoted or escaped, whatever `core.quotePath` says.
    fn run_git(&self, args: &[&str]) -> String {
        let output = match Command::new("git")
            .args(["-c", "core.quotePath=false"])
            .args(args)
            .current_dir(&self.root)
            .output()
        {
            Ok(output) => output,
            Err(e) => {
                warn!(error = %e, ?args, "Failed to spawn git");
                return String::new();
            }
        };

        if !output.status.success() {
            warn!(
                status = ?output.status.code(),
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                ?args,
                "git exited with failure"
            );
            return String::new();
        }

        String::from_utf8_lossy(&output.stdout).into_owned()
    }
}

impl StagedSource for GitInspector {
    fn staged_diff(&self) -> String {
        self.run_git(&["diff", "--staged"]).trim().to_string()
    }

    fn staged_files(&self) -> Vec<String> {
        // NUL-separated, so names with spaces, newlines or non-ASCII survive verbatim.
        let output = self.run_git(&["diff", "--staged", "--name-only", "-z", "--diff-filter=d"]);
        let files: Vec<String> = output
            .split('\0')
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect();
        debug!(count = files.len(), "Collected staged files");
        files
    }

    fn read_file(&self, path: &str) -> String {
        read_text(&self.root.join(path))
    }
}

/// Read a file as UTF-8 text, substituting a sentinel when that is impossible.
pub fn read_text(path: &Path) -> String {
    match fs::read(path) {
        Ok(bytes) => match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(_) => BINARY_SENTINEL.to_string(),
        },
        Err(e) if e.kind() == ErrorKind::NotFound => MISSING_SENTINEL.to_string(),
        Err(e) => format!("[Error reading file: {}]", e),
    }
}
