#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use csv_consolidate::Source;
use tempfile::{TempDir, tempdir};

/// Builds in-memory sources from `(name, contents)` pairs.
pub fn sources(items: &[(&str, &str)]) -> Vec<Source> {
    items
        .iter()
        .map(|(name, contents)| Source::new(*name, *contents))
        .collect()
}

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Returns the root path for all files owned by this workspace.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        fs::write(&path, contents).expect("write temp file contents");
        path
    }

    /// Returns a path under the workspace without creating it.
    pub fn join(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }
}
