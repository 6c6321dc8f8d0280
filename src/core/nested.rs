//! Nested installer candidates found inside extracted archives.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NestedCandidate {
    /// Path relative to the scratch directory it was extracted into
    pub relative_path: PathBuf,
    /// Absolute location inside the scratch directory
    pub absolute_path: PathBuf,
    /// 1 for a direct child of the analyzed file
    pub depth: usize,
    pub parent_hash: String,
}

impl NestedCandidate {
    pub fn new(
        relative_path: impl Into<PathBuf>,
        absolute_path: impl Into<PathBuf>,
        depth: usize,
        parent_hash: impl Into<String>,
    ) -> Self {
        Self {
            relative_path: relative_path.into(),
            absolute_path: absolute_path.into(),
            depth,
            parent_hash: parent_hash.into(),
        }
    }

    /// Relative path with forward slashes, stable across platforms.
    pub fn display_path(&self) -> String {
        self.relative_path
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}
