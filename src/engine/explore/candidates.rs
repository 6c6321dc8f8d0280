//! Finding installer-shaped files in an extracted tree.

use crate::formats::msi::is_compound_document;
use crate::formats::pe::is_pe_candidate;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Leading bytes needed to recognize MZ or a compound document.
const SNIFF_LEN: u64 = 8;

/// Deepest directory level walked inside one extraction.
const MAX_WALK_DEPTH: usize = 16;

/// A file inside an extraction root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoundFile {
    pub relative_path: PathBuf,
    pub absolute_path: PathBuf,
}

fn has_candidate_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| extensions.iter().any(|c| c.eq_ignore_ascii_case(ext)))
}

fn has_installer_header(path: &Path) -> bool {
    let Ok(file) = File::open(path) else {
        return false;
    };
    let mut head = Vec::with_capacity(SNIFF_LEN as usize);
    if file.take(SNIFF_LEN).read_to_end(&mut head).is_err() {
        return false;
    }
    is_pe_candidate(&head) || is_compound_document(&head)
}

/// Installer-like files under `root`, in walk order (sorted by file name).
///
/// Symlinks are not followed, so an archive cannot point the walk outside
/// its scratch directory. At most `limit` files are returned; the second
/// value reports whether more were present.
pub fn find_candidates(root: &Path, extensions: &[String], limit: usize) -> (Vec<FoundFile>, bool) {
    let mut found = Vec::new();
    let mut truncated = false;

    let walker = WalkDir::new(root)
        .min_depth(1)
        .max_depth(MAX_WALK_DEPTH)
        .follow_links(false)
        .sort_by_file_name();

    for entry in walker.into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if !has_candidate_extension(path, extensions) && !has_installer_header(path) {
            continue;
        }
        if found.len() >= limit {
            truncated = true;
            break;
        }
        let relative_path = path.strip_prefix(root).unwrap_or(path).to_path_buf();
        debug!(path = %relative_path.display(), "nested installer candidate");
        found.push(FoundFile {
            relative_path,
            absolute_path: path.to_path_buf(),
        });
    }
    (found, truncated)
}
