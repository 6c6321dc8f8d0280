//! Installer file handle and its bounded in-memory image.

use crate::formats::msi::{is_compound_document, read_package, MsiInfo};
use crate::formats::pe::{is_pe_candidate, PeError, PeView};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Immutable handle to a file under analysis.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstallerFile {
    pub path: PathBuf,
    pub size: u64,
    /// Lowercase hex SHA-256 of the full contents
    pub sha256: String,
}

impl InstallerFile {
    pub fn new(path: impl Into<PathBuf>, size: u64, sha256: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            size,
            sha256: sha256.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Short hash prefix used to namespace scratch directories.
    pub fn short_hash(&self) -> &str {
        &self.sha256[..self.sha256.len().min(16)]
    }
}

/// Outer container recognized from leading bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContainerShape {
    CompoundDocument,
    PortableExecutable,
    Zip,
    Unknown,
}

impl ContainerShape {
    pub fn sniff(data: &[u8]) -> Self {
        if is_compound_document(data) {
            ContainerShape::CompoundDocument
        } else if is_pe_candidate(data) {
            ContainerShape::PortableExecutable
        } else if infer::archive::is_zip(data) {
            ContainerShape::Zip
        } else {
            ContainerShape::Unknown
        }
    }
}

/// Bytes read from an installer plus the structures parsed from them.
///
/// Parsing happens once here so detection and metadata extraction can share
/// it read-only.
#[derive(Debug, Clone)]
pub struct InstallerImage {
    pub file: InstallerFile,
    pub data: Vec<u8>,
    pub shape: ContainerShape,
    /// Parsed PE headers; `Err` holds why an MZ file failed to parse
    pub pe: Option<Result<PeView, PeError>>,
    /// Parsed package; `Err` holds why a compound document failed to open
    pub msi: Option<Result<MsiInfo, String>>,
}

impl InstallerImage {
    pub fn new(file: InstallerFile, data: Vec<u8>) -> Self {
        let shape = ContainerShape::sniff(&data);
        let pe = (shape == ContainerShape::PortableExecutable).then(|| PeView::parse(&data));
        let msi = (shape == ContainerShape::CompoundDocument)
            .then(|| read_package(&data).map_err(|e| e.to_string()));
        Self {
            file,
            data,
            shape,
            pe,
            msi,
        }
    }

    /// Image of a compound document whose package was read from the file
    /// itself, for packages larger than the bytes kept in `data`.
    pub fn with_package(file: InstallerFile, data: Vec<u8>, package: Result<MsiInfo, String>) -> Self {
        Self {
            file,
            data,
            shape: ContainerShape::CompoundDocument,
            pe: None,
            msi: Some(package),
        }
    }

    pub fn pe_view(&self) -> Option<&PeView> {
        self.pe.as_ref().and_then(|r| r.as_ref().ok())
    }

    pub fn msi_info(&self) -> Option<&MsiInfo> {
        self.msi.as_ref().and_then(|r| r.as_ref().ok())
    }

    /// In-memory slice of the PE overlay, if the overlay starts within the
    /// bytes that were read.
    pub fn overlay(&self) -> Option<&[u8]> {
        let view = self.pe_view()?;
        if !view.has_overlay(self.file.size) {
            return None;
        }
        self.data.get(view.overlay_offset as usize..)
    }
}
