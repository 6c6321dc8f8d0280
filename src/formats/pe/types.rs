//! Core PE data types and structures

use crate::error::UnattendError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// PE constants
pub const DOS_SIGNATURE: u16 = 0x5A4D; // MZ
pub const PE_SIGNATURE: [u8; 4] = *b"PE\0\0";
pub const PE32_MAGIC: u16 = 0x10B;
pub const PE32PLUS_MAGIC: u16 = 0x20B;

pub const IMAGE_DIRECTORY_ENTRY_RESOURCE: usize = 2;

pub const RT_VERSION: u32 = 16;
pub const VS_FIXEDFILEINFO_SIGNATURE: u32 = 0xFEEF_04BD;

/// Upper bound on headers we are willing to walk
pub const MAX_SECTIONS: u16 = 96;
pub const MAX_RESOURCE_ENTRIES: u16 = 4096;

/// PE parsing error types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeError {
    InvalidDosSignature,
    InvalidPeSignature,
    InvalidMagic(u16),
    TruncatedHeader { expected: usize, actual: usize },
    InvalidRva { rva: u32 },
    InvalidOffset { offset: usize },
    MalformedResourceDirectory,
    MalformedVersionInfo { offset: usize },
    ResourceDepthExceeded,
    LimitExceeded(&'static str),
    InvalidString,
}

impl PeError {
    fn offset(&self) -> u64 {
        match self {
            Self::TruncatedHeader { actual, .. } => *actual as u64,
            Self::InvalidOffset { offset } | Self::MalformedVersionInfo { offset } => {
                *offset as u64
            }
            Self::InvalidRva { rva } => *rva as u64,
            _ => 0,
        }
    }
}

impl fmt::Display for PeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDosSignature => write!(f, "Invalid DOS signature"),
            Self::InvalidPeSignature => write!(f, "Invalid PE signature"),
            Self::InvalidMagic(m) => write!(f, "Invalid optional header magic: 0x{:04x}", m),
            Self::TruncatedHeader { expected, actual } => {
                write!(
                    f,
                    "Truncated header: expected {} bytes, got {}",
                    expected, actual
                )
            }
            Self::InvalidRva { rva } => write!(f, "Invalid RVA: 0x{:08x}", rva),
            Self::InvalidOffset { offset } => write!(f, "Invalid offset: 0x{:x}", offset),
            Self::MalformedResourceDirectory => write!(f, "Malformed resource directory"),
            Self::MalformedVersionInfo { offset } => {
                write!(f, "Malformed version resource at 0x{:x}", offset)
            }
            Self::ResourceDepthExceeded => write!(f, "Resource nesting too deep"),
            Self::LimitExceeded(what) => write!(f, "Limit exceeded: {}", what),
            Self::InvalidString => write!(f, "Invalid string encoding"),
        }
    }
}

impl std::error::Error for PeError {}

impl From<PeError> for UnattendError {
    fn from(err: PeError) -> Self {
        UnattendError::parse(err.offset(), err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PeError>;

/// The subset of the NT headers the engine needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NtSummary {
    pub e_lfanew: usize,
    pub machine: u16,
    pub number_of_sections: u16,
    pub size_of_optional_header: u16,
    pub is_64bit: bool,
    /// (rva, size) pairs
    pub data_directories: Vec<(u32, u32)>,
}

impl NtSummary {
    /// File offset of the first section header.
    pub fn section_table_offset(&self) -> usize {
        self.e_lfanew + 24 + self.size_of_optional_header as usize
    }

    pub fn data_directory(&self, index: usize) -> Option<(u32, u32)> {
        self.data_directories
            .get(index)
            .copied()
            .filter(|&(rva, size)| rva != 0 && size != 0)
    }
}

/// One section header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionInfo {
    pub name: String,
    pub virtual_address: u32,
    pub virtual_size: u32,
    pub raw_offset: u32,
    pub raw_size: u32,
}

impl SectionInfo {
    pub fn contains_rva(&self, rva: u32) -> bool {
        let span = self.virtual_size.max(self.raw_size);
        rva >= self.virtual_address && (rva - self.virtual_address) < span
    }
}

/// Fixed part of a version resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedFileInfo {
    pub file_version: [u16; 4],
    pub product_version: [u16; 4],
}

impl FixedFileInfo {
    pub fn product_version_string(&self) -> String {
        let v = self.product_version;
        format!("{}.{}.{}.{}", v[0], v[1], v[2], v[3])
    }
}

/// Parsed `VS_VERSIONINFO`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    pub fixed: Option<FixedFileInfo>,
    /// StringFileInfo values from the first string table
    pub strings: BTreeMap<String, String>,
}

impl VersionInfo {
    /// Case-insensitive lookup of a string value, empty values ignored.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.strings
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.trim())
            .filter(|v| !v.is_empty())
    }
}

/// Parsed PE summary used by detection and metadata extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeView {
    pub machine: u16,
    pub is_64bit: bool,
    pub sections: Vec<SectionInfo>,
    /// First byte past the last section's raw data
    pub overlay_offset: u64,
    pub has_resources: bool,
    /// `None` when no version resource exists; `Some(Err)` when it is corrupt
    pub version_info: Option<std::result::Result<VersionInfo, PeError>>,
}

impl PeView {
    pub fn section(&self, name: &str) -> Option<&SectionInfo> {
        self.sections.iter().find(|s| s.name == name)
    }

    /// Whether data is appended after the last section.
    pub fn has_overlay(&self, file_len: u64) -> bool {
        self.overlay_offset > 0 && self.overlay_offset < file_len
    }

    pub fn version(&self) -> Option<&VersionInfo> {
        self.version_info.as_ref().and_then(|v| v.as_ref().ok())
    }
}
