//! Product metadata types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Target architecture of an installer payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Architecture {
    X86,
    X64,
    Arm,
    Arm64,
    Neutral,
}

impl Architecture {
    /// PE machine types to architecture mapping.
    pub fn from_pe_machine(machine: u16) -> Option<Self> {
        match machine {
            0x014C => Some(Architecture::X86),   // IMAGE_FILE_MACHINE_I386
            0x8664 => Some(Architecture::X64),   // IMAGE_FILE_MACHINE_AMD64
            0x01C0 => Some(Architecture::Arm),   // IMAGE_FILE_MACHINE_ARM
            0x01C4 => Some(Architecture::Arm),   // IMAGE_FILE_MACHINE_ARMNT
            0xAA64 => Some(Architecture::Arm64), // IMAGE_FILE_MACHINE_ARM64
            0x0000 => Some(Architecture::Neutral),
            _ => None,
        }
    }

    /// Platform part of an MSI template string such as `x64;1033`.
    pub fn from_msi_platform(platform: &str) -> Option<Self> {
        let platform = platform.split(';').next().unwrap_or_default().trim();
        match platform.to_ascii_lowercase().as_str() {
            "intel" | "x86" | "" => Some(Architecture::X86),
            "x64" | "amd64" => Some(Architecture::X64),
            "arm" => Some(Architecture::Arm),
            "arm64" => Some(Architecture::Arm64),
            _ => None,
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Architecture::X86 => "x86",
            Architecture::X64 => "x64",
            Architecture::Arm => "arm",
            Architecture::Arm64 => "arm64",
            Architecture::Neutral => "neutral",
        };
        f.write_str(s)
    }
}

/// Unique identifiers carried by structured packages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageIdentifiers {
    pub product_code: Option<String>,
    pub upgrade_code: Option<String>,
    pub package_code: Option<String>,
}

impl PackageIdentifiers {
    pub fn is_empty(&self) -> bool {
        self.product_code.is_none() && self.upgrade_code.is_none() && self.package_code.is_none()
    }
}

/// Product metadata read from a version resource or package tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub product_name: Option<String>,
    pub product_version: Option<String>,
    pub manufacturer: Option<String>,
    pub architecture: Option<Architecture>,
    pub package_identifiers: Option<PackageIdentifiers>,
    /// Whether the metadata table was located and parsed without error
    pub complete: bool,
}

impl Metadata {
    /// Degraded metadata: nothing found, extraction incomplete.
    pub fn incomplete() -> Self {
        Self::default()
    }

    pub fn product_code(&self) -> Option<&str> {
        self.package_identifiers
            .as_ref()
            .and_then(|ids| ids.product_code.as_deref())
    }
}
