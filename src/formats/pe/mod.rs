//! Minimal PE parser: headers, sections, overlay and version resource.

pub mod headers;
pub mod resources;
pub mod sections;
pub mod types;
pub mod utils;
pub mod version;

pub use types::*;

use headers::parse_nt_summary;
use resources::find_version_resource;
use sections::{overlay_offset, parse_sections};
use version::parse_version_info;

/// Whether `data` starts with a DOS header.
pub fn is_pe_candidate(data: &[u8]) -> bool {
    data.len() >= 2 && &data[..2] == b"MZ"
}

impl PeView {
    /// Parse the headers and version resource of a PE image.
    ///
    /// Header failures are errors. A corrupt version resource is recorded in
    /// `version_info` instead, so the caller can still use the section
    /// table.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let nt = parse_nt_summary(data)?;
        let sections = parse_sections(data, &nt)?;
        let overlay_offset = overlay_offset(&sections);

        let resource_dir = nt.data_directory(IMAGE_DIRECTORY_ENTRY_RESOURCE);
        let version_info = resource_dir.and_then(|dir| {
            match find_version_resource(data, &sections, dir) {
                Ok(Some(blob)) => Some(parse_version_info(blob)),
                Ok(None) => None,
                Err(e) => Some(Err(e)),
            }
        });

        Ok(PeView {
            machine: nt.machine,
            is_64bit: nt.is_64bit,
            sections,
            overlay_offset,
            has_resources: resource_dir.is_some(),
            version_info,
        })
    }
}
