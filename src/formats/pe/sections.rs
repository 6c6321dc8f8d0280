//! Section table parsing and address translation

use crate::formats::pe::types::*;
use crate::formats::pe::utils::{section_name_to_string, u32_at, ReadExt};

const SECTION_HEADER_SIZE: usize = 40;

/// Parse section headers from the section table.
pub fn parse_sections(data: &[u8], nt: &NtSummary) -> Result<Vec<SectionInfo>> {
    if nt.number_of_sections > MAX_SECTIONS {
        return Err(PeError::LimitExceeded("section count"));
    }
    let table = nt.section_table_offset();
    let mut sections = Vec::with_capacity(nt.number_of_sections as usize);
    for i in 0..nt.number_of_sections as usize {
        let at = table + i * SECTION_HEADER_SIZE;
        let name = data
            .read_slice_at(at, 8)
            .ok_or(PeError::InvalidOffset { offset: at })?;
        sections.push(SectionInfo {
            name: section_name_to_string(name),
            virtual_size: u32_at(data, at + 8)?,
            virtual_address: u32_at(data, at + 12)?,
            raw_size: u32_at(data, at + 16)?,
            raw_offset: u32_at(data, at + 20)?,
        });
    }
    Ok(sections)
}

/// Translate an RVA into a file offset through the section table.
pub fn rva_to_offset(sections: &[SectionInfo], rva: u32) -> Option<usize> {
    sections
        .iter()
        .find(|s| s.contains_rva(rva))
        .map(|s| (rva - s.virtual_address) as usize + s.raw_offset as usize)
}

/// First byte after the last section's raw data.
pub fn overlay_offset(sections: &[SectionInfo]) -> u64 {
    sections
        .iter()
        .filter(|s| s.raw_size > 0)
        .map(|s| s.raw_offset as u64 + s.raw_size as u64)
        .max()
        .unwrap_or(0)
}
