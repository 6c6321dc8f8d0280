//! Resource directory walking, limited to locating the version resource.

use crate::formats::pe::sections::rva_to_offset;
use crate::formats::pe::types::*;
use crate::formats::pe::utils::{u16_at, u32_at, ReadExt};

const SUBDIRECTORY_FLAG: u32 = 0x8000_0000;
const NAME_IS_STRING_FLAG: u32 = 0x8000_0000;

#[derive(Debug, Clone, Copy)]
struct Entry {
    name_or_id: u32,
    offset_to_data: u32,
}

fn read_directory(rsrc: &[u8], dir_offset: usize) -> Result<Vec<Entry>> {
    let named = u16_at(rsrc, dir_offset + 12)?;
    let ids = u16_at(rsrc, dir_offset + 14)?;
    let total = named as usize + ids as usize;
    if total > MAX_RESOURCE_ENTRIES as usize {
        return Err(PeError::LimitExceeded("resource entries"));
    }
    let mut entries = Vec::with_capacity(total);
    for i in 0..total {
        let at = dir_offset + 16 + i * 8;
        entries.push(Entry {
            name_or_id: u32_at(rsrc, at)?,
            offset_to_data: u32_at(rsrc, at + 4)?,
        });
    }
    Ok(entries)
}

fn subdirectory(entry: &Entry) -> Result<usize> {
    if entry.offset_to_data & SUBDIRECTORY_FLAG == 0 {
        return Err(PeError::MalformedResourceDirectory);
    }
    Ok((entry.offset_to_data & !SUBDIRECTORY_FLAG) as usize)
}

/// Locate the raw bytes of the first `RT_VERSION` resource.
///
/// Returns `Ok(None)` when the image has no version resource at all.
pub fn find_version_resource<'a>(
    data: &'a [u8],
    sections: &[SectionInfo],
    resource_dir: (u32, u32),
) -> Result<Option<&'a [u8]>> {
    let (rva, size) = resource_dir;
    let base = rva_to_offset(sections, rva).ok_or(PeError::InvalidRva { rva })?;
    let rsrc = data
        .get(base..)
        .ok_or(PeError::InvalidOffset { offset: base })?;
    let rsrc = &rsrc[..rsrc.len().min(size as usize)];

    // Level 1: resource type
    let Some(version_type) = read_directory(rsrc, 0)?
        .into_iter()
        .find(|e| e.name_or_id & NAME_IS_STRING_FLAG == 0 && e.name_or_id == RT_VERSION)
    else {
        return Ok(None);
    };

    // Level 2: resource name, Level 3: language. The first entry of each is taken.
    let names_dir = subdirectory(&version_type)?;
    let name = *read_directory(rsrc, names_dir)?
        .first()
        .ok_or(PeError::MalformedResourceDirectory)?;
    let langs_dir = subdirectory(&name)?;
    let lang = *read_directory(rsrc, langs_dir)?
        .first()
        .ok_or(PeError::MalformedResourceDirectory)?;
    if lang.offset_to_data & SUBDIRECTORY_FLAG != 0 {
        return Err(PeError::ResourceDepthExceeded);
    }

    // IMAGE_RESOURCE_DATA_ENTRY
    let entry = lang.offset_to_data as usize;
    let data_rva = u32_at(rsrc, entry)?;
    let data_size = u32_at(rsrc, entry + 4)?;
    let offset = rva_to_offset(sections, data_rva).ok_or(PeError::InvalidRva { rva: data_rva })?;
    data.read_slice_at(offset, data_size as usize)
        .map(Some)
        .ok_or(PeError::InvalidOffset { offset })
}
