//! Utility functions for PE parsing

use crate::formats::pe::types::{PeError, Result};

/// Extension trait for reading primitive types from byte slices
pub trait ReadExt {
    fn read_u16_le_at(&self, offset: usize) -> Option<u16>;
    fn read_u32_le_at(&self, offset: usize) -> Option<u32>;
    fn read_slice_at(&self, offset: usize, len: usize) -> Option<&[u8]>;
}

impl ReadExt for [u8] {
    #[inline(always)]
    fn read_u16_le_at(&self, offset: usize) -> Option<u16> {
        self.get(offset..offset.checked_add(2)?)
            .and_then(|b| b.try_into().ok())
            .map(u16::from_le_bytes)
    }

    #[inline(always)]
    fn read_u32_le_at(&self, offset: usize) -> Option<u32> {
        self.get(offset..offset.checked_add(4)?)
            .and_then(|b| b.try_into().ok())
            .map(u32::from_le_bytes)
    }

    #[inline(always)]
    fn read_slice_at(&self, offset: usize, len: usize) -> Option<&[u8]> {
        self.get(offset..offset.checked_add(len)?)
    }
}

/// Read a `u16` or report where the data ran out.
#[inline]
pub fn u16_at(data: &[u8], offset: usize) -> Result<u16> {
    data.read_u16_le_at(offset)
        .ok_or(PeError::InvalidOffset { offset })
}

/// Read a `u32` or report where the data ran out.
#[inline]
pub fn u32_at(data: &[u8], offset: usize) -> Result<u32> {
    data.read_u32_le_at(offset)
        .ok_or(PeError::InvalidOffset { offset })
}

/// Read a NUL-terminated UTF-16LE string, returning it and the offset just
/// past the terminator.
pub fn read_utf16le_cstr(data: &[u8], offset: usize, max_chars: usize) -> Result<(String, usize)> {
    let mut words = Vec::new();
    let mut pos = offset;
    loop {
        if words.len() >= max_chars {
            return Err(PeError::InvalidString);
        }
        let word = u16_at(data, pos)?;
        pos += 2;
        if word == 0 {
            break;
        }
        words.push(word);
    }
    String::from_utf16(&words)
        .map(|s| (s, pos))
        .map_err(|_| PeError::InvalidString)
}

/// Decode UTF-16LE bytes up to the first NUL.
pub fn decode_utf16le(bytes: &[u8]) -> String {
    let words: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .take_while(|&w| w != 0)
        .collect();
    String::from_utf16_lossy(&words)
}

/// Align a value up to the specified power-of-two alignment
#[inline(always)]
pub fn align_up(value: usize, alignment: usize) -> usize {
    if alignment == 0 {
        value
    } else {
        (value + alignment - 1) & !(alignment - 1)
    }
}

/// Convert a section name array to a string
pub fn section_name_to_string(name: &[u8]) -> String {
    let end = name.iter().position(|&b| b == 0).unwrap_or(name.len());
    String::from_utf8_lossy(&name[..end]).to_string()
}
