//! `VS_VERSIONINFO` parsing.
//!
//! Every node in the resource has the same shape: `wLength`, `wValueLength`,
//! `wType`, a NUL-terminated UTF-16 key, padding to a 4-byte boundary, the
//! value, more padding, then child nodes until `wLength` is exhausted.

use crate::formats::pe::types::*;
use crate::formats::pe::utils::{align_up, decode_utf16le, read_utf16le_cstr, u16_at, u32_at};

const MAX_DEPTH: usize = 4;
const MAX_KEY_CHARS: usize = 64;

#[derive(Debug)]
struct Node<'a> {
    key: String,
    value: &'a [u8],
    is_text: bool,
    children: Vec<Node<'a>>,
}

fn parse_node(blob: &[u8], offset: usize, depth: usize) -> Result<(Node<'_>, usize)> {
    if depth > MAX_DEPTH {
        return Err(PeError::ResourceDepthExceeded);
    }
    let length = u16_at(blob, offset)? as usize;
    let value_length = u16_at(blob, offset + 2)? as usize;
    let value_type = u16_at(blob, offset + 4)?;
    if length < 6 {
        return Err(PeError::MalformedVersionInfo { offset });
    }
    let end = (offset + length).min(blob.len());

    let (key, after_key) = read_utf16le_cstr(blob, offset + 6, MAX_KEY_CHARS)?;
    let value_start = align_up(after_key, 4);
    let is_text = value_type == 1;
    let value_bytes = if is_text {
        value_length * 2
    } else {
        value_length
    };
    let value_end = (value_start + value_bytes).min(end);
    let value = blob.get(value_start.min(value_end)..value_end).unwrap_or(&[]);

    let mut children = Vec::new();
    let mut cursor = align_up(value_end, 4);
    while cursor + 6 <= end {
        let (child, next) = parse_node(blob, cursor, depth + 1)?;
        children.push(child);
        if next <= cursor {
            break;
        }
        cursor = align_up(next, 4);
    }

    Ok((
        Node {
            key,
            value,
            is_text,
            children,
        },
        end,
    ))
}

fn parse_fixed(value: &[u8]) -> Result<Option<FixedFileInfo>> {
    if value.len() < 52 {
        return Ok(None);
    }
    if u32_at(value, 0)? != VS_FIXEDFILEINFO_SIGNATURE {
        return Err(PeError::MalformedVersionInfo { offset: 0 });
    }
    let split = |ms: u32, ls: u32| {
        [
            (ms >> 16) as u16,
            (ms & 0xFFFF) as u16,
            (ls >> 16) as u16,
            (ls & 0xFFFF) as u16,
        ]
    };
    Ok(Some(FixedFileInfo {
        file_version: split(u32_at(value, 8)?, u32_at(value, 12)?),
        product_version: split(u32_at(value, 16)?, u32_at(value, 20)?),
    }))
}

/// Parse a raw `VS_VERSIONINFO` blob.
pub fn parse_version_info(blob: &[u8]) -> Result<VersionInfo> {
    let (root, _) = parse_node(blob, 0, 0)?;
    if root.key != "VS_VERSION_INFO" {
        return Err(PeError::MalformedVersionInfo { offset: 0 });
    }

    let mut info = VersionInfo {
        fixed: parse_fixed(root.value)?,
        ..Default::default()
    };

    let tables = root
        .children
        .iter()
        .filter(|c| c.key == "StringFileInfo")
        .flat_map(|c| c.children.iter());
    if let Some(table) = tables.into_iter().next() {
        for entry in &table.children {
            let text = if entry.is_text || entry.value.len() % 2 == 0 {
                decode_utf16le(entry.value)
            } else {
                String::new()
            };
            info.strings.insert(entry.key.clone(), text);
        }
    }

    Ok(info)
}
