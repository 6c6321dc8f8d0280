//! Readable string extraction.
//!
//! Installers keep their user-facing text (including "silent mode" notices)
//! either as plain ASCII or as UTF-16LE in resources. Both are extracted in
//! file order so callers can search them uniformly.

mod config;
mod scan;

pub use config::StringsConfig;
pub use scan::{scan_strings, ScannedStrings};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StringEncoding {
    Ascii,
    Utf16Le,
}

/// A readable string found in a binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedString {
    pub text: String,
    pub offset: usize,
    pub encoding: StringEncoding,
}

/// Extract ASCII and UTF-16LE strings, ordered by offset.
pub fn extract_strings(data: &[u8], cfg: &StringsConfig) -> Vec<ExtractedString> {
    let scanned = scan_strings(data, cfg);
    let mut out: Vec<ExtractedString> = scanned
        .ascii_strings
        .into_iter()
        .map(|(text, offset)| ExtractedString {
            text,
            offset,
            encoding: StringEncoding::Ascii,
        })
        .chain(
            scanned
                .utf16le_strings
                .into_iter()
                .map(|(text, offset)| ExtractedString {
                    text,
                    offset,
                    encoding: StringEncoding::Utf16Le,
                }),
        )
        .collect();
    out.sort_by_key(|s| s.offset);
    tracing::trace!(count = out.len(), "strings extracted");
    out
}

/// Encode `text` as UTF-16LE bytes.
pub fn utf16le_bytes(text: &str) -> Vec<u8> {
    text.encode_utf16().flat_map(|u| u.to_le_bytes()).collect()
}
