//! "Silent mode disabled" markers.
//!
//! Some vendors compile installers with unattended mode switched off and
//! leave a readable notice behind. Finding one caps confidence regardless of
//! which framework produced the file.

use crate::strings::{extract_strings, ExtractedString, StringsConfig};
use aho_corasick::AhoCorasick;
use once_cell::sync::Lazy;

pub const SILENT_DISABLED_MARKERS: &[&str] = &[
    "SilentModeDisabled",
    "silent mode is disabled",
    "silent installation is not supported",
    "silent install is not supported",
    "does not support silent",
    "unattended installation is not supported",
    "DisableSilent",
    "NoSilentInstall",
];

static MARKERS: Lazy<Option<AhoCorasick>> = Lazy::new(|| {
    AhoCorasick::builder()
        .ascii_case_insensitive(true)
        .build(SILENT_DISABLED_MARKERS)
        .ok()
});

/// A marker and the string it was found in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerHit {
    pub marker: &'static str,
    pub offset: usize,
}

fn find_in(strings: &[ExtractedString]) -> Option<MarkerHit> {
    let ac = MARKERS.as_ref()?;
    strings.iter().find_map(|s| {
        ac.find(&s.text).map(|m| MarkerHit {
            marker: SILENT_DISABLED_MARKERS[m.pattern().as_usize()],
            offset: s.offset,
        })
    })
}

/// Scan the readable strings of `data` for the first marker.
///
/// Every string in `data` is searched; a marker behind a large payload must
/// still cap confidence.
pub fn scan_markers(data: &[u8], min_string_length: usize) -> Option<MarkerHit> {
    let cfg = StringsConfig {
        min_length: min_string_length.max(1),
        max_strings: usize::MAX,
        max_scan_bytes: data.len(),
    };
    find_in(&extract_strings(data, &cfg))
}
