//! Bounded string scanners for ASCII and UTF-16LE encodings.

use super::StringsConfig;

/// Scanned strings per encoding, each with its byte offset.
#[derive(Debug, Default)]
pub struct ScannedStrings {
    pub ascii_strings: Vec<(String, usize)>,
    pub utf16le_strings: Vec<(String, usize)>,
}

#[inline]
fn is_printable(b: u8) -> bool {
    (b.is_ascii_graphic() || b == b'\t' || b == b' ') && b != 0x7f
}

/// Scan strings within the byte budget.
pub fn scan_strings(data: &[u8], cfg: &StringsConfig) -> ScannedStrings {
    let mut out = ScannedStrings::default();
    let scan = &data[..data.len().min(cfg.max_scan_bytes)];

    // ASCII runs
    {
        let mut run_start: Option<usize> = None;
        for (i, &b) in scan.iter().enumerate() {
            if is_printable(b) {
                run_start.get_or_insert(i);
                continue;
            }
            if let Some(start) = run_start.take() {
                push_ascii(&mut out.ascii_strings, scan, start, i, cfg);
            }
        }
        if let Some(start) = run_start {
            push_ascii(&mut out.ascii_strings, scan, start, scan.len(), cfg);
        }
    }

    // UTF-16LE runs of ASCII-range code units, checked at both alignments
    for phase in 0..2usize {
        if scan.len() < phase {
            break;
        }
        let mut run: Vec<u16> = Vec::new();
        let mut run_offset = 0usize;
        for (i, chunk) in scan[phase..].chunks_exact(2).enumerate() {
            let ch = u16::from_le_bytes([chunk[0], chunk[1]]);
            if ch < 128 && is_printable(ch as u8) {
                if run.is_empty() {
                    run_offset = phase + i * 2;
                }
                run.push(ch);
            } else {
                push_utf16(&mut out.utf16le_strings, &mut run, run_offset, cfg);
            }
        }
        push_utf16(&mut out.utf16le_strings, &mut run, run_offset, cfg);
    }
    out.utf16le_strings.sort_by_key(|(_, off)| *off);

    out
}

fn push_ascii(
    sink: &mut Vec<(String, usize)>,
    scan: &[u8],
    start: usize,
    end: usize,
    cfg: &StringsConfig,
) {
    if end - start < cfg.min_length || sink.len() >= cfg.max_strings {
        return;
    }
    if let Ok(text) = std::str::from_utf8(&scan[start..end]) {
        sink.push((text.to_string(), start));
    }
}

fn push_utf16(
    sink: &mut Vec<(String, usize)>,
    run: &mut Vec<u16>,
    offset: usize,
    cfg: &StringsConfig,
) {
    if run.len() >= cfg.min_length && sink.len() < cfg.max_strings {
        if let Ok(text) = String::from_utf16(run) {
            sink.push((text, offset));
        }
    }
    run.clear();
}
