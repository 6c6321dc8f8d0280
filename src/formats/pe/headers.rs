//! PE header parsing

use crate::formats::pe::types::*;
use crate::formats::pe::utils::{u16_at, u32_at, ReadExt};

/// Parse the DOS stub and NT headers, keeping what detection needs.
pub fn parse_nt_summary(data: &[u8]) -> Result<NtSummary> {
    if data.len() < 64 {
        return Err(PeError::TruncatedHeader {
            expected: 64,
            actual: data.len(),
        });
    }
    if u16_at(data, 0)? != DOS_SIGNATURE {
        return Err(PeError::InvalidDosSignature);
    }

    let e_lfanew = u32_at(data, 0x3C)? as usize;
    match data.read_slice_at(e_lfanew, 4) {
        Some(sig) if sig == PE_SIGNATURE => {}
        Some(_) => return Err(PeError::InvalidPeSignature),
        None => {
            return Err(PeError::TruncatedHeader {
                expected: e_lfanew.saturating_add(4),
                actual: data.len(),
            })
        }
    }

    // COFF file header
    let coff = e_lfanew + 4;
    if coff + 20 > data.len() {
        return Err(PeError::TruncatedHeader {
            expected: coff + 20,
            actual: data.len(),
        });
    }
    let machine = u16_at(data, coff)?;
    let number_of_sections = u16_at(data, coff + 2)?;
    let size_of_optional_header = u16_at(data, coff + 16)?;

    // Optional header
    let opt = coff + 20;
    if opt + size_of_optional_header as usize > data.len() {
        return Err(PeError::TruncatedHeader {
            expected: opt + size_of_optional_header as usize,
            actual: data.len(),
        });
    }
    let magic = u16_at(data, opt)?;
    let (is_64bit, rva_count_at, dirs_at) = match magic {
        PE32_MAGIC => (false, 92, 96),
        PE32PLUS_MAGIC => (true, 108, 112),
        _ => return Err(PeError::InvalidMagic(magic)),
    };
    if (size_of_optional_header as usize) < dirs_at {
        return Err(PeError::TruncatedHeader {
            expected: opt + dirs_at,
            actual: opt + size_of_optional_header as usize,
        });
    }

    let declared = u32_at(data, opt + rva_count_at)? as usize;
    let room = (size_of_optional_header as usize - dirs_at) / 8;
    let count = declared.min(room).min(16);
    let mut data_directories = Vec::with_capacity(count);
    for i in 0..count {
        let at = opt + dirs_at + i * 8;
        data_directories.push((u32_at(data, at)?, u32_at(data, at + 4)?));
    }

    Ok(NtSummary {
        e_lfanew,
        machine,
        number_of_sections,
        size_of_optional_header,
        is_64bit,
        data_directories,
    })
}
