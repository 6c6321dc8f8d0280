#![no_main]
use libfuzzer_sys::fuzz_target;
use unattend::core::{InstallerFile, InstallerImage};
use unattend::engine::metadata::extract_metadata;
use unattend::engine::SignatureDetector;

fuzz_target!(|data: &[u8]| {
    let file = InstallerFile::new("<fuzz>", data.len() as u64, "00".repeat(32));
    let image = InstallerImage::new(file, data.to_vec());
    let _ = SignatureDetector::default().detect(&image);
    let _ = extract_metadata(&image);
});
