#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = unattend::formats::pe::version::parse_version_info(data);
    let _ = unattend::formats::pe::PeView::parse(data);
});
