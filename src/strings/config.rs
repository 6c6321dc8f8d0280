//! Configuration for bounded string extraction.

#[derive(Debug, Clone)]
pub struct StringsConfig {
    /// Minimum length for a string candidate (in characters)
    pub min_length: usize,
    /// Maximum number of strings kept per encoding
    pub max_strings: usize,
    /// Maximum number of bytes scanned from input
    pub max_scan_bytes: usize,
}

impl Default for StringsConfig {
    fn default() -> Self {
        Self {
            min_length: 6,
            max_strings: 200_000,
            max_scan_bytes: 64 * 1024 * 1024,
        }
    }
}
