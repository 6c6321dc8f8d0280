//! Container format readers.

pub mod msi;
pub mod pe;
