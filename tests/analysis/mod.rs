//! End-to-end analysis tests.
//!
//! `scenarios` covers one installer of each kind through the public API;
//! the other modules check the invariants that must hold for every input.

mod batch;
mod bounds;
mod formats;
mod json;
mod properties;
