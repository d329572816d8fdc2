//! Pipeline entry points for scanning.
//!
//! - `scan`: start polling every configured board and return a handle
//! - `scan_forever`: start polling and wait on the pollers

pub mod scan;

pub use scan::{ScanHandle, scan, scan_forever};
