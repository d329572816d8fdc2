// src/lib.rs

//! threadscan library
//!
//! Polls forum boards and hands every thread that satisfies a scan rule to
//! a callback, once per thread.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod provider;
pub mod services;
pub mod utils;

pub use pipeline::{ScanHandle, scan, scan_forever};
