// src/models/mod.rs

//! Domain models for the scanner.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod board;
mod config;

// Re-export all public types
pub use board::{Board, Post, Thread, ThreadUid};
pub use config::{Config, DispatchMode, ProviderConfig, ScanConfig};
