//! Service layer for the scanner.
//!
//! This module contains the business logic for:
//! - Rule matching (`ScanRule`)
//! - Deduplication and dispatch (`Scanner`)
//! - Board polling (`BoardPoller`)
//! - User callbacks (`MatchHandler`, `FetchErrorHandler`)

mod handler;
mod poller;
mod rule;
mod scanner;

pub use handler::{FetchErrorHandler, LogFetchErrors, MatchHandler};
pub use poller::BoardPoller;
pub use rule::ScanRule;
pub use scanner::{Match, ScanPlan, Scanner};
