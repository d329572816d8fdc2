//! Board provider abstraction.
//!
//! Pollers only talk to boards through [`BoardProvider`], so the scanner can
//! run against the bundled HTTP client ([`ChanProvider`]) or any other
//! source of threads.

pub mod chan;

use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Board, Thread};

// Re-export for convenience
pub use chan::ChanProvider;

/// Trait for thread sources.
#[async_trait]
pub trait BoardProvider: Send + Sync {
    /// Resolve board names into boards.
    ///
    /// `clean_comments` asks for post bodies reduced to plaintext.
    async fn get_boards(&self, names: &BTreeSet<String>, clean_comments: bool)
    -> Result<Vec<Board>>;

    /// Fetch every live thread on a board, in board order.
    ///
    /// With `expand` unset only the topic (and whatever replies come for
    /// free) is required. Connectivity failures must be reported as
    /// [`AppError::Unreachable`](crate::error::AppError::Unreachable).
    async fn get_all_threads(&self, board: &Board, expand: bool) -> Result<Vec<Thread>>;
}
