// src/services/handler.rs

//! Callbacks invoked by the scanner.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::AppError;
use crate::models::{Board, Post};
use crate::services::ScanRule;

/// Receives each thread the first time it satisfies a rule.
///
/// In concurrent dispatch mode this runs on its own task, so it must tolerate
/// being called while another invocation is still in flight.
#[async_trait]
pub trait MatchHandler: Send + Sync + 'static {
    async fn on_match(&self, post: Post, rule: Arc<ScanRule>);
}

#[async_trait]
impl<F> MatchHandler for F
where
    F: Fn(Post, Arc<ScanRule>) + Send + Sync + 'static,
{
    async fn on_match(&self, post: Post, rule: Arc<ScanRule>) {
        self(post, rule)
    }
}

/// Informed whenever a board fetch fails.
pub trait FetchErrorHandler: Send + Sync + 'static {
    fn on_fetch_error(&self, board: &Board, error: &AppError);
}

impl<F> FetchErrorHandler for F
where
    F: Fn(&Board, &AppError) + Send + Sync + 'static,
{
    fn on_fetch_error(&self, board: &Board, error: &AppError) {
        self(board, error)
    }
}

/// Default error handler: logs a warning and carries on.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogFetchErrors;

impl FetchErrorHandler for LogFetchErrors {
    fn on_fetch_error(&self, board: &Board, error: &AppError) {
        log::warn!("Failed to fetch /{}/: {}", board.name, error);
    }
}
