// src/services/poller.rs

//! Per-board polling loop.

use std::sync::Arc;

use crate::error::Result;
use crate::models::{Board, Thread};
use crate::provider::BoardProvider;
use crate::services::{FetchErrorHandler, MatchHandler, Scanner};

/// Repeatedly fetches one board and feeds its threads to the scanner.
pub struct BoardPoller {
    board: Board,
    scanner: Arc<Scanner>,
    provider: Arc<dyn BoardProvider>,
    handler: Arc<dyn MatchHandler>,
    error_handler: Arc<dyn FetchErrorHandler>,
}

impl BoardPoller {
    pub fn new(
        board: Board,
        scanner: Arc<Scanner>,
        provider: Arc<dyn BoardProvider>,
        handler: Arc<dyn MatchHandler>,
        error_handler: Arc<dyn FetchErrorHandler>,
    ) -> Self {
        Self {
            board,
            scanner,
            provider,
            handler,
            error_handler,
        }
    }

    /// Poll forever, sleeping the recheck interval between cycles.
    ///
    /// Only returns when the provider fails with a non-transient error.
    pub async fn run(self) -> Result<()> {
        let interval = self.scanner.plan().recheck_interval;
        log::info!("Polling /{}/ every {:?}", self.board.name, interval);

        loop {
            self.poll_once().await?;
            tokio::time::sleep(interval).await;
        }
    }

    /// One fetch, evaluate, dispatch cycle. Returns the number of new matches.
    pub async fn poll_once(&self) -> Result<usize> {
        let threads = self.grab_threads().await?;
        let mut matched = 0;

        for thread in &threads {
            if let Some(hit) = self.scanner.evaluate(&self.board, thread) {
                log::info!(
                    "Thread {} matched scan {:?}: {}",
                    thread.uid(),
                    hit.rule.description(),
                    hit.post.url
                );
                self.scanner.dispatch(hit, Arc::clone(&self.handler)).await;
                matched += 1;
            }
        }

        log::debug!(
            "/{}/: {} threads checked, {} new matches, {} watched",
            self.board.name,
            threads.len(),
            matched,
            self.scanner.watch_count()
        );
        Ok(matched)
    }

    async fn grab_threads(&self) -> Result<Vec<Thread>> {
        let expand = !self.scanner.plan().topics_only;

        match self.provider.get_all_threads(&self.board, expand).await {
            Ok(threads) => Ok(threads),
            Err(error) if error.is_transient() => {
                self.error_handler.on_fetch_error(&self.board, &error);
                Ok(Vec::new())
            }
            Err(error) => {
                log::error!("Stopping poller for /{}/: {}", self.board.name, error);
                self.error_handler.on_fetch_error(&self.board, &error);
                Err(error)
            }
        }
    }
}
