// src/pipeline/scan.rs

//! Scan entry points: start one poller per board and keep them running.

use std::sync::Arc;

use tokio::task::{JoinHandle, JoinSet};

use crate::error::Result;
use crate::models::{Config, DispatchMode};
use crate::provider::BoardProvider;
use crate::services::{BoardPoller, FetchErrorHandler, LogFetchErrors, MatchHandler, Scanner};

/// Handle to a running scan.
///
/// Dropping the handle leaves the scan running; use [`ScanHandle::abort`] to
/// stop it.
#[derive(Debug)]
pub struct ScanHandle {
    scanner: Arc<Scanner>,
    task: JoinHandle<Result<()>>,
}

impl ScanHandle {
    /// Start polling every board the scanner's rules cover.
    ///
    /// Must be called from within a tokio runtime. Board pollers are started
    /// one stagger interval apart.
    pub fn start(
        scanner: Arc<Scanner>,
        provider: Arc<dyn BoardProvider>,
        handler: Arc<dyn MatchHandler>,
        error_handler: Arc<dyn FetchErrorHandler>,
    ) -> Self {
        let task = tokio::spawn(run_pollers(
            Arc::clone(&scanner),
            provider,
            handler,
            error_handler,
        ));
        Self { scanner, task }
    }

    pub fn scanner(&self) -> &Arc<Scanner> {
        &self.scanner
    }

    /// Number of threads a dispatch has been started for.
    pub fn watch_count(&self) -> usize {
        self.scanner.watch_count()
    }

    /// Number of threads that produced a match.
    pub fn match_count(&self) -> usize {
        self.scanner.match_count()
    }

    /// Stop all board pollers. Handlers already running are left alone.
    pub fn abort(&self) {
        self.task.abort();
    }

    /// Wait until every poller has stopped.
    ///
    /// Pollers only stop on non-transient provider errors, so in practice
    /// this waits forever unless the scan is aborted. Returns the first
    /// error any poller stopped with.
    pub async fn join(self) -> Result<()> {
        match self.task.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Ok(()),
            Err(e) => std::panic::resume_unwind(e.into_panic()),
        }
    }
}

async fn run_pollers(
    scanner: Arc<Scanner>,
    provider: Arc<dyn BoardProvider>,
    handler: Arc<dyn MatchHandler>,
    error_handler: Arc<dyn FetchErrorHandler>,
) -> Result<()> {
    let plan = scanner.plan().clone();
    let boards = provider.get_boards(&plan.boards, plan.clean_comments).await?;
    log::info!(
        "Scanning {} boards with {} rules ({:?} dispatch)",
        boards.len(),
        scanner.rules().len(),
        scanner.mode()
    );

    let mut pollers = JoinSet::new();
    for (i, board) in boards.into_iter().enumerate() {
        // Spread the first round of requests out
        if i > 0 && !plan.startup_stagger.is_zero() {
            tokio::time::sleep(plan.startup_stagger).await;
        }
        let poller = BoardPoller::new(
            board,
            Arc::clone(&scanner),
            Arc::clone(&provider),
            Arc::clone(&handler),
            Arc::clone(&error_handler),
        );
        pollers.spawn(poller.run());
    }

    let mut first_error = None;
    while let Some(joined) = pollers.join_next().await {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                first_error.get_or_insert(e);
            }
            Err(e) if e.is_panic() => log::error!("Board poller panicked: {e}"),
            Err(_) => {}
        }
    }

    first_error.map_or(Ok(()), Err)
}

/// Build a scanner from `config` and start polling without blocking.
///
/// Fails fast on configuration errors. `error_handler` defaults to
/// [`LogFetchErrors`].
pub fn scan(
    config: &Config,
    provider: Arc<dyn BoardProvider>,
    handler: Arc<dyn MatchHandler>,
    error_handler: Option<Arc<dyn FetchErrorHandler>>,
    mode: DispatchMode,
) -> Result<ScanHandle> {
    let scanner = Arc::new(Scanner::new(config)?.with_mode(mode));
    let error_handler = error_handler.unwrap_or_else(|| Arc::new(LogFetchErrors));
    Ok(ScanHandle::start(scanner, provider, handler, error_handler))
}

/// Start scanning and wait on the pollers, which in practice never finish.
pub async fn scan_forever(
    config: &Config,
    provider: Arc<dyn BoardProvider>,
    handler: Arc<dyn MatchHandler>,
    error_handler: Option<Arc<dyn FetchErrorHandler>>,
    mode: DispatchMode,
) -> Result<()> {
    scan(config, provider, handler, error_handler, mode)?
        .join()
        .await
}
