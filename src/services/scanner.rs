// src/services/scanner.rs

//! Rule evaluation, thread deduplication, and match dispatch.

use std::collections::{BTreeSet, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::FutureExt;

use crate::error::{AppError, Result};
use crate::models::{Board, Config, DispatchMode, Post, Thread, ThreadUid};
use crate::services::{MatchHandler, ScanRule};

/// Settings derived from the whole rule set.
#[derive(Debug, Clone)]
pub struct ScanPlan {
    /// Every board any rule applies to
    pub boards: BTreeSet<String>,

    /// True only when no rule looks past the topic post
    pub topics_only: bool,

    /// Strip HTML from post bodies
    pub clean_comments: bool,

    /// Delay between polls of one board
    pub recheck_interval: Duration,

    /// Delay between starting consecutive board pollers
    pub startup_stagger: Duration,
}

/// A rule hit: the first matching post and the rule that produced it.
#[derive(Debug, Clone)]
pub struct Match {
    pub post: Post,
    pub rule: Arc<ScanRule>,
}

#[derive(Debug, Default)]
struct SeenThreads {
    /// Threads with a dispatch already started
    watched: HashSet<ThreadUid>,
    /// Threads that already produced a match
    matched: HashSet<ThreadUid>,
}

/// Owns the rules and the set of threads already handled.
///
/// Both sets only grow; a thread is matched at most once for the lifetime
/// of the scanner.
#[derive(Debug)]
pub struct Scanner {
    rules: Vec<Arc<ScanRule>>,
    plan: ScanPlan,
    mode: DispatchMode,
    seen: Mutex<SeenThreads>,
    dispatch_lock: tokio::sync::Mutex<()>,
}

impl Scanner {
    /// Compile all scan rules from the configuration.
    pub fn new(config: &Config) -> Result<Self> {
        if config.scans.is_empty() {
            return Err(AppError::config("No scans defined"));
        }
        let rules = config
            .scans
            .iter()
            .map(|scan| ScanRule::new(scan).map(Arc::new))
            .collect::<Result<Vec<_>>>()?;

        let plan = ScanPlan {
            boards: rules.iter().flat_map(|r| r.boards().iter().cloned()).collect(),
            topics_only: rules.iter().all(|r| r.topics_only()),
            clean_comments: config.clean_comments,
            recheck_interval: config.recheck_interval(),
            startup_stagger: config.startup_stagger(),
        };

        Ok(Self {
            rules,
            plan,
            mode: config.dispatch,
            seen: Mutex::new(SeenThreads::default()),
            dispatch_lock: tokio::sync::Mutex::new(()),
        })
    }

    /// Override the dispatch mode taken from the configuration.
    pub fn with_mode(mut self, mode: DispatchMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn rules(&self) -> &[Arc<ScanRule>] {
        &self.rules
    }

    pub fn plan(&self) -> &ScanPlan {
        &self.plan
    }

    pub fn mode(&self) -> DispatchMode {
        self.mode
    }

    fn seen(&self) -> MutexGuard<'_, SeenThreads> {
        self.seen.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of threads a dispatch has been started for.
    pub fn watch_count(&self) -> usize {
        self.seen().watched.len()
    }

    /// Number of threads that produced a match.
    pub fn match_count(&self) -> usize {
        self.seen().matched.len()
    }

    pub fn is_watched(&self, uid: &ThreadUid) -> bool {
        self.seen().watched.contains(uid)
    }

    pub fn is_matched(&self, uid: &ThreadUid) -> bool {
        self.seen().matched.contains(uid)
    }

    /// Mark a thread as having a dispatch in progress or done.
    pub fn watch(&self, uid: &ThreadUid) {
        self.seen().watched.insert(uid.clone());
    }

    /// Run the rules against a thread, first rule in configuration order wins.
    ///
    /// Returns `None` for any thread that has matched before. Topic-only
    /// rules are skipped for threads that are already watched, whichever
    /// rule caused the watch.
    pub fn evaluate(&self, board: &Board, thread: &Thread) -> Option<Match> {
        let uid = thread.uid();
        let mut seen = self.seen();
        if seen.matched.contains(&uid) {
            return None;
        }
        let watched = seen.watched.contains(&uid);

        for rule in &self.rules {
            if rule.topics_only() && watched {
                continue;
            }
            if let Some(post) = rule.matches(board, thread) {
                seen.matched.insert(uid);
                return Some(Match {
                    post: post.clone(),
                    rule: Arc::clone(rule),
                });
            }
        }
        None
    }

    /// Hand a match to the handler according to the dispatch mode.
    ///
    /// The thread is marked watched before the handler starts. In
    /// concurrent mode this returns as soon as the handler task is spawned;
    /// in serialized mode it returns once the handler has finished.
    pub async fn dispatch(&self, hit: Match, handler: Arc<dyn MatchHandler>) {
        match self.mode {
            DispatchMode::Concurrent => {
                self.watch(&hit.post.thread);
                tokio::spawn(run_handler(handler, hit));
            }
            DispatchMode::Serialized => {
                let _guard = self.dispatch_lock.lock().await;
                self.watch(&hit.post.thread);
                run_handler(handler, hit).await;
            }
        }
    }
}

/// Run a handler, containing any panic to this one match.
async fn run_handler(handler: Arc<dyn MatchHandler>, hit: Match) {
    let uid = hit.post.thread.clone();
    let outcome = AssertUnwindSafe(handler.on_match(hit.post, hit.rule))
        .catch_unwind()
        .await;
    if outcome.is_err() {
        log::error!("Match handler panicked for thread {}", uid);
    }
}
