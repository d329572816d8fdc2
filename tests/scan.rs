//! End-to-end scanning against a scripted board provider.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::Instant;

use threadscan::error::{AppError, Result};
use threadscan::models::{Board, Config, DispatchMode, Post, ScanConfig, Thread, ThreadUid};
use threadscan::provider::BoardProvider;
use threadscan::services::{LogFetchErrors, MatchHandler, ScanRule, Scanner};
use threadscan::{ScanHandle, scan};

enum Reply {
    Threads(Vec<Thread>),
    Unreachable,
    Broken,
}

#[derive(Default)]
struct ScriptedProvider {
    scripts: Mutex<HashMap<String, VecDeque<Reply>>>,
    steady: Mutex<HashMap<String, Vec<Thread>>>,
    fetches: Mutex<Vec<(String, Instant, bool)>>,
}

impl ScriptedProvider {
    fn then(self, board: &str, reply: Reply) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .entry(board.to_string())
            .or_default()
            .push_back(reply);
        self
    }

    fn always(self, board: &str, threads: Vec<Thread>) -> Self {
        self.steady
            .lock()
            .unwrap()
            .insert(board.to_string(), threads);
        self
    }

    fn fetches(&self, board: &str) -> Vec<(Instant, bool)> {
        self.fetches
            .lock()
            .unwrap()
            .iter()
            .filter(|(b, _, _)| b == board)
            .map(|(_, at, expand)| (*at, *expand))
            .collect()
    }
}

#[async_trait]
impl BoardProvider for ScriptedProvider {
    async fn get_boards(
        &self,
        names: &BTreeSet<String>,
        clean_comments: bool,
    ) -> Result<Vec<Board>> {
        Ok(names
            .iter()
            .map(|n| Board::new(n.clone(), clean_comments))
            .collect())
    }

    async fn get_all_threads(&self, board: &Board, expand: bool) -> Result<Vec<Thread>> {
        self.fetches
            .lock()
            .unwrap()
            .push((board.name.clone(), Instant::now(), expand));

        let scripted = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&board.name)
            .and_then(VecDeque::pop_front);

        match scripted {
            Some(Reply::Threads(threads)) => Ok(threads),
            Some(Reply::Unreachable) => Err(AppError::unreachable(&board.name, "connection refused")),
            Some(Reply::Broken) => Err(serde_json::from_str::<u8>("not json").unwrap_err().into()),
            None => Ok(self
                .steady
                .lock()
                .unwrap()
                .get(&board.name)
                .cloned()
                .unwrap_or_default()),
        }
    }
}

fn thread(board: &str, id: u64, topic: &str) -> Thread {
    Thread {
        board: board.to_string(),
        id,
        topic: Post {
            id,
            thread: ThreadUid::new(board, id),
            subject: None,
            body: topic.to_string(),
            url: format!("https://example.com/{board}/thread/{id}"),
            posted_at: None,
        },
        replies: Vec::new(),
    }
}

fn config(boards: &str, topics_only: bool, stagger_secs: u64) -> Config {
    Config {
        startup_stagger_secs: stagger_secs,
        scans: vec![ScanConfig {
            description: "widgets".to_string(),
            topics_only,
            boards: boards.to_string(),
            terms: vec!["widget".to_string()],
            words: Vec::new(),
        }],
        ..Config::default()
    }
}

fn channel_handler() -> (Arc<dyn MatchHandler>, mpsc::UnboundedReceiver<Post>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let handler = move |post: Post, _rule: Arc<ScanRule>| {
        let _ = tx.send(post);
    };
    (Arc::new(handler), rx)
}

#[tokio::test(start_paused = true)]
async fn transient_error_waits_for_recheck_delay() {
    let provider = Arc::new(
        ScriptedProvider::default()
            .then("a", Reply::Unreachable)
            .always("a", vec![thread("a", 1, "Selling a widget")]),
    );
    let errors = Arc::new(Mutex::new(Vec::new()));
    let seen_errors = Arc::clone(&errors);
    let on_error = move |board: &Board, error: &AppError| {
        seen_errors
            .lock()
            .unwrap()
            .push((board.name.clone(), error.is_transient()));
    };

    let (handler, mut rx) = channel_handler();
    let handle = scan(
        &config("a", true, 8),
        provider.clone(),
        handler,
        Some(Arc::new(on_error)),
        DispatchMode::Concurrent,
    )
    .unwrap();

    let post = rx.recv().await.unwrap();
    assert_eq!(post.thread, ThreadUid::new("a", 1));
    assert_eq!(*errors.lock().unwrap(), vec![("a".to_string(), true)]);

    let fetches = provider.fetches("a");
    assert_eq!(fetches.len(), 2);
    assert!(fetches[1].0 - fetches[0].0 >= Duration::from_secs(180));
    assert_eq!(handle.watch_count(), 1);
    handle.abort();
}

#[tokio::test(start_paused = true)]
async fn thread_is_dispatched_once_across_polls() {
    let provider = Arc::new(
        ScriptedProvider::default()
            .then("a", Reply::Threads(Vec::new()))
            .always(
                "a",
                vec![thread("a", 1, "widget here"), thread("a", 2, "nothing")],
            ),
    );
    let (handler, mut rx) = channel_handler();
    let handle = scan(
        &config("a", true, 0),
        provider.clone(),
        handler,
        None,
        DispatchMode::Concurrent,
    )
    .unwrap();

    tokio::time::sleep(Duration::from_secs(3 * 180 + 30)).await;

    assert!(provider.fetches("a").len() >= 4);
    assert_eq!(rx.recv().await.unwrap().id, 1);
    assert!(rx.try_recv().is_err());
    assert_eq!(handle.match_count(), 1);
    handle.abort();
}

#[tokio::test(start_paused = true)]
async fn pollers_start_staggered() {
    let provider = Arc::new(ScriptedProvider::default());
    let (handler, _rx) = channel_handler();
    let handle = scan(
        &config("a b", true, 8),
        provider.clone(),
        handler,
        None,
        DispatchMode::Concurrent,
    )
    .unwrap();

    tokio::time::sleep(Duration::from_secs(30)).await;

    let a = provider.fetches("a");
    let b = provider.fetches("b");
    assert_eq!((a.len(), b.len()), (1, 1));
    assert!(b[0].0 - a[0].0 >= Duration::from_secs(8));
    handle.abort();
}

#[tokio::test(start_paused = true)]
async fn replies_rules_request_expanded_threads() {
    let provider = Arc::new(ScriptedProvider::default());
    let (handler, _rx) = channel_handler();
    let handle = scan(
        &config("a", false, 0),
        provider.clone(),
        handler,
        None,
        DispatchMode::Concurrent,
    )
    .unwrap();

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(provider.fetches("a")[0].1);
    handle.abort();
}

#[tokio::test(start_paused = true)]
async fn topic_rules_request_catalog_threads() {
    let provider = Arc::new(ScriptedProvider::default());
    let (handler, _rx) = channel_handler();
    let handle = scan(
        &config("a", true, 0),
        provider.clone(),
        handler,
        None,
        DispatchMode::Concurrent,
    )
    .unwrap();

    tokio::time::sleep(Duration::from_secs(1)).await;
    let fetches = provider.fetches("a");
    assert_eq!(fetches.len(), 1);
    assert!(!fetches[0].1);
    handle.abort();
}

#[tokio::test(start_paused = true)]
async fn broken_provider_stops_poller_with_error() {
    let provider = Arc::new(ScriptedProvider::default().then("a", Reply::Broken));
    let calls = Arc::new(AtomicUsize::new(0));
    let counted = Arc::clone(&calls);
    let on_error = move |_board: &Board, _error: &AppError| {
        counted.fetch_add(1, Ordering::SeqCst);
    };
    let (handler, _rx) = channel_handler();

    let handle = scan(
        &config("a", true, 0),
        provider,
        handler,
        Some(Arc::new(on_error)),
        DispatchMode::Concurrent,
    )
    .unwrap();

    let result = handle.join().await;
    assert!(matches!(result, Err(AppError::Json(_))));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn scan_rejects_config_without_rules() {
    let provider = Arc::new(ScriptedProvider::default());
    let (handler, _rx) = channel_handler();
    let result = scan(
        &Config::default(),
        provider,
        handler,
        None,
        DispatchMode::Concurrent,
    );
    assert!(matches!(result, Err(AppError::Config(_))));
}

/// Handler that tracks how many invocations run at once.
struct Recorder {
    scanner: Arc<Scanner>,
    active: AtomicUsize,
    max_active: AtomicUsize,
    watched_first: Mutex<Vec<bool>>,
    done: mpsc::UnboundedSender<u64>,
}

#[async_trait]
impl MatchHandler for Recorder {
    async fn on_match(&self, post: Post, _rule: Arc<ScanRule>) {
        let watched = self.scanner.is_watched(&post.thread);
        self.watched_first.lock().unwrap().push(watched);

        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        self.active.fetch_sub(1, Ordering::SeqCst);

        let _ = self.done.send(post.id);
    }
}

async fn run_two_boards(mode: DispatchMode) -> Arc<Recorder> {
    let scanner = Arc::new(
        Scanner::new(&config("a b", true, 0))
            .unwrap()
            .with_mode(mode),
    );
    let provider = Arc::new(
        ScriptedProvider::default()
            .always("a", vec![thread("a", 1, "widget")])
            .always("b", vec![thread("b", 2, "widget")]),
    );
    let (tx, mut rx) = mpsc::unbounded_channel();
    let recorder = Arc::new(Recorder {
        scanner: Arc::clone(&scanner),
        active: AtomicUsize::new(0),
        max_active: AtomicUsize::new(0),
        watched_first: Mutex::new(Vec::new()),
        done: tx,
    });

    let handle = ScanHandle::start(
        scanner,
        provider,
        recorder.clone(),
        Arc::new(LogFetchErrors),
    );

    let mut ids = vec![rx.recv().await.unwrap(), rx.recv().await.unwrap()];
    ids.sort();
    assert_eq!(ids, vec![1, 2]);
    handle.abort();
    recorder
}

#[tokio::test(start_paused = true)]
async fn serialized_dispatch_never_overlaps() {
    let recorder = run_two_boards(DispatchMode::Serialized).await;
    assert_eq!(recorder.max_active.load(Ordering::SeqCst), 1);
    assert_eq!(*recorder.watched_first.lock().unwrap(), vec![true, true]);
}

#[tokio::test(start_paused = true)]
async fn concurrent_dispatch_may_overlap() {
    let recorder = run_two_boards(DispatchMode::Concurrent).await;
    assert_eq!(recorder.max_active.load(Ordering::SeqCst), 2);
    assert_eq!(*recorder.watched_first.lock().unwrap(), vec![true, true]);
}
