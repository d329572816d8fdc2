//! threadscan CLI
//!
//! Polls the configured boards and prints every thread that matches a scan.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use threadscan::{
    error::Result,
    models::{Config, DispatchMode, Post},
    provider::ChanProvider,
    services::{ScanRule, Scanner},
};

const DEFAULT_FORMAT: &str = "[{scan}] {url}";

/// threadscan - forum board watcher
#[derive(Parser, Debug)]
#[command(
    name = "threadscan",
    version,
    about = "Watches forum boards for threads matching scan rules"
)]
struct Cli {
    /// Path to the scan configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan boards until interrupted (default)
    Run {
        /// Handle matches one at a time
        #[arg(long)]
        serialized: bool,

        /// Print matches as JSON lines
        #[arg(long, conflicts_with = "format")]
        json: bool,

        /// Line template: {scan}, {board}, {thread}, {post}, {subject}, {url}, {body}
        #[arg(long, default_value = DEFAULT_FORMAT)]
        format: String,
    },

    /// Validate the configuration file
    Validate,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Render one match as an output line.
fn render_match(post: &Post, rule: &ScanRule, json: bool, template: &str) -> Option<String> {
    if !json {
        return Some(post.format(&template.replace("{scan}", rule.description())));
    }

    let line = serde_json::json!({
        "scan": rule.description(),
        "post": post,
    });
    serde_json::to_string(&line)
        .inspect_err(|e| log::error!("Failed to encode match for {}: {}", post.thread, e))
        .ok()
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::load(&cli.config).inspect_err(|e| {
        log::error!("Failed to load {}: {}", cli.config.display(), e);
    })?;
    log::info!(
        "Loaded {} scans from {}",
        config.scans.len(),
        cli.config.display()
    );

    let command = cli.command.unwrap_or(Command::Run {
        serialized: false,
        json: false,
        format: DEFAULT_FORMAT.to_string(),
    });

    match command {
        Command::Validate => {
            let scanner = Scanner::new(&config)?;
            for rule in scanner.rules() {
                log::info!(
                    "✓ {:?} on {} (topics only: {})",
                    rule.description(),
                    rule.boards().iter().cloned().collect::<Vec<_>>().join(" "),
                    rule.topics_only()
                );
            }
            log::info!(
                "Config OK: {} boards, recheck every {} min",
                scanner.plan().boards.len(),
                config.recheck_delay
            );
        }

        Command::Run {
            serialized,
            json,
            format,
        } => {
            let mode = if serialized {
                DispatchMode::Serialized
            } else {
                config.dispatch
            };
            let provider = Arc::new(ChanProvider::new(&config.provider)?);
            let handler = move |post: Post, rule: Arc<ScanRule>| {
                if let Some(line) = render_match(&post, &rule, json, &format) {
                    println!("{line}");
                }
            };

            threadscan::scan_forever(&config, provider, Arc::new(handler), None, mode).await?;
        }
    }

    Ok(())
}
