// src/provider/chan.rs

//! Board provider for the 4chan read-only JSON API.
//!
//! Topics come from `{board}/catalog.json`; full threads, when asked for,
//! from `{board}/thread/{no}.json`.

use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::error::Result;
use crate::models::{Board, Post, ProviderConfig, Thread, ThreadUid};
use crate::provider::BoardProvider;
use crate::utils::{base_url, html::clean_comment, http};

/// One page of `catalog.json`.
#[derive(Debug, Deserialize)]
struct CatalogPage {
    #[serde(default)]
    threads: Vec<RawPost>,
}

/// Body of `thread/{no}.json`.
#[derive(Debug, Deserialize)]
struct ThreadPage {
    #[serde(default)]
    posts: Vec<RawPost>,
}

/// A post as the API returns it.
#[derive(Debug, Deserialize)]
struct RawPost {
    no: u64,
    #[serde(default)]
    sub: Option<String>,
    #[serde(default)]
    com: Option<String>,
    #[serde(default)]
    time: Option<i64>,
    #[serde(default)]
    semantic_url: Option<String>,
    #[serde(default)]
    last_replies: Vec<RawPost>,
}

/// HTTP board provider.
pub struct ChanProvider {
    config: ProviderConfig,
    client: Client,
    api: Url,
    site: Url,
}

impl ChanProvider {
    /// Create a provider with the given settings.
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        Ok(Self {
            client: http::create_async_client(config)?,
            api: base_url(&config.api_url)?,
            site: base_url(&config.site_url)?,
            config: config.clone(),
        })
    }

    async fn fetch_catalog(&self, board: &Board) -> Result<Vec<RawPost>> {
        let url = self.api.join(&format!("{}/catalog.json", board.name))?;
        let pages: Vec<CatalogPage> = http::fetch_json(&self.client, &board.name, url).await?;
        Ok(pages.into_iter().flat_map(|page| page.threads).collect())
    }

    async fn fetch_thread(&self, board: &Board, no: u64) -> Result<Vec<RawPost>> {
        let url = self.api.join(&format!("{}/thread/{no}.json", board.name))?;
        let page: ThreadPage = http::fetch_json(&self.client, &board.name, url).await?;
        Ok(page.posts)
    }

    /// Replace a catalog entry with the full thread.
    ///
    /// Threads pruned between the catalog and thread requests keep their
    /// catalog contents.
    async fn expand_thread(&self, board: &Board, op: RawPost) -> Result<Thread> {
        match self.fetch_thread(board, op.no).await {
            Ok(posts) => {
                let mut posts = posts.into_iter();
                match posts.next() {
                    Some(mut topic) => {
                        topic.semantic_url = topic.semantic_url.or(op.semantic_url);
                        self.to_thread(board, topic, posts.collect())
                    }
                    None => self.catalog_thread(board, op),
                }
            }
            Err(e) if http::is_not_found(&e) => {
                log::debug!("Thread {}/{} is gone, using catalog copy", board.name, op.no);
                self.catalog_thread(board, op)
            }
            Err(e) => Err(e),
        }
    }

    fn catalog_thread(&self, board: &Board, mut op: RawPost) -> Result<Thread> {
        let replies = std::mem::take(&mut op.last_replies);
        self.to_thread(board, op, replies)
    }

    fn to_thread(&self, board: &Board, op: RawPost, replies: Vec<RawPost>) -> Result<Thread> {
        let uid = ThreadUid::new(board.name.clone(), op.no);
        let path = match op.semantic_url.as_deref() {
            Some(slug) if !slug.is_empty() => format!("{}/thread/{}/{}", board.name, op.no, slug),
            _ => format!("{}/thread/{}", board.name, op.no),
        };
        let link = self.site.join(&path)?;

        let topic = to_post(board, &uid, &link, op, true);
        let replies = replies
            .into_iter()
            .map(|raw| to_post(board, &uid, &link, raw, false))
            .collect();

        Ok(Thread {
            board: board.name.clone(),
            id: uid.thread_id,
            topic,
            replies,
        })
    }
}

fn to_post(board: &Board, uid: &ThreadUid, link: &Url, raw: RawPost, is_topic: bool) -> Post {
    let clean = |s: String| {
        if board.clean_comments {
            clean_comment(&s)
        } else {
            s
        }
    };

    let mut url = link.clone();
    if !is_topic {
        url.set_fragment(Some(&format!("p{}", raw.no)));
    }

    Post {
        id: raw.no,
        thread: uid.clone(),
        subject: raw.sub.map(clean),
        body: raw.com.map(clean).unwrap_or_default(),
        url: url.to_string(),
        posted_at: raw
            .time
            .and_then(|t| DateTime::<Utc>::from_timestamp(t, 0)),
    }
}

#[async_trait]
impl BoardProvider for ChanProvider {
    async fn get_boards(
        &self,
        names: &BTreeSet<String>,
        clean_comments: bool,
    ) -> Result<Vec<Board>> {
        Ok(names
            .iter()
            .map(|name| Board::new(name.clone(), clean_comments))
            .collect())
    }

    async fn get_all_threads(&self, board: &Board, expand: bool) -> Result<Vec<Thread>> {
        let catalog = self.fetch_catalog(board).await?;

        if !expand {
            return catalog
                .into_iter()
                .map(|op| self.catalog_thread(board, op))
                .collect();
        }

        let delay = Duration::from_millis(self.config.request_delay_ms);
        let concurrency = self.config.max_concurrent.max(1);
        let mut threads = Vec::with_capacity(catalog.len());

        let mut expanded = stream::iter(catalog)
            .map(|op| self.expand_thread(board, op))
            .buffered(concurrency);

        while let Some(result) = expanded.next().await {
            threads.push(result?);

            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        log::debug!("/{}/: expanded {} threads", board.name, threads.len());
        Ok(threads)
    }
}
