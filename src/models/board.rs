// src/models/board.rs

//! Board, Thread, and Post data structures.

use std::fmt;
use std::iter;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named board as handed out by a board provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    /// Board name (e.g., "g", "diy")
    pub name: String,

    /// Whether post bodies on this board are reduced to plaintext
    pub clean_comments: bool,
}

impl Board {
    pub fn new(name: impl Into<String>, clean_comments: bool) -> Self {
        Self {
            name: name.into(),
            clean_comments,
        }
    }
}

/// Key identifying a thread across polls.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ThreadUid {
    pub board: String,
    pub thread_id: u64,
}

impl ThreadUid {
    pub fn new(board: impl Into<String>, thread_id: u64) -> Self {
        Self {
            board: board.into(),
            thread_id,
        }
    }
}

impl fmt::Display for ThreadUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.board, self.thread_id)
    }
}

/// A single post within a thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    /// Post number
    pub id: u64,

    /// Thread this post belongs to
    pub thread: ThreadUid,

    /// Subject line, usually only set on topic posts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,

    /// Post text
    pub body: String,

    /// Canonical link to the post
    pub url: String,

    /// When the post was made
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub posted_at: Option<DateTime<Utc>>,
}

impl Post {
    /// Format post for display using a template.
    ///
    /// Supported placeholders:
    /// - `{board}`, `{thread}`, `{post}`, `{subject}`, `{url}`, `{body}`
    pub fn format(&self, template: &str) -> String {
        template
            .replace("{board}", &self.thread.board)
            .replace("{thread}", &self.thread.thread_id.to_string())
            .replace("{post}", &self.id.to_string())
            .replace("{subject}", self.subject.as_deref().unwrap_or(""))
            .replace("{url}", &self.url)
            .replace("{body}", &self.body)
    }
}

/// A thread: one topic post followed by its replies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thread {
    /// Board name
    pub board: String,

    /// Thread number (same as the topic post number)
    pub id: u64,

    /// Opening post
    pub topic: Post,

    /// Replies in posting order
    #[serde(default)]
    pub replies: Vec<Post>,
}

impl Thread {
    pub fn uid(&self) -> ThreadUid {
        ThreadUid::new(self.board.clone(), self.id)
    }

    /// All posts, topic first.
    pub fn posts(&self) -> impl Iterator<Item = &Post> {
        iter::once(&self.topic).chain(self.replies.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(board: &str, thread: u64, id: u64, body: &str) -> Post {
        Post {
            id,
            thread: ThreadUid::new(board, thread),
            subject: None,
            body: body.to_string(),
            url: format!("https://example.com/{board}/thread/{thread}#p{id}"),
            posted_at: None,
        }
    }

    #[test]
    fn test_uid_display() {
        assert_eq!(ThreadUid::new("g", 42).to_string(), "g/42");
    }

    #[test]
    fn test_posts_topic_first() {
        let thread = Thread {
            board: "g".to_string(),
            id: 1,
            topic: post("g", 1, 1, "topic"),
            replies: vec![post("g", 1, 2, "first"), post("g", 1, 3, "second")],
        };
        let bodies: Vec<_> = thread.posts().map(|p| p.body.as_str()).collect();
        assert_eq!(bodies, vec!["topic", "first", "second"]);
        assert_eq!(thread.uid(), ThreadUid::new("g", 1));
    }

    #[test]
    fn test_format() {
        let mut p = post("diy", 7, 9, "hello");
        p.subject = Some("Bench".to_string());
        assert_eq!(p.format("/{board}/ {thread}#{post} [{subject}]"), "/diy/ 7#9 [Bench]");
    }
}
