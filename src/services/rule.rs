// src/services/rule.rs

//! Scan rules: board scope plus term and keyword matching.

use std::collections::BTreeSet;

use regex::Regex;

use crate::error::{AppError, Result};
use crate::models::{Board, Post, ScanConfig, Thread};

/// A compiled matching predicate.
///
/// Terms are plain lowercase substrings, which suits multi-word phrases.
/// Words are single tokens that only hit on word boundaries, so `cat` does
/// not fire on `concatenate`.
#[derive(Debug, Clone)]
pub struct ScanRule {
    description: String,
    topics_only: bool,
    boards: BTreeSet<String>,
    terms: Vec<String>,
    keywords: Option<Regex>,
}

impl ScanRule {
    /// Compile a rule from its configuration entry.
    pub fn new(config: &ScanConfig) -> Result<Self> {
        let boards = config.board_names();
        if boards.is_empty() {
            return Err(AppError::config(format!(
                "scan {:?} has no boards",
                config.description
            )));
        }

        Ok(Self {
            description: config.description.clone(),
            topics_only: config.topics_only,
            boards,
            terms: normalize(&config.terms),
            keywords: Self::compile_keywords(&normalize(&config.words))?,
        })
    }

    fn compile_keywords(words: &[String]) -> Result<Option<Regex>> {
        if words.is_empty() {
            return Ok(None);
        }
        let alternation = words
            .iter()
            .map(|w| regex::escape(w))
            .collect::<Vec<_>>()
            .join("|");
        // Bodies are lowercased before matching, as are the words.
        Ok(Some(Regex::new(&format!(r"\b(?:{alternation})\b"))?))
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn topics_only(&self) -> bool {
        self.topics_only
    }

    pub fn boards(&self) -> &BTreeSet<String> {
        &self.boards
    }

    pub fn applies_to(&self, board: &str) -> bool {
        self.boards.contains(board)
    }

    /// First post in the thread that satisfies this rule, if any.
    ///
    /// Only the topic is considered for topic-only rules.
    pub fn matches<'t>(&self, board: &Board, thread: &'t Thread) -> Option<&'t Post> {
        if !self.applies_to(&board.name) {
            return None;
        }
        if self.topics_only {
            return Some(&thread.topic).filter(|post| self.search_hit(&post.body));
        }
        thread.posts().find(|post| self.search_hit(&post.body))
    }

    /// Whether `body` contains any term or whole-word keyword.
    pub fn search_hit(&self, body: &str) -> bool {
        if body.is_empty() {
            return false;
        }
        let body = body.to_lowercase();

        self.terms.iter().any(|term| body.contains(term.as_str()))
            || self.keywords.as_ref().is_some_and(|re| re.is_match(&body))
    }
}

fn normalize(items: &[String]) -> Vec<String> {
    items
        .iter()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}
