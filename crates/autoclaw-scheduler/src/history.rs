//! Action History — append-only log of executed work for one session.
//! Keeps the most recent `limit` actions in memory (ring buffer); the total
//! count survives eviction.

use std::collections::VecDeque;

use autoclaw_core::types::{ActionSource, ActionType, Thoughts};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Characters of each response kept in the self-prompt digest.
const DIGEST_CHARS: usize = 100;

/// One executed work item. Immutable once appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    pub session_id: String,
    pub action_type: ActionType,
    pub source: ActionSource,
    pub prompt: String,
    pub response: String,
    #[serde(default)]
    pub goals_affected: Vec<String>,
    #[serde(default)]
    pub tools_used: Vec<String>,
    #[serde(default)]
    pub thoughts: Thoughts,
    pub iteration: u64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug)]
pub struct ActionHistory {
    actions: VecDeque<Action>,
    limit: usize,
    total: u64,
}

impl ActionHistory {
    pub fn new(limit: usize) -> Self {
        Self {
            actions: VecDeque::new(),
            limit: limit.max(1),
            total: 0,
        }
    }

    /// Append in execution order. Iteration numbers restart with each run
    /// of the loop, so order is by arrival, not by `iteration`.
    pub fn append(&mut self, action: Action) {
        self.actions.push_back(action);
        self.total += 1;
        while self.actions.len() > self.limit {
            self.actions.pop_front();
        }
    }

    /// The last `limit` actions, oldest first.
    pub fn recent(&self, limit: usize) -> Vec<Action> {
        let skip = self.actions.len().saturating_sub(limit);
        self.actions.iter().skip(skip).cloned().collect()
    }

    /// One line per recent action: `type: first 100 chars of response`.
    pub fn digest(&self, limit: usize) -> String {
        let skip = self.actions.len().saturating_sub(limit);
        self.actions
            .iter()
            .skip(skip)
            .map(|a| format!("- {}: {}", a.action_type, truncate_chars(&a.response, DIGEST_CHARS)))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Actions currently retained.
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Actions ever appended, including evicted ones.
    pub fn total(&self) -> u64 {
        self.total
    }
}

/// Cut at a char boundary (responses are often non-ASCII).
fn truncate_chars(s: &str, max_chars: usize) -> String {
    let flat = s.replace('\n', " ");
    match flat.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &flat[..idx]),
        None => flat,
    }
}
