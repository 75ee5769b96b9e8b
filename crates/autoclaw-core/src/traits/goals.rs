//! Goal collaborator trait — supplies goal text for self-generated work.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::GoalSuggestion;

#[async_trait]
pub trait GoalSource: Send + Sync {
    /// Short human-readable digest of up to `limit` active goals for `owner`.
    async fn active_goals_digest(&self, owner: &str, limit: usize) -> Result<String>;

    /// What `owner` should focus on next, if anything.
    async fn suggest_next_goal(&self, owner: &str) -> Result<Option<GoalSuggestion>>;
}
