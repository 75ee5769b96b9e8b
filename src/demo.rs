//! Stand-in collaborators for the demo binary.

use async_trait::async_trait;
use autoclaw_core::error::{ExecutorError, Result};
use autoclaw_core::traits::{Executor, GoalSource};
use autoclaw_core::types::{ExecutionResult, ExecutorOutput, GoalSuggestion, Thoughts};

/// Echoes the first line of each prompt back as the response.
pub struct EchoExecutor;

#[async_trait]
impl Executor for EchoExecutor {
    fn name(&self) -> &str {
        "echo"
    }

    async fn invoke(
        &self,
        prompt: &str,
        session_id: &str,
    ) -> std::result::Result<ExecutorOutput, ExecutorError> {
        let first_line = prompt.lines().next().unwrap_or_default();
        Ok(ExecutorOutput::Structured(ExecutionResult {
            response_text: format!("[{session_id}] echo: {first_line}"),
            thoughts: Thoughts {
                reasoning: vec![format!("Prompt has {} lines", prompt.lines().count())],
                ..Default::default()
            },
            tools_used: Vec::new(),
        }))
    }
}

/// Fixed goal list; always suggests the first goal.
pub struct StaticGoals {
    goals: Vec<String>,
}

impl StaticGoals {
    pub fn new(goals: Vec<String>) -> Self {
        Self { goals }
    }
}

#[async_trait]
impl GoalSource for StaticGoals {
    async fn active_goals_digest(&self, _owner: &str, limit: usize) -> Result<String> {
        Ok(self
            .goals
            .iter()
            .take(limit)
            .enumerate()
            .map(|(i, g)| format!("{}. {g}", i + 1))
            .collect::<Vec<_>>()
            .join("\n"))
    }

    async fn suggest_next_goal(&self, _owner: &str) -> Result<Option<GoalSuggestion>> {
        Ok(self.goals.first().map(|g| GoalSuggestion {
            goal_id: Some("goal-1".into()),
            goal_description: g.clone(),
            reasoning: "First goal on the list".into(),
        }))
    }
}
