//! Test doubles for the executor and goal source.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use autoclaw_core::error::{AutoClawError, ExecutorError, Result};
use autoclaw_core::traits::{Executor, GoalSource};
use autoclaw_core::types::{ExecutorOutput, GoalSuggestion};

type Outcome = std::result::Result<ExecutorOutput, ExecutorError>;

/// Replays queued outcomes, then repeats a fallback. Records every prompt.
pub(crate) struct ScriptedExecutor {
    script: Mutex<VecDeque<Outcome>>,
    fallback: Outcome,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedExecutor {
    pub(crate) fn always(fallback: Outcome) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn always_ok(text: &str) -> Self {
        Self::always(Ok(text.into()))
    }

    pub(crate) fn always_err(message: &str) -> Self {
        Self::always(Err(ExecutorError::Failed(message.into())))
    }

    /// Queue an outcome ahead of the fallback.
    pub(crate) fn then(self, outcome: Outcome) -> Self {
        self.script.lock().unwrap().push_back(outcome);
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub(crate) fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Executor for ScriptedExecutor {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn invoke(&self, prompt: &str, _session_id: &str) -> Outcome {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }
}

/// Never completes.
pub(crate) struct HangingExecutor;

#[async_trait]
impl Executor for HangingExecutor {
    async fn invoke(&self, _prompt: &str, _session_id: &str) -> Outcome {
        std::future::pending().await
    }
}

#[derive(Default)]
pub(crate) struct StaticGoals {
    digest: String,
    suggestion: Option<GoalSuggestion>,
}

impl StaticGoals {
    pub(crate) fn with_suggestion(digest: &str, goal_id: &str, description: &str) -> Self {
        Self {
            digest: digest.into(),
            suggestion: Some(GoalSuggestion {
                goal_id: Some(goal_id.into()),
                goal_description: description.into(),
                reasoning: "highest priority".into(),
            }),
        }
    }
}

#[async_trait]
impl GoalSource for StaticGoals {
    async fn active_goals_digest(&self, _owner: &str, _limit: usize) -> Result<String> {
        Ok(self.digest.clone())
    }

    async fn suggest_next_goal(&self, _owner: &str) -> Result<Option<GoalSuggestion>> {
        Ok(self.suggestion.clone())
    }
}

pub(crate) struct FailingGoals;

#[async_trait]
impl GoalSource for FailingGoals {
    async fn active_goals_digest(&self, _owner: &str, _limit: usize) -> Result<String> {
        Err(AutoClawError::Goal("goal store offline".into()))
    }

    async fn suggest_next_goal(&self, _owner: &str) -> Result<Option<GoalSuggestion>> {
        Err(AutoClawError::Goal("goal store offline".into()))
    }
}

/// Goal store that never answers.
pub(crate) struct HangingGoals;

#[async_trait]
impl GoalSource for HangingGoals {
    async fn active_goals_digest(&self, _owner: &str, _limit: usize) -> Result<String> {
        std::future::pending().await
    }

    async fn suggest_next_goal(&self, _owner: &str) -> Result<Option<GoalSuggestion>> {
        std::future::pending().await
    }
}
