//! Records exchanged between the scheduler and its collaborators.

use serde::{Deserialize, Serialize};

/// Inbox priority tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    #[default]
    Normal,
    /// Inserted at the head of the session's inbox.
    High,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::Normal => write!(f, "normal"),
            Priority::High => write!(f, "high"),
        }
    }
}

/// Kind of work an action represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Answer to a message a caller queued.
    UserResponse,
    /// Self-directed work derived from goal state.
    AutonomousAction,
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionType::UserResponse => write!(f, "user_response"),
            ActionType::AutonomousAction => write!(f, "autonomous_action"),
        }
    }
}

/// Where the prompt of an action came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionSource {
    UserQueued,
    Autonomous,
}

impl std::fmt::Display for ActionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionSource::UserQueued => write!(f, "user_queued"),
            ActionSource::Autonomous => write!(f, "autonomous"),
        }
    }
}

/// A tool invocation recorded by the executor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    #[serde(alias = "tool")]
    pub name: String,
    #[serde(default, alias = "args", alias = "input")]
    pub arguments: serde_json::Value,
    #[serde(default, alias = "result")]
    pub output: Option<String>,
}

/// Intermediate reasoning the executor exposes alongside its answer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Thoughts {
    #[serde(default)]
    pub reasoning: Vec<String>,
    #[serde(default, alias = "toolCalls")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, alias = "autoRecall")]
    pub auto_recall: Option<String>,
}

impl Thoughts {
    pub fn is_empty(&self) -> bool {
        self.reasoning.is_empty() && self.tool_calls.is_empty() && self.auto_recall.is_none()
    }
}

/// Normalized executor result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    #[serde(rename = "output", alias = "response_text")]
    pub response_text: String,
    #[serde(default)]
    pub thoughts: Thoughts,
    #[serde(default)]
    pub tools_used: Vec<String>,
}

/// Raw executor output: either a structured result or a bare string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExecutorOutput {
    Text(String),
    Structured(ExecutionResult),
}

impl ExecutorOutput {
    /// Normalize into an [`ExecutionResult`]. A bare string becomes the
    /// response text with empty thoughts and no tools.
    pub fn into_result(self) -> ExecutionResult {
        match self {
            ExecutorOutput::Text(text) => ExecutionResult {
                response_text: text,
                ..Default::default()
            },
            ExecutorOutput::Structured(result) => result,
        }
    }
}

impl From<String> for ExecutorOutput {
    fn from(text: String) -> Self {
        ExecutorOutput::Text(text)
    }
}

impl From<&str> for ExecutorOutput {
    fn from(text: &str) -> Self {
        ExecutorOutput::Text(text.to_string())
    }
}

impl From<ExecutionResult> for ExecutorOutput {
    fn from(result: ExecutionResult) -> Self {
        ExecutorOutput::Structured(result)
    }
}

/// Next-goal suggestion from the goal collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalSuggestion {
    /// Identifier of an existing goal, when the suggestion refers to one.
    #[serde(default)]
    pub goal_id: Option<String>,
    pub goal_description: String,
    #[serde(default)]
    pub reasoning: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_string_output() {
        let out: ExecutorOutput = serde_json::from_str(r#""just text""#).unwrap();
        let result = out.into_result();
        assert_eq!(result.response_text, "just text");
        assert!(result.thoughts.is_empty());
        assert!(result.tools_used.is_empty());
    }

    #[test]
    fn test_structured_output_camel_case() {
        let json = r#"{
            "output": "done",
            "thoughts": {
                "reasoning": ["look up", "summarize"],
                "toolCalls": [{"name": "web_search", "arguments": {"q": "rust"}}],
                "autoRecall": "previous notes"
            },
            "tools_used": ["web_search"]
        }"#;
        let result = serde_json::from_str::<ExecutorOutput>(json).unwrap().into_result();
        assert_eq!(result.response_text, "done");
        assert_eq!(result.thoughts.reasoning.len(), 2);
        assert_eq!(result.thoughts.tool_calls[0].name, "web_search");
        assert_eq!(result.thoughts.tool_calls[0].arguments["q"], "rust");
        assert_eq!(result.thoughts.auto_recall.as_deref(), Some("previous notes"));
        assert_eq!(result.tools_used, vec!["web_search"]);
    }

    #[test]
    fn test_structured_output_missing_thoughts() {
        let result = serde_json::from_str::<ExecutorOutput>(r#"{"output": "ok"}"#)
            .unwrap()
            .into_result();
        assert_eq!(result.response_text, "ok");
        assert!(result.thoughts.is_empty());
    }

    #[test]
    fn test_enum_wire_names() {
        assert_eq!(serde_json::to_string(&Priority::High).unwrap(), r#""high""#);
        assert_eq!(
            serde_json::to_string(&ActionType::AutonomousAction).unwrap(),
            r#""autonomous_action""#
        );
        assert_eq!(ActionSource::UserQueued.to_string(), "user_queued");
    }
}
