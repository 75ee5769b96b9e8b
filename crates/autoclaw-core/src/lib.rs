//! # AutoClaw Core
//! Shared building blocks for the autonomous session scheduler:
//! configuration, the error type, collaborator traits (Executor, GoalSource),
//! and the records exchanged with them.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::{AutoClawConfig, AutonomousConfig, EventsConfig};
pub use error::{AutoClawError, ExecutorError, Result};
pub use traits::{Executor, GoalSource};
pub use types::{
    ActionSource, ActionType, ExecutionResult, ExecutorOutput, GoalSuggestion, Priority, Thoughts,
    ToolCall,
};
