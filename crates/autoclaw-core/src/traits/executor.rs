//! Executor trait — turns a prompt into a response (the LLM call).

use async_trait::async_trait;

use crate::error::ExecutorError;
use crate::types::ExecutorOutput;

/// Opaque prompt executor. Implementations wrap a provider, an agent engine,
/// or anything else that can answer a prompt for a session.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Executor name for logs.
    fn name(&self) -> &str {
        "executor"
    }

    /// Run one prompt on behalf of `session_id`.
    async fn invoke(&self, prompt: &str, session_id: &str)
    -> Result<ExecutorOutput, ExecutorError>;
}
