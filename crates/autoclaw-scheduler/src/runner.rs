//! Autonomous Loop — the per-session worker that decides what to do next.
//!
//! Each tick: check the rate governor, take the next inbox message (user work
//! always preempts) or synthesize a self-prompt from goal state, run it
//! through the executor, record the outcome, publish events, then pace.
//! The inter-tick sleep and the in-flight executor call are both raced
//! against the stop signal, so `stop()` takes effect immediately.
//!
//! ```text
//!  Stopped ──start()──▶ Running ──stop() / fatal error count──▶ Stopped
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use autoclaw_core::config::{AutonomousConfig, ConfigSummary};
use autoclaw_core::error::ExecutorError;
use autoclaw_core::traits::{Executor, GoalSource};
use autoclaw_core::types::{ActionSource, ActionType, ExecutionResult};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::events::{EventBus, EventKind};
use crate::governor::RateGovernor;
use crate::history::{Action, ActionHistory};
use crate::inbox::{Inbox, QueueEntry};
use crate::prompt::{SelfPromptContext, build_self_prompt};

/// Wait after the governor denies an action. Longer than a typical tick so
/// the loop does not spin against the ceiling.
pub const RATE_LIMIT_COOLDOWN: Duration = Duration::from_secs(60);

/// History entries summarized into each self-prompt.
const RECENT_ACTIONS_IN_PROMPT: usize = 3;

/// Goals requested from the goal source per self-prompt.
const GOALS_IN_DIGEST: usize = 5;

/// Per-run session bookkeeping, reset on every `start`.
#[derive(Debug, Default)]
struct SessionState {
    running: bool,
    /// Bumped per `start`, so a detached worker cannot clobber a newer run.
    generation: u64,
    started_at: Option<Instant>,
    started_at_utc: Option<DateTime<Utc>>,
    iteration: u64,
    consecutive_errors: u32,
    focus_goal: Option<String>,
}

struct LoopState {
    session: SessionState,
    governor: RateGovernor,
    history: ActionHistory,
}

/// State shared between the handle and its background worker.
struct LoopShared {
    session_id: String,
    config: AutonomousConfig,
    executor: Arc<dyn Executor>,
    goals: Arc<dyn GoalSource>,
    inbox: Arc<Inbox>,
    events: Arc<EventBus>,
    state: Mutex<LoopState>,
}

struct LoopControl {
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Work picked for one tick.
struct Work {
    prompt: String,
    action_type: ActionType,
    source: ActionSource,
    goals_affected: Vec<String>,
    /// The inbox entry being answered; returned to the inbox if the loop
    /// stops before the executor finishes.
    entry: Option<QueueEntry>,
}

enum Outcome {
    Continue,
    Fatal,
}

/// Snapshot returned by [`AutonomousLoop::status`].
#[derive(Debug, Clone, Serialize)]
pub struct LoopStatus {
    pub running: bool,
    pub session_id: String,
    pub iteration_count: u64,
    pub actions_taken_count: u64,
    pub actions_this_hour: u32,
    pub uptime_seconds: u64,
    pub started_at: Option<DateTime<Utc>>,
    pub queue_size: usize,
    pub consecutive_errors: u32,
    pub focus_goal: Option<String>,
    pub config_summary: ConfigSummary,
}

/// Handle to one session's autonomous loop.
pub struct AutonomousLoop {
    shared: Arc<LoopShared>,
    control: tokio::sync::Mutex<Option<LoopControl>>,
}

impl AutonomousLoop {
    pub fn new(
        session_id: impl Into<String>,
        config: AutonomousConfig,
        executor: Arc<dyn Executor>,
        goals: Arc<dyn GoalSource>,
        inbox: Arc<Inbox>,
        events: Arc<EventBus>,
    ) -> Self {
        let state = LoopState {
            session: SessionState::default(),
            governor: RateGovernor::new(config.max_actions_per_hour),
            history: ActionHistory::new(config.history_limit),
        };
        Self {
            shared: Arc::new(LoopShared {
                session_id: session_id.into(),
                config,
                executor,
                goals,
                inbox,
                events,
                state: Mutex::new(state),
            }),
            control: tokio::sync::Mutex::new(None),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.shared.session_id
    }

    pub fn config(&self) -> &AutonomousConfig {
        &self.shared.config
    }

    /// Start ticking in a background task. Returns `false` (and does nothing)
    /// when already running or disabled by config.
    pub async fn start(&self) -> bool {
        let mut control = self.control.lock().await;
        let shared = &self.shared;

        if shared.lock().session.running {
            tracing::warn!(
                "⚠️ Autonomous loop for session '{}' is already running",
                shared.session_id
            );
            return false;
        }
        if !shared.config.enabled {
            tracing::info!(
                "Autonomous loop for session '{}' is disabled, not starting",
                shared.session_id
            );
            return false;
        }

        let generation = {
            let mut state = shared.lock();
            let generation = state.session.generation + 1;
            state.session = SessionState {
                running: true,
                generation,
                started_at: Some(Instant::now()),
                started_at_utc: Some(Utc::now()),
                ..Default::default()
            };
            generation
        };

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(shared.clone().run(generation, shutdown_rx));
        *control = Some(LoopControl {
            shutdown_tx,
            handle,
        });
        true
    }

    /// Signal the loop to exit and wait up to `stop_timeout_secs` for it.
    /// A loop that does not acknowledge in time is detached. No-op when no
    /// loop was started.
    pub async fn stop(&self) {
        let mut control = self.control.lock().await;
        let Some(LoopControl {
            shutdown_tx,
            mut handle,
        }) = control.take()
        else {
            tracing::debug!("No active loop for session '{}'", self.shared.session_id);
            return;
        };

        // Already gone after a fatal stop; nothing listens then.
        let _ = shutdown_tx.send(true);

        let timeout = self.shared.config.stop_timeout();
        match tokio::time::timeout(timeout, &mut handle).await {
            Ok(Ok(())) => {
                tracing::info!("🛑 Autonomous loop stopped for session '{}'", self.shared.session_id);
            }
            Ok(Err(e)) => {
                tracing::warn!(
                    "⚠️ Autonomous loop for session '{}' ended abnormally: {e}",
                    self.shared.session_id
                );
            }
            Err(_) => {
                tracing::warn!(
                    "⚠️ Autonomous loop for session '{}' did not stop within {:?}, detaching",
                    self.shared.session_id,
                    timeout
                );
            }
        }
        self.shared.lock().session.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.shared.lock().session.running
    }

    pub async fn status(&self) -> LoopStatus {
        let queue_size = self.shared.inbox.size(&self.shared.session_id).await;
        let state = self.shared.lock();
        let uptime_seconds = match (state.session.running, state.session.started_at) {
            (true, Some(started)) => started.elapsed().as_secs(),
            _ => 0,
        };
        LoopStatus {
            running: state.session.running,
            session_id: self.shared.session_id.clone(),
            iteration_count: state.session.iteration,
            actions_taken_count: state.history.total(),
            actions_this_hour: state.governor.actions_this_hour(),
            uptime_seconds,
            started_at: state.session.started_at_utc,
            queue_size,
            consecutive_errors: state.session.consecutive_errors,
            focus_goal: state.session.focus_goal.clone(),
            config_summary: self.shared.config.summary(),
        }
    }

    /// The last `limit` actions, oldest first.
    pub fn recent_actions(&self, limit: usize) -> Vec<Action> {
        self.shared.lock().history.recent(limit)
    }
}

impl LoopShared {
    fn lock(&self) -> MutexGuard<'_, LoopState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, iteration: u64, kind: EventKind, data: serde_json::Value) {
        self.events.publish(&self.session_id, kind, data, iteration);
    }

    async fn run(self: Arc<Self>, generation: u64, mut shutdown: watch::Receiver<bool>) {
        let interval = self.config.interval();
        tracing::info!(
            "🤖 Autonomous loop started for session '{}' (every {}s, max {}/h)",
            self.session_id,
            self.config.interval_secs,
            self.config.max_actions_per_hour
        );
        self.emit(
            0,
            EventKind::LoopStarted,
            json!({ "config": self.config.summary(), "executor": self.executor.name() }),
        );

        let reason = loop {
            if *shutdown.borrow() {
                break "stopped";
            }

            let iteration = {
                let mut state = self.lock();
                state.session.iteration += 1;
                state.session.iteration
            };
            self.emit(iteration, EventKind::IterationStart, json!({}));

            let (allowed, used) = {
                let mut state = self.lock();
                (state.governor.can_act(), state.governor.actions_this_hour())
            };
            if !allowed {
                tracing::warn!(
                    "⏳ Session '{}' hit {}/{} actions this hour, cooling down {}s",
                    self.session_id,
                    used,
                    self.config.max_actions_per_hour,
                    RATE_LIMIT_COOLDOWN.as_secs()
                );
                self.emit(
                    iteration,
                    EventKind::RateLimit,
                    json!({
                        "actions_this_hour": used,
                        "max_actions_per_hour": self.config.max_actions_per_hour,
                        "cooldown_secs": RATE_LIMIT_COOLDOWN.as_secs(),
                    }),
                );
                if pause(RATE_LIMIT_COOLDOWN, &mut shutdown).await {
                    break "stopped";
                }
                continue;
            }

            // The goal source may be slow. An entry taken from the inbox is
            // returned from `select_work` without further awaits, so losing
            // this race never drops a user message.
            let work = tokio::select! {
                biased;
                _ = stop_signalled(&mut shutdown) => break "stopped",
                work = self.select_work(iteration) => work,
            };
            let Some(work) = work else {
                if pause(interval, &mut shutdown).await {
                    break "stopped";
                }
                continue;
            };

            self.emit(
                iteration,
                EventKind::AgentStart,
                json!({
                    "source": work.source,
                    "action_type": work.action_type,
                    "executor": self.executor.name(),
                }),
            );
            let result = tokio::select! {
                biased;
                _ = stop_signalled(&mut shutdown) => None,
                result = self.executor.invoke(&work.prompt, &self.session_id) => Some(result),
            };
            let Some(result) = result else {
                self.return_to_inbox(work).await;
                break "stopped";
            };

            match result {
                Ok(output) => self.record_success(iteration, work, output.into_result()),
                Err(e) => {
                    if let Outcome::Fatal = self.record_failure(iteration, &e) {
                        break "fatal";
                    }
                }
            }

            if pause(interval, &mut shutdown).await {
                break "stopped";
            }
        };

        self.finish(generation, reason);
    }

    /// User messages first; otherwise a self-prompt from goal state.
    /// `None` when the self-prompt is held back for approval.
    async fn select_work(&self, iteration: u64) -> Option<Work> {
        if let Some(entry) = self.inbox.dequeue(&self.session_id).await {
            tracing::info!(
                "💬 Session '{}' picked user message {} ({})",
                self.session_id,
                entry.id,
                entry.priority
            );
            self.emit(
                iteration,
                EventKind::UserMessage,
                json!({
                    "entry_id": entry.id,
                    "message": entry.message,
                    "priority": entry.priority,
                    "metadata": entry.metadata,
                    "enqueued_at": entry.enqueued_at,
                }),
            );
            return Some(Work {
                prompt: entry.message.clone(),
                action_type: ActionType::UserResponse,
                source: ActionSource::UserQueued,
                goals_affected: Vec::new(),
                entry: Some(entry),
            });
        }

        let goals_digest = match self
            .goals
            .active_goals_digest(&self.session_id, GOALS_IN_DIGEST)
            .await
        {
            Ok(digest) => digest,
            Err(e) => {
                tracing::warn!("⚠️ Goal digest unavailable for '{}': {e}", self.session_id);
                String::new()
            }
        };
        let suggestion = if self.config.auto_goals {
            self.goals
                .suggest_next_goal(&self.session_id)
                .await
                .unwrap_or_else(|e| {
                    tracing::warn!("⚠️ Goal suggestion failed for '{}': {e}", self.session_id);
                    None
                })
        } else {
            None
        };

        let recent_actions = self.lock().history.digest(RECENT_ACTIONS_IN_PROMPT);
        let prompt = build_self_prompt(&SelfPromptContext {
            iteration,
            goals_digest: &goals_digest,
            suggestion: suggestion.as_ref(),
            recent_actions: &recent_actions,
        });

        let focus_goal = suggestion
            .as_ref()
            .map(|s| s.goal_id.clone().unwrap_or_else(|| s.goal_description.clone()));
        if focus_goal.is_some() {
            self.lock().session.focus_goal = focus_goal.clone();
        }
        let goals_affected = suggestion
            .as_ref()
            .and_then(|s| s.goal_id.clone())
            .into_iter()
            .collect();

        if self.config.requires_approval(ActionType::AutonomousAction) {
            tracing::info!(
                "✋ Self-prompt for session '{}' needs approval, not executing",
                self.session_id
            );
            self.emit(
                iteration,
                EventKind::ApprovalRequired,
                json!({
                    "action_type": ActionType::AutonomousAction,
                    "prompt": prompt,
                    "focus_goal": focus_goal,
                }),
            );
            return None;
        }

        self.emit(
            iteration,
            EventKind::SelfPrompt,
            json!({
                "prompt": prompt,
                "focus_goal": focus_goal,
                "suggestion": suggestion,
            }),
        );
        Some(Work {
            prompt,
            action_type: ActionType::AutonomousAction,
            source: ActionSource::Autonomous,
            goals_affected,
            entry: None,
        })
    }

    /// Put an unanswered user message back at the head of the inbox.
    async fn return_to_inbox(&self, work: Work) {
        if let Some(entry) = work.entry {
            tracing::info!(
                "↩️ Session '{}' stopped before answering {}, returning it to the inbox",
                self.session_id,
                entry.id
            );
            self.inbox.requeue_front(entry).await;
        }
    }

    fn record_success(&self, iteration: u64, work: Work, result: ExecutionResult) {
        let ExecutionResult {
            response_text,
            thoughts,
            tools_used,
        } = result;

        if let Some(recall) = &thoughts.auto_recall {
            self.emit(iteration, EventKind::AutoRecall, json!({ "content": recall }));
        }
        for (i, step) in thoughts.reasoning.iter().enumerate() {
            self.emit(
                iteration,
                EventKind::Reasoning,
                json!({ "step": i + 1, "content": step }),
            );
        }
        for call in &thoughts.tool_calls {
            self.emit(
                iteration,
                EventKind::ToolCall,
                json!({ "name": call.name, "arguments": call.arguments, "output": call.output }),
            );
        }
        self.emit(
            iteration,
            EventKind::Response,
            json!({
                "content": response_text,
                "source": work.source,
                "action_type": work.action_type,
            }),
        );

        let disallowed: Vec<&String> = tools_used
            .iter()
            .filter(|t| !self.config.allows_tool(t))
            .collect();
        if !disallowed.is_empty() {
            tracing::warn!(
                "⚠️ Session '{}' used tools outside the whitelist: {:?}",
                self.session_id,
                disallowed
            );
            self.emit(
                iteration,
                EventKind::ToolViolation,
                json!({ "tools": disallowed, "allowed": self.config.allowed_tools }),
            );
        }

        let completion = json!({
            "success": true,
            "source": work.source,
            "action_type": work.action_type,
            "tools_used": tools_used,
        });
        let action = Action {
            session_id: self.session_id.clone(),
            action_type: work.action_type,
            source: work.source,
            prompt: work.prompt,
            response: response_text,
            goals_affected: work.goals_affected,
            tools_used,
            thoughts,
            iteration,
            timestamp: Utc::now(),
        };

        let actions_this_hour = {
            let mut state = self.lock();
            state.governor.record_action();
            state.history.append(action);
            state.session.consecutive_errors = 0;
            state.governor.actions_this_hour()
        };
        tracing::info!(
            "✅ Session '{}' iteration {} done ({} this hour)",
            self.session_id,
            iteration,
            actions_this_hour
        );
        self.emit(iteration, EventKind::IterationComplete, completion);
    }

    fn record_failure(&self, iteration: u64, error: &ExecutorError) -> Outcome {
        let max = self.config.max_consecutive_errors;
        let errors = {
            let mut state = self.lock();
            state.session.consecutive_errors += 1;
            state.session.consecutive_errors
        };
        let fatal = errors >= max;

        self.emit(
            iteration,
            EventKind::Error,
            json!({
                "error": error.to_string(),
                "consecutive_errors": errors,
                "max_consecutive_errors": max,
                "fatal": fatal,
            }),
        );

        if fatal {
            tracing::error!(
                "🛑 Session '{}' stopping after {} consecutive errors (last: {error})",
                self.session_id,
                errors
            );
            Outcome::Fatal
        } else {
            tracing::warn!(
                "⚠️ Session '{}' iteration {} failed ({}/{}): {error}",
                self.session_id,
                iteration,
                errors,
                max
            );
            self.emit(
                iteration,
                EventKind::IterationComplete,
                json!({ "success": false, "error": error.to_string() }),
            );
            Outcome::Continue
        }
    }

    fn finish(&self, generation: u64, reason: &str) {
        let iteration = {
            let mut state = self.lock();
            if state.session.generation == generation {
                state.session.running = false;
            }
            state.session.iteration
        };
        self.emit(
            iteration,
            EventKind::LoopStopped,
            json!({ "reason": reason, "iterations": iteration }),
        );
        tracing::info!(
            "Autonomous loop for session '{}' exited ({reason}) after {} iterations",
            self.session_id,
            iteration
        );
    }
}

/// Resolves once stop is requested or the sender is gone.
async fn stop_signalled(shutdown: &mut watch::Receiver<bool>) {
    while !*shutdown.borrow_and_update() {
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

/// Sleep unless stop is requested first. Returns `true` on stop.
async fn pause(duration: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    if duration.is_zero() {
        tokio::task::yield_now().await;
        return *shutdown.borrow();
    }
    tokio::select! {
        _ = tokio::time::sleep(duration) => *shutdown.borrow(),
        _ = stop_signalled(shutdown) => true,
    }
}
