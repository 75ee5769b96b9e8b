//! # AutoClaw Scheduler
//!
//! Autonomous per-session loops: every session gets a background worker that
//! answers queued user messages first and otherwise works toward its goals,
//! within a rolling-hour action ceiling.
//!
//! ## Architecture
//! ```text
//! SessionRegistry ──owns──▶ Inbox (per-session, High at head / Normal at tail)
//!        │          └─────▶ EventBus (per-session bounded channel, drop-newest)
//!        ▼
//! AutonomousLoop (one per session, tokio task)
//!   ├── RateGovernor  → max actions per rolling hour
//!   ├── Inbox.dequeue → user message, else self-prompt from GoalSource
//!   ├── Executor      → response + thoughts + tools used
//!   └── ActionHistory → ring buffer, feeds the next self-prompt
//! ```

pub mod events;
pub mod governor;
pub mod history;
pub mod inbox;
pub mod prompt;
pub mod registry;
pub mod runner;

#[cfg(test)]
mod testing;

pub use events::{Event, EventBus, EventKind, EventSubscription};
pub use governor::RateGovernor;
pub use history::{Action, ActionHistory};
pub use inbox::{EntryStatus, Inbox, Metadata, QueueEntry};
pub use registry::SessionRegistry;
pub use runner::{AutonomousLoop, LoopStatus};
