//! Event Channel — per-session bounded buffer of progress events.
//!
//! `publish` is a `try_send`: when a session's buffer is full the new event is
//! dropped with a warning, so the loop never waits on a slow observer. Events
//! published before anyone subscribes stay buffered (up to capacity) for the
//! first subscriber.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_stream::wrappers::ReceiverStream;

/// Default per-session buffer size.
pub const DEFAULT_CAPACITY: usize = 1000;

/// Event type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    LoopStarted,
    IterationStart,
    RateLimit,
    UserMessage,
    SelfPrompt,
    ApprovalRequired,
    AgentStart,
    AutoRecall,
    Reasoning,
    ToolCall,
    ToolViolation,
    Response,
    IterationComplete,
    Error,
    LoopStopped,
}

/// A structured progress event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub session_id: String,
    pub data: serde_json::Value,
    pub timestamp: DateTime<Utc>,
    pub iteration: u64,
}

struct SessionChannel {
    tx: mpsc::Sender<Event>,
    /// Held here until the first subscriber takes it.
    rx: Option<mpsc::Receiver<Event>>,
    dropped: u64,
}

impl SessionChannel {
    fn new(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity);
        Self {
            tx,
            rx: Some(rx),
            dropped: 0,
        }
    }
}

/// Event channels for every session.
pub struct EventBus {
    capacity: usize,
    channels: Mutex<HashMap<String, SessionChannel>>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            channels: Mutex::new(HashMap::new()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn channels(&self) -> MutexGuard<'_, HashMap<String, SessionChannel>> {
        self.channels.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Publish without blocking. Returns `false` when the event was dropped.
    pub fn publish(
        &self,
        session_id: &str,
        kind: EventKind,
        data: serde_json::Value,
        iteration: u64,
    ) -> bool {
        let event = Event {
            kind,
            session_id: session_id.to_string(),
            data,
            timestamp: Utc::now(),
            iteration,
        };

        let mut channels = self.channels();
        let channel = channels
            .entry(session_id.to_string())
            .or_insert_with(|| SessionChannel::new(self.capacity));

        match channel.tx.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                channel.dropped += 1;
                tracing::warn!(
                    "⚠️ Event channel full for session '{}' (capacity {}), dropping {:?}",
                    session_id,
                    self.capacity,
                    event.kind
                );
                false
            }
            Err(TrySendError::Closed(event)) => {
                // Subscriber went away: buffer for the next one.
                let dropped = channel.dropped;
                *channel = SessionChannel::new(self.capacity);
                channel.dropped = dropped;
                channel.tx.try_send(event).is_ok()
            }
        }
    }

    /// Subscribe to a session's events. The first subscriber receives events
    /// buffered so far; a later subscriber replaces the previous one, whose
    /// stream ends once drained.
    pub fn subscribe(&self, session_id: &str) -> EventSubscription {
        let mut channels = self.channels();
        let channel = channels
            .entry(session_id.to_string())
            .or_insert_with(|| SessionChannel::new(self.capacity));

        let rx = match channel.rx.take() {
            Some(rx) => rx,
            None => {
                let (tx, rx) = mpsc::channel(self.capacity);
                channel.tx = tx;
                rx
            }
        };
        tracing::debug!("👀 Subscribed to events of session '{}'", session_id);
        EventSubscription {
            session_id: session_id.to_string(),
            rx,
        }
    }

    /// Events dropped so far because the session's buffer was full.
    pub fn dropped(&self, session_id: &str) -> u64 {
        self.channels().get(session_id).map_or(0, |c| c.dropped)
    }

    /// Forget a session's channel; current subscribers see end-of-stream.
    pub fn remove(&self, session_id: &str) -> bool {
        self.channels().remove(session_id).is_some()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// Receiving end of a session's events, in arrival order.
pub struct EventSubscription {
    session_id: String,
    rx: mpsc::Receiver<Event>,
}

impl EventSubscription {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Wait for the next event. `None` once the channel is replaced or removed
    /// and fully drained.
    pub async fn recv(&mut self) -> Option<Event> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Event> {
        self.rx.try_recv().ok()
    }

    /// Everything currently buffered.
    pub fn drain(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            events.push(event);
        }
        events
    }

    pub fn into_stream(self) -> ReceiverStream<Event> {
        ReceiverStream::new(self.rx)
    }
}
