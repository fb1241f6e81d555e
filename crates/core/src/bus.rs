//! Typed event bus decoupling core logic from any particular delivery
//! mechanism (a desktop shell, a CLI, a test harness). Narrowed from a
//! generic `(topic: &str, payload: Value)` shape to a closed
//! [`SystemEvent`] enum, since every event this facade emits is already
//! a known Rust type and round-tripping it through JSON at the bus
//! boundary would only lose information.

use commentator_types::{Comment, Decision, Event, Turn};
use std::panic::AssertUnwindSafe;
use std::sync::Mutex;

/// The observable event surface of the facade (§4.7's table).
#[derive(Debug, Clone)]
pub enum SystemEvent {
    CommentStarted {
        turn: Turn,
    },
    CommentGenerated {
        comment: Comment,
        turn: Turn,
    },
    CommentRejected {
        reason: String,
        turn: Turn,
    },
    EventsDetected {
        events: Vec<Event>,
        turn: Turn,
        processing_time_ms: u64,
    },
    DecisionMade {
        decision: Decision,
        turn: Turn,
        processing_time_ms: u64,
    },
    Error {
        error: String,
        turn: Option<Turn>,
    },
}

/// Emits [`SystemEvent`]s to subscribers. Implementations must not block
/// (§5's "listeners must not block") and a panicking implementation must
/// not be allowed to take down the task emitting the event — callers use
/// [`emit_isolated`] rather than calling `emit` directly for that reason.
pub trait EventBus: Send + Sync {
    fn emit(&self, event: SystemEvent);
}

/// Calls `bus.emit(event)`, catching any panic so one broken listener
/// cannot prevent the caller's task from continuing (§7's "listener
/// exceptions must be isolated").
pub fn emit_isolated(bus: &dyn EventBus, event: SystemEvent) {
    if std::panic::catch_unwind(AssertUnwindSafe(|| bus.emit(event))).is_err() {
        tracing::error!("event bus listener panicked; event dropped");
    }
}

/// In-memory event bus for testing: captures every emitted event in
/// arrival order.
#[derive(Default)]
pub struct InMemoryEventBus {
    events: Mutex<Vec<SystemEvent>>,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SystemEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().unwrap().is_empty()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

impl EventBus for InMemoryEventBus {
    fn emit(&self, event: SystemEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Discards every event. Useful for headless/benchmark runs with no
/// listener at all.
pub struct NullEventBus;

impl EventBus for NullEventBus {
    fn emit(&self, _event: SystemEvent) {}
}
