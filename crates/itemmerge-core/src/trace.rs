//! Trace capability handed to the merge engine.
//!
//! The engine never logs through global state; callers pass a [`MergeTrace`].
//! [`TracingTrace`] forwards to `tracing`, [`RecordingTrace`] keeps events in
//! memory.

use crate::item::Item;
use crate::targets::{TargetKind, TargetSet};
use serde::Serialize;
use std::cell::RefCell;
use std::fmt;

/// Which merge pass produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Pass {
    SameCondition,
    NoCondition,
    HasCondition,
}

impl fmt::Display for Pass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SameCondition => write!(f, "same-condition"),
            Self::NoCondition => write!(f, "no-condition"),
            Self::HasCondition => write!(f, "has-condition"),
        }
    }
}

/// Something the engine decided while merging one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TraceEvent {
    /// An item entered the applicator.
    Received { item: String, destination_chain: String },
    /// A pass found candidates to reconcile against.
    Candidates { pass: Pass, count: usize },
    /// Pass 1 folded shared targets into a new merged item.
    Merged { kind: TargetKind, targets: TargetSet },
    /// Targets already declared identically elsewhere were dropped.
    Encompassed {
        pass: Pass,
        kind: TargetKind,
        targets: TargetSet,
    },
    /// An existing item lost all its targets and was detached.
    Detached { pass: Pass, item: String },
    /// A remove-only record was created or extended.
    RemoveEmitted { pass: Pass, targets: TargetSet },
    /// The incoming item was fully absorbed and will not be appended.
    Consumed { pass: Pass },
    /// The surviving item was appended to the destination.
    Appended { item: String },
}

impl TraceEvent {
    /// Build a `Received` event.
    #[must_use]
    pub fn received(item: &Item, destination_chain: impl fmt::Display) -> Self {
        Self::Received {
            item: item.to_string(),
            destination_chain: destination_chain.to_string(),
        }
    }
}

/// Sink for engine decisions.
pub trait MergeTrace {
    fn record(&self, event: TraceEvent);
}

/// Forwards events to `tracing` at debug level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingTrace;

impl MergeTrace for TracingTrace {
    fn record(&self, event: TraceEvent) {
        match &event {
            TraceEvent::Consumed { pass } => {
                tracing::debug!(pass = %pass, "Item completely merged");
            }
            TraceEvent::Appended { item } => {
                tracing::debug!(item = %item, "Item appended");
            }
            other => tracing::debug!(event = ?other, "Merge step"),
        }
    }
}

/// Keeps every event in memory, in order.
#[derive(Debug, Default)]
pub struct RecordingTrace {
    events: RefCell<Vec<TraceEvent>>,
}

impl RecordingTrace {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded events so far.
    #[must_use]
    pub fn events(&self) -> Vec<TraceEvent> {
        self.events.borrow().clone()
    }
}

impl MergeTrace for RecordingTrace {
    fn record(&self, event: TraceEvent) {
        self.events.borrow_mut().push(event);
    }
}
