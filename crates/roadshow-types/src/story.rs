//! The story graph: nested structure from stories down to events.
//!
//! Ownership is strictly single-parent: a story owns its acts, an act its
//! sequences, and so on down to actions. Cross-references to entities are
//! ids into the entity pool, never back-pointers.

use serde::{Deserialize, Serialize};

use crate::action::ActionSpec;
use crate::condition::ConditionGroup;
use crate::ids::EntityId;

/// Conflict-resolution priority of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventPriority {
    /// Terminate a conflicting running event and start immediately.
    Overwrite,
    /// Wait until the conflicting event finishes, then start.
    Following,
    /// Drop this event entirely if a conflict exists when it fires.
    Skip,
}

/// Smallest schedulable unit: actions fired together under one trigger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Event name.
    pub name: String,
    /// Priority against conflicting events.
    pub priority: EventPriority,
    /// Actions, one instance per declared action per sequence actor.
    pub actions: Vec<ActionSpec>,
    /// Start trigger (OR across groups, AND within).
    pub start_groups: Vec<ConditionGroup>,
}

/// Named list of events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Maneuver {
    /// Maneuver name.
    pub name: String,
    /// Events in declaration order.
    pub events: Vec<Event>,
}

/// Actor binding plus maneuvers, repeated a fixed number of times.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sequence {
    /// Sequence name.
    pub name: String,
    /// Entities the maneuvers apply to.
    pub actors: Vec<EntityId>,
    /// Number of times the maneuver set runs, at least 1.
    pub repetitions: u32,
    /// Maneuvers in declaration order.
    pub maneuvers: Vec<Maneuver>,
}

/// A triggered phase of the story.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Act {
    /// Act name.
    pub name: String,
    /// Sequences in declaration order.
    pub sequences: Vec<Sequence>,
    /// Start trigger.
    pub start_groups: Vec<ConditionGroup>,
    /// End trigger; an act without one never completes on its own.
    pub end_groups: Vec<ConditionGroup>,
}

/// Top-level narrative unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Story {
    /// Story name.
    pub name: String,
    /// Name of the entity this story centers on; also injected as the
    /// `$owner` parameter while the story is parsed.
    pub owner: String,
    /// Acts in declaration order.
    pub acts: Vec<Act>,
}
