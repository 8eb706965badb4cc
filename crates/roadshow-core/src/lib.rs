//! Scenario interpretation for the Roadshow workspace.
//!
//! This crate turns a parsed scenario document into behavior over time:
//! the trigger evaluator, the action dynamics, the story scheduler with
//! its priority arbitration, and the state gateway with binary recording.
//! Geometry and vehicle dynamics stay behind the `roadshow-world` traits;
//! this crate only decides what each entity should do each tick.
//!
//! # Modules
//!
//! - [`state`] -- Story-element lifecycle states and the name-keyed
//!   registry behind state-based triggers
//! - [`condition`] -- Stateful trigger evaluation with edge and delay
//!   semantics
//! - [`dynamics`] -- Scalar transition interpolation (shapes and timings)
//! - [`resolve`] -- Tick-start entity snapshots and position resolution
//! - [`engine`] -- The [`ScenarioEngine`] driving everything
//! - [`gateway`] -- Latest-state table, recording, and replay
//! - [`error`] -- Logic and recording error types

mod action;
pub mod condition;
pub mod dynamics;
pub mod engine;
pub mod error;
pub mod gateway;
pub mod resolve;
pub mod state;

// Re-export primary types at crate root.
pub use condition::{ConditionInstance, TriggerContext, evaluate_groups, reset_groups};
pub use dynamics::{Interpolator, VALUE_EPSILON, shape_fraction};
pub use engine::ScenarioEngine;
pub use error::{LogicError, RecordError};
pub use gateway::{Gateway, ObjectState, Recorder, Replay, ReplayHeader};
pub use resolve::{EntitySnapshot, SnapshotMap, resolve_pose};
pub use state::{ElementRecord, ElementRegistry, ElementState, Termination};
