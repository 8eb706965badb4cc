//! Scenario document model for the Roadshow workspace.
//!
//! This crate is the single source of truth for the types a parsed
//! driving scenario is made of. Everything here is pure data with
//! accessors only -- the reader constructs it, the engine interprets it,
//! and neither adds behavior to these types.
//!
//! # Modules
//!
//! - [`ids`] -- Declaration-order entity identifier
//! - [`geometry`] -- World-frame pose and road-coordinate value types
//! - [`entity`] -- Vehicle definitions and the entity pool
//! - [`position`] -- Position flavors and routes
//! - [`condition`] -- Trigger conditions and grouping
//! - [`action`] -- Action descriptions and dynamics parameters
//! - [`story`] -- The story/act/sequence/maneuver/event hierarchy
//! - [`catalog`] -- Template libraries (vehicles, routes, maneuvers)
//! - [`scenario`] -- The complete parsed document

pub mod action;
pub mod catalog;
pub mod condition;
pub mod entity;
pub mod geometry;
pub mod ids;
pub mod position;
pub mod scenario;
pub mod story;

// Re-export all public types at crate root for convenience.
pub use action::{
    ActionKind, ActionSpec, ControlDomain, DistanceGap, DynamicLimits, DynamicsShape,
    LaneChangeTarget, LaneOffsetTarget, MeetingMode, SpeedTarget, SpeedTargetKind, Timing,
    TimingKind, TransitionDynamics,
};
pub use catalog::{Catalog, CatalogEntry, CatalogKind, CatalogPayload};
pub use condition::{
    Condition, ConditionEdge, ConditionGroup, ConditionKind, RelativeDistanceKind, Rule,
    StoryElementKind, TerminationRule, TriggerRule, TriggeringEntities,
};
pub use entity::{
    ControlOverride, Dimensions, Entity, EntityPool, Property, PropertySet, VehicleCategory,
    VehicleSpec,
};
pub use geometry::{RoadCoord, WorldPose};
pub use ids::EntityId;
pub use position::{Orientation, OrientationKind, PositionSpec, RouteSpec};
pub use scenario::{RoadFiles, ScenarioGraph};
pub use story::{Act, Event, EventPriority, Maneuver, Sequence, Story};
