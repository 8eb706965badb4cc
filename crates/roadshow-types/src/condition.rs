//! Trigger conditions and their grouping.
//!
//! Conditions attach to start/end points of acts and events. Within one
//! [`ConditionGroup`] conditions combine with AND; the list of groups at a
//! trigger point combines with OR. Edge and delay semantics live in the
//! engine's trigger evaluator; this module only describes what was parsed.

use serde::{Deserialize, Serialize};

use crate::ids::EntityId;
use crate::position::PositionSpec;

/// Comparison operator used by numeric conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rule {
    /// Measured value must exceed the threshold.
    GreaterThan,
    /// Measured value must be below the threshold.
    LessThan,
    /// Measured value must equal the threshold within a small tolerance.
    EqualTo,
    /// Unrecognized rule token; never satisfied.
    Undefined,
}

/// Which boolean transition of a condition's raw signal counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConditionEdge {
    /// Fires on a false-to-true transition.
    Rising,
    /// Fires on a true-to-false transition.
    Falling,
    /// No filtering; the raw level is used directly.
    Any,
    /// Edge attribute absent or unrecognized; behaves like [`Self::Any`].
    #[default]
    None,
}

/// Structural level a state trigger refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StoryElementKind {
    /// An act.
    Act,
    /// A sequence (the document calls this level "scene").
    Scene,
    /// A maneuver.
    Maneuver,
    /// An event.
    Event,
    /// A single action.
    Action,
    /// Unrecognized element-type token; the condition never matches.
    Undefined,
}

/// Which kind of termination satisfies an after-termination trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminationRule {
    /// The element ran to natural completion.
    End,
    /// The element was cancelled before completing.
    Cancel,
    /// Either way of terminating counts.
    Any,
}

/// ALL/ANY combinator across the triggering entity set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerRule {
    /// Every listed entity must satisfy the raw test.
    All,
    /// At least one listed entity must satisfy the raw test.
    Any,
}

/// The entity set a by-entity condition is evaluated against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggeringEntities {
    /// How per-entity results combine.
    pub rule: TriggerRule,
    /// Entities whose state feeds the raw test.
    pub members: Vec<EntityId>,
}

/// Distance axis for relative-distance conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelativeDistanceKind {
    /// Along the triggering entity's direction of travel.
    Longitudinal,
    /// Perpendicular to the triggering entity's direction of travel.
    Lateral,
    /// Straight-line distance in the world frame.
    Inertial,
}

/// Payload of a single condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConditionKind {
    /// Time for a triggering entity to reach the referenced entity at its
    /// current speed.
    TimeHeadway {
        /// Entities evaluated against the test.
        triggering: TriggeringEntities,
        /// The entity headway is measured to.
        entity: EntityId,
        /// Threshold in seconds.
        value: f64,
        /// Comparison operator.
        rule: Rule,
        /// Subtract body dimensions from the measured distance.
        freespace: bool,
        /// Measure along the route instead of free space. Recognized but
        /// evaluated as free space.
        along_route: bool,
    },
    /// A triggering entity is within `tolerance` of a position.
    ReachPosition {
        /// Entities evaluated against the test.
        triggering: TriggeringEntities,
        /// Target position.
        position: PositionSpec,
        /// Radius in meters.
        tolerance: f64,
    },
    /// Distance between a triggering entity and another entity.
    RelativeDistance {
        /// Entities evaluated against the test.
        triggering: TriggeringEntities,
        /// The entity distance is measured to.
        entity: EntityId,
        /// Distance axis.
        kind: RelativeDistanceKind,
        /// Threshold in meters.
        value: f64,
        /// Comparison operator.
        rule: Rule,
        /// Subtract body dimensions from the measured distance.
        freespace: bool,
    },
    /// Distance between a triggering entity and a fixed position.
    Distance {
        /// Entities evaluated against the test.
        triggering: TriggeringEntities,
        /// Reference position.
        position: PositionSpec,
        /// Threshold in meters.
        value: f64,
        /// Comparison operator.
        rule: Rule,
        /// Subtract body dimensions from the measured distance.
        freespace: bool,
        /// Route-distance flag; recognized but always evaluated as
        /// straight-line distance.
        along_route: bool,
    },
    /// A named story element has started running.
    AtStart {
        /// Level of the referenced element.
        element: StoryElementKind,
        /// Name of the referenced element.
        name: String,
    },
    /// A named story element has terminated.
    AfterTermination {
        /// Level of the referenced element.
        element: StoryElementKind,
        /// Name of the referenced element.
        name: String,
        /// Which termination kinds count.
        rule: TerminationRule,
    },
    /// The simulation clock compared to a threshold.
    SimulationTime {
        /// Threshold in seconds.
        value: f64,
        /// Comparison operator.
        rule: Rule,
    },
}

/// A named trigger with edge and delay semantics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Condition name from the document.
    pub name: String,
    /// Seconds the fired trigger must hold before it counts, non-negative.
    pub delay: f64,
    /// Which raw-signal transition fires the trigger.
    pub edge: ConditionEdge,
    /// The raw test.
    pub kind: ConditionKind,
}

/// AND-combined set of conditions. A trigger point holds an OR-combined
/// list of groups.
pub type ConditionGroup = Vec<Condition>;
