//! Action descriptions: what an event does to its owning entity.
//!
//! Actions are pure descriptions; the engine owns the per-action runtime
//! (interpolation progress, frozen targets) and matches exhaustively on
//! [`ActionKind`] at execution sites. Every action is bound to exactly one
//! entity: events instantiate one [`ActionSpec`] per declared action per
//! sequence actor at parse time.

use serde::{Deserialize, Serialize};

use crate::ids::EntityId;
use crate::position::{PositionSpec, RouteSpec};

/// Interpolation curve for a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DynamicsShape {
    /// Straight interpolation from start to target.
    Linear,
    /// Raised-cosine ease-in/ease-out.
    Sinusoidal,
    /// Immediate jump to the target.
    Step,
    /// Unrecognized shape token; rejected when the action starts.
    Undefined,
}

/// What the timing value of a transition constrains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimingKind {
    /// Maximum change per second; no fixed end time.
    Rate,
    /// Total transition duration in seconds.
    Time,
    /// Total distance travelled during the transition in meters.
    Distance,
}

/// Timing constraint for a transition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Timing {
    /// Which quantity `value` constrains.
    pub kind: TimingKind,
    /// Rate, duration, or distance depending on `kind`.
    pub value: f64,
}

/// Shape plus optional timing. A missing timing means the target is
/// applied immediately.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransitionDynamics {
    /// Interpolation curve.
    pub shape: DynamicsShape,
    /// Timing constraint, if any.
    pub timing: Option<Timing>,
}

/// Acceleration/speed envelope for limited longitudinal dynamics.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DynamicLimits {
    /// Maximum acceleration in m/s².
    pub max_acceleration: Option<f64>,
    /// Maximum deceleration in m/s² (positive).
    pub max_deceleration: Option<f64>,
    /// Speed ceiling in m/s.
    pub max_speed: Option<f64>,
}

/// How a relative speed target combines with the reference speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpeedTargetKind {
    /// Target = reference speed + value.
    Delta,
    /// Target = reference speed × value.
    Factor,
}

/// Target of a speed action.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SpeedTarget {
    /// Fixed target speed in m/s.
    Absolute {
        /// Target speed.
        value: f64,
    },
    /// Target derived from another entity's speed.
    Relative {
        /// The reference entity.
        entity: EntityId,
        /// Delta in m/s or factor, per `kind`.
        value: f64,
        /// How `value` combines with the reference speed.
        kind: SpeedTargetKind,
        /// Re-sample the reference speed every tick instead of freezing
        /// it when the action starts. Continuous targets never complete
        /// on their own.
        continuous: bool,
    },
}

/// Gap measure for a distance (follow) action.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DistanceGap {
    /// Fixed gap in meters.
    Space {
        /// Desired gap.
        meters: f64,
    },
    /// Speed-dependent gap: desired distance = seconds × own speed.
    Time {
        /// Desired time gap.
        seconds: f64,
    },
}

/// Target lane of a lane-change action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LaneChangeTarget {
    /// Fixed signed lane id.
    Absolute {
        /// Target lane id.
        lane_id: i32,
    },
    /// Lane relative to another entity's current lane.
    Relative {
        /// The reference entity.
        entity: EntityId,
        /// Signed lane delta.
        delta: i32,
    },
}

/// Target lateral offset of a lane-offset action.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum LaneOffsetTarget {
    /// Fixed offset from the lane center in meters.
    Absolute {
        /// Target offset.
        offset: f64,
    },
    /// Offset relative to another entity's current lane offset.
    Relative {
        /// The reference entity.
        entity: EntityId,
        /// Offset added to the reference entity's lane offset.
        offset: f64,
    },
}

/// Path interpretation for a relative meeting action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MeetingMode {
    /// Straight-line closing toward the meeting point.
    Straight,
    /// Closing along a route; falls back to straight-line with a
    /// diagnostic.
    Route,
}

/// Control axes an autonomous toggle applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlDomain {
    /// Speed and gap control.
    Longitudinal,
    /// Lane and lateral-offset control.
    Lateral,
    /// Both axes.
    Both,
}

/// Payload of a single action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ActionKind {
    /// Converge the entity's speed toward a target.
    Speed {
        /// Interpolation shape and timing.
        dynamics: TransitionDynamics,
        /// Target speed description.
        target: SpeedTarget,
    },
    /// Maintain a gap behind another entity.
    Distance {
        /// The entity to follow.
        entity: EntityId,
        /// Desired gap.
        gap: DistanceGap,
        /// Subtract body lengths from the measured gap.
        freespace: bool,
        /// Acceleration envelope; `None` means the required speed is
        /// applied directly each tick.
        limits: Option<DynamicLimits>,
    },
    /// Move the entity into another lane.
    LaneChange {
        /// Interpolation shape and timing (time- or distance-based).
        dynamics: TransitionDynamics,
        /// Final offset from the target lane center in meters.
        target_lane_offset: f64,
        /// Target lane description.
        target: LaneChangeTarget,
    },
    /// Shift the entity laterally within its lane.
    LaneOffset {
        /// Interpolation shape.
        shape: DynamicsShape,
        /// Lateral acceleration bound in m/s², used to derive a duration
        /// when none is given.
        max_lateral_acc: f64,
        /// Transition duration in seconds, if specified.
        duration: Option<f64>,
        /// Target offset description.
        target: LaneOffsetTarget,
    },
    /// Teleport the entity to a position, instantaneously.
    Position(PositionSpec),
    /// Assign a route for the entity to follow.
    FollowRoute {
        /// The route to follow (cloned from its catalog or inline source).
        route: RouteSpec,
    },
    /// Reach a position at a fixed time from action start.
    MeetingAbsolute {
        /// The position to reach.
        position: PositionSpec,
        /// Seconds until arrival, measured from action start.
        time_to_destination: f64,
    },
    /// Arrive at an own target position in sync with another entity
    /// reaching its target position.
    MeetingRelative {
        /// The own entity's meeting point.
        position: PositionSpec,
        /// The entity to synchronize with.
        entity: EntityId,
        /// The reference entity's meeting point.
        entity_position: PositionSpec,
        /// Path interpretation.
        mode: MeetingMode,
        /// Seconds added to the reference entity's estimated arrival.
        offset_time: f64,
        /// Re-estimate the reference arrival every tick.
        continuous: bool,
    },
    /// Toggle autonomous control for one or both axes.
    Autonomous {
        /// Enable or disable.
        activate: bool,
        /// Affected control axes.
        domain: ControlDomain,
    },
}

/// A named action bound to its owning entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionSpec {
    /// Action name; synthesized by the reader when the document omits one.
    pub name: String,
    /// The entity this action drives.
    pub entity: EntityId,
    /// What the action does.
    pub kind: ActionKind,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn action_kind_roundtrip_serde() {
        let action = ActionSpec {
            name: "slowdown".to_owned(),
            entity: EntityId::new(1),
            kind: ActionKind::Speed {
                dynamics: TransitionDynamics {
                    shape: DynamicsShape::Sinusoidal,
                    timing: Some(Timing {
                        kind: TimingKind::Time,
                        value: 3.0,
                    }),
                },
                target: SpeedTarget::Relative {
                    entity: EntityId::new(0),
                    value: -5.0,
                    kind: SpeedTargetKind::Delta,
                    continuous: false,
                },
            },
        };
        let json = serde_json::to_string(&action).unwrap();
        let restored: ActionSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(action, restored);
    }
}
