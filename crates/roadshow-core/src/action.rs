//! Per-action runtime: frozen targets, interpolators, and tick effects.
//!
//! When an event starts, each of its actions becomes one [`ActionRuntime`]
//! with everything resolved that the action semantics freeze at start
//! time (relative speed references, meeting poses, lane-center deltas).
//! Each tick the runtime emits [`ActionEffect`]s for the engine to apply
//! and reports whether the action has completed. Runtimes never touch
//! entity state directly; they only read the tick-start snapshots.

use roadshow_types::{
    ActionKind, ActionSpec, ControlDomain, DistanceGap, DynamicLimits, EntityId, LaneChangeTarget,
    LaneOffsetTarget, MeetingMode, PositionSpec, RouteSpec, SpeedTarget, SpeedTargetKind, Timing,
    TimingKind, WorldPose,
};
use roadshow_world::{DriveCommand, RoadNetwork};
use tracing::{debug, warn};

use crate::dynamics::{Interpolator, VALUE_EPSILON};
use crate::error::LogicError;
use crate::resolve::{EntitySnapshot, SnapshotMap, planar_distance, resolve_pose};

/// How close to a meeting point counts as arrived, in meters.
const ARRIVAL_TOLERANCE: f64 = 0.5;

/// Gap-error feedback gain for distance (follow) actions, in 1/s.
const FOLLOW_GAIN: f64 = 0.5;

/// Shortest horizon a meeting action plans over, in seconds.
const MIN_ETA: f64 = 0.1;

/// One state change an action requests for its entity this tick.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ActionEffect {
    /// Set the entity's speed directly (dynamics already shaped it).
    SetSpeed(f64),
    /// Converge toward a target speed through the vehicle model.
    Drive(DriveCommand),
    /// Set the lateral offset from the current lane center.
    LaneOffset(f64),
    /// Finish a lane change: jump to the target lane at the given offset.
    CommitLane {
        /// Target lane id.
        lane_id: i32,
        /// Final offset from the target lane center.
        offset: f64,
    },
    /// Teleport to a position.
    Teleport(Box<PositionSpec>),
    /// Assign a route to follow.
    AssignRoute(Box<RouteSpec>),
    /// Toggle autonomous control.
    Autonomy {
        /// Enable or disable.
        activate: bool,
        /// Affected axes.
        domain: ControlDomain,
    },
}

/// Result of ticking one action.
#[derive(Debug, Default)]
pub(crate) struct ActionTick {
    /// Effects to apply to the owning entity.
    pub effects: Vec<ActionEffect>,
    /// The action has completed and can be retired.
    pub done: bool,
}

/// Inputs an action may read during start or tick.
pub(crate) struct ActionCtx<'a> {
    pub now: f64,
    pub dt: f64,
    pub snapshots: &'a SnapshotMap,
    pub network: &'a dyn RoadNetwork,
}

/// Per-kind runtime state.
#[derive(Debug, Clone)]
enum RuntimeKind {
    Speed {
        interp: Interpolator,
        /// Re-sampled reference for continuous relative targets.
        reference: Option<(EntityId, f64, SpeedTargetKind)>,
    },
    Distance {
        entity: EntityId,
        gap: DistanceGap,
        freespace: bool,
        limits: Option<DynamicLimits>,
    },
    LaneChange {
        interp: Interpolator,
        target_lane: i32,
        target_offset: f64,
    },
    LaneOffset {
        interp: Interpolator,
    },
    Teleport {
        spec: Box<PositionSpec>,
    },
    FollowRoute {
        route: Box<RouteSpec>,
        final_s: Option<f64>,
        assigned: bool,
    },
    MeetingAbsolute {
        target: WorldPose,
        deadline: f64,
    },
    MeetingRelative {
        own_target: WorldPose,
        other: EntityId,
        other_target: WorldPose,
        offset_time: f64,
        /// Speed computed once at start for non-continuous meetings.
        frozen_speed: Option<f64>,
    },
    Autonomous {
        activate: bool,
        domain: ControlDomain,
    },
}

/// A started action executing against one entity.
#[derive(Debug, Clone)]
pub(crate) struct ActionRuntime {
    name: String,
    entity: EntityId,
    kind: RuntimeKind,
}

impl ActionRuntime {
    /// Start an action, freezing whatever its semantics freeze.
    ///
    /// # Errors
    ///
    /// Returns [`LogicError`] when the action cannot start (undefined
    /// shape, missing entity state, unresolvable position). The engine
    /// logs the error and skips the action.
    #[allow(clippy::too_many_lines)]
    pub fn start(spec: &ActionSpec, ctx: &ActionCtx<'_>) -> Result<Self, LogicError> {
        let own = *ctx.snapshots.get(&spec.entity).ok_or_else(|| LogicError::MissingEntity {
            action: spec.name.clone(),
        })?;
        debug!(action = spec.name, entity = %spec.entity, "starting action");

        let kind = match &spec.kind {
            ActionKind::Speed { dynamics, target } => {
                let (value, reference) = match target {
                    SpeedTarget::Absolute { value } => (*value, None),
                    SpeedTarget::Relative {
                        entity,
                        value,
                        kind,
                        continuous,
                    } => {
                        let reference =
                            ctx.snapshots.get(entity).ok_or_else(|| LogicError::MissingEntity {
                                action: spec.name.clone(),
                            })?;
                        let resolved = combine_speed(reference.speed, *value, *kind);
                        // Frozen at start unless continuous.
                        let tracked = continuous.then_some((*entity, *value, *kind));
                        (resolved, tracked)
                    }
                };
                RuntimeKind::Speed {
                    interp: Interpolator::new(
                        dynamics.shape,
                        own.speed,
                        value,
                        dynamics.timing,
                        &spec.name,
                    )?,
                    reference,
                }
            }
            ActionKind::Distance {
                entity,
                gap,
                freespace,
                limits,
            } => {
                if !ctx.snapshots.contains_key(entity) {
                    return Err(LogicError::MissingEntity {
                        action: spec.name.clone(),
                    });
                }
                RuntimeKind::Distance {
                    entity: *entity,
                    gap: *gap,
                    freespace: *freespace,
                    limits: *limits,
                }
            }
            ActionKind::LaneChange {
                dynamics,
                target_lane_offset,
                target,
            } => {
                let target_lane = match target {
                    LaneChangeTarget::Absolute { lane_id } => *lane_id,
                    LaneChangeTarget::Relative { entity, delta } => {
                        let reference =
                            ctx.snapshots.get(entity).ok_or_else(|| LogicError::MissingEntity {
                                action: spec.name.clone(),
                            })?;
                        reference.road.lane_id.saturating_add(*delta)
                    }
                };
                // The transition runs as a lateral offset in the start
                // lane's frame; the lane id flips only at completion.
                let delta = ctx.network.lane_center_offset(
                    own.road.road_id,
                    own.road.lane_id,
                    target_lane,
                ) + target_lane_offset;
                RuntimeKind::LaneChange {
                    interp: Interpolator::new(
                        dynamics.shape,
                        own.road.offset,
                        delta,
                        dynamics.timing,
                        &spec.name,
                    )?,
                    target_lane,
                    target_offset: *target_lane_offset,
                }
            }
            ActionKind::LaneOffset {
                shape,
                max_lateral_acc,
                duration,
                target,
            } => {
                let value = match target {
                    LaneOffsetTarget::Absolute { offset } => *offset,
                    LaneOffsetTarget::Relative { entity, offset } => {
                        let reference =
                            ctx.snapshots.get(entity).ok_or_else(|| LogicError::MissingEntity {
                                action: spec.name.clone(),
                            })?;
                        reference.road.offset + offset
                    }
                };
                let timing = lane_offset_timing(*duration, *max_lateral_acc, own.road.offset, value);
                RuntimeKind::LaneOffset {
                    interp: Interpolator::new(*shape, own.road.offset, value, timing, &spec.name)?,
                }
            }
            ActionKind::Position(position) => RuntimeKind::Teleport {
                spec: Box::new(position.clone()),
            },
            ActionKind::FollowRoute { route } => {
                // The route ends at its last lane-flavored waypoint's arc
                // length; routes without one complete on assignment.
                let final_s = route.waypoints.iter().rev().find_map(|wp| match wp {
                    PositionSpec::Lane { s, .. } => Some(*s),
                    _ => None,
                });
                RuntimeKind::FollowRoute {
                    route: Box::new(route.clone()),
                    final_s,
                    assigned: false,
                }
            }
            ActionKind::MeetingAbsolute {
                position,
                time_to_destination,
            } => {
                let target = resolve_pose(position, ctx.network, ctx.snapshots).ok_or_else(|| {
                    LogicError::UnresolvedPosition {
                        action: spec.name.clone(),
                    }
                })?;
                RuntimeKind::MeetingAbsolute {
                    target,
                    deadline: ctx.now + time_to_destination,
                }
            }
            ActionKind::MeetingRelative {
                position,
                entity,
                entity_position,
                mode,
                offset_time,
                continuous,
            } => {
                if *mode == MeetingMode::Route {
                    warn!(
                        action = spec.name,
                        "route-mode meeting is not supported, using straight-line estimates"
                    );
                }
                let own_target =
                    resolve_pose(position, ctx.network, ctx.snapshots).ok_or_else(|| {
                        LogicError::UnresolvedPosition {
                            action: spec.name.clone(),
                        }
                    })?;
                let other_target = resolve_pose(entity_position, ctx.network, ctx.snapshots)
                    .ok_or_else(|| LogicError::UnresolvedPosition {
                        action: spec.name.clone(),
                    })?;
                let other_snapshot =
                    ctx.snapshots.get(entity).ok_or_else(|| LogicError::MissingEntity {
                        action: spec.name.clone(),
                    })?;
                let frozen_speed = (!continuous).then(|| {
                    meeting_speed(
                        planar_distance(&own.pose, &own_target),
                        planar_distance(&other_snapshot.pose, &other_target),
                        other_snapshot.speed,
                        *offset_time,
                    )
                });
                RuntimeKind::MeetingRelative {
                    own_target,
                    other: *entity,
                    other_target,
                    offset_time: *offset_time,
                    frozen_speed,
                }
            }
            ActionKind::Autonomous { activate, domain } => RuntimeKind::Autonomous {
                activate: *activate,
                domain: *domain,
            },
        };

        Ok(Self {
            name: spec.name.clone(),
            entity: spec.entity,
            kind,
        })
    }

    /// The entity this action drives.
    pub const fn entity(&self) -> EntityId {
        self.entity
    }

    /// The action's name for diagnostics and completion logging.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Control axes this action occupies, for conflict arbitration.
    pub const fn domain(&self) -> ControlDomain {
        match &self.kind {
            RuntimeKind::Speed { .. }
            | RuntimeKind::Distance { .. }
            | RuntimeKind::MeetingAbsolute { .. }
            | RuntimeKind::MeetingRelative { .. } => ControlDomain::Longitudinal,
            RuntimeKind::LaneChange { .. } | RuntimeKind::LaneOffset { .. } => {
                ControlDomain::Lateral
            }
            RuntimeKind::Teleport { .. } | RuntimeKind::FollowRoute { .. } => ControlDomain::Both,
            RuntimeKind::Autonomous { domain, .. } => *domain,
        }
    }

    /// Advance the action by one tick.
    #[allow(clippy::too_many_lines)]
    pub fn tick(&mut self, ctx: &ActionCtx<'_>) -> ActionTick {
        let Some(own) = ctx.snapshots.get(&self.entity).copied() else {
            warn!(action = self.name, entity = %self.entity, "entity state missing, holding action");
            return ActionTick::default();
        };
        let mut out = ActionTick::default();

        match &mut self.kind {
            RuntimeKind::Speed { interp, reference } => {
                if let Some((entity, value, kind)) = reference {
                    if let Some(r) = ctx.snapshots.get(entity) {
                        interp.retarget(combine_speed(r.speed, *value, *kind));
                    }
                }
                interp.advance(ctx.dt, own.speed * ctx.dt);
                out.effects.push(ActionEffect::SetSpeed(interp.value()));
                // Continuous relative targets never complete on their own.
                out.done = reference.is_none() && interp.done();
            }
            RuntimeKind::Distance {
                entity,
                gap,
                freespace,
                limits,
            } => {
                let Some(other) = ctx.snapshots.get(entity) else {
                    return out;
                };
                let mut actual = if own.road.road_id == other.road.road_id {
                    other.road.s - own.road.s
                } else {
                    planar_distance(&own.pose, &other.pose)
                };
                if *freespace {
                    actual -= (own.length + other.length) / 2.0;
                }
                let desired = match gap {
                    DistanceGap::Space { meters } => *meters,
                    DistanceGap::Time { seconds } => *seconds * own.speed,
                };
                let target = FOLLOW_GAIN.mul_add(actual - desired, other.speed).max(0.0);
                if limits.is_some() {
                    out.effects.push(ActionEffect::Drive(DriveCommand::TargetSpeed {
                        speed: target,
                        limits: *limits,
                    }));
                } else {
                    // No dynamics: the required speed applies directly.
                    out.effects.push(ActionEffect::SetSpeed(target));
                }
                // Follow actions run until something terminates them.
            }
            RuntimeKind::LaneChange {
                interp,
                target_lane,
                target_offset,
            } => {
                interp.advance(ctx.dt, own.speed * ctx.dt);
                if interp.done() {
                    out.effects.push(ActionEffect::CommitLane {
                        lane_id: *target_lane,
                        offset: *target_offset,
                    });
                    out.done = true;
                } else {
                    out.effects.push(ActionEffect::LaneOffset(interp.value()));
                }
            }
            RuntimeKind::LaneOffset { interp } => {
                interp.advance(ctx.dt, own.speed * ctx.dt);
                out.effects.push(ActionEffect::LaneOffset(interp.value()));
                out.done = interp.done();
            }
            RuntimeKind::Teleport { spec } => {
                out.effects.push(ActionEffect::Teleport(spec.clone()));
                out.done = true;
            }
            RuntimeKind::FollowRoute {
                route,
                final_s,
                assigned,
            } => {
                if !*assigned {
                    out.effects.push(ActionEffect::AssignRoute(route.clone()));
                    *assigned = true;
                }
                out.done = final_s.is_none_or(|end| own.road.s >= end - VALUE_EPSILON);
            }
            RuntimeKind::MeetingAbsolute { target, deadline } => {
                let distance = planar_distance(&own.pose, target);
                if distance <= ARRIVAL_TOLERANCE {
                    out.done = true;
                } else {
                    let remaining = (*deadline - ctx.now).max(MIN_ETA);
                    out.effects.push(ActionEffect::SetSpeed(distance / remaining));
                }
            }
            RuntimeKind::MeetingRelative {
                own_target,
                other,
                other_target,
                offset_time,
                frozen_speed,
            } => {
                let own_distance = planar_distance(&own.pose, own_target);
                if own_distance <= ARRIVAL_TOLERANCE {
                    out.done = true;
                } else {
                    let speed = frozen_speed.map_or_else(
                        || {
                            ctx.snapshots.get(other).map_or(0.0, |o| {
                                meeting_speed(
                                    own_distance,
                                    planar_distance(&o.pose, other_target),
                                    o.speed,
                                    *offset_time,
                                )
                            })
                        },
                        |s| s,
                    );
                    out.effects.push(ActionEffect::SetSpeed(speed));
                }
            }
            RuntimeKind::Autonomous { activate, domain } => {
                out.effects.push(ActionEffect::Autonomy {
                    activate: *activate,
                    domain: *domain,
                });
                out.done = true;
            }
        }
        out
    }
}

/// Combine a reference speed with a relative target value.
fn combine_speed(reference: f64, value: f64, kind: SpeedTargetKind) -> f64 {
    match kind {
        SpeedTargetKind::Delta => reference + value,
        SpeedTargetKind::Factor => reference * value,
    }
}

/// Speed that arrives at the own meeting point in sync with the other
/// entity reaching its point, plus the offset time.
fn meeting_speed(own_distance: f64, other_distance: f64, other_speed: f64, offset_time: f64) -> f64 {
    let other_eta = if other_speed > 0.0 {
        other_distance / other_speed
    } else {
        // A stopped reference never arrives; hold position.
        return 0.0;
    };
    (own_distance / (other_eta + offset_time).max(MIN_ETA)).max(0.0)
}

/// Timing for a lane-offset transition.
///
/// An explicit duration wins; otherwise one is derived from the lateral
/// acceleration bound for the raised-cosine profile. A non-positive bound
/// degenerates to an immediate transition.
fn lane_offset_timing(
    duration: Option<f64>,
    max_lateral_acc: f64,
    start: f64,
    target: f64,
) -> Option<Timing> {
    if let Some(seconds) = duration {
        return Some(Timing {
            kind: TimingKind::Time,
            value: seconds,
        });
    }
    if max_lateral_acc <= 0.0 {
        return None;
    }
    let span = (target - start).abs();
    Some(Timing {
        kind: TimingKind::Time,
        value: core::f64::consts::PI * (span / (2.0 * max_lateral_acc)).sqrt(),
    })
}

/// Control-domain overlap test for conflict arbitration.
pub(crate) const fn domains_overlap(a: ControlDomain, b: ControlDomain) -> bool {
    match (a, b) {
        (ControlDomain::Both, _) | (_, ControlDomain::Both) => true,
        (ControlDomain::Longitudinal, ControlDomain::Longitudinal)
        | (ControlDomain::Lateral, ControlDomain::Lateral) => true,
        _ => false,
    }
}

/// The control domain an action spec would occupy, available before the
/// runtime exists (used when arbitrating events that have not started).
pub(crate) const fn spec_domain(kind: &ActionKind) -> ControlDomain {
    match kind {
        ActionKind::Speed { .. }
        | ActionKind::Distance { .. }
        | ActionKind::MeetingAbsolute { .. }
        | ActionKind::MeetingRelative { .. } => ControlDomain::Longitudinal,
        ActionKind::LaneChange { .. } | ActionKind::LaneOffset { .. } => ControlDomain::Lateral,
        ActionKind::Position(_) | ActionKind::FollowRoute { .. } => ControlDomain::Both,
        ActionKind::Autonomous { domain, .. } => *domain,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use roadshow_types::{DynamicsShape, RoadCoord, TransitionDynamics};
    use roadshow_world::StraightRoad;

    const EPS: f64 = 1e-9;

    const fn immediate_dynamics() -> TransitionDynamics {
        TransitionDynamics {
            shape: DynamicsShape::Step,
            timing: None,
        }
    }

    fn make_snapshot(id: u32, s: f64, lane_id: i32, offset: f64, speed: f64) -> EntitySnapshot {
        EntitySnapshot {
            id: EntityId::new(id),
            pose: WorldPose {
                x: s,
                ..WorldPose::default()
            },
            road: RoadCoord {
                road_id: 1,
                lane_id,
                s,
                offset,
            },
            speed,
            length: 5.0,
            width: 2.0,
        }
    }

    fn make_ctx<'a>(
        now: f64,
        dt: f64,
        snapshots: &'a SnapshotMap,
        network: &'a StraightRoad,
    ) -> ActionCtx<'a> {
        ActionCtx {
            now,
            dt,
            snapshots,
            network,
        }
    }

    #[test]
    fn speed_action_without_timing_completes_in_one_tick() {
        let road = StraightRoad::new(1, 500.0, 3.5).unwrap();
        let mut snapshots = SnapshotMap::new();
        snapshots.insert(EntityId::new(0), make_snapshot(0, 0.0, -1, 0.0, 10.0));
        let ctx = make_ctx(0.0, 0.1, &snapshots, &road);

        let spec = ActionSpec {
            name: "speed".to_owned(),
            entity: EntityId::new(0),
            kind: ActionKind::Speed {
                dynamics: immediate_dynamics(),
                target: SpeedTarget::Absolute { value: 25.0 },
            },
        };
        let mut action = ActionRuntime::start(&spec, &ctx).unwrap();
        let tick = action.tick(&ctx);
        assert!(tick.done);
        assert_eq!(tick.effects, vec![ActionEffect::SetSpeed(25.0)]);
    }

    #[test]
    fn continuous_relative_speed_never_completes() {
        let road = StraightRoad::new(1, 500.0, 3.5).unwrap();
        let mut snapshots = SnapshotMap::new();
        snapshots.insert(EntityId::new(0), make_snapshot(0, 0.0, -1, 0.0, 10.0));
        snapshots.insert(EntityId::new(1), make_snapshot(1, 50.0, -1, 0.0, 20.0));
        let ctx = make_ctx(0.0, 0.1, &snapshots, &road);

        let spec = ActionSpec {
            name: "match".to_owned(),
            entity: EntityId::new(0),
            kind: ActionKind::Speed {
                dynamics: immediate_dynamics(),
                target: SpeedTarget::Relative {
                    entity: EntityId::new(1),
                    value: -2.0,
                    kind: SpeedTargetKind::Delta,
                    continuous: true,
                },
            },
        };
        let mut action = ActionRuntime::start(&spec, &ctx).unwrap();
        let tick = action.tick(&ctx);
        assert!(!tick.done);
        assert_eq!(tick.effects, vec![ActionEffect::SetSpeed(18.0)]);
    }

    #[test]
    fn lane_change_interpolates_offset_then_commits() {
        let road = StraightRoad::new(1, 500.0, 3.5).unwrap();
        let mut snapshots = SnapshotMap::new();
        snapshots.insert(EntityId::new(0), make_snapshot(0, 0.0, -1, 0.0, 10.0));
        let ctx = make_ctx(0.0, 1.0, &snapshots, &road);

        let spec = ActionSpec {
            name: "change".to_owned(),
            entity: EntityId::new(0),
            kind: ActionKind::LaneChange {
                dynamics: TransitionDynamics {
                    shape: DynamicsShape::Linear,
                    timing: Some(Timing {
                        kind: TimingKind::Time,
                        value: 2.0,
                    }),
                },
                target_lane_offset: 0.0,
                target: LaneChangeTarget::Absolute { lane_id: -2 },
            },
        };
        let mut action = ActionRuntime::start(&spec, &ctx).unwrap();

        // Halfway after one second: half the -3.5 m lane-center delta.
        let tick = action.tick(&ctx);
        assert!(!tick.done);
        match tick.effects.first().unwrap() {
            ActionEffect::LaneOffset(offset) => assert!((offset + 1.75).abs() < EPS),
            other => panic!("unexpected effect: {other:?}"),
        }

        let tick = action.tick(&ctx);
        assert!(tick.done);
        assert_eq!(
            tick.effects,
            vec![ActionEffect::CommitLane {
                lane_id: -2,
                offset: 0.0
            }]
        );
    }

    #[test]
    fn undefined_shape_fails_the_start() {
        let road = StraightRoad::new(1, 500.0, 3.5).unwrap();
        let mut snapshots = SnapshotMap::new();
        snapshots.insert(EntityId::new(0), make_snapshot(0, 0.0, -1, 0.0, 10.0));
        let ctx = make_ctx(0.0, 0.1, &snapshots, &road);

        let spec = ActionSpec {
            name: "bad".to_owned(),
            entity: EntityId::new(0),
            kind: ActionKind::Speed {
                dynamics: TransitionDynamics {
                    shape: DynamicsShape::Undefined,
                    timing: None,
                },
                target: SpeedTarget::Absolute { value: 5.0 },
            },
        };
        assert!(matches!(
            ActionRuntime::start(&spec, &ctx),
            Err(LogicError::UndefinedShape { .. })
        ));
    }

    #[test]
    fn distance_action_commands_a_follow_speed() {
        let road = StraightRoad::new(1, 500.0, 3.5).unwrap();
        let mut snapshots = SnapshotMap::new();
        snapshots.insert(EntityId::new(0), make_snapshot(0, 0.0, -1, 0.0, 10.0));
        snapshots.insert(EntityId::new(1), make_snapshot(1, 40.0, -1, 0.0, 15.0));
        let ctx = make_ctx(0.0, 0.1, &snapshots, &road);

        let spec = ActionSpec {
            name: "follow".to_owned(),
            entity: EntityId::new(0),
            kind: ActionKind::Distance {
                entity: EntityId::new(1),
                gap: DistanceGap::Space { meters: 20.0 },
                freespace: false,
                limits: None,
            },
        };
        let mut action = ActionRuntime::start(&spec, &ctx).unwrap();
        let tick = action.tick(&ctx);
        // 20 m surplus at gain 0.5 adds 10 m/s on top of the lead's 15.
        assert!(!tick.done);
        assert_eq!(tick.effects, vec![ActionEffect::SetSpeed(25.0)]);
    }

    #[test]
    fn domains_overlap_only_on_shared_axes() {
        assert!(domains_overlap(ControlDomain::Both, ControlDomain::Lateral));
        assert!(domains_overlap(
            ControlDomain::Longitudinal,
            ControlDomain::Longitudinal
        ));
        assert!(!domains_overlap(
            ControlDomain::Longitudinal,
            ControlDomain::Lateral
        ));
    }
}
