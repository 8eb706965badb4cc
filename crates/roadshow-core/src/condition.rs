//! Trigger evaluation with edge and delay semantics.
//!
//! Each parsed [`Condition`] gets one stateful [`ConditionInstance`] per
//! trigger point. Evaluation runs in three stages every tick: the raw
//! boolean test, the edge filter against the previous tick's raw value,
//! and the delay timer. Edge-filtered (rising/falling) conditions report
//! true for exactly one tick per firing; level conditions report true for
//! as long as the delayed level holds.

use roadshow_types::{
    Condition, ConditionEdge, ConditionKind, RelativeDistanceKind, Rule, TriggerRule,
    TriggeringEntities,
};
use roadshow_world::RoadNetwork;
use tracing::warn;

use crate::resolve::{EntitySnapshot, SnapshotMap, heading_projection, planar_distance, resolve_pose};
use crate::state::ElementRegistry;

/// Tolerance for `EqualTo` comparisons.
pub const RULE_EPSILON: f64 = 1e-3;

/// Everything a condition may observe during one tick.
///
/// All fields are tick-start views; evaluation never sees state written
/// earlier in the same tick.
pub struct TriggerContext<'a> {
    /// Simulation time in seconds.
    pub now: f64,
    /// Frozen entity states.
    pub snapshots: &'a SnapshotMap,
    /// Frozen story-element states.
    pub registry: &'a ElementRegistry,
    /// Road network for resolving position specs.
    pub network: &'a dyn RoadNetwork,
}

/// Compare a measured value against a threshold.
fn compare(rule: Rule, measured: f64, threshold: f64, warned: &mut bool, condition: &str) -> bool {
    match rule {
        Rule::GreaterThan => measured > threshold,
        Rule::LessThan => measured < threshold,
        Rule::EqualTo => (measured - threshold).abs() <= RULE_EPSILON,
        Rule::Undefined => {
            if !*warned {
                warn!(condition, "condition carries an undefined comparison rule, never satisfied");
                *warned = true;
            }
            false
        }
    }
}

/// Combine the per-entity raw results with the triggering-entity rule.
fn combine_members(
    triggering: &TriggeringEntities,
    snapshots: &SnapshotMap,
    mut test: impl FnMut(&EntitySnapshot) -> bool,
) -> bool {
    match triggering.rule {
        TriggerRule::All => triggering
            .members
            .iter()
            .all(|id| snapshots.get(id).is_some_and(|s| test(s))),
        TriggerRule::Any => triggering
            .members
            .iter()
            .any(|id| snapshots.get(id).is_some_and(|s| test(s))),
    }
}

/// Signed longitudinal gap from `trigger` to `other`, positive when
/// `other` lies ahead. Shared-road pairs use arc length; otherwise the
/// world delta is projected onto the trigger's heading.
fn longitudinal_gap(trigger: &EntitySnapshot, other: &EntitySnapshot) -> f64 {
    if trigger.road.road_id == other.road.road_id {
        other.road.s - trigger.road.s
    } else {
        heading_projection(&trigger.pose, &other.pose).0
    }
}

/// One condition's evaluation state across ticks.
#[derive(Debug, Clone)]
pub struct ConditionInstance {
    spec: Condition,
    /// Raw value from the previous tick; starts false.
    last_raw: bool,
    /// Time the delay timer was armed, if pending or held.
    armed_since: Option<f64>,
    warned_undefined: bool,
}

impl ConditionInstance {
    /// Wrap a parsed condition for evaluation.
    pub const fn new(spec: Condition) -> Self {
        Self {
            spec,
            last_raw: false,
            armed_since: None,
            warned_undefined: false,
        }
    }

    /// The wrapped condition.
    pub const fn spec(&self) -> &Condition {
        &self.spec
    }

    /// Forget all evaluation state (sequence repetition re-arm).
    pub const fn reset(&mut self) {
        self.last_raw = false;
        self.armed_since = None;
    }

    /// Evaluate for this tick.
    pub fn evaluate(&mut self, ctx: &TriggerContext<'_>) -> bool {
        let raw = self.raw_value(ctx);
        let result = match self.spec.edge {
            ConditionEdge::Rising => self.edge_result(raw, true, ctx.now),
            ConditionEdge::Falling => self.edge_result(raw, false, ctx.now),
            ConditionEdge::Any | ConditionEdge::None => self.level_result(raw, ctx.now),
        };
        self.last_raw = raw;
        result
    }

    /// Edge-filtered evaluation: fire on the transition to `level`, hold
    /// through the delay only while the post-transition level persists,
    /// then report true for a single tick.
    fn edge_result(&mut self, raw: bool, level: bool, now: f64) -> bool {
        let fired = if level {
            raw && !self.last_raw
        } else {
            !raw && self.last_raw
        };
        if fired {
            if self.armed_since.is_none() {
                self.armed_since = Some(now);
            }
        } else if raw != level {
            // The level reverted before the delay elapsed.
            self.armed_since = None;
        }
        if let Some(armed) = self.armed_since {
            if now - armed >= self.spec.delay {
                self.armed_since = None;
                return true;
            }
        }
        false
    }

    /// Level evaluation: true once the raw level has held for the delay,
    /// and for as long as it keeps holding.
    fn level_result(&mut self, raw: bool, now: f64) -> bool {
        if raw {
            if self.armed_since.is_none() {
                self.armed_since = Some(now);
            }
        } else {
            self.armed_since = None;
        }
        self.armed_since
            .is_some_and(|armed| now - armed >= self.spec.delay)
    }

    /// The raw boolean test, before edge and delay filtering.
    fn raw_value(&mut self, ctx: &TriggerContext<'_>) -> bool {
        let warned = &mut self.warned_undefined;
        let name = self.spec.name.as_str();
        match &self.spec.kind {
            ConditionKind::SimulationTime { value, rule } => {
                compare(*rule, ctx.now, *value, warned, name)
            }
            ConditionKind::AtStart { element, name } => ctx.registry.has_started(*element, name),
            ConditionKind::AfterTermination {
                element,
                name,
                rule,
            } => ctx.registry.has_terminated(*element, name, *rule),
            ConditionKind::TimeHeadway {
                triggering,
                entity,
                value,
                rule,
                freespace,
                along_route: _,
            } => {
                let Some(other) = ctx.snapshots.get(entity).copied() else {
                    return false;
                };
                combine_members(triggering, ctx.snapshots, |trigger| {
                    let mut gap = longitudinal_gap(trigger, &other);
                    if *freespace {
                        gap -= (trigger.length + other.length) / 2.0;
                    }
                    // Headway is only defined toward a vehicle ahead of a
                    // moving trigger.
                    let headway = if gap <= 0.0 || trigger.speed <= 0.0 {
                        f64::INFINITY
                    } else {
                        gap / trigger.speed
                    };
                    compare(*rule, headway, *value, warned, name)
                })
            }
            ConditionKind::ReachPosition {
                triggering,
                position,
                tolerance,
            } => {
                let Some(target) = resolve_pose(position, ctx.network, ctx.snapshots) else {
                    return false;
                };
                combine_members(triggering, ctx.snapshots, |trigger| {
                    planar_distance(&trigger.pose, &target) <= *tolerance
                })
            }
            ConditionKind::RelativeDistance {
                triggering,
                entity,
                kind,
                value,
                rule,
                freespace,
            } => {
                let Some(other) = ctx.snapshots.get(entity).copied() else {
                    return false;
                };
                combine_members(triggering, ctx.snapshots, |trigger| {
                    let mut distance = match kind {
                        RelativeDistanceKind::Inertial => {
                            planar_distance(&trigger.pose, &other.pose)
                        }
                        RelativeDistanceKind::Longitudinal => {
                            longitudinal_gap(trigger, &other).abs()
                        }
                        RelativeDistanceKind::Lateral => {
                            heading_projection(&trigger.pose, &other.pose).1.abs()
                        }
                    };
                    if *freespace {
                        let body = match kind {
                            RelativeDistanceKind::Lateral => {
                                (trigger.width + other.width) / 2.0
                            }
                            RelativeDistanceKind::Inertial
                            | RelativeDistanceKind::Longitudinal => {
                                (trigger.length + other.length) / 2.0
                            }
                        };
                        distance = (distance - body).max(0.0);
                    }
                    compare(*rule, distance, *value, warned, name)
                })
            }
            ConditionKind::Distance {
                triggering,
                position,
                value,
                rule,
                freespace,
                along_route: _,
            } => {
                let Some(target) = resolve_pose(position, ctx.network, ctx.snapshots) else {
                    return false;
                };
                combine_members(triggering, ctx.snapshots, |trigger| {
                    let mut distance = planar_distance(&trigger.pose, &target);
                    if *freespace {
                        distance = (distance - trigger.length / 2.0).max(0.0);
                    }
                    compare(*rule, distance, *value, warned, name)
                })
            }
        }
    }
}

/// Evaluate a trigger point: OR across groups, AND within each group.
///
/// Every condition is evaluated every tick regardless of short-circuit
/// opportunities, because edge and delay state must advance uniformly.
/// An empty group list reports false; the caller decides whether an
/// absent trigger means "immediately" (event start) or "never" (act end).
pub fn evaluate_groups(groups: &mut [Vec<ConditionInstance>], ctx: &TriggerContext<'_>) -> bool {
    let mut any = false;
    for group in &mut *groups {
        let mut all = true;
        for condition in &mut *group {
            if !condition.evaluate(ctx) {
                all = false;
            }
        }
        if all && !group.is_empty() {
            any = true;
        }
    }
    any
}

/// Reset every condition at a trigger point (repetition re-arm).
pub fn reset_groups(groups: &mut [Vec<ConditionInstance>]) {
    for group in &mut *groups {
        for condition in &mut *group {
            condition.reset();
        }
    }
}
