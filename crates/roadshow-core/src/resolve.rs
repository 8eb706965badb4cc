//! Tick-start entity snapshots and position resolution.
//!
//! Triggers and actions never touch live entity state: the engine takes
//! one [`EntitySnapshot`] per entity at the start of each tick and
//! evaluates everything against that frozen view, so results cannot
//! depend on iteration order within the tick.

use std::collections::BTreeMap;

use roadshow_types::position::{Orientation, OrientationKind};
use roadshow_types::{EntityId, PositionSpec, RoadCoord, WorldPose};
use roadshow_world::RoadNetwork;
use tracing::warn;

/// Frozen per-entity state at the start of a tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntitySnapshot {
    /// The entity.
    pub id: EntityId,
    /// World pose.
    pub pose: WorldPose,
    /// Road coordinates.
    pub road: RoadCoord,
    /// Forward speed in m/s.
    pub speed: f64,
    /// Body length in meters.
    pub length: f64,
    /// Body width in meters.
    pub width: f64,
}

/// Snapshot table keyed by entity id; iteration follows declaration order.
pub type SnapshotMap = BTreeMap<EntityId, EntitySnapshot>;

/// Apply an explicit orientation override to a resolved pose.
fn apply_orientation(pose: &mut WorldPose, orientation: Option<Orientation>) {
    let Some(o) = orientation else { return };
    match o.kind {
        OrientationKind::Absolute => {
            pose.h = o.h;
            pose.p = o.p;
            pose.r = o.r;
        }
        OrientationKind::Relative => {
            pose.h += o.h;
            pose.p += o.p;
            pose.r += o.r;
        }
    }
}

/// Resolve a position description to a world pose.
///
/// Relative flavors read the reference entity from the snapshot table; a
/// missing snapshot resolves to `None` with a diagnostic and the caller
/// skips the depending element for this tick.
pub fn resolve_pose(
    spec: &PositionSpec,
    network: &dyn RoadNetwork,
    snapshots: &SnapshotMap,
) -> Option<WorldPose> {
    match spec {
        PositionSpec::World { x, y, z, h, p, r } => Some(WorldPose {
            x: *x,
            y: *y,
            z: *z,
            h: *h,
            p: *p,
            r: *r,
        }),
        PositionSpec::Lane {
            road_id,
            lane_id,
            s,
            offset,
            orientation,
        } => {
            let mut scratch = network.new_position();
            scratch.set_lane(*road_id, *lane_id, *s, *offset);
            let mut pose = scratch.world();
            apply_orientation(&mut pose, *orientation);
            Some(pose)
        }
        PositionSpec::RelativeObject {
            entity,
            dx,
            dy,
            dz,
            orientation,
        } => {
            let Some(reference) = snapshots.get(entity) else {
                warn!(entity = %entity, "relative position references an unknown entity");
                return None;
            };
            // Offsets are in the reference entity's local frame.
            let (sin_h, cos_h) = reference.pose.h.sin_cos();
            let mut pose = reference.pose;
            pose.x += dx.mul_add(cos_h, -(dy * sin_h));
            pose.y += dx.mul_add(sin_h, dy * cos_h);
            pose.z += dz;
            apply_orientation(&mut pose, *orientation);
            Some(pose)
        }
        PositionSpec::RelativeLane {
            entity,
            d_lane,
            ds,
            offset,
            orientation,
        } => {
            let Some(reference) = snapshots.get(entity) else {
                warn!(entity = %entity, "relative lane position references an unknown entity");
                return None;
            };
            let road = reference.road;
            let mut scratch = network.new_position();
            scratch.set_lane(
                road.road_id,
                road.lane_id.saturating_add(*d_lane),
                road.s + ds,
                *offset,
            );
            let mut pose = scratch.world();
            apply_orientation(&mut pose, *orientation);
            Some(pose)
        }
        PositionSpec::Route {
            route,
            lane_id,
            path_s,
            lane_offset,
        } => {
            let mut scratch = network.new_position();
            scratch.set_route(route, *lane_id, *path_s, *lane_offset);
            Some(scratch.world())
        }
    }
}

/// Euclidean distance between two world poses, ground-plane only.
pub fn planar_distance(a: &WorldPose, b: &WorldPose) -> f64 {
    let dx = a.x - b.x;
    let dy = a.y - b.y;
    dx.hypot(dy)
}

/// Project the world delta from `from` to `to` onto `from`'s heading.
///
/// Returns `(longitudinal, lateral)` components, both signed: positive
/// longitudinal means `to` lies ahead of `from`.
pub fn heading_projection(from: &WorldPose, to: &WorldPose) -> (f64, f64) {
    let dx = to.x - from.x;
    let dy = to.y - from.y;
    let (sin_h, cos_h) = from.h.sin_cos();
    (
        dx.mul_add(cos_h, dy * sin_h),
        dy.mul_add(cos_h, -(dx * sin_h)),
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use roadshow_world::StraightRoad;

    const EPS: f64 = 1e-9;

    fn make_snapshot(id: u32, x: f64, y: f64, h: f64) -> EntitySnapshot {
        EntitySnapshot {
            id: EntityId::new(id),
            pose: WorldPose {
                x,
                y,
                h,
                ..WorldPose::default()
            },
            road: RoadCoord {
                road_id: 1,
                lane_id: -1,
                s: x,
                offset: 0.0,
            },
            speed: 10.0,
            length: 5.0,
            width: 2.0,
        }
    }

    #[test]
    fn world_positions_resolve_verbatim() {
        let road = StraightRoad::new(1, 500.0, 3.5).unwrap();
        let spec = PositionSpec::World {
            x: 1.0,
            y: 2.0,
            z: 3.0,
            h: 0.5,
            p: 0.0,
            r: 0.0,
        };
        let pose = resolve_pose(&spec, &road, &SnapshotMap::new()).unwrap();
        assert!((pose.x - 1.0).abs() < EPS);
        assert!((pose.y - 2.0).abs() < EPS);
        assert!((pose.h - 0.5).abs() < EPS);
    }

    #[test]
    fn lane_positions_resolve_through_the_network() {
        let road = StraightRoad::new(1, 500.0, 3.5).unwrap();
        let spec = PositionSpec::Lane {
            road_id: 1,
            lane_id: -1,
            s: 100.0,
            offset: 0.5,
            orientation: None,
        };
        let pose = resolve_pose(&spec, &road, &SnapshotMap::new()).unwrap();
        assert!((pose.x - 100.0).abs() < EPS);
        assert!((pose.y - (-1.75 + 0.5)).abs() < EPS);
    }

    #[test]
    fn relative_object_offsets_rotate_with_the_reference_heading() {
        let road = StraightRoad::new(1, 500.0, 3.5).unwrap();
        let mut snapshots = SnapshotMap::new();
        // Reference faces +y, so "ahead" is +y and "left" is -x.
        snapshots.insert(
            EntityId::new(0),
            make_snapshot(0, 10.0, 0.0, core::f64::consts::FRAC_PI_2),
        );
        let spec = PositionSpec::RelativeObject {
            entity: EntityId::new(0),
            dx: 5.0,
            dy: 1.0,
            dz: 0.0,
            orientation: None,
        };
        let pose = resolve_pose(&spec, &road, &snapshots).unwrap();
        assert!((pose.x - 9.0).abs() < EPS);
        assert!((pose.y - 5.0).abs() < EPS);
    }

    #[test]
    fn unknown_reference_entity_resolves_to_none() {
        let road = StraightRoad::new(1, 500.0, 3.5).unwrap();
        let spec = PositionSpec::RelativeObject {
            entity: EntityId::new(9),
            dx: 0.0,
            dy: 0.0,
            dz: 0.0,
            orientation: None,
        };
        assert!(resolve_pose(&spec, &road, &SnapshotMap::new()).is_none());
    }

    #[test]
    fn heading_projection_splits_the_delta() {
        let from = WorldPose::default();
        let to = WorldPose {
            x: 3.0,
            y: 4.0,
            ..WorldPose::default()
        };
        let (longitudinal, lateral) = heading_projection(&from, &to);
        assert!((longitudinal - 3.0).abs() < EPS);
        assert!((lateral - 4.0).abs() < EPS);
        assert!((planar_distance(&from, &to) - 5.0).abs() < EPS);
    }
}
