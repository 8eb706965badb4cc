//! Position descriptions and routes.
//!
//! A [`PositionSpec`] is the document's answer to "where" -- it stays in
//! whichever coordinate flavor the author wrote and is only resolved to a
//! concrete pose by the road-network capability at execution time.
//! Relative flavors reference other entities by id; the reader guarantees
//! those ids resolve, dropping the surrounding element otherwise.

use serde::{Deserialize, Serialize};

use crate::ids::EntityId;

/// Reference frame of an explicit orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrientationKind {
    /// Angles are absolute world-frame values.
    Absolute,
    /// Angles are added to the reference pose's angles.
    Relative,
}

/// Heading/pitch/roll override attached to a position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Orientation {
    /// How the angles combine with the reference pose.
    pub kind: OrientationKind,
    /// Heading in radians.
    pub h: f64,
    /// Pitch in radians.
    pub p: f64,
    /// Roll in radians.
    pub r: f64,
}

/// A position in one of the document's coordinate flavors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PositionSpec {
    /// Absolute world-frame pose.
    World {
        /// X coordinate in meters.
        x: f64,
        /// Y coordinate in meters.
        y: f64,
        /// Z coordinate in meters.
        z: f64,
        /// Heading in radians.
        h: f64,
        /// Pitch in radians.
        p: f64,
        /// Roll in radians.
        r: f64,
    },
    /// Lane coordinates on a specific road.
    Lane {
        /// Road id from the road-network file.
        road_id: i32,
        /// Signed lane id.
        lane_id: i32,
        /// Arc length along the road in meters.
        s: f64,
        /// Lateral offset from the lane center in meters.
        offset: f64,
        /// Optional orientation override.
        orientation: Option<Orientation>,
    },
    /// Offset from another entity in that entity's local frame.
    RelativeObject {
        /// The reference entity.
        entity: EntityId,
        /// Longitudinal offset in meters (positive ahead).
        dx: f64,
        /// Lateral offset in meters (positive left).
        dy: f64,
        /// Vertical offset in meters.
        dz: f64,
        /// Optional orientation override.
        orientation: Option<Orientation>,
    },
    /// Lane-relative offset from another entity.
    RelativeLane {
        /// The reference entity.
        entity: EntityId,
        /// Lane delta added to the reference entity's lane id.
        d_lane: i32,
        /// Arc-length delta in meters.
        ds: f64,
        /// Lateral offset from the target lane center in meters.
        offset: f64,
        /// Optional orientation override.
        orientation: Option<Orientation>,
    },
    /// A point along a route, in route coordinates.
    Route {
        /// The resolved route (cloned from its catalog or inline source).
        route: RouteSpec,
        /// Lane id at the route coordinate.
        lane_id: i32,
        /// Distance along the route in meters.
        path_s: f64,
        /// Lateral offset from the lane center in meters.
        lane_offset: f64,
    },
}

/// Named ordered waypoint list.
///
/// Routes are cloned per referencing site (follow-route actions, route
/// positions), never shared, so route-local bookkeeping in the engine
/// cannot alias across entities. The reader guarantees at least one
/// waypoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSpec {
    /// Route name (the catalog entry name for cloned routes).
    pub name: String,
    /// Closed-loop flag from the document; recognized but not used by
    /// route following.
    pub closed: bool,
    /// Waypoints in travel order.
    pub waypoints: Vec<PositionSpec>,
}
