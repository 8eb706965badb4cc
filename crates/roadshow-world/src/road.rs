//! Road-network capability: positions that know road geometry.
//!
//! The engine never does geometry itself. It owns one [`RoadPosition`]
//! per entity and manipulates it through this trait; a road-network
//! implementation resolves lane coordinates to world poses, moves
//! positions along the reference line, and reports curvature.
//!
//! [`StraightRoad`] is the built-in implementation: a single straight
//! road with configurable length, lane count, and lane width. It is what
//! the player wires up by default and what the test suites run on; real
//! road networks plug in behind the same trait.

use roadshow_types::position::{PositionSpec, RouteSpec};
use roadshow_types::{RoadCoord, WorldPose};
use tracing::debug;

use crate::error::{OffRoadError, WorldError};

/// One entity's location on the road network.
///
/// Implementations keep road coordinates and the world pose in sync:
/// after any setter, `world()` and `road()` describe the same point.
/// Each entity owns its position exclusively; positions are never shared.
pub trait RoadPosition {
    /// Move forward along the road reference line by `ds` meters
    /// (negative moves backward).
    ///
    /// # Errors
    ///
    /// Returns [`OffRoadError`] when the move crosses a road boundary.
    /// The position is left clamped at the boundary.
    fn move_along(&mut self, ds: f64) -> Result<(), OffRoadError>;

    /// Place the position at lane coordinates.
    fn set_lane(&mut self, road_id: i32, lane_id: i32, s: f64, offset: f64);

    /// Place the position at a world pose, deriving road coordinates.
    fn set_world(&mut self, pose: WorldPose);

    /// Change only the lateral offset from the current lane center.
    fn set_lane_offset(&mut self, offset: f64);

    /// Place the position at a route coordinate.
    ///
    /// The built-in straight road interprets `path_s` as arc length on
    /// the road of the route's first lane-flavored waypoint.
    fn set_route(&mut self, route: &RouteSpec, lane_id: i32, path_s: f64, lane_offset: f64);

    /// Current world pose.
    fn world(&self) -> WorldPose;

    /// Current road coordinates.
    fn road(&self) -> RoadCoord;

    /// Road curvature at the current arc length, in 1/m.
    fn curvature(&self) -> f64;

    /// Clone into a new boxed position.
    fn clone_box(&self) -> Box<dyn RoadPosition>;
}

impl Clone for Box<dyn RoadPosition> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Factory and lane-geometry queries for a road network.
pub trait RoadNetwork {
    /// Create a fresh position at the network's origin.
    fn new_position(&self) -> Box<dyn RoadPosition>;

    /// Signed lateral distance in meters from the center of `from_lane`
    /// to the center of `to_lane` on the given road, positive left.
    fn lane_center_offset(&self, road_id: i32, from_lane: i32, to_lane: i32) -> f64;
}

/// Geometry of the built-in straight road, shared by its positions.
#[derive(Debug, Clone, Copy, PartialEq)]
struct StraightLayout {
    road_id: i32,
    length: f64,
    lane_width: f64,
}

impl StraightLayout {
    /// Lateral offset of a lane center from the reference line.
    ///
    /// Lane 0 is the reference line itself. Negative lanes stack to the
    /// right, positive to the left, each `lane_width` wide with the lane
    /// center half a width from the lane edge.
    fn lane_center(&self, lane_id: i32) -> f64 {
        if lane_id == 0 {
            return 0.0;
        }
        let magnitude = (f64::from(lane_id.unsigned_abs()) - 0.5) * self.lane_width;
        if lane_id < 0 { -magnitude } else { magnitude }
    }
}

/// A single straight road running along the world x axis.
///
/// The reference line starts at the origin and extends `length` meters
/// in +x. Lane ids follow the signed convention of [`RoadCoord`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StraightRoad {
    layout: StraightLayout,
}

impl StraightRoad {
    /// Create a straight road.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidLayout`] if `length` or `lane_width`
    /// is not strictly positive.
    pub fn new(road_id: i32, length: f64, lane_width: f64) -> Result<Self, WorldError> {
        if !length.is_finite() || length <= 0.0 {
            return Err(WorldError::InvalidLayout {
                reason: format!("road length must be positive, got {length}"),
            });
        }
        if !lane_width.is_finite() || lane_width <= 0.0 {
            return Err(WorldError::InvalidLayout {
                reason: format!("lane width must be positive, got {lane_width}"),
            });
        }
        Ok(Self {
            layout: StraightLayout {
                road_id,
                length,
                lane_width,
            },
        })
    }

    /// The road's length in meters.
    pub const fn length(&self) -> f64 {
        self.layout.length
    }
}

impl RoadNetwork for StraightRoad {
    fn new_position(&self) -> Box<dyn RoadPosition> {
        Box::new(StraightPosition {
            layout: self.layout,
            coord: RoadCoord {
                road_id: self.layout.road_id,
                lane_id: -1,
                s: 0.0,
                offset: 0.0,
            },
            pose: WorldPose::default(),
        })
    }

    fn lane_center_offset(&self, _road_id: i32, from_lane: i32, to_lane: i32) -> f64 {
        self.layout.lane_center(to_lane) - self.layout.lane_center(from_lane)
    }
}

/// A position on the built-in straight road.
#[derive(Debug, Clone)]
struct StraightPosition {
    layout: StraightLayout,
    coord: RoadCoord,
    pose: WorldPose,
}

impl StraightPosition {
    /// Recompute the world pose from the road coordinates.
    fn sync_pose(&mut self) {
        self.pose.x = self.coord.s;
        self.pose.y = self.layout.lane_center(self.coord.lane_id) + self.coord.offset;
        self.pose.z = 0.0;
        self.pose.h = 0.0;
        self.pose.p = 0.0;
        self.pose.r = 0.0;
    }
}

impl RoadPosition for StraightPosition {
    fn move_along(&mut self, ds: f64) -> Result<(), OffRoadError> {
        let target = self.coord.s + ds;
        if target < 0.0 {
            debug!(s = target, "position moved before road start, clamping");
            self.coord.s = 0.0;
            self.sync_pose();
            return Err(OffRoadError { boundary_s: 0.0 });
        }
        if target > self.layout.length {
            debug!(s = target, length = self.layout.length, "position moved past road end, clamping");
            self.coord.s = self.layout.length;
            self.sync_pose();
            return Err(OffRoadError {
                boundary_s: self.layout.length,
            });
        }
        self.coord.s = target;
        self.sync_pose();
        Ok(())
    }

    fn set_lane(&mut self, road_id: i32, lane_id: i32, s: f64, offset: f64) {
        self.coord.road_id = road_id;
        self.coord.lane_id = lane_id;
        self.coord.s = s.clamp(0.0, self.layout.length);
        self.coord.offset = offset;
        self.sync_pose();
    }

    fn set_world(&mut self, pose: WorldPose) {
        // Keep the current lane and express the pose in its frame; the
        // straight road cannot infer a lane from an arbitrary pose.
        self.pose = pose;
        self.coord.s = pose.x.clamp(0.0, self.layout.length);
        self.coord.offset = pose.y - self.layout.lane_center(self.coord.lane_id);
    }

    fn set_lane_offset(&mut self, offset: f64) {
        self.coord.offset = offset;
        self.sync_pose();
    }

    fn set_route(&mut self, route: &RouteSpec, lane_id: i32, path_s: f64, lane_offset: f64) {
        // On a single straight road, route arc length coincides with
        // road arc length. Take the road id from the first lane-flavored
        // waypoint if there is one.
        let road_id = route
            .waypoints
            .iter()
            .find_map(|wp| match wp {
                PositionSpec::Lane { road_id, .. } => Some(*road_id),
                _ => None,
            })
            .unwrap_or(self.coord.road_id);
        self.set_lane(road_id, lane_id, path_s, lane_offset);
    }

    fn world(&self) -> WorldPose {
        self.pose
    }

    fn road(&self) -> RoadCoord {
        self.coord
    }

    fn curvature(&self) -> f64 {
        0.0
    }

    fn clone_box(&self) -> Box<dyn RoadPosition> {
        Box::new(self.clone())
    }
}
