//! Plain geometric state shared across the workspace.
//!
//! [`WorldPose`] is an inertial-frame pose (position plus heading, pitch,
//! roll, all angles in radians). [`RoadCoord`] locates an entity in road
//! coordinates: which road, which lane, arc length `s` along the reference
//! line, and lateral offset from the lane center. Both are dumb data;
//! translation between the two frames happens behind the road-network
//! capability.

use serde::{Deserialize, Serialize};

/// Pose in the inertial world frame.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WorldPose {
    /// X coordinate in meters.
    pub x: f64,
    /// Y coordinate in meters.
    pub y: f64,
    /// Z coordinate in meters.
    pub z: f64,
    /// Heading (yaw) in radians.
    pub h: f64,
    /// Pitch in radians.
    pub p: f64,
    /// Roll in radians.
    pub r: f64,
}

/// Location in road coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RoadCoord {
    /// Road identifier from the road-network file.
    pub road_id: i32,
    /// Signed lane id; negative lanes lie right of the reference line.
    pub lane_id: i32,
    /// Arc length along the road reference line in meters.
    pub s: f64,
    /// Lateral offset from the lane center in meters, positive left.
    pub offset: f64,
}
