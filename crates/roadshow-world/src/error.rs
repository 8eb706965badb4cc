//! Error types for road and vehicle capabilities.

/// Errors from constructing road-network capabilities.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// Road layout parameters are invalid (non-positive length or width).
    #[error("invalid road layout: {reason}")]
    InvalidLayout {
        /// Explanation of what is wrong with the layout.
        reason: String,
    },
}

/// A movement left the drivable road.
///
/// Reported by [`RoadPosition::move_along`] when a requested advance
/// crosses a road boundary. The position itself stays at the boundary;
/// the engine decides how to recover.
///
/// [`RoadPosition::move_along`]: crate::road::RoadPosition::move_along
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
#[error("position left the road, clamped at s = {boundary_s:.3}")]
pub struct OffRoadError {
    /// Arc length of the boundary the position was clamped to.
    pub boundary_s: f64,
}
