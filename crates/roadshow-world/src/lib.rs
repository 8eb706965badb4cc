//! Road-network and vehicle-model capabilities for the Roadshow engine.
//!
//! The scenario engine treats geometry and vehicle dynamics as opaque
//! capabilities behind traits. This crate defines those seams and ships
//! built-in implementations good enough for headless execution and for
//! the test suites: a configurable straight road and a point-mass
//! vehicle model. Real road networks and physics models plug in behind
//! the same traits without touching the engine.
//!
//! # Modules
//!
//! - [`error`] -- Capability error types, including off-road reporting
//! - [`road`] -- [`RoadPosition`]/[`RoadNetwork`] traits and the built-in
//!   [`StraightRoad`]
//! - [`vehicle`] -- [`VehicleModel`] trait and the built-in
//!   [`KinematicModel`]

pub mod error;
pub mod road;
pub mod vehicle;

// Re-export primary types at crate root.
pub use error::{OffRoadError, WorldError};
pub use road::{RoadNetwork, RoadPosition, StraightRoad};
pub use vehicle::{DriveCommand, KinematicModel, VehicleModel, VehicleState};
