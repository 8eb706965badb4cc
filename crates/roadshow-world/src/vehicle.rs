//! Vehicle-model capability: commands in, updated kinematics out.
//!
//! The engine computes *what* an entity should do (a target speed, a
//! pedal command); a vehicle model decides *how fast* the entity can
//! comply. [`KinematicModel`] is the built-in implementation: a
//! point-mass model with symmetric acceleration limits and a simple
//! steering-rate turn model, enough for headless scenario execution and
//! for driving an externally-controlled ego from the player.

use roadshow_types::{DynamicLimits, WorldPose};

/// A driving command for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DriveCommand {
    /// Converge on a target speed, optionally under an envelope tighter
    /// than the model's own limits.
    TargetSpeed {
        /// Desired speed in m/s.
        speed: f64,
        /// Optional acceleration/speed envelope.
        limits: Option<DynamicLimits>,
    },
    /// Raw pedal and steering input.
    Pedals {
        /// Throttle in [-1, 1]; negative values brake.
        throttle: f64,
        /// Steering in [-1, 1]; positive steers left.
        steering: f64,
    },
}

/// Kinematic state handed to and returned by a vehicle model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleState {
    /// World pose.
    pub pose: WorldPose,
    /// Forward speed in m/s.
    pub speed: f64,
}

/// Converts a command plus current state into the next state.
pub trait VehicleModel {
    /// Advance the state by `dt` seconds under `command`.
    fn step(&self, dt: f64, state: &VehicleState, command: &DriveCommand) -> VehicleState;
}

/// Built-in point-mass model with acceleration and steering-rate limits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KinematicModel {
    /// Maximum acceleration in m/s².
    pub max_acceleration: f64,
    /// Maximum deceleration in m/s² (positive).
    pub max_deceleration: f64,
    /// Maximum heading change in rad/s at full steering input.
    pub max_steering_rate: f64,
}

impl Default for KinematicModel {
    fn default() -> Self {
        Self {
            max_acceleration: 5.0,
            max_deceleration: 10.0,
            max_steering_rate: 0.8,
        }
    }
}

impl KinematicModel {
    /// Effective acceleration bound, the tighter of model and command.
    fn accel_bound(&self, limits: Option<&DynamicLimits>) -> f64 {
        limits
            .and_then(|l| l.max_acceleration)
            .map_or(self.max_acceleration, |a| a.min(self.max_acceleration))
    }

    /// Effective deceleration bound, the tighter of model and command.
    fn decel_bound(&self, limits: Option<&DynamicLimits>) -> f64 {
        limits
            .and_then(|l| l.max_deceleration)
            .map_or(self.max_deceleration, |d| d.min(self.max_deceleration))
    }
}

impl VehicleModel for KinematicModel {
    fn step(&self, dt: f64, state: &VehicleState, command: &DriveCommand) -> VehicleState {
        let mut next = *state;
        match command {
            DriveCommand::TargetSpeed { speed, limits } => {
                let mut target = *speed;
                if let Some(cap) = limits.and_then(|l| l.max_speed) {
                    target = target.min(cap);
                }
                let delta = target - state.speed;
                let step_up = self.accel_bound(limits.as_ref()) * dt;
                let step_down = self.decel_bound(limits.as_ref()) * dt;
                next.speed = state.speed + delta.clamp(-step_down, step_up);
            }
            DriveCommand::Pedals { throttle, steering } => {
                let throttle = throttle.clamp(-1.0, 1.0);
                let accel = if throttle >= 0.0 {
                    throttle * self.max_acceleration
                } else {
                    throttle * self.max_deceleration
                };
                next.speed = accel.mul_add(dt, state.speed).max(0.0);
                let turn = steering.clamp(-1.0, 1.0) * self.max_steering_rate;
                next.pose.h = turn.mul_add(dt, next.pose.h);
            }
        }

        // Advance the pose along the (possibly updated) heading using the
        // average speed over the tick.
        let ds = f64::midpoint(state.speed, next.speed) * dt;
        next.pose.x = ds.mul_add(next.pose.h.cos(), next.pose.x);
        next.pose.y = ds.mul_add(next.pose.h.sin(), next.pose.y);
        next
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn at_rest() -> VehicleState {
        VehicleState {
            pose: WorldPose::default(),
            speed: 0.0,
        }
    }

    #[test]
    fn target_speed_respects_acceleration_limit() {
        let model = KinematicModel::default();
        let state = at_rest();
        let cmd = DriveCommand::TargetSpeed {
            speed: 30.0,
            limits: None,
        };

        let next = model.step(1.0, &state, &cmd);
        assert!((next.speed - 5.0).abs() < EPS);
    }

    #[test]
    fn target_speed_converges_without_overshoot() {
        let model = KinematicModel::default();
        let mut state = at_rest();
        let cmd = DriveCommand::TargetSpeed {
            speed: 8.0,
            limits: None,
        };

        for _ in 0..40 {
            state = model.step(0.1, &state, &cmd);
        }
        assert!((state.speed - 8.0).abs() < EPS);
    }

    #[test]
    fn command_limits_tighten_the_envelope() {
        let model = KinematicModel::default();
        let state = at_rest();
        let cmd = DriveCommand::TargetSpeed {
            speed: 30.0,
            limits: Some(DynamicLimits {
                max_acceleration: Some(2.0),
                max_deceleration: None,
                max_speed: Some(10.0),
            }),
        };

        let next = model.step(1.0, &state, &cmd);
        assert!((next.speed - 2.0).abs() < EPS);

        let mut state = VehicleState {
            pose: WorldPose::default(),
            speed: 9.9,
        };
        for _ in 0..20 {
            state = model.step(0.1, &state, &cmd);
        }
        assert!((state.speed - 10.0).abs() < EPS);
    }

    #[test]
    fn braking_uses_deceleration_limit() {
        let model = KinematicModel::default();
        let state = VehicleState {
            pose: WorldPose::default(),
            speed: 20.0,
        };
        let cmd = DriveCommand::TargetSpeed {
            speed: 0.0,
            limits: None,
        };

        let next = model.step(1.0, &state, &cmd);
        assert!((next.speed - 10.0).abs() < EPS);
    }

    #[test]
    fn pedals_integrate_speed_and_heading() {
        let model = KinematicModel::default();
        let state = at_rest();
        let cmd = DriveCommand::Pedals {
            throttle: 1.0,
            steering: 0.5,
        };

        let next = model.step(1.0, &state, &cmd);
        assert!((next.speed - 5.0).abs() < EPS);
        assert!((next.pose.h - 0.4).abs() < EPS);
    }

    #[test]
    fn pedal_braking_never_reverses() {
        let model = KinematicModel::default();
        let state = VehicleState {
            pose: WorldPose::default(),
            speed: 1.0,
        };
        let cmd = DriveCommand::Pedals {
            throttle: -1.0,
            steering: 0.0,
        };

        let next = model.step(1.0, &state, &cmd);
        assert!(next.speed.abs() < EPS);
    }
}
