//! Transition dynamics: interpolation of a value toward a target.
//!
//! A speed, lane-change, or lane-offset transition is an [`Interpolator`]
//! over one scalar. Progress `p` in `[0, 1]` comes from elapsed time,
//! travelled distance, or a rate-derived duration; the shape maps `p` to
//! the blend fraction. The `Undefined` shape is rejected here so a bad
//! token never silently freezes an entity mid-transition.

use roadshow_types::{DynamicsShape, Timing, TimingKind};

use crate::error::LogicError;

/// Two values within this distance count as equal for completion checks.
pub const VALUE_EPSILON: f64 = 1e-3;

/// Map progress `p` in `[0, 1]` to the blend fraction for a shape.
///
/// Linear passes `p` through, sinusoidal is the raised-cosine
/// ease-in/ease-out, step jumps to 1 for any positive progress.
pub fn shape_fraction(shape: DynamicsShape, p: f64) -> f64 {
    let p = p.clamp(0.0, 1.0);
    match shape {
        DynamicsShape::Linear => p,
        DynamicsShape::Sinusoidal => (1.0 - (core::f64::consts::PI * p).cos()) / 2.0,
        DynamicsShape::Step | DynamicsShape::Undefined => {
            if p > 0.0 { 1.0 } else { 0.0 }
        }
    }
}

/// One scalar transition from a start value to a target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interpolator {
    shape: DynamicsShape,
    start: f64,
    target: f64,
    /// Total progress span in seconds or meters; 0 means immediate.
    total: f64,
    /// Progress counts travelled distance instead of elapsed time.
    by_distance: bool,
    progress: f64,
}

impl Interpolator {
    /// Create a transition.
    ///
    /// A missing timing applies the target immediately. A `Rate` timing
    /// derives the duration from the value gap; a non-positive rate also
    /// degenerates to immediate.
    ///
    /// # Errors
    ///
    /// Returns [`LogicError::UndefinedShape`] for the `Undefined` shape;
    /// the caller logs and skips the action.
    pub fn new(
        shape: DynamicsShape,
        start: f64,
        target: f64,
        timing: Option<Timing>,
        action: &str,
    ) -> Result<Self, LogicError> {
        if shape == DynamicsShape::Undefined {
            return Err(LogicError::UndefinedShape {
                action: action.to_owned(),
            });
        }
        let (total, by_distance) = match timing {
            None => (0.0, false),
            Some(Timing { kind, value }) => match kind {
                TimingKind::Time => (value.max(0.0), false),
                TimingKind::Distance => (value.max(0.0), true),
                TimingKind::Rate => {
                    if value > 0.0 {
                        ((target - start).abs() / value, false)
                    } else {
                        (0.0, false)
                    }
                }
            },
        };
        Ok(Self {
            shape,
            start,
            target,
            total,
            by_distance,
            progress: 0.0,
        })
    }

    /// Advance progress by one tick: `dt` seconds, `ds` meters travelled.
    pub fn advance(&mut self, dt: f64, ds: f64) {
        self.progress += if self.by_distance { ds.abs() } else { dt.max(0.0) };
    }

    /// Progress fraction in `[0, 1]`.
    pub fn fraction(&self) -> f64 {
        if self.total <= 0.0 {
            1.0
        } else {
            (self.progress / self.total).clamp(0.0, 1.0)
        }
    }

    /// Current interpolated value.
    pub fn value(&self) -> f64 {
        let f = shape_fraction(self.shape, self.fraction());
        (self.target - self.start).mul_add(f, self.start)
    }

    /// The current target.
    pub const fn target(&self) -> f64 {
        self.target
    }

    /// Replace the target mid-transition (continuous relative targets).
    pub const fn retarget(&mut self, target: f64) {
        self.target = target;
    }

    /// Whether the transition has reached its target.
    pub fn done(&self) -> bool {
        self.fraction() >= 1.0 || (self.value() - self.target).abs() < VALUE_EPSILON
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn time(seconds: f64) -> Option<Timing> {
        Some(Timing {
            kind: TimingKind::Time,
            value: seconds,
        })
    }

    #[test]
    fn linear_shape_is_identity_on_progress() {
        assert!((shape_fraction(DynamicsShape::Linear, 0.25) - 0.25).abs() < 1e-12);
        assert!((shape_fraction(DynamicsShape::Linear, 1.5) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn sinusoidal_shape_eases_in_and_out() {
        assert!(shape_fraction(DynamicsShape::Sinusoidal, 0.0).abs() < 1e-12);
        assert!((shape_fraction(DynamicsShape::Sinusoidal, 0.5) - 0.5).abs() < 1e-12);
        assert!((shape_fraction(DynamicsShape::Sinusoidal, 1.0) - 1.0).abs() < 1e-12);
        // Slower than linear near the start, faster near the end.
        assert!(shape_fraction(DynamicsShape::Sinusoidal, 0.1) < 0.1);
        assert!(shape_fraction(DynamicsShape::Sinusoidal, 0.9) > 0.9);
    }

    #[test]
    fn step_shape_jumps_on_any_progress() {
        assert!(shape_fraction(DynamicsShape::Step, 0.0).abs() < 1e-12);
        assert!((shape_fraction(DynamicsShape::Step, 0.001) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn undefined_shape_is_rejected() {
        let result = Interpolator::new(DynamicsShape::Undefined, 0.0, 1.0, time(1.0), "bad");
        assert!(matches!(result, Err(LogicError::UndefinedShape { .. })));
    }

    #[test]
    fn time_based_transition_hits_midpoint_and_end() {
        let mut interp =
            Interpolator::new(DynamicsShape::Linear, 10.0, 20.0, time(2.0), "speed").unwrap();
        interp.advance(1.0, 0.0);
        assert!((interp.value() - 15.0).abs() < 1e-9);
        assert!(!interp.done());

        interp.advance(1.0, 0.0);
        assert!((interp.value() - 20.0).abs() < 1e-9);
        assert!(interp.done());
    }

    #[test]
    fn distance_based_transition_tracks_travelled_meters() {
        let mut interp = Interpolator::new(
            DynamicsShape::Linear,
            0.0,
            4.0,
            Some(Timing {
                kind: TimingKind::Distance,
                value: 40.0,
            }),
            "lane",
        )
        .unwrap();
        interp.advance(0.1, 10.0);
        assert!((interp.value() - 1.0).abs() < 1e-9);
        interp.advance(0.1, 30.0);
        assert!(interp.done());
    }

    #[test]
    fn rate_timing_derives_the_duration() {
        // 10 m/s gap at 2.5 m/s² takes 4 seconds.
        let mut interp = Interpolator::new(
            DynamicsShape::Linear,
            10.0,
            20.0,
            Some(Timing {
                kind: TimingKind::Rate,
                value: 2.5,
            }),
            "speed",
        )
        .unwrap();
        interp.advance(2.0, 0.0);
        assert!((interp.value() - 15.0).abs() < 1e-9);
        interp.advance(2.0, 0.0);
        assert!(interp.done());
    }

    #[test]
    fn missing_timing_applies_the_target_immediately() {
        let interp = Interpolator::new(DynamicsShape::Linear, 5.0, 9.0, None, "speed").unwrap();
        assert!((interp.value() - 9.0).abs() < 1e-9);
        assert!(interp.done());
    }

    #[test]
    fn retarget_moves_the_endpoint_mid_transition() {
        let mut interp =
            Interpolator::new(DynamicsShape::Linear, 0.0, 10.0, time(2.0), "speed").unwrap();
        interp.advance(1.0, 0.0);
        interp.retarget(20.0);
        interp.advance(1.0, 0.0);
        assert!((interp.value() - 20.0).abs() < 1e-9);
        assert!(interp.done());
    }
}
