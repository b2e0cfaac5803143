//! Per-object interpolation window.
//!
//! The controller owns one window and lends it to whichever behavior state is
//! active, so switching behaviors mid-window never leaks bookkeeping from the
//! previous state.

use crate::interpolation::{
    blend_angular_velocity, hermite_position, hermite_rotation, hermite_velocity,
};
use crate::sync::Kinematics;

/// Shortest window the clock will ever run, in seconds.
pub const MIN_WINDOW_DURATION: f32 = 1.0e-3;

#[derive(Debug, Clone, PartialEq)]
pub struct InterpolationWindow {
    /// Where the blend starts (usually the live transform when the window opened).
    pub start: Kinematics,
    /// Where the blend ends; filled in by the active state.
    pub end: Kinematics,
    /// Authoritative basis the active state derives `end` from.
    pub target: Kinematics,
    /// Set once the window's terminal side effects ran.
    pub ended: bool,
    elapsed: f32,
    duration: f32,
}

impl Default for InterpolationWindow {
    fn default() -> Self {
        Self {
            start: Kinematics::REST,
            end: Kinematics::REST,
            target: Kinematics::REST,
            ended: false,
            elapsed: 0.0,
            duration: MIN_WINDOW_DURATION,
        }
    }
}

impl InterpolationWindow {
    /// Resets the clock and endpoints. `end` starts out equal to `target`.
    pub fn open(&mut self, start: Kinematics, target: Kinematics, duration: f32) {
        self.start = start;
        self.target = target;
        self.end = target;
        self.ended = false;
        self.elapsed = 0.0;
        self.duration = duration.max(MIN_WINDOW_DURATION);
    }

    /// Opens a fresh window seeded at the end of the current one.
    pub fn extend(&mut self) {
        let end = self.end;
        self.open(end, end, self.duration);
    }

    pub fn advance(&mut self, dt: f32) {
        self.elapsed = (self.elapsed + dt.max(0.0)).min(self.duration);
    }

    pub fn fraction(&self) -> f32 {
        (self.elapsed / self.duration).clamp(0.0, 1.0)
    }

    pub fn is_complete(&self) -> bool {
        self.elapsed >= self.duration
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }

    /// Evaluates the window at `fraction` (clamped to `[0, 1]`).
    pub fn sample(&self, fraction: f32) -> Kinematics {
        let t = fraction.clamp(0.0, 1.0);
        let (a, b, d) = (&self.start, &self.end, self.duration);
        Kinematics {
            position: hermite_position(
                a.position,
                a.linear_velocity,
                b.position,
                b.linear_velocity,
                d,
                t,
            ),
            rotation: hermite_rotation(
                a.rotation,
                a.angular_velocity,
                b.rotation,
                b.angular_velocity,
                d,
                t,
            ),
            linear_velocity: hermite_velocity(
                a.position,
                a.linear_velocity,
                b.position,
                b.linear_velocity,
                d,
                t,
            ),
            angular_velocity: blend_angular_velocity(a.angular_velocity, b.angular_velocity, t),
        }
    }
}
