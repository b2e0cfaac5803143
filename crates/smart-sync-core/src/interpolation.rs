//! Cubic Hermite curves for position and rotation.
//!
//! All curves are parameterized by a normalized fraction `t` in `[0, 1]` over
//! a window of `duration` seconds. Velocities are in units per second, so the
//! tangent at each endpoint is `velocity * duration`. Callers clamp `t` and
//! never pass a zero duration.

use bevy::math::{Quat, Vec3};

/// Below this rotation-vector length a quaternion segment is treated as identity.
const SMALL_ANGLE: f32 = 1.0e-7;

/// Hermite basis weights `(h00, h10, h01, h11)` at `t`.
#[inline]
fn basis(t: f32) -> (f32, f32, f32, f32) {
    let t2 = t * t;
    let t3 = t2 * t;
    (
        2.0 * t3 - 3.0 * t2 + 1.0,
        t3 - 2.0 * t2 + t,
        -2.0 * t3 + 3.0 * t2,
        t3 - t2,
    )
}

/// Derivatives of the basis weights with respect to `t`.
#[inline]
fn basis_derivative(t: f32) -> (f32, f32, f32, f32) {
    let t2 = t * t;
    (
        6.0 * t2 - 6.0 * t,
        3.0 * t2 - 4.0 * t + 1.0,
        -6.0 * t2 + 6.0 * t,
        3.0 * t2 - 2.0 * t,
    )
}

/// Position on the Hermite curve at `t`.
///
/// Passes through `start` at `t = 0` and `end` at `t = 1` with derivatives
/// `start_velocity` and `end_velocity` (per second) at those points.
pub fn hermite_position(
    start: Vec3,
    start_velocity: Vec3,
    end: Vec3,
    end_velocity: Vec3,
    duration: f32,
    t: f32,
) -> Vec3 {
    let (_, h10, h01, h11) = basis(t);
    // Written relative to `start` so that a window with start == end and no
    // velocity reproduces `start` bit for bit.
    start + (end - start) * h01 + start_velocity * (h10 * duration) + end_velocity * (h11 * duration)
}

/// Velocity (per second) along the Hermite curve at `t`.
pub fn hermite_velocity(
    start: Vec3,
    start_velocity: Vec3,
    end: Vec3,
    end_velocity: Vec3,
    duration: f32,
    t: f32,
) -> Vec3 {
    // d00 == -d01, so the position terms reduce to the chord.
    let (_, d10, d01, d11) = basis_derivative(t);
    (end - start) * (d01 / duration) + start_velocity * d10 + end_velocity * d11
}

/// Rotation on the spherical Hermite curve at `t`, always unit length.
///
/// The angular velocities are turned into incremental rotations over a third
/// of the window, which yields the two inner control rotations. The cumulative
/// cubic basis is then applied segment by segment on the quaternion manifold.
pub fn hermite_rotation(
    start: Quat,
    start_angular_velocity: Vec3,
    end: Quat,
    end_angular_velocity: Vec3,
    duration: f32,
    t: f32,
) -> Quat {
    let third = duration / 3.0;
    let q0 = start.normalize();
    let q3 = align(q0, end.normalize());
    let q1 = (Quat::from_scaled_axis(start_angular_velocity * third) * q0).normalize();
    let q2 = (Quat::from_scaled_axis(-end_angular_velocity * third) * q3).normalize();

    let w1 = log(q0.conjugate() * q1);
    let w2 = log(q1.conjugate() * q2);
    let w3 = log(q2.conjugate() * q3);

    let s = 1.0 - t;
    let b1 = 1.0 - s * s * s;
    let b2 = 3.0 * t * t - 2.0 * t * t * t;
    let b3 = t * t * t;

    // Renormalized on every evaluation; repeated products drift off unit length.
    (q0 * exp(w1 * b1) * exp(w2 * b2) * exp(w3 * b3)).normalize()
}

/// Angular velocity at `t`, blended with the same weights as the position curve.
pub fn blend_angular_velocity(start: Vec3, end: Vec3, t: f32) -> Vec3 {
    let (_, _, h01, _) = basis(t);
    start + (end - start) * h01
}

/// Picks the sign of `q` closest to `reference` so blends take the short arc.
fn align(reference: Quat, q: Quat) -> Quat {
    if reference.dot(q) < 0.0 { -q } else { q }
}

/// Rotation vector (axis * angle) of a unit quaternion, shortest arc.
fn log(q: Quat) -> Vec3 {
    let q = if q.w < 0.0 { -q } else { q };
    let v = q.xyz();
    let sin_half = v.length();
    if sin_half < SMALL_ANGLE {
        return v * 2.0;
    }
    let angle = 2.0 * sin_half.atan2(q.w);
    v * (angle / sin_half)
}

fn exp(rotation_vector: Vec3) -> Quat {
    if rotation_vector.length_squared() < SMALL_ANGLE * SMALL_ANGLE {
        return Quat::IDENTITY;
    }
    Quat::from_scaled_axis(rotation_vector)
}
