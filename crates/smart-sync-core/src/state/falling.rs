//! Free flight under gravity.
//!
//! Both sides extrapolate ballistically, so a falling object needs no updates
//! until something other than gravity changes its velocity.

use bevy::math::{Quat, Vec3};

use crate::sync::Kinematics;

use super::{BehaviorKind, BehaviorState, StateContext, WindowOutcome};

#[derive(Debug, Default, Clone, Copy)]
pub struct Falling;

/// Where a body in free flight will be after `duration` seconds.
pub fn ballistic_end(target: Kinematics, gravity: Vec3, duration: f32) -> Kinematics {
    Kinematics {
        position: target.position
            + target.linear_velocity * duration
            + gravity * (0.5 * duration * duration),
        rotation: (Quat::from_scaled_axis(target.angular_velocity * duration) * target.rotation)
            .normalize(),
        linear_velocity: target.linear_velocity + gravity * duration,
        angular_velocity: target.angular_velocity,
    }
}

/// Whether the body's velocity changed by anything other than gravity since
/// the last push.
fn accelerated_off_gravity(ctx: &StateContext<'_>) -> bool {
    let gravity = ctx.body.gravity();
    let axis = gravity.normalize_or_zero();
    let local = ctx.body.linear_velocity();
    let synced = ctx.sync.linear_velocity;

    let expected_along = synced.dot(axis) + gravity.length() * ctx.since_push;
    let along = (local.dot(axis) - expected_along).abs();

    let local_off = local - axis * local.dot(axis);
    let synced_off = synced - axis * synced.dot(axis);
    let off = (local_off - synced_off).length();

    along > ctx.config.acceleration_epsilon || off > ctx.config.acceleration_epsilon
}

/// Rest is the integrator's call. A body that is merely slow may still be
/// resolving a contact.
fn is_at_rest(ctx: &StateContext<'_>) -> bool {
    ctx.body.is_sleeping()
}

impl BehaviorState for Falling {
    fn kind(&self) -> BehaviorKind {
        BehaviorKind::Falling
    }

    fn on_enter(&mut self, ctx: &mut StateContext<'_>) {
        if ctx.is_owner {
            ctx.body.wake_up();
        }
    }

    fn on_interpolation_start(&mut self, ctx: &mut StateContext<'_>) {
        let gravity = ctx.body.gravity();
        ctx.window.end = ballistic_end(ctx.window.target, gravity, ctx.window.duration());
    }

    fn interpolate(&mut self, ctx: &mut StateContext<'_>, fraction: f32) {
        if ctx.is_owner {
            return;
        }
        ctx.drive_body(fraction);
    }

    fn on_interpolation_end(&mut self, ctx: &mut StateContext<'_>) -> WindowOutcome {
        if !ctx.is_owner {
            // The body carries the window's end velocity into local physics.
            return WindowOutcome::Release;
        }

        if is_at_rest(ctx) {
            tracing::debug!(object = ctx.object, "[state] came to rest");
            ctx.switch_to(BehaviorKind::Sleeping);
            ctx.request_resend();
            return WindowOutcome::Release;
        }
        if accelerated_off_gravity(ctx) {
            ctx.request_resend();
        }
        WindowOutcome::Extend
    }

    fn on_simulation_step(&mut self, ctx: &mut StateContext<'_>) {
        let up = (-ctx.body.gravity()).try_normalize().unwrap_or(Vec3::Y);
        let height = ctx.body.position().dot(up);
        if height <= ctx.config.respawn_height {
            tracing::info!(
                object = ctx.object,
                height,
                "[state] fell below respawn height"
            );
            ctx.request_respawn();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::PhysicsBody;
    use crate::state::StateCommand;
    use crate::state::harness::Harness;

    const G: Vec3 = Vec3::new(0.0, -9.81, 0.0);

    #[test]
    fn test_ballistic_end_velocity_is_v_plus_gd() {
        let target = Kinematics {
            position: Vec3::new(0.0, 5.0, 0.0),
            linear_velocity: Vec3::new(2.0, 3.0, -1.0),
            ..Kinematics::REST
        };
        let d = 0.2;

        let end = ballistic_end(target, G, d);

        assert!((end.linear_velocity - (target.linear_velocity + G * d)).length() < 1e-6);
        let expected = target.position + target.linear_velocity * d + 0.5 * G * d * d;
        assert!((end.position - expected).length() < 1e-6);
    }

    #[test]
    fn test_window_end_is_extrapolated_from_target() {
        let mut h = Harness::new(false);
        let target = Kinematics {
            position: Vec3::new(1.0, 4.0, 0.0),
            linear_velocity: Vec3::new(0.5, 0.0, 0.0),
            ..Kinematics::REST
        };
        h.open(target);

        Falling.on_interpolation_start(&mut h.ctx());

        let d = h.window.duration();
        assert_eq!(h.window.end, ballistic_end(target, G, d));
        assert!((h.window.end.linear_velocity - (target.linear_velocity + G * d)).length() < 1e-6);
    }

    #[test]
    fn test_owner_goes_to_sleep_when_body_rests() {
        let mut h = Harness::new(true);
        h.open(Kinematics::REST);
        h.body.sleep();

        let outcome = Falling.on_interpolation_end(&mut h.ctx());

        assert_eq!(outcome, WindowOutcome::Release);
        assert_eq!(
            h.commands,
            vec![
                StateCommand::SwitchTo(BehaviorKind::Sleeping),
                StateCommand::Resend
            ]
        );
    }

    #[test]
    fn test_owner_extends_pure_ballistic_flight() {
        let mut h = Harness::new(true);
        h.sync.linear_velocity = Vec3::new(1.0, 2.0, 0.0);
        h.since_push = 0.25;
        h.body.set_linear_velocity(h.sync.linear_velocity + G * 0.25);
        h.open(Kinematics::REST);

        assert_eq!(Falling.on_interpolation_end(&mut h.ctx()), WindowOutcome::Extend);
        assert!(h.commands.is_empty());
    }

    #[test]
    fn test_owner_resends_on_non_gravitational_acceleration() {
        let mut h = Harness::new(true);
        h.sync.linear_velocity = Vec3::new(1.0, 2.0, 0.0);
        h.since_push = 0.25;
        // Something pushed the body sideways.
        h.body
            .set_linear_velocity(h.sync.linear_velocity + G * 0.25 + Vec3::new(0.0, 0.0, 0.5));
        h.open(Kinematics::REST);

        assert_eq!(Falling.on_interpolation_end(&mut h.ctx()), WindowOutcome::Extend);
        assert_eq!(h.commands, vec![StateCommand::Resend]);
    }

    #[test]
    fn test_slow_grounded_body_keeps_falling_until_asleep() {
        let mut h = Harness::new(true);
        h.body.grounded = true;
        h.body.set_position(Vec3::new(0.0, 0.15, 0.0));
        h.open(Kinematics::REST);

        assert_eq!(Falling.on_interpolation_end(&mut h.ctx()), WindowOutcome::Extend);
        assert!(!h.commands.contains(&StateCommand::SwitchTo(BehaviorKind::Sleeping)));
    }

    #[test]
    fn test_owner_resends_on_bounce_along_gravity() {
        let mut h = Harness::new(true);
        h.sync.linear_velocity = Vec3::new(0.0, -4.0, 0.0);
        h.since_push = 0.25;
        // The floor reversed the fall: +5 m/s up instead of v + g·t.
        h.body.set_linear_velocity(Vec3::new(0.0, 5.0, 0.0));
        h.open(Kinematics::REST);

        assert_eq!(Falling.on_interpolation_end(&mut h.ctx()), WindowOutcome::Extend);
        assert_eq!(h.commands, vec![StateCommand::Resend]);
    }

    #[test]
    fn test_owner_respawns_at_threshold() {
        let mut h = Harness::new(true);
        h.config.respawn_height = 0.2;

        h.body.set_position(Vec3::new(0.0, 0.3, 0.0));
        Falling.on_simulation_step(&mut h.ctx());
        assert!(h.commands.is_empty());

        h.body.set_position(Vec3::new(0.0, 0.1, 0.0));
        Falling.on_simulation_step(&mut h.ctx());
        assert_eq!(h.commands, vec![StateCommand::Respawn]);
    }

    #[test]
    fn test_non_owner_releases_to_local_physics() {
        let mut h = Harness::new(false);
        h.open(Kinematics::REST);
        assert_eq!(Falling.on_interpolation_end(&mut h.ctx()), WindowOutcome::Release);
        assert!(h.commands.is_empty());
    }
}
