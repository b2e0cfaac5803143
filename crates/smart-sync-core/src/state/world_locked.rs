//! Pinned in world space. The body is kinematic and never carries velocity.

use super::{BehaviorKind, BehaviorState, StateContext, WindowOutcome};

#[derive(Debug, Default, Clone, Copy)]
pub struct WorldLocked;

impl BehaviorState for WorldLocked {
    fn kind(&self) -> BehaviorKind {
        BehaviorKind::WorldLocked
    }

    fn on_enter(&mut self, ctx: &mut StateContext<'_>) {
        ctx.body.set_kinematic(true);
        ctx.body.zero_velocity();
    }

    fn on_exit(&mut self, ctx: &mut StateContext<'_>) {
        ctx.body.set_kinematic(false);
    }

    fn on_interpolation_start(&mut self, ctx: &mut StateContext<'_>) {
        ctx.window.start = ctx.window.start.stopped();
        ctx.window.end = ctx.window.target.stopped();
        ctx.body.zero_velocity();
    }

    fn interpolate(&mut self, ctx: &mut StateContext<'_>, fraction: f32) {
        if ctx.is_owner {
            return;
        }
        let pose = ctx.window.sample(fraction).pose();
        ctx.body.set_pose(pose);
        ctx.body.zero_velocity();
    }

    fn on_interpolation_end(&mut self, ctx: &mut StateContext<'_>) -> WindowOutcome {
        ctx.body.zero_velocity();
        WindowOutcome::Release
    }
}

#[cfg(test)]
mod tests {
    use bevy::math::Vec3;

    use super::*;
    use crate::physics::PhysicsBody;
    use crate::state::harness::Harness;
    use crate::sync::Kinematics;

    #[test]
    fn test_velocity_is_zeroed_every_window() {
        let mut h = Harness::new(false);
        let mut state = WorldLocked;
        state.on_enter(&mut h.ctx());
        assert!(h.body.is_kinematic());

        h.body.set_linear_velocity(Vec3::new(4.0, 0.0, 0.0));
        h.open(Kinematics {
            position: Vec3::new(1.0, 1.0, 1.0),
            linear_velocity: Vec3::new(9.0, 9.0, 9.0),
            ..Kinematics::REST
        });
        state.on_interpolation_start(&mut h.ctx());

        assert_eq!(h.window.end.linear_velocity, Vec3::ZERO);
        assert_eq!(h.body.linear_velocity(), Vec3::ZERO);

        state.interpolate(&mut h.ctx(), 0.5);
        assert_eq!(h.body.linear_velocity(), Vec3::ZERO);
        state.interpolate(&mut h.ctx(), 1.0);
        assert!((h.body.position() - Vec3::ONE).length() < 1e-5);

        assert_eq!(state.on_interpolation_end(&mut h.ctx()), WindowOutcome::Release);
        state.on_exit(&mut h.ctx());
        assert!(!h.body.is_kinematic());
    }
}
