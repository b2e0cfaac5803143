//! Object at rest. Non-owners glide to the synced rest pose, snap, and put the
//! body to sleep. On the owner the integrator already put the body to sleep;
//! the state only watches for it being woken up.

use crate::listener::DesyncReport;
use crate::sync::SyncState;

use super::{BehaviorKind, BehaviorState, StateContext, WindowOutcome};

#[derive(Debug, Default, Clone, Copy)]
pub struct Sleeping;

impl BehaviorState for Sleeping {
    fn kind(&self) -> BehaviorKind {
        BehaviorKind::Sleeping
    }

    fn on_interpolation_start(&mut self, ctx: &mut StateContext<'_>) {
        ctx.window.end = ctx.window.target.stopped();
    }

    fn interpolate(&mut self, ctx: &mut StateContext<'_>, fraction: f32) {
        // Once snapped, leave the sleeping body alone.
        if ctx.is_owner || ctx.window.ended {
            return;
        }
        ctx.drive_body(fraction);
    }

    fn on_interpolation_end(&mut self, ctx: &mut StateContext<'_>) -> WindowOutcome {
        if ctx.is_owner || ctx.window.ended {
            return WindowOutcome::Release;
        }

        let expected = ctx.window.end.pose();
        let drift = ctx.body.position().distance(expected.position);
        let angle = ctx.body.rotation().angle_between(expected.rotation);
        if drift > ctx.config.sleep_drift_tolerance || angle > ctx.config.sleep_angle_tolerance {
            tracing::warn!(
                object = ctx.object,
                drift,
                angle,
                "[state] sleeping body drifted from its synced pose"
            );
            ctx.report_desync(DesyncReport { drift, angle });
        }

        ctx.body.set_pose(ctx.sync.pose());
        ctx.body.zero_velocity();
        ctx.body.sleep();
        ctx.window.ended = true;
        WindowOutcome::Release
    }

    fn on_simulation_step(&mut self, ctx: &mut StateContext<'_>) {
        if ctx.body.is_sleeping() {
            return;
        }
        let speed = ctx
            .body
            .linear_velocity()
            .length()
            .max(ctx.body.angular_velocity().length());
        if speed > ctx.config.rest_speed {
            tracing::debug!(object = ctx.object, speed, "[state] woken up, falling again");
            ctx.switch_to(BehaviorKind::Falling);
            ctx.request_resend();
        }
    }

    fn on_serialize(&mut self, ctx: &mut StateContext<'_>, out: &mut SyncState) {
        out.set_kinematics(ctx.body.kinematics().stopped());
    }
}
