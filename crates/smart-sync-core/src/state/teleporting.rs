//! Hard reposition. The window has no extent: start, end and target coincide.

use super::{BehaviorKind, BehaviorState, StateContext, WindowOutcome};

#[derive(Debug, Default, Clone, Copy)]
pub struct Teleporting;

impl BehaviorState for Teleporting {
    fn kind(&self) -> BehaviorKind {
        BehaviorKind::Teleporting
    }

    fn on_enter(&mut self, ctx: &mut StateContext<'_>) {
        ctx.body.wake_up();
    }

    fn on_interpolation_start(&mut self, ctx: &mut StateContext<'_>) {
        ctx.window.start = ctx.window.target;
        ctx.window.end = ctx.window.target;
    }

    fn interpolate(&mut self, ctx: &mut StateContext<'_>, _fraction: f32) {
        let end = ctx.window.end;
        ctx.body.apply_kinematics(&end);
    }

    fn on_interpolation_end(&mut self, ctx: &mut StateContext<'_>) -> WindowOutcome {
        if ctx.is_owner {
            ctx.switch_to(BehaviorKind::Falling);
            ctx.request_resend();
        }
        WindowOutcome::Release
    }
}
