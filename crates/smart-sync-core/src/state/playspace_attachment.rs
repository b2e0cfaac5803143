//! Attached to the owning player's tracked play-space origin.

use crate::sync::Pose;

use super::attachment::{AnchorFollower, AnchorKind};
use super::{BehaviorKind, BehaviorState, StateContext, WindowOutcome};

#[derive(Debug, Clone)]
pub struct PlayspaceAttachment {
    follower: AnchorFollower,
}

impl PlayspaceAttachment {
    pub fn new(offset: Pose) -> Self {
        Self {
            follower: AnchorFollower::new(AnchorKind::Playspace, offset),
        }
    }
}

impl BehaviorState for PlayspaceAttachment {
    fn kind(&self) -> BehaviorKind {
        BehaviorKind::PlayspaceAttachment
    }

    fn on_enter(&mut self, ctx: &mut StateContext<'_>) {
        self.follower.reset();
        ctx.body.set_kinematic(true);
        ctx.body.zero_velocity();
    }

    fn on_exit(&mut self, ctx: &mut StateContext<'_>) {
        ctx.body.set_kinematic(false);
    }

    fn on_interpolation_start(&mut self, ctx: &mut StateContext<'_>) {
        if !self.follower.start(ctx) {
            // Nothing further to fall back to; hold still until the anchor returns.
            tracing::debug!(object = ctx.object, owner = ?ctx.owner, "[state] playspace unavailable");
            ctx.window.start = ctx.window.start.stopped();
            ctx.window.end = ctx.window.start;
            ctx.body.zero_velocity();
        }
    }

    fn interpolate(&mut self, ctx: &mut StateContext<'_>, fraction: f32) {
        if !self.follower.follow(ctx, fraction) {
            ctx.body.zero_velocity();
        }
    }

    fn on_interpolation_end(&mut self, _ctx: &mut StateContext<'_>) -> WindowOutcome {
        self.follower.end()
    }
}
