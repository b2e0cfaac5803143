//! Attached to a skeleton joint of the owning player's avatar.

use crate::anchor::Bone;
use crate::sync::Pose;

use super::attachment::{AnchorFollower, AnchorKind};
use super::{BehaviorKind, BehaviorState, StateContext, WindowOutcome};

#[derive(Debug, Clone)]
pub struct BoneAttachment {
    follower: AnchorFollower,
}

impl BoneAttachment {
    pub fn new(bone: Bone, offset: Pose) -> Self {
        Self {
            follower: AnchorFollower::new(AnchorKind::Bone(bone), offset),
        }
    }
}

impl BehaviorState for BoneAttachment {
    fn kind(&self) -> BehaviorKind {
        BehaviorKind::BoneAttachment
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
            tracing::warn!(
                object = ctx.object,
                owner = ?ctx.owner,
                anchor = ?self.follower.anchor,
                "[state] bone missing, attaching to playspace"
            );
            ctx.switch_to(BehaviorKind::PlayspaceAttachment);
            if ctx.is_owner {
                ctx.request_resend();
            }
        }
    }

    fn interpolate(&mut self, ctx: &mut StateContext<'_>, fraction: f32) {
        // A bone that vanished mid-window is handled at the next window start.
        self.follower.follow(ctx, fraction);
    }

    fn on_interpolation_end(&mut self, _ctx: &mut StateContext<'_>) -> WindowOutcome {
        self.follower.end()
    }
}
