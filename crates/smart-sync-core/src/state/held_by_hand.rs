//! Held in one hand of the owning player.
//!
//! On the owner, hand tracking already places the object every frame, so this
//! state only keeps the hand pose up to date. Everyone else follows the hand
//! bone through the shared anchor follower.

use crate::anchor::Hand;
use crate::sync::Pose;

use super::attachment::{AnchorFollower, AnchorKind};
use super::{BehaviorKind, BehaviorState, StateContext, WindowOutcome};

#[derive(Debug, Clone)]
pub struct HeldByHand {
    hand: Hand,
    follower: AnchorFollower,
}

impl HeldByHand {
    pub fn new(hand: Hand, offset: Pose) -> Self {
        Self {
            hand,
            follower: AnchorFollower::new(AnchorKind::Bone(hand.bone()), offset),
        }
    }

    pub fn hand(&self) -> Hand {
        self.hand
    }

    /// Hand pose from the last successful lookup.
    pub fn last_hand_pose(&self) -> Option<Pose> {
        self.follower.last_anchor
    }
}

impl BehaviorState for HeldByHand {
    fn kind(&self) -> BehaviorKind {
        BehaviorKind::HeldByHand
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
                hand = ?self.hand,
                "[state] hand missing, attaching to playspace"
            );
            ctx.switch_to(BehaviorKind::PlayspaceAttachment);
            if ctx.is_owner {
                ctx.request_resend();
            }
        }
    }

    fn interpolate(&mut self, ctx: &mut StateContext<'_>, fraction: f32) {
        if ctx.is_owner {
            self.follower.refresh(ctx);
            return;
        }
        self.follower.follow(ctx, fraction);
    }

    fn on_interpolation_end(&mut self, _ctx: &mut StateContext<'_>) -> WindowOutcome {
        self.follower.end()
    }
}
