use bevy::math::Vec3;

use crate::anchor::Bone;
use crate::sync::{Kinematics, Pose};

use super::{StateContext, WindowOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AnchorKind {
    Bone(Bone),
    Playspace,
}

/// Shared logic of the attachment states: follow an anchor of the owning
/// player at a fixed offset.
///
/// The first window after entering blends from wherever the body was onto the
/// anchor. Once that window ran out the follower is settled and tracks the
/// anchor exactly every tick.
#[derive(Debug, Clone)]
pub(crate) struct AnchorFollower {
    pub anchor: AnchorKind,
    pub offset: Pose,
    pub settled: bool,
    /// Anchor pose seen on the last successful lookup.
    pub last_anchor: Option<Pose>,
}

impl AnchorFollower {
    pub fn new(anchor: AnchorKind, offset: Pose) -> Self {
        Self {
            anchor,
            offset,
            settled: false,
            last_anchor: None,
        }
    }

    pub fn reset(&mut self) {
        self.settled = false;
        self.last_anchor = None;
    }

    /// Current anchor pose. Rigs that lack a bone may report it at the origin,
    /// which counts as missing.
    fn resolve(&self, ctx: &StateContext<'_>) -> Option<Pose> {
        let player = ctx.owner?;
        match self.anchor {
            AnchorKind::Bone(bone) => ctx
                .anchors
                .bone_pose(player, bone)
                .filter(|pose| pose.position != Vec3::ZERO),
            AnchorKind::Playspace => ctx.anchors.playspace_pose(player),
        }
    }

    /// Pose the object should have right now, or `None` if the anchor is gone.
    pub fn target(&mut self, ctx: &StateContext<'_>) -> Option<Pose> {
        let anchor = self.resolve(ctx)?;
        self.last_anchor = Some(anchor);
        Some(anchor * self.offset)
    }

    /// Records the live anchor pose without touching the body. A missing
    /// anchor keeps the previous one.
    pub fn refresh(&mut self, ctx: &StateContext<'_>) {
        if let Some(anchor) = self.resolve(ctx) {
            self.last_anchor = Some(anchor);
        }
    }

    /// Points the window at the anchor. Returns `false` if it is missing.
    pub fn start(&mut self, ctx: &mut StateContext<'_>) -> bool {
        let Some(target) = self.target(ctx) else {
            return false;
        };
        ctx.window.target = Kinematics::at_rest(target);
        ctx.window.end = ctx.window.target;
        true
    }

    /// Moves the body towards the live anchor. Returns `false` if it is missing.
    pub fn follow(&mut self, ctx: &mut StateContext<'_>, fraction: f32) -> bool {
        let Some(target) = self.target(ctx) else {
            return false;
        };
        if self.settled {
            ctx.body.set_pose(target);
            ctx.body.zero_velocity();
        } else {
            ctx.window.end = Kinematics::at_rest(target);
            ctx.drive_body(fraction);
        }
        true
    }

    pub fn end(&mut self) -> WindowOutcome {
        self.settled = true;
        WindowOutcome::Extend
    }
}
