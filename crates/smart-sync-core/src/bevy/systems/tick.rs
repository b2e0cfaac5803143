//! Per-step controller update.

use bevy::prelude::*;

use super::{SyncEnv, with_collaborators};
use crate::bevy::components::{BodyMotion, SmartObject};
use crate::bevy::resources::{AnchorPoses, LocalPlayer, SyncGravity, SyncOutbox};

/// Advances every controller by one fixed step. Runs after the host's physics.
#[allow(clippy::needless_pass_by_value)]
pub fn tick_smart_objects(
    local: Res<LocalPlayer>,
    gravity: Res<SyncGravity>,
    time: Res<Time<Fixed>>,
    anchors: Res<AnchorPoses>,
    mut outbox: ResMut<SyncOutbox>,
    mut objects: Query<(&mut SmartObject, &mut Transform, &mut BodyMotion)>,
) {
    let env = SyncEnv {
        local: local.0,
        gravity: gravity.0,
        fixed_dt: time.timestep().as_secs_f32(),
    };

    for (mut object, mut transform, mut motion) in &mut objects {
        with_collaborators(env, &mut transform, &mut motion, &anchors, &mut outbox, |collab| {
            object.controller.tick(collab, env.fixed_dt);
        });
    }
}
