//! Inbound network traffic.

use bevy::prelude::*;

use super::{SyncEnv, with_collaborators};
use crate::bevy::components::{BodyMotion, SmartObject};
use crate::bevy::events::{OwnershipChanged, SyncStateReceived};
use crate::bevy::resources::{AnchorPoses, LocalPlayer, SyncGravity, SyncOutbox};

/// Hands received states and ownership notifications to their controllers.
#[allow(clippy::too_many_arguments, clippy::needless_pass_by_value)]
pub fn apply_inbound_sync(
    mut received: MessageReader<SyncStateReceived>,
    mut ownership: MessageReader<OwnershipChanged>,
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

    for change in ownership.read() {
        let Some((mut object, mut transform, mut motion)) = objects
            .iter_mut()
            .find(|(object, _, _)| object.controller.object_id() == change.object)
        else {
            tracing::warn!("[sync] ownership change for unknown object {}", change.object);
            continue;
        };
        with_collaborators(env, &mut transform, &mut motion, &anchors, &mut outbox, |collab| {
            object.controller.set_owner(collab, change.owner);
        });
    }

    for message in received.read() {
        let Some((mut object, mut transform, mut motion)) = objects
            .iter_mut()
            .find(|(object, _, _)| object.controller.object_id() == message.object)
        else {
            tracing::warn!("[sync] state for unknown object {}", message.object);
            continue;
        };
        let state = message.state.clone();
        with_collaborators(env, &mut transform, &mut motion, &anchors, &mut outbox, |collab| {
            object.controller.receive(collab, state);
        });
    }
}
