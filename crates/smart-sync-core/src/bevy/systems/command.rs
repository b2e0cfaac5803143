//! Command processing system.
//!
//! Runs gameplay requests against the object's controller. Owner-only
//! commands issued by a non-owner are logged and dropped.

use bevy::prelude::*;

use super::{SyncEnv, with_collaborators};
use crate::bevy::components::{BodyMotion, SmartObject};
use crate::bevy::events::{ObjectCommand, SmartObjectCommand};
use crate::bevy::resources::{AnchorPoses, LocalPlayer, SyncGravity, SyncOutbox};

#[allow(clippy::too_many_arguments, clippy::needless_pass_by_value)]
pub fn apply_object_commands(
    mut commands: MessageReader<SmartObjectCommand>,
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

    for message in commands.read() {
        let Some((mut object, mut transform, mut motion)) = objects
            .iter_mut()
            .find(|(object, _, _)| object.controller.object_id() == message.object)
        else {
            tracing::warn!("[command] unknown object {}", message.object);
            continue;
        };
        tracing::info!("[command] {:?} on object {}", message.command, message.object);

        let result = with_collaborators(env, &mut transform, &mut motion, &anchors, &mut outbox, |collab| {
            let controller = &mut object.controller;
            match message.command {
                ObjectCommand::RequestOwnership { non_destructive } => {
                    controller.request_ownership(collab, non_destructive);
                    Ok(())
                }
                ObjectCommand::Teleport {
                    position,
                    rotation,
                    linear_velocity,
                    angular_velocity,
                } => controller.teleport(collab, position, rotation, linear_velocity, angular_velocity),
                ObjectCommand::Respawn => controller.respawn(collab),
                ObjectCommand::SetBehavior(kind) => controller.set_behavior(collab, kind),
            }
        });
        if let Err(err) = result {
            tracing::warn!("[command] {err}");
        }
    }
}
