//! ECS Messages for synchronized objects.
//!
//! Note: In Bevy 0.18+, buffered events use Message trait instead of Event.

use bevy::prelude::*;

use crate::state::BehaviorKind;
use crate::sync::{ObjectId, PlayerId, SyncState};

/// Message fired by the host transport when an object's state arrives.
#[derive(Message, Debug, Clone)]
pub struct SyncStateReceived {
    pub object: ObjectId,
    pub state: SyncState,
}

/// Message fired by the host transport when an object's owner changes
/// (`None` when the owner left).
#[derive(Message, Debug, Clone, Copy)]
pub struct OwnershipChanged {
    pub object: ObjectId,
    pub owner: Option<PlayerId>,
}

/// Operations gameplay code can request on an object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ObjectCommand {
    RequestOwnership {
        non_destructive: bool,
    },
    Teleport {
        position: Vec3,
        rotation: Quat,
        linear_velocity: Vec3,
        angular_velocity: Vec3,
    },
    Respawn,
    SetBehavior(BehaviorKind),
}

/// Message to run an [`ObjectCommand`] on one object.
#[derive(Message, Debug, Clone, Copy)]
pub struct SmartObjectCommand {
    pub object: ObjectId,
    pub command: ObjectCommand,
}
