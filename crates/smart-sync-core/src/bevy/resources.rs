//! ECS Resources shared by the sync systems.

use std::collections::HashMap;

use bevy::prelude::*;

use crate::anchor::{AnchorProvider, Bone};
use crate::sync::{ObjectId, PlayerId, Pose, SyncState};
use crate::transport::{OwnershipRequest, Transport};

/// Identity of this client.
#[derive(Resource, Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalPlayer(pub PlayerId);

/// Gravity the host's physics applies.
#[derive(Resource, Debug, Clone, Copy, PartialEq)]
pub struct SyncGravity(pub Vec3);

impl Default for SyncGravity {
    fn default() -> Self {
        Self(Vec3::new(0.0, -9.81, 0.0))
    }
}

/// Outgoing traffic, drained by the host's transport.
#[derive(Resource, Debug, Default, Clone)]
pub struct SyncOutbox {
    pub pushes: Vec<(ObjectId, SyncState)>,
    pub ownership_requests: Vec<OwnershipRequest>,
}

impl SyncOutbox {
    pub fn drain_pushes(&mut self) -> Vec<(ObjectId, SyncState)> {
        std::mem::take(&mut self.pushes)
    }

    pub fn drain_requests(&mut self) -> Vec<OwnershipRequest> {
        std::mem::take(&mut self.ownership_requests)
    }
}

/// [`Transport`] that records into the [`SyncOutbox`].
pub struct OutboxTransport<'a> {
    pub local: PlayerId,
    pub outbox: &'a mut SyncOutbox,
}

impl Transport for OutboxTransport<'_> {
    fn local_player(&self) -> PlayerId {
        self.local
    }

    fn push(&mut self, object: ObjectId, state: &SyncState) {
        self.outbox.pushes.push((object, state.clone()));
    }

    fn request_ownership(&mut self, request: OwnershipRequest) {
        self.outbox.ownership_requests.push(request);
    }
}

/// Latest avatar anchor poses, written by the host's avatar systems.
#[derive(Resource, Debug, Default, Clone)]
pub struct AnchorPoses {
    pub bones: HashMap<(PlayerId, Bone), Pose>,
    pub playspaces: HashMap<PlayerId, Pose>,
}

impl AnchorPoses {
    pub fn set_bone(&mut self, player: PlayerId, bone: Bone, pose: Pose) {
        self.bones.insert((player, bone), pose);
    }

    pub fn set_playspace(&mut self, player: PlayerId, pose: Pose) {
        self.playspaces.insert(player, pose);
    }

    /// Forgets every anchor of a player that left.
    pub fn remove_player(&mut self, player: PlayerId) {
        self.bones.retain(|(owner, _), _| *owner != player);
        self.playspaces.remove(&player);
    }
}

impl AnchorProvider for AnchorPoses {
    fn bone_pose(&self, player: PlayerId, bone: Bone) -> Option<Pose> {
        self.bones.get(&(player, bone)).copied()
    }

    fn playspace_pose(&self, player: PlayerId) -> Option<Pose> {
        self.playspaces.get(&player).copied()
    }
}
