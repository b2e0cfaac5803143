//! Network collaborator. Every call is fire-and-forget.

use serde::{Deserialize, Serialize};

use crate::sync::{ObjectId, PlayerId, SyncState};

/// Ask the session authority to hand an object to `requester`.
///
/// Ownership is only confirmed by a later inbound `SyncState` (or an ownership
/// notification) naming the requester.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnershipRequest {
    pub object: ObjectId,
    pub requester: PlayerId,
    /// Keep in-flight physics on hand-off instead of resetting to the synced state.
    pub non_destructive: bool,
}

pub trait Transport {
    fn local_player(&self) -> PlayerId;
    /// Replicates `state` to every other client. Best effort.
    fn push(&mut self, object: ObjectId, state: &SyncState);
    fn request_ownership(&mut self, request: OwnershipRequest);
}
