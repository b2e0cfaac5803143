use crate::state::BehaviorKind;
use crate::sync::{ObjectId, PlayerId, StateIndex};

/// Errors surfaced by the sync core.
///
/// None of these are fatal: an owner-only call from a non-owner is simply
/// ignored, the others reject a bad setup before the object goes live.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("player {local} does not own object {object}")]
    NotOwner { object: ObjectId, local: PlayerId },
    #[error("object {object} has no behavior state at index {index}")]
    UnknownState { object: ObjectId, index: StateIndex },
    #[error("object {object} has no {kind:?} behavior state")]
    MissingState { object: ObjectId, kind: BehaviorKind },
    #[error("a controller needs at least one behavior state")]
    NoStates,
    #[error("invalid sync config: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Config(#[from] serde_json::Error),
}
