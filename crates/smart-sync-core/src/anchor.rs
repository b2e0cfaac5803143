//! Avatar anchors that attached objects follow.

use serde::{Deserialize, Serialize};

use crate::sync::{PlayerId, Pose};

/// Skeleton joints an object can attach to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bone {
    Head,
    Chest,
    Hips,
    LeftHand,
    RightHand,
    LeftFoot,
    RightFoot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Hand {
    Left,
    Right,
}

impl Hand {
    pub const fn bone(self) -> Bone {
        match self {
            Hand::Left => Bone::LeftHand,
            Hand::Right => Bone::RightHand,
        }
    }
}

/// Live anchor poses for every player in the session.
///
/// Avatars without a given joint return `None`. Some rigs report a missing joint
/// at the world origin instead; callers treat that the same as `None`.
pub trait AnchorProvider {
    fn bone_pose(&self, player: PlayerId, bone: Bone) -> Option<Pose>;
    fn playspace_pose(&self, player: PlayerId) -> Option<Pose>;
}

/// Provider for hosts without avatars.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAnchors;

impl AnchorProvider for NoAnchors {
    fn bone_pose(&self, _player: PlayerId, _bone: Bone) -> Option<Pose> {
        None
    }

    fn playspace_pose(&self, _player: PlayerId) -> Option<Pose> {
        None
    }
}
