//! Replicated snapshot of a smart object and the small value types around it.

use std::ops::Mul;

use bevy::math::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Unique identifier for a player (client) in the session.
pub type PlayerId = u32;

/// Unique identifier for a replicated object.
pub type ObjectId = u32;

/// Index into an object's ordered list of behavior states.
pub type StateIndex = u16;

/// World-space position and rotation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Pose {
    pub const IDENTITY: Pose = Pose {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    pub const fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    pub const fn from_position(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
        }
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Composes a parent pose with a local offset (`parent * local`).
impl Mul for Pose {
    type Output = Pose;

    fn mul(self, local: Pose) -> Pose {
        Pose {
            position: self.position + self.rotation * local.position,
            rotation: (self.rotation * local.rotation).normalize(),
        }
    }
}

/// Pose plus linear and angular velocity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Kinematics {
    pub position: Vec3,
    pub rotation: Quat,
    pub linear_velocity: Vec3,
    /// Angular velocity in world space (radians/sec).
    pub angular_velocity: Vec3,
}

impl Kinematics {
    pub const REST: Kinematics = Kinematics {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        linear_velocity: Vec3::ZERO,
        angular_velocity: Vec3::ZERO,
    };

    /// A body at `pose` with no motion.
    pub const fn at_rest(pose: Pose) -> Self {
        Self {
            position: pose.position,
            rotation: pose.rotation,
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
        }
    }

    pub const fn pose(&self) -> Pose {
        Pose::new(self.position, self.rotation)
    }

    /// Same pose with both velocities cleared.
    pub const fn stopped(self) -> Self {
        Self::at_rest(self.pose())
    }
}

impl Default for Kinematics {
    fn default() -> Self {
        Self::REST
    }
}

/// The minimal replicated state pushed by the owner of an object.
///
/// Everything a remote client needs to reconstruct motion: the pose and
/// velocities at send time, which behavior state governs the object, and who
/// currently owns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncState {
    /// World position at send time.
    pub position: Vec3,
    /// World rotation at send time.
    pub rotation: Quat,
    /// Linear velocity at send time.
    pub linear_velocity: Vec3,
    /// Angular velocity at send time (world space, radians/sec).
    pub angular_velocity: Vec3,
    /// Index of the active behavior state.
    pub behavior_state_id: StateIndex,
    /// Client authorized to simulate and push; `None` while nobody owns it.
    pub owner_id: Option<PlayerId>,
}

impl Default for SyncState {
    fn default() -> Self {
        Self::from_kinematics(Kinematics::REST, 0, None)
    }
}

impl SyncState {
    pub fn from_kinematics(
        kinematics: Kinematics,
        behavior_state_id: StateIndex,
        owner_id: Option<PlayerId>,
    ) -> Self {
        Self {
            position: kinematics.position,
            rotation: kinematics.rotation,
            linear_velocity: kinematics.linear_velocity,
            angular_velocity: kinematics.angular_velocity,
            behavior_state_id,
            owner_id,
        }
    }

    pub fn kinematics(&self) -> Kinematics {
        Kinematics {
            position: self.position,
            rotation: self.rotation,
            linear_velocity: self.linear_velocity,
            angular_velocity: self.angular_velocity,
        }
    }

    pub fn pose(&self) -> Pose {
        Pose::new(self.position, self.rotation)
    }

    /// Overwrites pose and velocities, keeping state id and owner.
    pub fn set_kinematics(&mut self, kinematics: Kinematics) {
        self.position = kinematics.position;
        self.rotation = kinematics.rotation;
        self.linear_velocity = kinematics.linear_velocity;
        self.angular_velocity = kinematics.angular_velocity;
    }
}
