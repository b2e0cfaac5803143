//! Smart-Sync Core Library
//!
//! Networked synchronization of dynamic physics objects. One client at a time
//! owns an object and runs authoritative physics for it; everyone else
//! reconstructs its motion from sparse updates with Hermite interpolation.
//! A pluggable behavior state machine decides how each object moves and when
//! the owner pushes.
//!
//! The host engine plugs in through three traits: [`PhysicsBody`],
//! [`AnchorProvider`] and [`Transport`]. The [`bevy`](crate::bevy) module wires
//! all of it into a Bevy app.

#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]

pub mod anchor;
pub mod config;
pub mod controller;
pub mod error;
pub mod interpolation;
pub mod listener;
pub mod physics;
pub mod state;
pub mod sync;
pub mod transport;
pub mod window;

// Bevy integration
pub mod bevy;

#[cfg(test)]
pub(crate) mod test_utils;

// Math types used throughout the public API.
pub use ::bevy::math::{Quat, Vec3};

pub use anchor::{AnchorProvider, Bone, Hand, NoAnchors};
pub use config::{PushPolicy, SyncConfig};
pub use controller::{Collaborators, SyncController};
pub use error::SyncError;
pub use listener::{DesyncReport, ListenerHandle, ListenerRegistry, SyncListener};
pub use physics::PhysicsBody;
pub use state::{BehaviorKind, BehaviorState, StateCommand, StateContext, WindowOutcome};
pub use sync::{Kinematics, ObjectId, PlayerId, Pose, StateIndex, SyncState};
pub use transport::{OwnershipRequest, Transport};
pub use window::InterpolationWindow;
