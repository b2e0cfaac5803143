//! Systems for synchronized objects.
//!
//! Organized by functionality:
//! - inbound: Apply received states and ownership notifications
//! - command: Run gameplay commands (teleport, respawn, ownership, behavior)
//! - tick: Advance every controller by one fixed step

pub mod command;
pub mod inbound;
pub mod tick;

pub use command::*;
pub use inbound::*;
pub use tick::*;

use bevy::prelude::*;

use crate::bevy::components::{BodyMotion, TransformBody};
use crate::bevy::resources::{AnchorPoses, OutboxTransport, SyncOutbox};
use crate::controller::Collaborators;
use crate::sync::PlayerId;

/// Per-run values every system hands to the controllers.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SyncEnv {
    pub local: PlayerId,
    pub gravity: Vec3,
    pub fixed_dt: f32,
}

/// Lends one entity's body plus the shared anchors and outbox to `f`.
pub(crate) fn with_collaborators<R>(
    env: SyncEnv,
    transform: &mut Transform,
    motion: &mut BodyMotion,
    anchors: &AnchorPoses,
    outbox: &mut SyncOutbox,
    f: impl FnOnce(&mut Collaborators<'_>) -> R,
) -> R {
    let mut body = TransformBody {
        transform,
        motion,
        gravity: env.gravity,
        fixed_dt: env.fixed_dt,
    };
    let mut transport = OutboxTransport {
        local: env.local,
        outbox,
    };
    let mut collab = Collaborators::new(&mut body, anchors, &mut transport);
    f(&mut collab)
}
