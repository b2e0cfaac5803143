//! Bevy integration for smart-sync.
//!
//! Each replicated object is an entity carrying a [`SmartObject`] (its
//! controller), a `Transform` and a [`BodyMotion`]. The host's physics writes
//! those two every step; the systems here apply inbound network state, run
//! object commands and tick every controller in `FixedUpdate`. Outgoing pushes
//! and ownership requests collect in [`SyncOutbox`] for the host's transport.

pub mod components;
pub mod events;
pub mod plugin;
pub mod resources;
pub mod systems;

#[cfg(test)]
pub(crate) mod test_utils;

pub use components::*;
pub use events::*;
pub use plugin::SmartSyncPlugin;
pub use resources::*;
