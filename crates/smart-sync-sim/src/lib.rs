//! Headless multi-client harness for smart-sync.
//!
//! Every client runs its own `Rapier3D` world and `SyncController` for the same
//! ball. A lossy loopback network with an ownership authority connects them.

#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod config;
pub mod network;
pub mod simulation;
pub mod world;

pub use client::{ClientEvent, EventLog, SimClient};
pub use config::SimConfig;
pub use network::{LoopbackNetwork, NetError, NetStats, WirePacket};
pub use simulation::{SimReport, Simulation};
