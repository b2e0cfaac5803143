//! Behavior states.
//!
//! Exactly one state is active per object. It decides how the object moves on
//! non-owners (interpolation) and when the owner pushes. States never reach into
//! the controller; they read and write through [`StateContext`] and queue
//! [`StateCommand`]s that the controller applies after each call.

mod attachment;
mod bone_attachment;
mod falling;
mod held_by_hand;
mod playspace_attachment;
mod sleeping;
mod teleporting;
mod world_locked;

use serde::{Deserialize, Serialize};

pub use bone_attachment::BoneAttachment;
pub use falling::{Falling, ballistic_end};
pub use held_by_hand::HeldByHand;
pub use playspace_attachment::PlayspaceAttachment;
pub use sleeping::Sleeping;
pub use teleporting::Teleporting;
pub use world_locked::WorldLocked;

use crate::anchor::AnchorProvider;
use crate::config::SyncConfig;
use crate::listener::DesyncReport;
use crate::physics::PhysicsBody;
use crate::sync::{ObjectId, PlayerId, SyncState};
use crate::window::InterpolationWindow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BehaviorKind {
    Sleeping,
    Falling,
    Teleporting,
    WorldLocked,
    HeldByHand,
    BoneAttachment,
    PlayspaceAttachment,
}

/// What happens when an interpolation window runs out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowOutcome {
    /// Open a fresh window seeded at the end of this one.
    Extend,
    /// Stop driving the body and hand it back to local physics.
    Release,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StateCommand {
    SwitchTo(BehaviorKind),
    /// Push a fresh `SyncState` out of band (owner only).
    Resend,
    /// Teleport to the configured spawn pose (owner only).
    Respawn,
    ReportDesync(DesyncReport),
}

/// Everything a state may touch during one lifecycle call.
pub struct StateContext<'a> {
    pub object: ObjectId,
    pub body: &'a mut dyn PhysicsBody,
    pub anchors: &'a dyn AnchorProvider,
    pub window: &'a mut InterpolationWindow,
    /// Last authoritative state (received, or last pushed on the owner).
    pub sync: &'a SyncState,
    pub config: &'a SyncConfig,
    pub owner: Option<PlayerId>,
    /// The local client owns the object.
    pub is_owner: bool,
    /// Seconds since the owner last pushed.
    pub since_push: f32,
    commands: &'a mut Vec<StateCommand>,
}

impl<'a> StateContext<'a> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        object: ObjectId,
        body: &'a mut dyn PhysicsBody,
        anchors: &'a dyn AnchorProvider,
        window: &'a mut InterpolationWindow,
        sync: &'a SyncState,
        config: &'a SyncConfig,
        owner: Option<PlayerId>,
        is_owner: bool,
        since_push: f32,
        commands: &'a mut Vec<StateCommand>,
    ) -> Self {
        Self {
            object,
            body,
            anchors,
            window,
            sync,
            config,
            owner,
            is_owner,
            since_push,
            commands,
        }
    }

    pub fn switch_to(&mut self, kind: BehaviorKind) {
        self.commands.push(StateCommand::SwitchTo(kind));
    }

    pub fn request_resend(&mut self) {
        self.commands.push(StateCommand::Resend);
    }

    pub fn request_respawn(&mut self) {
        self.commands.push(StateCommand::Respawn);
    }

    pub fn report_desync(&mut self, report: DesyncReport) {
        self.commands.push(StateCommand::ReportDesync(report));
    }

    /// Moves the body onto the window's curve at `fraction`.
    pub fn drive_body(&mut self, fraction: f32) {
        let sample = self.window.sample(fraction);
        self.body.apply_kinematics(&sample);
    }
}

/// Lifecycle contract every behavior implements.
///
/// `on_enter`/`on_exit` bracket the time a state is active. While active, the
/// controller runs windows: `on_interpolation_start`, then `interpolate` with a
/// growing fraction, then `on_interpolation_end`.
pub trait BehaviorState: Send + Sync {
    fn kind(&self) -> BehaviorKind;

    fn on_enter(&mut self, _ctx: &mut StateContext<'_>) {}

    fn on_exit(&mut self, _ctx: &mut StateContext<'_>) {}

    /// Called right after the window was opened. `ctx.window.end` starts out
    /// equal to `ctx.window.target`; states rewrite it as they see fit.
    fn on_interpolation_start(&mut self, ctx: &mut StateContext<'_>);

    fn interpolate(&mut self, ctx: &mut StateContext<'_>, fraction: f32);

    fn on_interpolation_end(&mut self, ctx: &mut StateContext<'_>) -> WindowOutcome;

    /// Owner-only hook run once per simulation tick.
    fn on_simulation_step(&mut self, _ctx: &mut StateContext<'_>) {}

    /// Fills the outgoing state right before a push. Reads the live body, never
    /// cached values, because pushes can happen anywhere in a tick.
    fn on_serialize(&mut self, ctx: &mut StateContext<'_>, out: &mut SyncState) {
        out.set_kinematics(ctx.body.kinematics());
    }
}

/// The standard behavior set, in registry order.
pub fn default_states(config: &SyncConfig) -> Vec<Box<dyn BehaviorState>> {
    vec![
        Box::new(Sleeping),
        Box::new(Falling),
        Box::new(Teleporting),
        Box::new(WorldLocked),
        Box::new(HeldByHand::new(config.held_hand, config.hand_offset)),
        Box::new(BoneAttachment::new(config.bone, config.bone_offset)),
        Box::new(PlayspaceAttachment::new(config.playspace_offset)),
    ]
}

#[cfg(test)]
pub(crate) mod harness {
    //! Runs a single state against test doubles.

    use crate::anchor::AnchorProvider;
    use crate::config::SyncConfig;
    use crate::sync::{Kinematics, PlayerId, SyncState};
    use crate::test_utils::{TestAnchors, TestBody};
    use crate::window::InterpolationWindow;

    use super::{StateCommand, StateContext};

    pub(crate) struct Harness {
        pub body: TestBody,
        pub anchors: TestAnchors,
        pub window: InterpolationWindow,
        pub sync: SyncState,
        pub config: SyncConfig,
        pub owner: Option<PlayerId>,
        pub is_owner: bool,
        pub since_push: f32,
        pub commands: Vec<StateCommand>,
    }

    impl Harness {
        pub fn new(is_owner: bool) -> Self {
            Self {
                body: TestBody::default(),
                anchors: TestAnchors::default(),
                window: InterpolationWindow::default(),
                sync: SyncState::default(),
                config: SyncConfig::default(),
                owner: Some(1),
                is_owner,
                since_push: 0.0,
                commands: Vec::new(),
            }
        }

        /// Opens a window from the live body towards `target`.
        pub fn open(&mut self, target: Kinematics) {
            let start = crate::physics::PhysicsBody::kinematics(&self.body);
            self.window.open(start, target, self.config.interpolation_duration);
        }

        pub fn ctx(&mut self) -> StateContext<'_> {
            let anchors: &dyn AnchorProvider = &self.anchors;
            StateContext::new(
                7,
                &mut self.body,
                anchors,
                &mut self.window,
                &self.sync,
                &self.config,
                self.owner,
                self.is_owner,
                self.since_push,
                &mut self.commands,
            )
        }
    }
}
