//! Per-object orchestrator.
//!
//! A [`SyncController`] owns the behavior states of one replicated object, the
//! interpolation clock, the last authoritative [`SyncState`] and the listener
//! set. The host lends it the body, the anchors and the transport for the
//! duration of each call through [`Collaborators`].
//!
//! Only the client whose local identity matches the controller's belief of the
//! owner runs physics and pushes. Every other client blends towards whatever it
//! received last.

use std::sync::Arc;

use bevy::math::{Quat, Vec3};

use crate::anchor::AnchorProvider;
use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::listener::{DesyncReport, ListenerHandle, ListenerRegistry, SyncListener};
use crate::physics::PhysicsBody;
use crate::state::{
    BehaviorKind, BehaviorState, StateCommand, StateContext, WindowOutcome, default_states,
};
use crate::sync::{Kinematics, ObjectId, PlayerId, StateIndex, SyncState};
use crate::transport::{OwnershipRequest, Transport};
use crate::window::{InterpolationWindow, MIN_WINDOW_DURATION};

/// Rounds of state commands applied per call before the rest is dropped.
const MAX_COMMAND_ROUNDS: usize = 8;

/// Host-side objects a controller needs for one call.
pub struct Collaborators<'a> {
    pub body: &'a mut dyn PhysicsBody,
    pub anchors: &'a dyn AnchorProvider,
    pub transport: &'a mut dyn Transport,
}

impl<'a> Collaborators<'a> {
    pub fn new(
        body: &'a mut dyn PhysicsBody,
        anchors: &'a dyn AnchorProvider,
        transport: &'a mut dyn Transport,
    ) -> Self {
        Self {
            body,
            anchors,
            transport,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OwnerTransition {
    Gained,
    Lost,
    Moved,
    Unchanged,
}

pub struct SyncController {
    object: ObjectId,
    config: SyncConfig,
    states: Vec<Box<dyn BehaviorState>>,
    active: usize,
    /// Bumped on every state change.
    epoch: u64,
    entered: bool,
    window: InterpolationWindow,
    driving: bool,
    last_sync: SyncState,
    owner: Option<PlayerId>,
    listeners: ListenerRegistry,
    commands: Vec<StateCommand>,
    pending_push: bool,
    since_push: f32,
    /// `non_destructive` flag of our outstanding ownership request.
    pending_request: Option<bool>,
    desync_count: u64,
    last_desync: Option<DesyncReport>,
}

impl std::fmt::Debug for SyncController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncController")
            .field("object", &self.object)
            .field("state", &self.state_kind())
            .field("owner", &self.owner)
            .field("driving", &self.driving)
            .field("window", &self.window)
            .field("listeners", &self.listeners)
            .finish_non_exhaustive()
    }
}

impl SyncController {
    /// Builds a controller over an ordered list of behavior states. The list
    /// order defines `behavior_state_id` and must match on every client.
    ///
    /// Starts in `Falling` if present, otherwise in the first state.
    pub fn new(
        object: ObjectId,
        config: SyncConfig,
        states: Vec<Box<dyn BehaviorState>>,
    ) -> Result<Self, SyncError> {
        config.validate()?;
        if states.is_empty() {
            return Err(SyncError::NoStates);
        }
        if states.len() > usize::from(StateIndex::MAX) + 1 {
            return Err(SyncError::InvalidConfig(format!(
                "{} behavior states do not fit a state index",
                states.len()
            )));
        }
        let active = states
            .iter()
            .position(|state| state.kind() == BehaviorKind::Falling)
            .unwrap_or(0);
        let last_sync = SyncState {
            behavior_state_id: StateIndex::try_from(active).unwrap_or_default(),
            ..SyncState::default()
        };

        Ok(Self {
            object,
            config,
            states,
            active,
            epoch: 0,
            entered: false,
            window: InterpolationWindow::default(),
            driving: false,
            last_sync,
            owner: None,
            listeners: ListenerRegistry::new(),
            commands: Vec::new(),
            pending_push: false,
            since_push: 0.0,
            pending_request: None,
            desync_count: 0,
            last_desync: None,
        })
    }

    pub fn with_default_states(object: ObjectId, config: SyncConfig) -> Result<Self, SyncError> {
        let states = default_states(&config);
        Self::new(object, config, states)
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn object_id(&self) -> ObjectId {
        self.object
    }

    pub fn state_id(&self) -> StateIndex {
        StateIndex::try_from(self.active).unwrap_or(StateIndex::MAX)
    }

    pub fn state_kind(&self) -> BehaviorKind {
        self.states[self.active].kind()
    }

    pub fn owner(&self) -> Option<PlayerId> {
        self.owner
    }

    /// Whether `local` may run physics and push for this object.
    pub fn is_owner(&self, local: PlayerId) -> bool {
        self.owner == Some(local)
    }

    pub fn last_sync(&self) -> &SyncState {
        &self.last_sync
    }

    pub fn window(&self) -> &InterpolationWindow {
        &self.window
    }

    /// Whether the active window is currently steering the body.
    pub fn is_driving(&self) -> bool {
        self.driving
    }

    pub fn desync_count(&self) -> u64 {
        self.desync_count
    }

    pub fn last_desync(&self) -> Option<DesyncReport> {
        self.last_desync
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn state_index(&self, kind: BehaviorKind) -> Option<StateIndex> {
        self.index_of(kind)
            .and_then(|index| StateIndex::try_from(index).ok())
    }

    // ------------------------------------------------------------------
    // Listeners
    // ------------------------------------------------------------------

    pub fn add_listener<L: SyncListener + 'static>(&mut self, listener: &Arc<L>) -> ListenerHandle {
        self.listeners.add(listener)
    }

    pub fn remove_listener(&mut self, handle: ListenerHandle) -> bool {
        self.listeners.remove(handle)
    }

    // ------------------------------------------------------------------
    // Public operations
    // ------------------------------------------------------------------

    /// Asks the authority for ownership. Fire-and-forget: ownership is only
    /// taken once an inbound state or notification names the local player.
    pub fn request_ownership(&mut self, collab: &mut Collaborators<'_>, non_destructive: bool) {
        let local = collab.transport.local_player();
        if self.is_owner(local) {
            tracing::debug!(object = self.object, "[sync] already owner, request skipped");
            return;
        }
        self.pending_request = Some(non_destructive);
        tracing::info!(
            object = self.object,
            player = local,
            non_destructive,
            "[sync] requesting ownership"
        );
        collab.transport.request_ownership(OwnershipRequest {
            object: self.object,
            requester: local,
            non_destructive,
        });
    }

    /// Owner-only hard reposition with an immediate push.
    pub fn teleport(
        &mut self,
        collab: &mut Collaborators<'_>,
        position: Vec3,
        rotation: Quat,
        linear_velocity: Vec3,
        angular_velocity: Vec3,
    ) -> Result<(), SyncError> {
        self.ensure_entered(collab);
        self.check_owner(collab, "teleport")?;
        self.teleport_inner(
            collab,
            Kinematics {
                position,
                rotation,
                linear_velocity,
                angular_velocity,
            },
        )?;
        self.settle(collab);
        Ok(())
    }

    /// Teleports to the configured spawn pose with zero velocity.
    pub fn respawn(&mut self, collab: &mut Collaborators<'_>) -> Result<(), SyncError> {
        self.ensure_entered(collab);
        self.check_owner(collab, "respawn")?;
        self.teleport_inner(collab, Kinematics::at_rest(self.config.spawn))?;
        self.settle(collab);
        Ok(())
    }

    /// Owner-only behavior change for external scripts (grab, release, lock).
    pub fn set_behavior(
        &mut self,
        collab: &mut Collaborators<'_>,
        kind: BehaviorKind,
    ) -> Result<(), SyncError> {
        self.ensure_entered(collab);
        self.check_owner(collab, "set_behavior")?;
        let index = self.index_of(kind).ok_or(SyncError::MissingState {
            object: self.object,
            kind,
        })?;
        self.enter_state(collab, index);
        self.settle(collab);
        Ok(())
    }

    /// One fixed simulation tick. Call after the host stepped physics.
    pub fn tick(&mut self, collab: &mut Collaborators<'_>, dt: f32) {
        self.ensure_entered(collab);
        let owner = self.is_local_owner(collab);

        if owner {
            self.since_push += dt;
            self.with_active(collab, |state, ctx| state.on_simulation_step(ctx));
            self.apply_commands(collab);
            if !self.driving {
                self.restart_window(collab);
                self.apply_commands(collab);
            }
        }

        self.step_window(collab, dt);

        if owner && self.config.push_policy.is_due(self.since_push) {
            self.pending_push = true;
        }
        self.flush(collab);
    }

    /// Render-tick evaluation at an explicit window fraction. Does not move
    /// the clock.
    pub fn interpolate(&mut self, collab: &mut Collaborators<'_>, fraction: f32) {
        self.ensure_entered(collab);
        if !self.driving {
            return;
        }
        let fraction = fraction.clamp(0.0, 1.0);
        self.with_active(collab, |state, ctx| state.interpolate(ctx, fraction));
        self.settle(collab);
    }

    /// Applies an inbound authoritative state.
    ///
    /// Cancels the current window and restarts it from the live transform,
    /// even mid-window.
    pub fn receive(&mut self, collab: &mut Collaborators<'_>, state: SyncState) {
        self.ensure_entered(collab);

        // No restart from enter_state; the window is reopened below.
        self.driving = false;

        let transition = self.change_owner(collab, state.owner_id);

        let index = usize::from(state.behavior_state_id);
        if index < self.states.len() {
            if index != self.active {
                self.enter_state(collab, index);
            }
        } else {
            let err = SyncError::UnknownState {
                object: self.object,
                index: state.behavior_state_id,
            };
            tracing::warn!("[sync] {err}, keeping {:?}", self.state_kind());
        }

        self.last_sync = state;

        if transition == OwnerTransition::Gained {
            self.take_over(collab);
        } else if !self.is_local_owner(collab) {
            self.restart_window(collab);
        }
        self.settle(collab);
    }

    /// Ownership notification from the transport, including "owner gone".
    pub fn set_owner(&mut self, collab: &mut Collaborators<'_>, owner: Option<PlayerId>) {
        self.ensure_entered(collab);
        match self.change_owner(collab, owner) {
            OwnerTransition::Gained => self.take_over(collab),
            // Local physics runs the body until the next state arrives.
            OwnerTransition::Lost | OwnerTransition::Moved => self.driving = false,
            OwnerTransition::Unchanged => {}
        }
        self.settle(collab);
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn index_of(&self, kind: BehaviorKind) -> Option<usize> {
        self.states.iter().position(|state| state.kind() == kind)
    }

    fn is_local_owner(&self, collab: &Collaborators<'_>) -> bool {
        self.is_owner(collab.transport.local_player())
    }

    fn check_owner(&self, collab: &Collaborators<'_>, operation: &str) -> Result<(), SyncError> {
        let local = collab.transport.local_player();
        if self.is_owner(local) {
            return Ok(());
        }
        tracing::warn!(
            object = self.object,
            player = local,
            owner = ?self.owner,
            "[sync] {operation} rejected, not owner"
        );
        Err(SyncError::NotOwner {
            object: self.object,
            local,
        })
    }

    /// Runs `f` against the active state with a freshly built context.
    fn with_active<R>(
        &mut self,
        collab: &mut Collaborators<'_>,
        f: impl FnOnce(&mut dyn BehaviorState, &mut StateContext<'_>) -> R,
    ) -> R {
        let is_owner = self.is_local_owner(collab);
        let mut ctx = StateContext::new(
            self.object,
            &mut *collab.body,
            collab.anchors,
            &mut self.window,
            &self.last_sync,
            &self.config,
            self.owner,
            is_owner,
            self.since_push,
            &mut self.commands,
        );
        f(self.states[self.active].as_mut(), &mut ctx)
    }

    fn ensure_entered(&mut self, collab: &mut Collaborators<'_>) {
        if self.entered {
            return;
        }
        self.entered = true;
        self.with_active(collab, |state, ctx| state.on_enter(ctx));
        self.apply_commands(collab);
    }

    /// Drains queued commands, then pushes if anything asked for it.
    fn settle(&mut self, collab: &mut Collaborators<'_>) {
        self.apply_commands(collab);
        self.flush(collab);
    }

    fn apply_commands(&mut self, collab: &mut Collaborators<'_>) {
        for _ in 0..MAX_COMMAND_ROUNDS {
            if self.commands.is_empty() {
                return;
            }
            let commands = std::mem::take(&mut self.commands);
            for command in commands {
                self.apply_command(collab, command);
            }
        }
        if !self.commands.is_empty() {
            tracing::warn!(
                object = self.object,
                dropped = self.commands.len(),
                "[sync] state commands did not settle"
            );
            self.commands.clear();
        }
    }

    fn apply_command(&mut self, collab: &mut Collaborators<'_>, command: StateCommand) {
        match command {
            StateCommand::SwitchTo(kind) => match self.index_of(kind) {
                Some(index) => self.enter_state(collab, index),
                None => {
                    let err = SyncError::MissingState {
                        object: self.object,
                        kind,
                    };
                    tracing::warn!("[sync] {err}");
                }
            },
            StateCommand::Resend => {
                if self.is_local_owner(collab) {
                    self.pending_push = true;
                }
            }
            StateCommand::Respawn => {
                if self.is_local_owner(collab) {
                    let spawn = Kinematics::at_rest(self.config.spawn);
                    if let Err(err) = self.teleport_inner(collab, spawn) {
                        tracing::warn!("[sync] respawn failed: {err}");
                    }
                }
            }
            StateCommand::ReportDesync(report) => {
                self.desync_count += 1;
                self.last_desync = Some(report);
                self.listeners.notify_desync(self.object, report);
            }
        }
    }

    fn enter_state(&mut self, collab: &mut Collaborators<'_>, index: usize) {
        if index == self.active {
            return;
        }
        let old = self.state_id();
        self.with_active(collab, |state, ctx| state.on_exit(ctx));
        self.active = index;
        self.epoch += 1;
        self.with_active(collab, |state, ctx| state.on_enter(ctx));

        let new = self.state_id();
        tracing::debug!(object = self.object, old, new, kind = ?self.state_kind(), "[sync] state changed");
        self.listeners.notify_state(self.object, old, new);

        if self.is_local_owner(collab) {
            self.pending_push = true;
        }
        if self.driving {
            self.restart_window(collab);
        }
    }

    fn change_owner(
        &mut self,
        collab: &mut Collaborators<'_>,
        owner: Option<PlayerId>,
    ) -> OwnerTransition {
        let old = self.owner;
        if old == owner {
            return OwnerTransition::Unchanged;
        }
        let local = collab.transport.local_player();
        self.owner = owner;
        tracing::info!(object = self.object, ?old, new = ?owner, "[sync] owner changed");
        self.listeners.notify_owner(self.object, old, owner);

        if owner == Some(local) {
            OwnerTransition::Gained
        } else if old == Some(local) {
            self.pending_push = false;
            self.pending_request = None;
            OwnerTransition::Lost
        } else {
            OwnerTransition::Moved
        }
    }

    /// First steps as the new owner.
    fn take_over(&mut self, collab: &mut Collaborators<'_>) {
        let destructive = self.pending_request.take() == Some(false);
        if destructive {
            collab.body.apply_kinematics(&self.last_sync.kinematics());
        }
        collab.body.wake_up();
        self.driving = false;
        self.since_push = 0.0;
        self.pending_push = true;
        tracing::info!(object = self.object, destructive, "[sync] took ownership");
    }

    /// Opens a window from the live body. The owner targets its own body,
    /// everyone else the last synced state.
    fn restart_window(&mut self, collab: &mut Collaborators<'_>) {
        let start = collab.body.kinematics();
        let target = if self.is_local_owner(collab) {
            start
        } else {
            self.last_sync.kinematics()
        };
        let duration = self.config.window_duration(collab.body.fixed_dt());
        self.window.open(start, target, duration);
        self.driving = true;
        self.with_active(collab, |state, ctx| state.on_interpolation_start(ctx));
    }

    fn step_window(&mut self, collab: &mut Collaborators<'_>, dt: f32) {
        if !self.driving {
            return;
        }
        if self.window.is_complete() {
            self.finish_window(collab);
            if !self.driving {
                return;
            }
        }
        self.window.advance(dt);
        let fraction = self.window.fraction();
        self.with_active(collab, |state, ctx| state.interpolate(ctx, fraction));
        self.apply_commands(collab);
    }

    fn finish_window(&mut self, collab: &mut Collaborators<'_>) {
        let epoch = self.epoch;
        let outcome = self.with_active(collab, |state, ctx| state.on_interpolation_end(ctx));
        self.apply_commands(collab);
        if self.epoch != epoch {
            // A state switch already reopened or released the window.
            return;
        }
        match outcome {
            WindowOutcome::Extend => {
                self.window.extend();
                self.with_active(collab, |state, ctx| state.on_interpolation_start(ctx));
                self.apply_commands(collab);
            }
            WindowOutcome::Release => self.driving = false,
        }
    }

    fn teleport_inner(
        &mut self,
        collab: &mut Collaborators<'_>,
        kinematics: Kinematics,
    ) -> Result<(), SyncError> {
        let index = self
            .index_of(BehaviorKind::Teleporting)
            .ok_or(SyncError::MissingState {
                object: self.object,
                kind: BehaviorKind::Teleporting,
            })?;
        let kinematics = Kinematics {
            rotation: kinematics.rotation.normalize(),
            ..kinematics
        };

        self.driving = false;
        self.enter_state(collab, index);
        collab.body.wake_up();
        collab.body.apply_kinematics(&kinematics);

        let duration = collab.body.fixed_dt().max(MIN_WINDOW_DURATION);
        self.window.open(kinematics, kinematics, duration);
        self.driving = true;
        self.with_active(collab, |state, ctx| state.on_interpolation_start(ctx));
        self.pending_push = true;
        tracing::info!(
            object = self.object,
            position = ?kinematics.position,
            "[sync] teleported"
        );
        Ok(())
    }

    /// Pushes the live state if a push is pending and we still own the object.
    fn flush(&mut self, collab: &mut Collaborators<'_>) {
        if !std::mem::take(&mut self.pending_push) || !self.is_local_owner(collab) {
            return;
        }
        let mut out = self.last_sync.clone();
        self.with_active(collab, |state, ctx| state.on_serialize(ctx, &mut out));
        // Commands from serialization are not acted on.
        self.commands.clear();
        out.behavior_state_id = self.state_id();
        out.owner_id = self.owner;

        collab.transport.push(self.object, &out);
        tracing::debug!(object = self.object, state = out.behavior_state_id, "[sync] pushed");
        self.last_sync = out;
        self.since_push = 0.0;
    }
}
