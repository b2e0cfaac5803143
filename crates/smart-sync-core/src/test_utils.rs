//! Test doubles for the collaborator traits.

use std::collections::HashMap;

use bevy::math::{Quat, Vec3};
use parking_lot::Mutex;

use crate::anchor::{AnchorProvider, Bone};
use crate::listener::{DesyncReport, SyncListener};
use crate::physics::PhysicsBody;
use crate::sync::{ObjectId, PlayerId, Pose, StateIndex, SyncState};
use crate::transport::{OwnershipRequest, Transport};

pub(crate) const TEST_DT: f32 = 1.0 / 60.0;

/// Point mass with explicit Euler integration and no collisions.
#[derive(Debug, Clone)]
pub(crate) struct TestBody {
    pub position: Vec3,
    pub rotation: Quat,
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
    pub sleeping: bool,
    pub grounded: bool,
    pub kinematic: bool,
    pub gravity: Vec3,
    pub fixed_dt: f32,
}

impl Default for TestBody {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            sleeping: false,
            grounded: false,
            kinematic: false,
            gravity: Vec3::new(0.0, -9.81, 0.0),
            fixed_dt: TEST_DT,
        }
    }
}

impl TestBody {
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    pub fn is_kinematic(&self) -> bool {
        self.kinematic
    }

    /// One physics tick.
    pub fn step(&mut self) {
        if self.sleeping || self.kinematic {
            return;
        }
        self.linear_velocity += self.gravity * TEST_DT;
        self.position += self.linear_velocity * TEST_DT;
        self.rotation =
            (Quat::from_scaled_axis(self.angular_velocity * TEST_DT) * self.rotation).normalize();
    }
}

impl PhysicsBody for TestBody {
    fn position(&self) -> Vec3 {
        self.position
    }

    fn rotation(&self) -> Quat {
        self.rotation
    }

    fn linear_velocity(&self) -> Vec3 {
        self.linear_velocity
    }

    fn angular_velocity(&self) -> Vec3 {
        self.angular_velocity
    }

    fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    fn set_rotation(&mut self, rotation: Quat) {
        self.rotation = rotation;
    }

    fn set_linear_velocity(&mut self, velocity: Vec3) {
        self.linear_velocity = velocity;
    }

    fn set_angular_velocity(&mut self, velocity: Vec3) {
        self.angular_velocity = velocity;
    }

    fn is_sleeping(&self) -> bool {
        self.sleeping
    }

    fn sleep(&mut self) {
        self.sleeping = true;
    }

    fn wake_up(&mut self) {
        self.sleeping = false;
    }

    fn is_grounded(&self) -> bool {
        self.grounded
    }

    fn set_kinematic(&mut self, kinematic: bool) {
        self.kinematic = kinematic;
    }

    fn gravity(&self) -> Vec3 {
        self.gravity
    }

    fn fixed_dt(&self) -> f32 {
        self.fixed_dt
    }
}

#[derive(Debug, Default, Clone)]
pub(crate) struct TestAnchors {
    bones: HashMap<(PlayerId, Bone), Pose>,
    playspaces: HashMap<PlayerId, Pose>,
}

impl TestAnchors {
    pub fn set_bone(&mut self, player: PlayerId, bone: Bone, pose: Pose) {
        self.bones.insert((player, bone), pose);
    }

    pub fn set_playspace(&mut self, player: PlayerId, pose: Pose) {
        self.playspaces.insert(player, pose);
    }
}

impl AnchorProvider for TestAnchors {
    fn bone_pose(&self, player: PlayerId, bone: Bone) -> Option<Pose> {
        self.bones.get(&(player, bone)).copied()
    }

    fn playspace_pose(&self, player: PlayerId) -> Option<Pose> {
        self.playspaces.get(&player).copied()
    }
}

#[derive(Debug, Clone)]
pub(crate) struct RecordingTransport {
    pub local: PlayerId,
    pub pushes: Vec<(ObjectId, SyncState)>,
    pub requests: Vec<OwnershipRequest>,
}

impl RecordingTransport {
    pub fn new(local: PlayerId) -> Self {
        Self {
            local,
            pushes: Vec::new(),
            requests: Vec::new(),
        }
    }

    pub fn last_push(&self) -> Option<&SyncState> {
        self.pushes.last().map(|(_, state)| state)
    }
}

impl Transport for RecordingTransport {
    fn local_player(&self) -> PlayerId {
        self.local
    }

    fn push(&mut self, object: ObjectId, state: &SyncState) {
        self.pushes.push((object, state.clone()));
    }

    fn request_ownership(&mut self, request: OwnershipRequest) {
        self.requests.push(request);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ListenerEvent {
    Owner(ObjectId, Option<PlayerId>, Option<PlayerId>),
    State(ObjectId, StateIndex, StateIndex),
    Desync(ObjectId, DesyncReport),
}

#[derive(Debug, Default)]
pub(crate) struct RecordingListener {
    events: Mutex<Vec<ListenerEvent>>,
}

impl RecordingListener {
    pub fn events(&self) -> Vec<ListenerEvent> {
        self.events.lock().clone()
    }
}

impl SyncListener for RecordingListener {
    fn on_change_owner(&self, object: ObjectId, old: Option<PlayerId>, new: Option<PlayerId>) {
        self.events.lock().push(ListenerEvent::Owner(object, old, new));
    }

    fn on_change_state(&self, object: ObjectId, old: StateIndex, new: StateIndex) {
        self.events.lock().push(ListenerEvent::State(object, old, new));
    }

    fn on_desync(&self, object: ObjectId, report: DesyncReport) {
        self.events.lock().push(ListenerEvent::Desync(object, report));
    }
}
