//! One simulated peer: its own physics world, controller and network endpoint.

use std::sync::Arc;

use parking_lot::Mutex;
use rapier3d::prelude::RigidBody;
use smart_sync_core::{
    Collaborators, DesyncReport, Kinematics, ListenerHandle, NoAnchors, ObjectId, PlayerId,
    StateIndex, SyncConfig, SyncController, SyncError, SyncListener, Vec3,
};

use crate::network::{Endpoint, WirePacket};
use crate::world::{BodyHandles, PhysicsWorld, from_na, from_na_rotation};

/// What a client's controller reported through its listener.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClientEvent {
    Owner {
        old: Option<PlayerId>,
        new: Option<PlayerId>,
    },
    State {
        old: StateIndex,
        new: StateIndex,
    },
    Desync(DesyncReport),
}

/// Listener collecting every callback in order.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Mutex<Vec<ClientEvent>>,
}

impl EventLog {
    pub fn events(&self) -> Vec<ClientEvent> {
        self.events.lock().clone()
    }

    pub fn count(&self, matches: impl Fn(&ClientEvent) -> bool) -> usize {
        self.events.lock().iter().filter(|event| matches(event)).count()
    }
}

impl SyncListener for EventLog {
    fn on_change_owner(&self, _object: ObjectId, old: Option<PlayerId>, new: Option<PlayerId>) {
        self.events.lock().push(ClientEvent::Owner { old, new });
    }

    fn on_change_state(&self, _object: ObjectId, old: StateIndex, new: StateIndex) {
        self.events.lock().push(ClientEvent::State { old, new });
    }

    fn on_desync(&self, _object: ObjectId, report: DesyncReport) {
        self.events.lock().push(ClientEvent::Desync(report));
    }
}

pub struct SimClient {
    id: PlayerId,
    object: ObjectId,
    world: PhysicsWorld,
    ball: BodyHandles,
    controller: SyncController,
    endpoint: Endpoint,
    anchors: NoAnchors,
    log: Arc<EventLog>,
    _listener: ListenerHandle,
}

impl SimClient {
    /// Builds a client with a floor at height zero and the object's ball at
    /// `spawn`.
    pub fn new(
        id: PlayerId,
        object: ObjectId,
        config: SyncConfig,
        fixed_dt: f32,
        spawn: Vec3,
        radius: f32,
    ) -> Result<Self, SyncError> {
        let mut world = PhysicsWorld::new(fixed_dt);
        world.add_ground(0.0);
        let ball = world.spawn_ball(spawn, radius);

        let mut controller = SyncController::with_default_states(object, config)?;
        let log = Arc::new(EventLog::default());
        let listener = controller.add_listener(&log);

        Ok(Self {
            id,
            object,
            world,
            ball,
            controller,
            endpoint: Endpoint::new(id),
            anchors: NoAnchors,
            log,
            _listener: listener,
        })
    }

    pub fn id(&self) -> PlayerId {
        self.id
    }

    pub fn controller(&self) -> &SyncController {
        &self.controller
    }

    pub fn log(&self) -> &Arc<EventLog> {
        &self.log
    }

    pub fn is_owner(&self) -> bool {
        self.controller.is_owner(self.id)
    }

    /// Live pose and velocities of the synchronized ball.
    pub fn kinematics(&self) -> Option<Kinematics> {
        let body = self.world.get_rigid_body(self.ball.body)?;
        Some(Kinematics {
            position: from_na(body.translation()),
            rotation: from_na_rotation(body.rotation()),
            linear_velocity: from_na(body.linvel()),
            angular_velocity: from_na(body.angvel()),
        })
    }

    /// Whether Rapier has put the synchronized ball to sleep.
    pub fn is_resting(&self) -> bool {
        self.world
            .get_rigid_body(self.ball.body)
            .is_some_and(RigidBody::is_sleeping)
    }

    /// Steps physics, then the controller.
    pub fn step(&mut self) {
        self.world.step();
        let dt = self.world.integration_parameters.dt;
        self.run(|controller, collab| controller.tick(collab, dt));
    }

    pub fn request_ownership(&mut self, non_destructive: bool) {
        self.run(|controller, collab| controller.request_ownership(collab, non_destructive));
    }

    pub fn handle(&mut self, packet: WirePacket) {
        match packet {
            WirePacket::State { object, state } if object == self.object => {
                self.run(|controller, collab| controller.receive(collab, state));
            }
            WirePacket::OwnerChanged { object, owner } if object == self.object => {
                self.run(|controller, collab| controller.set_owner(collab, owner));
            }
            WirePacket::OwnershipRequest(request) => {
                tracing::warn!(player = self.id, ?request, "[net] client got an ownership request");
            }
            WirePacket::State { object, .. } | WirePacket::OwnerChanged { object, .. } => {
                tracing::debug!(player = self.id, object, "[net] packet for unknown object");
            }
        }
    }

    pub fn drain_outgoing(&mut self) -> Vec<WirePacket> {
        self.endpoint.drain()
    }

    fn run<R>(
        &mut self,
        f: impl FnOnce(&mut SyncController, &mut Collaborators<'_>) -> R,
    ) -> Option<R> {
        let Some(mut body) = self.world.body(self.ball) else {
            tracing::error!(player = self.id, "[sim] synchronized body is gone");
            return None;
        };
        let mut collab = Collaborators::new(&mut body, &self.anchors, &mut self.endpoint);
        Some(f(&mut self.controller, &mut collab))
    }
}
