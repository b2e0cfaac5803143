//! Test utilities for headless Bevy integration tests.
//!
//! Provides `TestApp`, a bare `App` with `SmartSyncPlugin` whose fixed schedule
//! is run by hand, one step per call.

use bevy::prelude::*;

use crate::bevy::components::{BodyMotion, SmartObject};
use crate::bevy::plugin::SmartSyncPlugin;
use crate::bevy::resources::SyncOutbox;
use crate::config::SyncConfig;
use crate::controller::SyncController;
use crate::sync::{ObjectId, PlayerId};

pub(crate) const TEST_DT: f32 = 1.0 / 60.0;

pub(crate) struct TestApp {
    pub app: App,
}

impl TestApp {
    pub fn new(local: PlayerId) -> Self {
        let mut app = App::new();
        app.add_plugins(SmartSyncPlugin {
            local_player: local,
            fixed_dt: TEST_DT,
        });
        Self { app }
    }

    /// Spawns an object with the default behavior set at `position`.
    pub fn spawn_object(&mut self, object: ObjectId, config: SyncConfig, position: Vec3) -> Entity {
        let controller = SyncController::with_default_states(object, config).unwrap();
        self.app
            .world_mut()
            .spawn((
                SmartObject::new(controller),
                Transform::from_translation(position),
                BodyMotion::default(),
            ))
            .id()
    }

    pub fn send<M: Message>(&mut self, message: M) {
        self.app.world_mut().write_message(message);
    }

    /// Runs the sync systems `n` times.
    pub fn step(&mut self, n: usize) {
        for _ in 0..n {
            self.app.world_mut().run_schedule(FixedUpdate);
        }
    }

    pub fn transform(&self, entity: Entity) -> Transform {
        *self.app.world().get::<Transform>(entity).unwrap()
    }

    pub fn object(&self, entity: Entity) -> &SmartObject {
        self.app.world().get::<SmartObject>(entity).unwrap()
    }

    pub fn outbox(&mut self) -> Mut<'_, SyncOutbox> {
        self.app.world_mut().resource_mut::<SyncOutbox>()
    }
}
