//! Bevy plugin for synchronized objects.
//!
//! Headless: registers resources, messages and `FixedUpdate` systems only, so
//! it runs under `MinimalPlugins` or a bare `App` in tests.

use bevy::prelude::*;

use crate::bevy::events::*;
use crate::bevy::resources::*;
use crate::bevy::systems;
use crate::sync::PlayerId;

/// System set the sync systems run in. Order the host's physics step before it.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct SmartSyncSet;

pub struct SmartSyncPlugin {
    pub local_player: PlayerId,
    /// Fixed simulation step in seconds.
    pub fixed_dt: f32,
}

impl Default for SmartSyncPlugin {
    fn default() -> Self {
        Self {
            local_player: 0,
            fixed_dt: 1.0 / 60.0,
        }
    }
}

impl Plugin for SmartSyncPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(Time::<Fixed>::from_seconds(f64::from(self.fixed_dt)));

        app.insert_resource(LocalPlayer(self.local_player))
            .init_resource::<SyncGravity>()
            .init_resource::<SyncOutbox>()
            .init_resource::<AnchorPoses>();

        app.add_message::<SyncStateReceived>()
            .add_message::<OwnershipChanged>()
            .add_message::<SmartObjectCommand>();

        app.add_systems(
            FixedUpdate,
            (
                systems::apply_inbound_sync,
                systems::apply_object_commands,
                systems::tick_smart_objects,
            )
                .chain()
                .in_set(SmartSyncSet),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bevy::components::BodyMotion;
    use crate::bevy::test_utils::TestApp;
    use crate::config::{PushPolicy, SyncConfig};
    use crate::state::BehaviorKind;
    use crate::sync::{Kinematics, Pose, SyncState};

    const LOCAL: PlayerId = 1;
    const REMOTE: PlayerId = 2;

    fn quiet() -> SyncConfig {
        SyncConfig {
            push_policy: PushPolicy::OnDemand,
            ..SyncConfig::default()
        }
    }

    #[test]
    fn test_plugin_registers_resources() {
        let app = TestApp::new(LOCAL);
        let world = app.app.world();
        assert_eq!(world.resource::<LocalPlayer>().0, LOCAL);
        assert!(world.get_resource::<SyncOutbox>().is_some());
        assert!(world.get_resource::<AnchorPoses>().is_some());
        let step = world.resource::<Time<Fixed>>().timestep().as_secs_f32();
        assert!((step - 1.0 / 60.0).abs() < 1e-6);
    }

    #[test]
    fn test_received_state_moves_remote_object() {
        let mut app = TestApp::new(LOCAL);
        let entity = app.spawn_object(5, quiet(), Vec3::ZERO);
        let target = Vec3::new(2.0, 0.0, 0.0);
        // World-locked targets the pose directly, without ballistic extrapolation.
        let state = SyncState::from_kinematics(
            Kinematics::at_rest(Pose::from_position(target)),
            3,
            Some(REMOTE),
        );

        app.send(SyncStateReceived { object: 5, state });
        app.step(20);

        assert!((app.transform(entity).translation - target).length() < 1e-4);
        let controller = &app.object(entity).controller;
        assert_eq!(controller.state_kind(), BehaviorKind::WorldLocked);
        assert_eq!(controller.owner(), Some(REMOTE));
        assert!(app.outbox().pushes.is_empty());
    }

    #[test]
    fn test_owner_teleport_lands_in_outbox() {
        let mut app = TestApp::new(LOCAL);
        let entity = app.spawn_object(9, quiet(), Vec3::new(0.0, 3.0, 0.0));

        app.send(OwnershipChanged {
            object: 9,
            owner: Some(LOCAL),
        });
        app.step(1);
        app.outbox().drain_pushes();

        let position = Vec3::new(-4.0, 2.0, 1.0);
        app.send(SmartObjectCommand {
            object: 9,
            command: ObjectCommand::Teleport {
                position,
                rotation: Quat::IDENTITY,
                linear_velocity: Vec3::ZERO,
                angular_velocity: Vec3::ZERO,
            },
        });
        app.step(1);

        assert_eq!(app.transform(entity).translation, position);
        let pushes = app.outbox().drain_pushes();
        let (object, state) = pushes.first().unwrap();
        assert_eq!(*object, 9);
        assert_eq!(state.position, position);
        assert_eq!(state.owner_id, Some(LOCAL));
    }

    #[test]
    fn test_non_owner_commands_are_dropped() {
        let mut app = TestApp::new(LOCAL);
        let entity = app.spawn_object(3, quiet(), Vec3::new(0.0, 1.0, 0.0));

        app.send(SmartObjectCommand {
            object: 3,
            command: ObjectCommand::Respawn,
        });
        app.send(SmartObjectCommand {
            object: 3,
            command: ObjectCommand::RequestOwnership {
                non_destructive: true,
            },
        });
        app.step(1);

        assert_eq!(app.transform(entity).translation, Vec3::new(0.0, 1.0, 0.0));
        let mut outbox = app.outbox();
        assert!(outbox.pushes.is_empty());
        assert_eq!(outbox.drain_requests().len(), 1);
    }

    #[test]
    fn test_attached_object_follows_anchor_resource() {
        let mut app = TestApp::new(LOCAL);
        let config = SyncConfig {
            playspace_offset: Pose::from_position(Vec3::new(0.0, 1.0, 0.0)),
            ..quiet()
        };
        let entity = app.spawn_object(4, config, Vec3::ZERO);
        app.app
            .world_mut()
            .resource_mut::<AnchorPoses>()
            .set_playspace(LOCAL, Pose::from_position(Vec3::new(3.0, 0.0, 0.0)));

        app.send(OwnershipChanged {
            object: 4,
            owner: Some(LOCAL),
        });
        app.send(SmartObjectCommand {
            object: 4,
            command: ObjectCommand::SetBehavior(BehaviorKind::PlayspaceAttachment),
        });
        app.step(20);

        assert!((app.transform(entity).translation - Vec3::new(3.0, 1.0, 0.0)).length() < 1e-4);
        let motion = *app.app.world().get::<BodyMotion>(entity).unwrap();
        assert!(motion.kinematic);
    }
}
