//! ECS Components for synchronized objects.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::controller::SyncController;
use crate::physics::PhysicsBody;

/// A replicated physics object.
#[derive(Component, Debug)]
pub struct SmartObject {
    pub controller: SyncController,
}

impl SmartObject {
    pub fn new(controller: SyncController) -> Self {
        Self { controller }
    }
}

/// Rigid-body state the host's physics keeps next to the `Transform`.
#[derive(Component, Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BodyMotion {
    pub linear_velocity: Vec3,
    /// World-space angular velocity (radians/sec).
    pub angular_velocity: Vec3,
    pub sleeping: bool,
    pub grounded: bool,
    pub kinematic: bool,
}

/// [`PhysicsBody`] view over an entity's `Transform` and [`BodyMotion`].
pub struct TransformBody<'a> {
    pub transform: &'a mut Transform,
    pub motion: &'a mut BodyMotion,
    pub gravity: Vec3,
    pub fixed_dt: f32,
}

impl PhysicsBody for TransformBody<'_> {
    fn position(&self) -> Vec3 {
        self.transform.translation
    }

    fn rotation(&self) -> Quat {
        self.transform.rotation
    }

    fn linear_velocity(&self) -> Vec3 {
        self.motion.linear_velocity
    }

    fn angular_velocity(&self) -> Vec3 {
        self.motion.angular_velocity
    }

    fn set_position(&mut self, position: Vec3) {
        self.transform.translation = position;
    }

    fn set_rotation(&mut self, rotation: Quat) {
        self.transform.rotation = rotation;
    }

    fn set_linear_velocity(&mut self, velocity: Vec3) {
        self.motion.linear_velocity = velocity;
    }

    fn set_angular_velocity(&mut self, velocity: Vec3) {
        self.motion.angular_velocity = velocity;
    }

    fn is_sleeping(&self) -> bool {
        self.motion.sleeping
    }

    fn sleep(&mut self) {
        self.motion.sleeping = true;
    }

    fn wake_up(&mut self) {
        self.motion.sleeping = false;
    }

    fn is_grounded(&self) -> bool {
        self.motion.grounded
    }

    fn set_kinematic(&mut self, kinematic: bool) {
        self.motion.kinematic = kinematic;
    }

    fn gravity(&self) -> Vec3 {
        self.gravity
    }

    fn fixed_dt(&self) -> f32 {
        self.fixed_dt
    }
}
