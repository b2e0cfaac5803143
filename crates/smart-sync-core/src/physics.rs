//! Rigid-body collaborator.
//!
//! The core never integrates physics itself. The host engine hands it a body
//! through this trait for the duration of one call.

use bevy::math::{Quat, Vec3};

use crate::sync::{Kinematics, Pose};

pub trait PhysicsBody {
    fn position(&self) -> Vec3;
    fn rotation(&self) -> Quat;
    fn linear_velocity(&self) -> Vec3;
    /// World-space angular velocity (radians/sec).
    fn angular_velocity(&self) -> Vec3;

    fn set_position(&mut self, position: Vec3);
    fn set_rotation(&mut self, rotation: Quat);
    fn set_linear_velocity(&mut self, velocity: Vec3);
    fn set_angular_velocity(&mut self, velocity: Vec3);

    fn is_sleeping(&self) -> bool;
    /// Deactivates simulation for this body until something wakes it.
    fn sleep(&mut self);
    fn wake_up(&mut self);

    /// Whether the body currently rests on or touches something.
    fn is_grounded(&self) -> bool;

    /// Switches between kinematic (driven by pose writes) and dynamic.
    fn set_kinematic(&mut self, kinematic: bool);

    fn gravity(&self) -> Vec3;
    /// Fixed simulation tick in seconds.
    fn fixed_dt(&self) -> f32;

    fn kinematics(&self) -> Kinematics {
        Kinematics {
            position: self.position(),
            rotation: self.rotation(),
            linear_velocity: self.linear_velocity(),
            angular_velocity: self.angular_velocity(),
        }
    }

    fn apply_kinematics(&mut self, kinematics: &Kinematics) {
        self.set_position(kinematics.position);
        self.set_rotation(kinematics.rotation);
        self.set_linear_velocity(kinematics.linear_velocity);
        self.set_angular_velocity(kinematics.angular_velocity);
    }

    fn set_pose(&mut self, pose: Pose) {
        self.set_position(pose.position);
        self.set_rotation(pose.rotation);
    }

    fn zero_velocity(&mut self) {
        self.set_linear_velocity(Vec3::ZERO);
        self.set_angular_velocity(Vec3::ZERO);
    }
}
