//! Per-client physics using `Rapier3D`.
//!
//! Each simulated client owns a full `PhysicsWorld`, exactly like a real peer
//! would, and exposes its synchronized body to the controller through
//! [`RapierBody`].

use std::fmt;

use rapier3d::na::{Quaternion, UnitQuaternion};
use rapier3d::prelude::*;
use smart_sync_core::{PhysicsBody, Quat, Vec3};

/// Contact points farther apart than this do not count as touching.
const CONTACT_SLOP: f32 = 0.01;

/// Default gravity vector (downward, in m/s²).
pub fn default_gravity() -> Vector<Real> {
    vector![0.0, -9.81, 0.0]
}

pub fn to_na(v: Vec3) -> Vector<Real> {
    vector![v.x, v.y, v.z]
}

pub fn from_na(v: &Vector<Real>) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

pub fn to_na_rotation(q: Quat) -> UnitQuaternion<Real> {
    UnitQuaternion::new_normalize(Quaternion::new(q.w, q.x, q.y, q.z))
}

pub fn from_na_rotation(r: &UnitQuaternion<Real>) -> Quat {
    let q = r.quaternion();
    Quat::from_xyzw(q.i, q.j, q.k, q.w)
}

/// Physics world containing all `Rapier3D` components.
pub struct PhysicsWorld {
    pub rigid_body_set: RigidBodySet,
    pub collider_set: ColliderSet,
    pub integration_parameters: IntegrationParameters,
    pub physics_pipeline: PhysicsPipeline,
    pub island_manager: IslandManager,
    pub broad_phase: BroadPhaseBvh,
    pub narrow_phase: NarrowPhase,
    pub impulse_joint_set: ImpulseJointSet,
    pub multibody_joint_set: MultibodyJointSet,
    pub ccd_solver: CCDSolver,
    pub gravity: Vector<Real>,
    pub frame: u64,
}

impl fmt::Debug for PhysicsWorld {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhysicsWorld")
            .field("frame", &self.frame)
            .field("rigid_body_count", &self.rigid_body_set.len())
            .field("collider_count", &self.collider_set.len())
            .field("gravity", &self.gravity)
            .finish_non_exhaustive()
    }
}

impl PhysicsWorld {
    /// Creates a world stepping at `dt` seconds under default gravity.
    pub fn new(dt: f32) -> Self {
        Self::with_gravity(dt, default_gravity())
    }

    pub fn with_gravity(dt: f32, gravity: Vector<Real>) -> Self {
        let integration_parameters = IntegrationParameters {
            dt,
            ..Default::default()
        };

        Self {
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            integration_parameters,
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: BroadPhaseBvh::new(),
            narrow_phase: NarrowPhase::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            gravity,
            frame: 0,
        }
    }

    /// Advances the simulation by one fixed timestep.
    pub fn step(&mut self) {
        self.physics_pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            &(),
            &(),
        );
        self.frame += 1;
    }

    pub fn step_n(&mut self, n: u32) {
        for _ in 0..n {
            self.step();
        }
    }

    pub fn add_rigid_body(&mut self, rigid_body: RigidBody) -> RigidBodyHandle {
        self.rigid_body_set.insert(rigid_body)
    }

    /// Adds a collider attached to a rigid body.
    pub fn add_collider(&mut self, collider: Collider, parent: RigidBodyHandle) -> ColliderHandle {
        self.collider_set
            .insert_with_parent(collider, parent, &mut self.rigid_body_set)
    }

    /// Adds a collider without a parent (static collider).
    pub fn add_static_collider(&mut self, collider: Collider) -> ColliderHandle {
        self.collider_set.insert(collider)
    }

    /// Static floor slab whose top face sits at `height`.
    pub fn add_ground(&mut self, height: f32) -> ColliderHandle {
        let ground = ColliderBuilder::cuboid(50.0, 0.5, 50.0)
            .translation(vector![0.0, height - 0.5, 0.0])
            .friction(0.8)
            .build();
        self.add_static_collider(ground)
    }

    /// Dynamic ball with CCD, the shape every scenario throws around.
    pub fn spawn_ball(&mut self, position: Vec3, radius: f32) -> BodyHandles {
        let body = RigidBodyBuilder::dynamic()
            .translation(to_na(position))
            .ccd_enabled(true)
            .build();
        let body = self.add_rigid_body(body);
        let collider = ColliderBuilder::ball(radius)
            .restitution(0.0)
            .friction(0.8)
            .density(1.0)
            .build();
        let collider = self.add_collider(collider, body);
        BodyHandles { body, collider }
    }

    pub fn get_rigid_body(&self, handle: RigidBodyHandle) -> Option<&RigidBody> {
        self.rigid_body_set.get(handle)
    }

    /// Borrows a body through the controller-facing adapter. `None` when
    /// either handle is stale.
    pub fn body(&mut self, handles: BodyHandles) -> Option<RapierBody<'_>> {
        if self.rigid_body_set.contains(handles.body) && self.collider_set.contains(handles.collider) {
            Some(RapierBody {
                world: self,
                handles,
            })
        } else {
            None
        }
    }

    /// Whether `collider` is in contact with anything. Speculative points
    /// further than a centimeter out are ignored.
    pub fn touches_anything(&self, collider: ColliderHandle) -> bool {
        self.narrow_phase.contact_pairs_with(collider).any(|pair| {
            pair.manifolds
                .iter()
                .flat_map(|manifold| manifold.points.iter())
                .any(|point| point.dist <= CONTACT_SLOP)
        })
    }
}

/// Rigid body plus its single collider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BodyHandles {
    pub body: RigidBodyHandle,
    pub collider: ColliderHandle,
}

/// [`PhysicsBody`] over one body of a [`PhysicsWorld`].
pub struct RapierBody<'a> {
    world: &'a mut PhysicsWorld,
    handles: BodyHandles,
}

impl RapierBody<'_> {
    fn rb(&self) -> &RigidBody {
        &self.world.rigid_body_set[self.handles.body]
    }

    fn rb_mut(&mut self) -> &mut RigidBody {
        &mut self.world.rigid_body_set[self.handles.body]
    }
}

impl PhysicsBody for RapierBody<'_> {
    fn position(&self) -> Vec3 {
        from_na(self.rb().translation())
    }

    fn rotation(&self) -> Quat {
        from_na_rotation(self.rb().rotation())
    }

    fn linear_velocity(&self) -> Vec3 {
        from_na(self.rb().linvel())
    }

    fn angular_velocity(&self) -> Vec3 {
        from_na(self.rb().angvel())
    }

    fn set_position(&mut self, position: Vec3) {
        self.rb_mut().set_translation(to_na(position), true);
    }

    fn set_rotation(&mut self, rotation: Quat) {
        self.rb_mut().set_rotation(to_na_rotation(rotation), true);
    }

    fn set_linear_velocity(&mut self, velocity: Vec3) {
        self.rb_mut().set_linvel(to_na(velocity), true);
    }

    fn set_angular_velocity(&mut self, velocity: Vec3) {
        self.rb_mut().set_angvel(to_na(velocity), true);
    }

    fn is_sleeping(&self) -> bool {
        self.rb().is_sleeping()
    }

    fn sleep(&mut self) {
        self.rb_mut().sleep();
    }

    fn wake_up(&mut self) {
        self.rb_mut().wake_up(true);
    }

    fn is_grounded(&self) -> bool {
        self.world.touches_anything(self.handles.collider)
    }

    fn set_kinematic(&mut self, kinematic: bool) {
        let body_type = if kinematic {
            RigidBodyType::KinematicPositionBased
        } else {
            RigidBodyType::Dynamic
        };
        if self.rb().body_type() != body_type {
            self.rb_mut().set_body_type(body_type, true);
        }
    }

    fn gravity(&self) -> Vec3 {
        from_na(&self.world.gravity)
    }

    fn fixed_dt(&self) -> f32 {
        self.world.integration_parameters.dt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    fn world_with_ball(height: f32) -> (PhysicsWorld, BodyHandles) {
        let mut world = PhysicsWorld::new(DT);
        world.add_ground(0.0);
        let ball = world.spawn_ball(Vec3::new(0.0, height, 0.0), 0.25);
        (world, ball)
    }

    #[test]
    fn test_rotation_conversion_preserves_quaternion() {
        let q = Quat::from_rotation_y(0.7) * Quat::from_rotation_x(-0.3);
        let back = from_na_rotation(&to_na_rotation(q));
        assert!(q.dot(back).abs() > 1.0 - 1e-6);
    }

    #[test]
    fn test_ball_falls_and_lands() {
        let (mut world, ball) = world_with_ball(2.0);
        world.step_n(10);
        {
            let body = world.body(ball).unwrap();
            assert!(body.position().y < 2.0);
            assert!(body.linear_velocity().y < 0.0);
            assert!(!body.is_grounded());
        }

        world.step_n(120);
        let body = world.body(ball).unwrap();
        assert!((body.position().y - 0.25).abs() < 0.05);
        assert!(body.is_grounded());
    }

    #[test]
    fn test_pose_writes_reach_rapier() {
        let (mut world, ball) = world_with_ball(1.0);
        let mut body = world.body(ball).unwrap();
        body.set_position(Vec3::new(3.0, 4.0, 5.0));
        body.set_linear_velocity(Vec3::new(1.0, 0.0, 0.0));

        assert_eq!(body.position(), Vec3::new(3.0, 4.0, 5.0));
        assert_eq!(body.linear_velocity(), Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(body.gravity(), Vec3::new(0.0, -9.81, 0.0));
        assert!((body.fixed_dt() - DT).abs() < f32::EPSILON);
    }

    #[test]
    fn test_kinematic_body_ignores_gravity() {
        let (mut world, ball) = world_with_ball(3.0);
        world.body(ball).unwrap().set_kinematic(true);
        world.step_n(30);
        assert!((world.body(ball).unwrap().position().y - 3.0).abs() < 1e-5);

        world.body(ball).unwrap().set_kinematic(false);
        world.step_n(30);
        assert!(world.body(ball).unwrap().position().y < 3.0);
    }

    #[test]
    fn test_sleeping_body_stays_put() {
        let (mut world, ball) = world_with_ball(3.0);
        world.step();
        let resting_at = {
            let mut body = world.body(ball).unwrap();
            body.sleep();
            body.position()
        };
        world.step_n(30);
        let body = world.body(ball).unwrap();
        assert!(body.is_sleeping());
        assert!((body.position() - resting_at).length() < 1e-5);
    }

    #[test]
    fn test_stale_handles_are_rejected() {
        let (mut world, ball) = world_with_ball(1.0);
        world.rigid_body_set.remove(
            ball.body,
            &mut world.island_manager,
            &mut world.collider_set,
            &mut world.impulse_joint_set,
            &mut world.multibody_joint_set,
            true,
        );
        assert!(world.body(ball).is_none());
    }
}
