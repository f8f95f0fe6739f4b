use std::sync::Arc;

use glam::{Quat, Vec3};
use rapier3d::prelude::*;

use super::hooks::WheelContactFilter;
use super::step::{StepBuffers, StepOutput};
use super::Transform;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SetupError {
    #[error("rigid body {0:?} does not exist")]
    UnknownBody(RigidBodyHandle),
    #[error("collider {0:?} does not exist")]
    UnknownCollider(ColliderHandle),
}

pub struct PhysicsWorld {
    pipeline: PhysicsPipeline,
    integration_parameters: IntegrationParameters,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    pub bodies: RigidBodySet,
    pub colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    gravity: Vector,
    contact_filter: WheelContactFilter,
    step_buffers: Arc<StepBuffers>,
    step_count: u32,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsWorld {
    pub const TICK_RATE: Real = 1.0 / 60.0;

    pub fn new() -> Self {
        let mut integration_parameters = IntegrationParameters::default();
        integration_parameters.dt = Self::TICK_RATE;
        integration_parameters.min_ccd_dt = Self::TICK_RATE / 100.0;

        Self {
            pipeline: PhysicsPipeline::new(),
            integration_parameters,
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            gravity: Vector::new(0.0, -9.81, 0.0),
            contact_filter: WheelContactFilter::new(),
            step_buffers: Arc::new(StepBuffers::new()),
            step_count: 0,
        }
    }

    pub fn dt(&self) -> f32 {
        self.integration_parameters.dt
    }

    pub fn step(&mut self) {
        self.step_with(|_, _| {});
    }

    /// Steps the simulation, handing the chassis published through the step
    /// buffers to `pre_step` first.
    pub fn step_with<F>(&mut self, mut pre_step: F)
    where
        F: FnMut(&mut RigidBody, f32),
    {
        let dt = self.integration_parameters.dt;

        if let Some(body) = self
            .step_buffers
            .current_input()
            .and_then(|handle| self.bodies.get_mut(handle))
        {
            pre_step(body, dt);
        }

        self.pipeline.step(
            self.gravity,
            &self.integration_parameters,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            &self.contact_filter,
            &(),
        );

        self.step_count = self.step_count.wrapping_add(1);
        self.step_buffers.publish_output(StepOutput {
            delta_time: dt,
            step: self.step_count,
        });
    }

    pub fn step_buffers(&self) -> Arc<StepBuffers> {
        Arc::clone(&self.step_buffers)
    }

    /// Delta time of the most recent step. For display only.
    pub fn last_step_delta(&self) -> f32 {
        self.step_buffers.latest_output().delta_time
    }

    pub fn add_ground(&mut self, y: Real, half_size: Real) -> ColliderHandle {
        let collider = ColliderBuilder::cuboid(half_size, 0.1, half_size)
            .translation(Vector::new(0.0, y, 0.0))
            .build();
        self.colliders.insert(collider)
    }

    pub fn add_dynamic_box(
        &mut self,
        position: Vec3,
        half_extents: Vec3,
        mass: Real,
    ) -> (RigidBodyHandle, ColliderHandle) {
        let body = RigidBodyBuilder::dynamic()
            .translation(Vector::new(position.x, position.y, position.z))
            .ccd_enabled(true)
            .build();

        let handle = self.bodies.insert(body);

        let collider = ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
            .mass(mass)
            .friction(0.5)
            .restitution(0.1)
            .build();

        let collider = self
            .colliders
            .insert_with_parent(collider, handle, &mut self.bodies);

        (handle, collider)
    }

    pub fn add_dynamic_sphere(
        &mut self,
        position: Vec3,
        radius: f32,
        mass: f32,
    ) -> (RigidBodyHandle, ColliderHandle) {
        let body = RigidBodyBuilder::dynamic()
            .translation(Vector::new(position.x, position.y, position.z))
            .ccd_enabled(true)
            .build();
        let handle = self.bodies.insert(body);
        let collider = ColliderBuilder::ball(radius)
            .mass(mass)
            .friction(1.0)
            .restitution(0.0)
            .build();
        let collider = self
            .colliders
            .insert_with_parent(collider, handle, &mut self.bodies);
        (handle, collider)
    }

    /// Stops contacts between `chassis` and every collider in `wheels`.
    ///
    /// All handles are validated before anything changes; one bad handle
    /// fails the batch and the previous wheel list stays in effect.
    pub fn set_disabled_collisions(
        &mut self,
        chassis: RigidBodyHandle,
        wheels: &[ColliderHandle],
    ) -> Result<(), SetupError> {
        if !self.bodies.contains(chassis) {
            return Err(SetupError::UnknownBody(chassis));
        }
        if let Some(missing) = wheels.iter().find(|h| !self.colliders.contains(**h)) {
            return Err(SetupError::UnknownCollider(*missing));
        }

        for &handle in wheels {
            if let Some(collider) = self.colliders.get_mut(handle) {
                collider.set_active_hooks(ActiveHooks::FILTER_CONTACT_PAIRS);
            }
        }

        self.contact_filter.replace(chassis, wheels.to_vec());
        Ok(())
    }

    pub fn contact_filter(&self) -> &WheelContactFilter {
        &self.contact_filter
    }

    pub fn body_transform(&self, handle: RigidBodyHandle) -> Option<Transform> {
        self.bodies.get(handle).map(|b| {
            let t = b.translation();
            let r = b.rotation();
            Transform::new(
                Vec3::new(t.x, t.y, t.z),
                Quat::from_xyzw(r.x, r.y, r.z, r.w).normalize(),
            )
        })
    }

    pub fn set_body_transform(
        &mut self,
        handle: RigidBodyHandle,
        transform: Transform,
        teleport: bool,
    ) {
        if let Some(body) = self.bodies.get_mut(handle) {
            let p = transform.position;
            let q = transform.rotation;
            let rot = Rotation::from_xyzw(q.x, q.y, q.z, q.w).normalize();
            let new_pose = Pose::from_parts(Vector::new(p.x, p.y, p.z), rot);
            body.set_position(new_pose, true);
            if teleport {
                body.reset_forces(true);
                body.reset_torques(true);
            }
        }
    }

    pub fn body_velocity(&self, handle: RigidBodyHandle) -> Option<Vec3> {
        self.bodies.get(handle).map(|b| {
            let v = b.linvel();
            Vec3::new(v.x, v.y, v.z)
        })
    }

    pub fn set_body_velocity(&mut self, handle: RigidBodyHandle, velocity: Vec3) {
        if let Some(body) = self.bodies.get_mut(handle) {
            body.set_linvel(Vector::new(velocity.x, velocity.y, velocity.z), true);
        }
    }

    pub fn body_angular_velocity(&self, handle: RigidBodyHandle) -> Option<Vec3> {
        self.bodies.get(handle).map(|b| {
            let w = b.angvel();
            Vec3::new(w.x, w.y, w.z)
        })
    }

    pub fn set_body_angular_velocity(&mut self, handle: RigidBodyHandle, velocity: Vec3) {
        if let Some(body) = self.bodies.get_mut(handle) {
            body.set_angvel(Vector::new(velocity.x, velocity.y, velocity.z), true);
        }
    }

    pub fn is_body_awake(&self, handle: RigidBodyHandle) -> bool {
        self.bodies.get(handle).is_some_and(|b| !b.is_sleeping())
    }

    pub fn sleep_body(&mut self, handle: RigidBodyHandle) {
        if let Some(body) = self.bodies.get_mut(handle) {
            body.sleep();
        }
    }

    pub fn wake_body(&mut self, handle: RigidBodyHandle) {
        if let Some(body) = self.bodies.get_mut(handle) {
            body.wake_up(true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_collisions_fail_as_a_batch() {
        let mut world = PhysicsWorld::new();
        let (chassis, _) = world.add_dynamic_box(Vec3::new(0.0, 2.0, 0.0), Vec3::ONE, 100.0);
        let (_, wheel_a) = world.add_dynamic_sphere(Vec3::new(1.0, 1.0, 1.0), 0.4, 10.0);
        let (_, wheel_b) = world.add_dynamic_sphere(Vec3::new(-1.0, 1.0, 1.0), 0.4, 10.0);

        world.set_disabled_collisions(chassis, &[wheel_a]).unwrap();

        let bogus = ColliderHandle::from_raw_parts(999, 0);
        let result = world.set_disabled_collisions(chassis, &[wheel_b, bogus]);

        assert_eq!(result, Err(SetupError::UnknownCollider(bogus)));
        assert_eq!(world.contact_filter().wheels(), &[wheel_a]);
    }

    #[test]
    fn disabled_collisions_replace_previous_list() {
        let mut world = PhysicsWorld::new();
        let (chassis, _) = world.add_dynamic_box(Vec3::new(0.0, 2.0, 0.0), Vec3::ONE, 100.0);
        let (_, wheel_a) = world.add_dynamic_sphere(Vec3::new(1.0, 1.0, 1.0), 0.4, 10.0);
        let (_, wheel_b) = world.add_dynamic_sphere(Vec3::new(-1.0, 1.0, 1.0), 0.4, 10.0);

        world.set_disabled_collisions(chassis, &[wheel_a]).unwrap();
        world.set_disabled_collisions(chassis, &[wheel_b]).unwrap();

        assert_eq!(world.contact_filter().wheels(), &[wheel_b]);
    }

    #[test]
    fn step_publishes_output() {
        let mut world = PhysicsWorld::new();
        world.step();
        world.step();

        let output = world.step_buffers().latest_output();
        assert_eq!(output.step, 2);
        assert!((world.last_step_delta() - PhysicsWorld::TICK_RATE).abs() < f32::EPSILON);
    }

    #[test]
    fn pre_step_sees_published_chassis() {
        let mut world = PhysicsWorld::new();
        let (chassis, _) = world.add_dynamic_box(Vec3::new(0.0, 2.0, 0.0), Vec3::ONE, 100.0);

        let mut calls = 0;
        world.step_with(|_, _| calls += 1);
        assert_eq!(calls, 0);

        world.step_buffers().publish_input(Some(chassis));
        world.step_with(|_, dt| {
            calls += 1;
            assert!(dt > 0.0);
        });
        assert_eq!(calls, 1);
    }
}
