use glam::Vec3;
use rapier3d::prelude::{ColliderHandle, RigidBodyHandle};

use super::wheels::{Wheel, WheelRequests};
use super::world::{PhysicsWorld, SetupError};
use super::{Transform, VehicleBody};

#[derive(Debug, Clone)]
pub struct RigDesc {
    pub chassis_half_extents: Vec3,
    pub chassis_mass: f32,
    pub wheel_offsets: Vec<Vec3>,
    pub wheel_radius: f32,
    pub wheel_mass: f32,
}

impl Default for RigDesc {
    fn default() -> Self {
        Self {
            chassis_half_extents: Vec3::new(1.0, 0.4, 2.0),
            chassis_mass: 1200.0,
            wheel_offsets: vec![
                Vec3::new(0.9, -0.5, 1.4),
                Vec3::new(-0.9, -0.5, 1.4),
                Vec3::new(0.9, -0.5, -1.4),
                Vec3::new(-0.9, -0.5, -1.4),
            ],
            wheel_radius: 0.35,
            wheel_mass: 20.0,
        }
    }
}

/// Chassis plus wheel bodies living in one [`PhysicsWorld`].
#[derive(Debug, Clone)]
pub struct VehicleRig {
    pub chassis: RigidBodyHandle,
    pub chassis_collider: ColliderHandle,
    pub wheels: Vec<Wheel>,
}

impl VehicleRig {
    pub fn spawn(
        world: &mut PhysicsWorld,
        position: Vec3,
        desc: &RigDesc,
    ) -> Result<Self, SetupError> {
        let (chassis, chassis_collider) =
            world.add_dynamic_box(position, desc.chassis_half_extents, desc.chassis_mass);

        let wheels: Vec<Wheel> = desc
            .wheel_offsets
            .iter()
            .map(|&offset| {
                let (body, collider) = world.add_dynamic_sphere(
                    position + offset,
                    desc.wheel_radius,
                    desc.wheel_mass,
                );
                Wheel::new(body, collider, offset, desc.wheel_radius)
            })
            .collect();

        let colliders: Vec<ColliderHandle> = wheels.iter().map(|w| w.collider).collect();
        world.set_disabled_collisions(chassis, &colliders)?;
        world.step_buffers().publish_input(Some(chassis));

        Ok(Self {
            chassis,
            chassis_collider,
            wheels,
        })
    }

    pub fn body<'a>(&self, world: &'a mut PhysicsWorld) -> ChassisBody<'a> {
        ChassisBody {
            world,
            handle: self.chassis,
        }
    }

    pub fn wheel_colliders(&self) -> Vec<ColliderHandle> {
        self.wheels.iter().map(|w| w.collider).collect()
    }

    /// Carries out wheel requests raised during a tick.
    pub fn apply_wheel_requests(&self, world: &mut PhysicsWorld, requests: WheelRequests) {
        if requests.contains(WheelRequests::RESET) {
            self.reset_wheels(world);
        }
        if requests.contains(WheelRequests::WAKE) {
            for wheel in &self.wheels {
                world.wake_body(wheel.body);
            }
            self.hold_locked_wheels(world);
        }
    }

    /// Locks or releases every wheel, as a handbrake would.
    pub fn set_wheels_locked(&mut self, locked: bool) {
        for wheel in &mut self.wheels {
            wheel.set_locked(locked);
        }
    }

    pub fn locked_wheels(&self) -> usize {
        self.wheels.iter().filter(|w| w.is_locked()).count()
    }

    /// Stops locked wheels from spinning. Call once per frame before stepping.
    pub fn hold_locked_wheels(&self, world: &mut PhysicsWorld) {
        for wheel in self.wheels.iter().filter(|w| w.is_locked()) {
            world.set_body_angular_velocity(wheel.body, Vec3::ZERO);
        }
    }

    fn reset_wheels(&self, world: &mut PhysicsWorld) {
        let Some(chassis) = world.body_transform(self.chassis) else {
            return;
        };

        for wheel in &self.wheels {
            let position = chassis.position + chassis.rotation * wheel.local_offset;
            world.set_body_transform(
                wheel.body,
                Transform::new(position, chassis.rotation),
                true,
            );
            world.set_body_velocity(wheel.body, Vec3::ZERO);
            world.set_body_angular_velocity(wheel.body, Vec3::ZERO);
        }
    }
}

/// [`VehicleBody`] view over a rig's chassis.
pub struct ChassisBody<'a> {
    world: &'a mut PhysicsWorld,
    handle: RigidBodyHandle,
}

impl VehicleBody for ChassisBody<'_> {
    fn transform(&self) -> Option<Transform> {
        self.world.body_transform(self.handle)
    }

    fn set_transform(&mut self, transform: Transform, teleport: bool) {
        self.world.set_body_transform(self.handle, transform, teleport);
    }

    fn linear_velocity(&self) -> Option<Vec3> {
        self.world.body_velocity(self.handle)
    }

    fn set_linear_velocity(&mut self, velocity: Vec3) {
        self.world.set_body_velocity(self.handle, velocity);
    }

    fn angular_velocity(&self) -> Option<Vec3> {
        self.world.body_angular_velocity(self.handle)
    }

    fn set_angular_velocity(&mut self, velocity: Vec3) {
        self.world.set_body_angular_velocity(self.handle, velocity);
    }

    fn is_awake(&self) -> bool {
        self.world.is_body_awake(self.handle)
    }

    fn put_to_sleep(&mut self) {
        self.world.sleep_body(self.handle);
    }
}

#[cfg(test)]
mod tests {
    use glam::Quat;

    use super::*;

    #[test]
    fn spawn_filters_wheel_contacts() {
        let mut world = PhysicsWorld::new();
        let rig = VehicleRig::spawn(&mut world, Vec3::new(0.0, 2.0, 0.0), &RigDesc::default())
            .unwrap();

        assert_eq!(rig.wheels.len(), 4);
        assert_eq!(world.contact_filter().chassis(), Some(rig.chassis));
        assert_eq!(world.contact_filter().wheels(), rig.wheel_colliders().as_slice());
    }

    #[test]
    fn wheel_reset_reanchors_under_chassis() {
        let mut world = PhysicsWorld::new();
        let rig = VehicleRig::spawn(&mut world, Vec3::new(0.0, 2.0, 0.0), &RigDesc::default())
            .unwrap();

        let target = Transform::new(Vec3::new(500.0, 2.0, 0.0), Quat::IDENTITY);
        rig.body(&mut world).set_transform(target, true);
        rig.apply_wheel_requests(&mut world, WheelRequests::RESET);

        for wheel in &rig.wheels {
            let position = world.body_transform(wheel.body).unwrap().position;
            let expected = target.position + wheel.local_offset;
            assert!((position - expected).length() < 1e-3);
        }
    }

    #[test]
    fn locked_wheels_stop_spinning() {
        let mut world = PhysicsWorld::new();
        let mut rig = VehicleRig::spawn(&mut world, Vec3::new(0.0, 2.0, 0.0), &RigDesc::default())
            .unwrap();
        for wheel in &rig.wheels {
            world.set_body_angular_velocity(wheel.body, Vec3::new(10.0, 0.0, 0.0));
        }

        rig.wheels[0].set_locked(true);
        rig.hold_locked_wheels(&mut world);

        assert_eq!(rig.locked_wheels(), 1);
        assert_eq!(world.body_angular_velocity(rig.wheels[0].body), Some(Vec3::ZERO));
        assert_eq!(
            world.body_angular_velocity(rig.wheels[1].body),
            Some(Vec3::new(10.0, 0.0, 0.0))
        );

        rig.set_wheels_locked(false);
        assert_eq!(rig.locked_wheels(), 0);
    }

    #[test]
    fn chassis_body_sleeps_on_request() {
        let mut world = PhysicsWorld::new();
        let rig = VehicleRig::spawn(&mut world, Vec3::new(0.0, 2.0, 0.0), &RigDesc::default())
            .unwrap();

        let mut body = rig.body(&mut world);
        assert!(body.is_awake());
        body.put_to_sleep();
        assert!(!body.is_awake());
    }
}
