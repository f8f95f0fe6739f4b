use glam::{Quat, Vec3};

use crate::net::NetState;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }
}

impl Transform {
    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    /// Distance on the ground plane, ignoring height.
    pub fn planar_distance(&self, other: &Transform) -> f32 {
        let delta = other.position - self.position;
        (delta.x * delta.x + delta.z * delta.z).sqrt()
    }
}

/// The physics engine's view of a single vehicle chassis.
///
/// Getters return `None` when the underlying body is gone; setters are no-ops
/// in that case.
pub trait VehicleBody {
    fn transform(&self) -> Option<Transform>;
    fn set_transform(&mut self, transform: Transform, teleport: bool);

    fn linear_velocity(&self) -> Option<Vec3>;
    fn set_linear_velocity(&mut self, velocity: Vec3);

    fn angular_velocity(&self) -> Option<Vec3>;
    fn set_angular_velocity(&mut self, velocity: Vec3);

    fn is_awake(&self) -> bool;
    fn put_to_sleep(&mut self);

    /// Samples the body into a state stamped with the local clock.
    fn sample(&self, now: f64) -> Option<NetState> {
        let transform = self.transform()?;
        Some(
            NetState::new(now, transform.position, transform.rotation).with_velocities(
                self.linear_velocity().unwrap_or(Vec3::ZERO),
                self.angular_velocity().unwrap_or(Vec3::ZERO),
            ),
        )
    }
}
