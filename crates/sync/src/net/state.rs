use glam::{Quat, Vec3};
use rkyv::{Archive, Deserialize, Serialize};

use crate::physics::Transform;

/// Kinematic snapshot of a vehicle body.
///
/// `timestamp` is the sender's clock at sample time. `local_timestamp` is the
/// receiver's clock time at which the state becomes the playback target; it is
/// assigned when the state is queued and carries no meaning on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct NetState {
    pub timestamp: f64,
    pub local_timestamp: f64,
    pub position: Vec3,
    pub rotation: Quat,
    pub velocity: Vec3,
    pub angular_velocity: Vec3,
}

impl Default for NetState {
    fn default() -> Self {
        Self {
            timestamp: 0.0,
            local_timestamp: 0.0,
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
        }
    }
}

impl NetState {
    pub fn new(timestamp: f64, position: Vec3, rotation: Quat) -> Self {
        Self {
            timestamp,
            position,
            rotation,
            ..Default::default()
        }
    }

    pub fn with_velocities(mut self, velocity: Vec3, angular_velocity: Vec3) -> Self {
        self.velocity = velocity;
        self.angular_velocity = angular_velocity;
        self
    }

    pub fn transform(&self) -> Transform {
        Transform::new(self.position, self.rotation)
    }

    /// True when every axis of `self.position` is within `tolerance` of `other`.
    pub fn position_nearly_equal(&self, other: &NetState, tolerance: f32) -> bool {
        let delta = (self.position - other.position).abs();
        delta.x <= tolerance && delta.y <= tolerance && delta.z <= tolerance
    }
}

/// Dormancy transition carried on the reliable channel.
///
/// `resting` is explicit so a body that legitimately sleeps at the world
/// origin is still reported as resting.
#[derive(Debug, Clone, Copy, PartialEq, Default, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct RestState {
    pub resting: bool,
    pub state: NetState,
}

impl RestState {
    pub fn resting(state: NetState) -> Self {
        Self {
            resting: true,
            state,
        }
    }

    pub fn awake() -> Self {
        Self::default()
    }
}
