use bitflags::bitflags;
use glam::Vec3;
use rapier3d::prelude::{ColliderHandle, RigidBodyHandle};

bitflags! {
    /// Fire-and-forget requests raised toward the wheel visuals/physics.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct WheelRequests: u8 {
        /// Re-anchor wheels under the chassis after a teleport.
        const RESET = 1 << 0;
        /// Chassis is being moved; wheel bodies must follow.
        const WAKE = 1 << 1;
    }
}

pub trait WheelCollaborator {
    fn request_wheel_reset(&mut self);
    fn request_wake_for_movement(&mut self);
}

impl WheelCollaborator for WheelRequests {
    fn request_wheel_reset(&mut self) {
        self.insert(WheelRequests::RESET);
    }

    fn request_wake_for_movement(&mut self) {
        self.insert(WheelRequests::WAKE);
    }
}

impl WheelCollaborator for () {
    fn request_wheel_reset(&mut self) {}
    fn request_wake_for_movement(&mut self) {}
}

/// A physically simulated wheel attached under the chassis.
///
/// The lock flag lives here and nowhere else; anything that needs it asks the
/// wheel.
#[derive(Debug, Clone)]
pub struct Wheel {
    pub body: RigidBodyHandle,
    pub collider: ColliderHandle,
    pub local_offset: Vec3,
    pub radius: f32,
    locked: bool,
}

impl Wheel {
    pub fn new(
        body: RigidBodyHandle,
        collider: ColliderHandle,
        local_offset: Vec3,
        radius: f32,
    ) -> Self {
        Self {
            body,
            collider,
            local_offset,
            radius,
            locked: false,
        }
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn set_locked(&mut self, locked: bool) {
        self.locked = locked;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requests_accumulate() {
        let mut requests = WheelRequests::empty();
        requests.request_wake_for_movement();
        requests.request_wake_for_movement();
        requests.request_wheel_reset();

        assert_eq!(requests, WheelRequests::RESET | WheelRequests::WAKE);
    }
}
