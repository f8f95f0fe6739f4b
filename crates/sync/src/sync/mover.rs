use glam::{Quat, Vec3};

use super::config::{SyncAxes, SyncConfig};
use crate::physics::{Transform, VehicleBody, WheelCollaborator};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Too far away to smooth; transform was set outright.
    Teleported,
    /// Already close enough; nothing was written.
    Holding,
    Smoothed,
    /// Target written as-is, without smoothing.
    Exact,
    /// The body could not be read.
    Unavailable,
}

#[derive(Debug, Clone, Copy)]
pub struct MoveRequest {
    pub target: Transform,
    pub dt: f32,
    pub resting: bool,
    pub wake_wheels: bool,
}

/// Moves `current` toward `target` at `speed`, frame-rate independent.
pub fn interp_to(current: Vec3, target: Vec3, dt: f32, speed: f32) -> Vec3 {
    if speed <= 0.0 {
        return target;
    }
    let distance = target - current;
    if distance.length_squared() < 1e-4 {
        return target;
    }
    current + distance * (dt * speed).clamp(0.0, 1.0)
}

pub fn rotation_interp_to(current: Quat, target: Quat, dt: f32, speed: f32) -> Quat {
    if speed <= 0.0 {
        return target;
    }
    if dt <= 0.0 {
        return current;
    }
    shortest_slerp(current, target, (dt * speed).clamp(0.0, 1.0))
}

pub fn shortest_slerp(from: Quat, to: Quat, t: f32) -> Quat {
    if from.dot(to) < 0.0 {
        from.slerp(-to, t)
    } else {
        from.slerp(to, t)
    }
}

/// Writes network-driven poses into the chassis.
///
/// Keeps the hysteresis flag that widens the hold band once a resting
/// vehicle has come close to its rest pose.
#[derive(Debug, Clone, Default)]
pub struct LocationWriter {
    near_rest: bool,
}

impl LocationWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn near_rest(&self) -> bool {
        self.near_rest
    }

    pub fn reset(&mut self) {
        self.near_rest = false;
    }

    pub fn set_vehicle_location<B, W>(
        &mut self,
        config: &SyncConfig,
        request: MoveRequest,
        body: &mut B,
        wheels: &mut W,
    ) -> MoveOutcome
    where
        B: VehicleBody + ?Sized,
        W: WheelCollaborator + ?Sized,
    {
        let Some(current) = body.transform() else {
            return MoveOutcome::Unavailable;
        };

        let distance = current.planar_distance(&request.target);

        if distance > config.teleport_distance {
            log::warn!(
                "teleporting chassis {:.1} units to {:?}",
                distance,
                request.target.position
            );
            let teleported = masked(config.sync_axes, current, request.target);
            body.set_transform(teleported, true);
            body.set_linear_velocity(Vec3::ZERO);
            body.set_angular_velocity(Vec3::ZERO);
            wheels.request_wheel_reset();
            return MoveOutcome::Teleported;
        }

        let mut threshold = config.rest_snap_distance;
        if (request.resting && self.near_rest) || distance < threshold {
            threshold = config.rest_snap_distance_wide;
            self.near_rest = distance < threshold;
        } else {
            self.near_rest = false;
        }

        if distance <= threshold {
            return MoveOutcome::Holding;
        }

        if request.wake_wheels {
            wheels.request_wake_for_movement();
        }

        let smoothed = Transform::new(
            interp_to(
                current.position,
                request.target.position,
                request.dt,
                config.net_smoothing,
            ),
            rotation_interp_to(
                current.rotation,
                request.target.rotation,
                request.dt,
                config.net_smoothing,
            ),
        );
        body.set_transform(masked(config.sync_axes, current, smoothed), false);
        MoveOutcome::Smoothed
    }
}

pub(super) fn masked(axes: SyncAxes, current: Transform, target: Transform) -> Transform {
    Transform::new(
        if axes.contains(SyncAxes::LOCATION) {
            target.position
        } else {
            current.position
        },
        if axes.contains(SyncAxes::ROTATION) {
            target.rotation
        } else {
            current.rotation
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::WheelRequests;

    #[derive(Default)]
    struct Body {
        transform: Transform,
        velocity: Vec3,
        angular_velocity: Vec3,
        writes: Vec<(Transform, bool)>,
    }

    impl VehicleBody for Body {
        fn transform(&self) -> Option<Transform> {
            Some(self.transform)
        }
        fn set_transform(&mut self, transform: Transform, teleport: bool) {
            self.transform = transform;
            self.writes.push((transform, teleport));
        }
        fn linear_velocity(&self) -> Option<Vec3> {
            Some(self.velocity)
        }
        fn set_linear_velocity(&mut self, velocity: Vec3) {
            self.velocity = velocity;
        }
        fn angular_velocity(&self) -> Option<Vec3> {
            Some(self.angular_velocity)
        }
        fn set_angular_velocity(&mut self, velocity: Vec3) {
            self.angular_velocity = velocity;
        }
        fn is_awake(&self) -> bool {
            true
        }
        fn put_to_sleep(&mut self) {}
    }

    fn request(x: f32, resting: bool) -> MoveRequest {
        MoveRequest {
            target: Transform::new(Vec3::new(x, 0.0, 0.0), Quat::IDENTITY),
            dt: 1.0 / 60.0,
            resting,
            wake_wheels: true,
        }
    }

    #[test]
    fn far_target_teleports() {
        let config = SyncConfig::default();
        let mut body = Body {
            velocity: Vec3::new(5.0, 0.0, 0.0),
            angular_velocity: Vec3::Y,
            ..Default::default()
        };
        let mut wheels = WheelRequests::empty();
        let mut writer = LocationWriter::new();

        let outcome =
            writer.set_vehicle_location(&config, request(5000.0, false), &mut body, &mut wheels);

        assert_eq!(outcome, MoveOutcome::Teleported);
        assert_eq!(body.writes, vec![(request(5000.0, false).target, true)]);
        assert_eq!(body.velocity, Vec3::ZERO);
        assert_eq!(body.angular_velocity, Vec3::ZERO);
        assert!(wheels.contains(WheelRequests::RESET));
    }

    #[test]
    fn height_does_not_count_toward_teleport() {
        let config = SyncConfig::default();
        let mut body = Body::default();
        let mut writer = LocationWriter::new();
        let target = MoveRequest {
            target: Transform::new(Vec3::new(0.0, 5000.0, 0.0), Quat::IDENTITY),
            ..request(0.0, false)
        };

        let outcome = writer.set_vehicle_location(&config, target, &mut body, &mut ());

        assert_eq!(outcome, MoveOutcome::Holding);
    }

    #[test]
    fn moderate_distance_smooths_and_wakes_wheels() {
        let config = SyncConfig::default();
        let mut body = Body::default();
        let mut wheels = WheelRequests::empty();
        let mut writer = LocationWriter::new();

        let outcome =
            writer.set_vehicle_location(&config, request(6.0, false), &mut body, &mut wheels);

        assert_eq!(outcome, MoveOutcome::Smoothed);
        let (written, teleport) = body.writes[0];
        assert!(!teleport);
        assert!(written.position.x > 0.0 && written.position.x < 6.0);
        assert_eq!(wheels, WheelRequests::WAKE);
    }

    #[test]
    fn tiny_distance_holds() {
        let config = SyncConfig::default();
        let mut body = Body::default();
        let mut writer = LocationWriter::new();

        let outcome = writer.set_vehicle_location(&config, request(0.1, false), &mut body, &mut ());

        assert_eq!(outcome, MoveOutcome::Holding);
        assert!(body.writes.is_empty());
        assert!(writer.near_rest());
    }

    #[test]
    fn rest_band_widens_only_while_resting() {
        let config = SyncConfig::default();
        let mut writer = LocationWriter::new();

        let mut body = Body::default();
        writer.set_vehicle_location(&config, request(0.1, true), &mut body, &mut ());
        assert!(writer.near_rest());

        // Resting and already near: a 6 unit offset is inside the wide band.
        let outcome = writer.set_vehicle_location(&config, request(6.0, true), &mut body, &mut ());
        assert_eq!(outcome, MoveOutcome::Holding);

        // Not resting: the same offset is smoothed and the band collapses.
        let outcome = writer.set_vehicle_location(&config, request(6.0, false), &mut body, &mut ());
        assert_eq!(outcome, MoveOutcome::Smoothed);
        assert!(!writer.near_rest());
    }

    #[test]
    fn disabled_rotation_axis_is_preserved() {
        let config = SyncConfig {
            sync_axes: SyncAxes::LOCATION,
            ..Default::default()
        };
        let start = Quat::from_rotation_y(0.3);
        let mut body = Body {
            transform: Transform::new(Vec3::ZERO, start),
            ..Default::default()
        };
        let mut writer = LocationWriter::new();
        let target = MoveRequest {
            target: Transform::new(Vec3::new(6.0, 0.0, 0.0), Quat::from_rotation_y(1.2)),
            ..request(0.0, false)
        };

        writer.set_vehicle_location(&config, target, &mut body, &mut ());

        assert!(body.transform.rotation.abs_diff_eq(start, 1e-6));
        assert!(body.transform.position.x > 0.0);
    }

    #[test]
    fn interp_to_converges() {
        let mut position = Vec3::ZERO;
        for _ in 0..600 {
            position = interp_to(position, Vec3::splat(10.0), 1.0 / 60.0, 10.0);
        }
        assert_eq!(position, Vec3::splat(10.0));
    }
}
