use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Which parts of the transform network playback may write.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct SyncAxes: u8 {
        const LOCATION = 1 << 0;
        const ROTATION = 1 << 1;
    }
}

impl Default for SyncAxes {
    fn default() -> Self {
        Self::all()
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("net_send_rate must be positive, got {0}")]
    SendRate(f32),
    #[error("queue_capacity must be at least 1")]
    QueueCapacity,
    #[error("{field} must not be negative, got {value}")]
    Negative { field: &'static str, value: f32 },
    #[error("rest_snap_distance_wide ({wide}) is below rest_snap_distance ({narrow})")]
    RestBand { narrow: f32, wide: f32 },
}

/// Tuning for one synchronized vehicle. Times are in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub replicate_movement: bool,
    pub sync_axes: SyncAxes,
    /// Seconds between authority samples.
    pub net_send_rate: f32,
    /// Playback buffering delay.
    pub net_time_behind: f32,
    /// How long before a state's target time blending toward it begins.
    pub net_lerp_start: f32,
    /// Per-axis distance under which a segment is skipped.
    pub net_position_tolerance: f32,
    /// Exponential smoothing rate for chassis writes.
    pub net_smoothing: f32,
    pub queue_capacity: usize,
    /// Planar distance beyond which the chassis teleports.
    pub teleport_distance: f32,
    pub rest_snap_distance: f32,
    /// Hold band used once the chassis is already close to a rest pose.
    pub rest_snap_distance_wide: f32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            replicate_movement: true,
            sync_axes: SyncAxes::all(),
            net_send_rate: 0.05,
            net_time_behind: 0.15,
            net_lerp_start: 0.35,
            net_position_tolerance: 0.1,
            net_smoothing: 10.0,
            queue_capacity: 10,
            teleport_distance: 3000.0,
            rest_snap_distance: 0.15,
            rest_snap_distance_wide: 10.0,
        }
    }
}

impl SyncConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.net_send_rate > 0.0) {
            return Err(ConfigError::SendRate(self.net_send_rate));
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::QueueCapacity);
        }

        let non_negative = [
            ("net_time_behind", self.net_time_behind),
            ("net_lerp_start", self.net_lerp_start),
            ("net_position_tolerance", self.net_position_tolerance),
            ("net_smoothing", self.net_smoothing),
            ("teleport_distance", self.teleport_distance),
            ("rest_snap_distance", self.rest_snap_distance),
            ("rest_snap_distance_wide", self.rest_snap_distance_wide),
        ];
        for (field, value) in non_negative {
            if value < 0.0 {
                return Err(ConfigError::Negative { field, value });
            }
        }

        if self.rest_snap_distance_wide < self.rest_snap_distance {
            return Err(ConfigError::RestBand {
                narrow: self.rest_snap_distance,
                wide: self.rest_snap_distance_wide,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = SyncConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.queue_capacity, 10);
        assert_eq!(config.sync_axes, SyncAxes::LOCATION | SyncAxes::ROTATION);
    }

    #[test]
    fn rejects_bad_values() {
        let config = SyncConfig {
            net_send_rate: 0.0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::SendRate(0.0)));

        let config = SyncConfig {
            net_smoothing: -1.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Negative {
                field: "net_smoothing",
                ..
            })
        ));

        let config = SyncConfig {
            rest_snap_distance_wide: 0.1,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::RestBand { .. })));
    }
}
