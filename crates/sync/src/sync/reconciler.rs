use super::config::SyncConfig;
use super::mover::{LocationWriter, MoveOutcome, MoveRequest, masked, shortest_slerp};
use super::queue::{InsertOutcome, StateQueue};
use crate::net::{NetState, RestState};
use crate::physics::{Transform, VehicleBody, WheelCollaborator};

/// Blend progress at which a segment snaps to its exact target.
pub const SETTLE_ALPHA: f32 = 0.99;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTime {
    /// Local clock, seconds.
    pub now: f64,
    /// Duration of the frame being ticked.
    pub dt: f32,
}

impl FrameTime {
    pub fn new(now: f64, dt: f32) -> Self {
        Self { now, dt }
    }
}

/// Result of one playback tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// Held at the replicated rest pose; the queue is ignored.
    Resting(MoveOutcome),
    /// Nothing queued.
    Idle,
    /// Head is not due yet; local physics keeps predicting.
    Waiting,
    /// Body was already within tolerance of the head; head skipped.
    Converged,
    Blending { alpha: f32, movement: MoveOutcome },
    /// Exact head state applied and popped.
    Settled { movement: MoveOutcome },
    /// The body could not be sampled this tick.
    Unavailable,
}

/// Per-tick playback of queued states onto a non-authoritative body.
#[derive(Debug, Clone)]
pub struct Reconciler {
    queue: StateQueue,
    anchor: NetState,
    writer: LocationWriter,
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new(&SyncConfig::default())
    }
}

impl Reconciler {
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            queue: StateQueue::new(config.queue_capacity),
            anchor: NetState::default(),
            writer: LocationWriter::new(),
        }
    }

    pub fn queue(&self) -> &StateQueue {
        &self.queue
    }

    /// Start of the current blend segment, if one is in progress.
    pub fn anchor(&self) -> Option<&NetState> {
        (!self.queue.anchor_needed()).then_some(&self.anchor)
    }

    pub fn insert(&mut self, state: NetState, now: f64, config: &SyncConfig) -> InsertOutcome {
        self.queue
            .insert(state, now, f64::from(config.net_time_behind))
    }

    /// Drops every queued state and the segment in progress.
    pub fn clear(&mut self) {
        self.queue.clear();
        self.anchor = NetState::default();
        self.writer.reset();
    }

    pub fn tick<B, W>(
        &mut self,
        config: &SyncConfig,
        rest: &RestState,
        frame: FrameTime,
        body: &mut B,
        wheels: &mut W,
    ) -> TickOutcome
    where
        B: VehicleBody + ?Sized,
        W: WheelCollaborator + ?Sized,
    {
        if rest.resting {
            return self.hold_rest(config, rest, frame, body, wheels);
        }

        let Some(head) = self.queue.head().copied() else {
            return TickOutcome::Idle;
        };

        if frame.now < head.local_timestamp - f64::from(config.net_lerp_start) {
            return TickOutcome::Waiting;
        }

        if self.queue.anchor_needed() {
            let Some(anchor) = body.sample(frame.now) else {
                return TickOutcome::Unavailable;
            };
            self.anchor = anchor;
            self.queue.set_anchor_needed(false);

            if anchor.position_nearly_equal(&head, config.net_position_tolerance) {
                log::trace!("already at state @{:.3}, skipping", head.timestamp);
                self.queue.pop_head();
                self.queue.set_anchor_needed(true);
                return TickOutcome::Converged;
            }
            log::trace!(
                "new segment toward @{:.3}, due {:.3}",
                head.timestamp,
                head.local_timestamp
            );
        }

        self.queue
            .set_last_active_timestamp(head.timestamp + f64::from(config.net_time_behind));

        let begin = self.anchor.timestamp;
        let span = head.local_timestamp - begin;
        let alpha = if span > 0.0 {
            ((frame.now - begin) / span).clamp(0.0, 1.0) as f32
        } else {
            1.0
        };

        let blended = Transform::new(
            self.anchor.position.lerp(head.position, alpha),
            shortest_slerp(self.anchor.rotation, head.rotation, alpha),
        );
        let movement = self.writer.set_vehicle_location(
            config,
            MoveRequest {
                target: blended,
                dt: frame.dt,
                resting: false,
                wake_wheels: false,
            },
            body,
            wheels,
        );

        if alpha >= SETTLE_ALPHA || begin > head.local_timestamp {
            let exact = self.apply_exact_state(config, &head, body);
            self.queue.pop_head();
            self.queue.set_anchor_needed(true);
            let movement = if movement == MoveOutcome::Teleported {
                movement
            } else {
                exact
            };
            return TickOutcome::Settled { movement };
        }

        TickOutcome::Blending { alpha, movement }
    }

    /// Writes `state` without blending or smoothing, including both
    /// velocities. Axes masked out of `sync_axes` keep their current value.
    pub fn apply_exact_state<B>(
        &self,
        config: &SyncConfig,
        state: &NetState,
        body: &mut B,
    ) -> MoveOutcome
    where
        B: VehicleBody + ?Sized,
    {
        let Some(current) = body.transform() else {
            return MoveOutcome::Unavailable;
        };
        body.set_transform(masked(config.sync_axes, current, state.transform()), false);
        body.set_linear_velocity(state.velocity);
        body.set_angular_velocity(state.angular_velocity);
        MoveOutcome::Exact
    }

    fn hold_rest<B, W>(
        &mut self,
        config: &SyncConfig,
        rest: &RestState,
        frame: FrameTime,
        body: &mut B,
        wheels: &mut W,
    ) -> TickOutcome
    where
        B: VehicleBody + ?Sized,
        W: WheelCollaborator + ?Sized,
    {
        let movement = self.writer.set_vehicle_location(
            config,
            MoveRequest {
                target: rest.state.transform(),
                dt: frame.dt,
                resting: true,
                wake_wheels: true,
            },
            body,
            wheels,
        );

        if !self.queue.is_empty() {
            self.queue.clear();
        }
        if body.is_awake() {
            body.put_to_sleep();
        }

        TickOutcome::Resting(movement)
    }
}
