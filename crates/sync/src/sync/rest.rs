use crate::net::{NetState, RestState, SyncMessage, Transport};
use crate::physics::VehicleBody;

/// What the authority put on the wire for one sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleOutcome {
    /// Regular state on the unreliable channel.
    State,
    /// Regular state plus a reliable wake transition.
    StateAndWake,
    /// Body fell asleep; reliable rest transition sent.
    Rested,
    /// Asleep and already reported as resting.
    Quiet,
    Unavailable,
}

/// Authority-side dormancy detection.
///
/// The authority's rest slot is updated as soon as a transition is sent, so
/// each awake/asleep change goes out exactly once.
#[derive(Debug, Clone, Default)]
pub struct RestStateTracker {
    states_sent: u64,
    transitions_sent: u64,
}

impl RestStateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn states_sent(&self) -> u64 {
        self.states_sent
    }

    pub fn transitions_sent(&self) -> u64 {
        self.transitions_sent
    }

    pub fn sample<B, T>(
        &mut self,
        now: f64,
        slot: &mut RestState,
        body: &B,
        transport: &mut T,
    ) -> SampleOutcome
    where
        B: VehicleBody + ?Sized,
        T: Transport + ?Sized,
    {
        if body.is_awake() {
            let Some(state) = body.sample(now) else {
                return SampleOutcome::Unavailable;
            };
            transport.send_unreliable(SyncMessage::State(state));
            self.states_sent += 1;

            if !slot.resting {
                return SampleOutcome::State;
            }

            log::debug!("body woke at {now:.3}");
            *slot = RestState::awake();
            transport.send_reliable(SyncMessage::Rest(*slot));
            self.transitions_sent += 1;
            return SampleOutcome::StateAndWake;
        }

        if slot.resting {
            return SampleOutcome::Quiet;
        }

        let Some(state) = body.sample(now) else {
            return SampleOutcome::Unavailable;
        };
        log::debug!("body came to rest at {:?}", state.position);
        *slot = RestState::resting(NetState {
            velocity: glam::Vec3::ZERO,
            angular_velocity: glam::Vec3::ZERO,
            ..state
        });
        transport.send_reliable(SyncMessage::Rest(*slot));
        self.transitions_sent += 1;
        SampleOutcome::Rested
    }
}
