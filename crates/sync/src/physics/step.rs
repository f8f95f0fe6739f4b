use std::sync::atomic::{AtomicU64, Ordering};

use rapier3d::prelude::RigidBodyHandle;

const NO_BODY: u64 = u64::MAX;

/// What the physics step last reported back to the game side.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StepOutput {
    pub delta_time: f32,
    pub step: u32,
}

impl StepOutput {
    fn pack(self) -> u64 {
        (u64::from(self.step) << 32) | u64::from(self.delta_time.to_bits())
    }

    fn unpack(bits: u64) -> Self {
        Self {
            delta_time: f32::from_bits(bits as u32),
            step: (bits >> 32) as u32,
        }
    }
}

/// Lock-free handoff between the game tick and the physics step.
///
/// The game side only writes `input` and the step side only writes `output`;
/// each reads the other's most recently completed value.
#[derive(Debug)]
pub struct StepBuffers {
    input: AtomicU64,
    output: AtomicU64,
}

impl Default for StepBuffers {
    fn default() -> Self {
        Self {
            input: AtomicU64::new(NO_BODY),
            output: AtomicU64::new(StepOutput::default().pack()),
        }
    }
}

impl StepBuffers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Game side: which chassis the next step should hand to its callback.
    pub fn publish_input(&self, chassis: Option<RigidBodyHandle>) {
        let bits = chassis.map_or(NO_BODY, |handle| {
            let (index, generation) = handle.into_raw_parts();
            (u64::from(generation) << 32) | u64::from(index)
        });
        self.input.store(bits, Ordering::Release);
    }

    /// Step side.
    pub fn current_input(&self) -> Option<RigidBodyHandle> {
        match self.input.load(Ordering::Acquire) {
            NO_BODY => None,
            bits => Some(RigidBodyHandle::from_raw_parts(
                bits as u32,
                (bits >> 32) as u32,
            )),
        }
    }

    /// Step side.
    pub fn publish_output(&self, output: StepOutput) {
        self.output.store(output.pack(), Ordering::Release);
    }

    /// Game side. Intermediate outputs produced between two reads are
    /// superseded by the latest one.
    pub fn latest_output(&self) -> StepOutput {
        StepOutput::unpack(self.output.load(Ordering::Acquire))
    }
}
