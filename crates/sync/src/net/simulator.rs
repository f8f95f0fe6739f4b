use std::cmp::Ordering;
use std::collections::BinaryHeap;

use super::protocol::{Channel, Packet, PacketError};

/// Network conditions applied by a [`SimulatedLink`].
#[derive(Debug, Clone, Default)]
pub struct PacketLossSimulation {
    pub enabled: bool,
    /// Chance, in percent, that an unreliable packet is dropped. Reliable
    /// packets are delayed but never dropped.
    pub loss_percent: f32,
    /// One-way latency is drawn uniformly from `min..max`, plus jitter.
    pub min_latency_ms: u32,
    pub max_latency_ms: u32,
    /// Extra random delay on top of the base latency.
    pub jitter_ms: u32,
}

impl PacketLossSimulation {
    pub fn should_drop(&self, rng: &mut LinkRng) -> bool {
        if !self.enabled || self.loss_percent <= 0.0 {
            return false;
        }
        rng.next_percent() * 100.0 < self.loss_percent
    }

    pub fn delay_ms(&self, rng: &mut LinkRng) -> u32 {
        if !self.enabled || self.max_latency_ms == 0 {
            return 0;
        }
        let base = self.min_latency_ms;
        let range = self.max_latency_ms.saturating_sub(self.min_latency_ms);
        let jitter = if self.jitter_ms > 0 {
            (rng.next_percent() * self.jitter_ms as f32) as u32
        } else {
            0
        };
        base + (rng.next_percent() * range as f32) as u32 + jitter
    }
}

/// Seeded xorshift generator so simulated runs are reproducible.
#[derive(Debug, Clone)]
pub struct LinkRng {
    state: u64,
}

impl LinkRng {
    pub fn new(seed: u64) -> Self {
        Self {
            state: seed.max(1),
        }
    }

    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    /// Uniform in `[0, 1)`.
    pub fn next_percent(&mut self) -> f32 {
        (self.next_u64() % 10_000) as f32 / 10_000.0
    }
}

#[derive(Debug, Clone, Default)]
pub struct LinkStats {
    pub packets_sent: u64,
    pub packets_delivered: u64,
    pub packets_lost: u64,
    pub bytes_sent: u64,
}

#[derive(Debug)]
struct DelayedPacket {
    release_time: f64,
    order: u64,
    bytes: Vec<u8>,
}

impl PartialEq for DelayedPacket {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for DelayedPacket {}

impl PartialOrd for DelayedPacket {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DelayedPacket {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order for min-heap
        other
            .release_time
            .total_cmp(&self.release_time)
            .then_with(|| other.order.cmp(&self.order))
    }
}

/// One-directional link with configurable loss and latency.
///
/// Unreliable packets may be dropped and may overtake each other. Reliable
/// packets are never dropped and are released in send order.
#[derive(Debug)]
pub struct SimulatedLink {
    conditions: PacketLossSimulation,
    rng: LinkRng,
    queue: BinaryHeap<DelayedPacket>,
    next_order: u64,
    last_reliable_release: f64,
    stats: LinkStats,
}

impl SimulatedLink {
    pub fn new(conditions: PacketLossSimulation, seed: u64) -> Self {
        Self {
            conditions,
            rng: LinkRng::new(seed),
            queue: BinaryHeap::new(),
            next_order: 0,
            last_reliable_release: 0.0,
            stats: LinkStats::default(),
        }
    }

    pub fn perfect() -> Self {
        Self::new(PacketLossSimulation::default(), 1)
    }

    pub fn stats(&self) -> &LinkStats {
        &self.stats
    }

    /// Packets sent but not yet released by [`take_ready`](Self::take_ready).
    pub fn in_flight(&self) -> usize {
        self.queue.len()
    }

    pub fn send(&mut self, packet: &Packet, channel: Channel, now: f64) -> Result<(), PacketError> {
        let bytes = packet.serialize()?;
        self.stats.packets_sent += 1;
        self.stats.bytes_sent += bytes.len() as u64;

        let mut release_time =
            now + f64::from(self.conditions.delay_ms(&mut self.rng)) / 1000.0;

        match channel {
            Channel::Unreliable => {
                if self.conditions.should_drop(&mut self.rng) {
                    self.stats.packets_lost += 1;
                    log::trace!("link dropped packet {}", packet.header.sequence);
                    return Ok(());
                }
            }
            Channel::Reliable => {
                release_time = release_time.max(self.last_reliable_release);
                self.last_reliable_release = release_time;
            }
        }

        let order = self.next_order;
        self.next_order += 1;
        self.queue.push(DelayedPacket {
            release_time,
            order,
            bytes,
        });
        Ok(())
    }

    /// Releases every packet due at `now`. Packets that fail to decode are
    /// skipped and reported through the log.
    pub fn take_ready(&mut self, now: f64) -> Vec<Packet> {
        let mut packets = Vec::new();
        while self
            .queue
            .peek()
            .is_some_and(|delayed| delayed.release_time <= now)
        {
            let Some(delayed) = self.queue.pop() else {
                break;
            };
            match Packet::deserialize(&delayed.bytes) {
                Ok(packet) => {
                    self.stats.packets_delivered += 1;
                    packets.push(packet);
                }
                Err(e) => log::warn!("discarding undecodable packet: {}", e),
            }
        }
        packets
    }
}
