use anyhow::{Context, Result};
use carsync::net::Outbox;
use carsync::{
    NetworkRole, Packet, PacketHeader, PhysicsWorld, RigDesc, RoleFacts, RoleSource,
    SimulatedLink, SyncConfig, SyncMessage, TickOutcome, Transform, Transport, VehicleRig,
    VehicleSync, WheelRequests,
};
use glam::Vec3;

/// One simulated machine holding its own copy of the vehicle.
pub struct Peer {
    pub name: &'static str,
    pub world: PhysicsWorld,
    pub rig: VehicleRig,
    pub sync: VehicleSync,
    pub facts: RoleFacts,
    pub outbox: Outbox,
    sequence: u32,
}

impl Peer {
    pub fn spawn(
        name: &'static str,
        position: Vec3,
        config: SyncConfig,
        facts: RoleFacts,
    ) -> Result<Self> {
        let mut world = PhysicsWorld::new();
        world.add_ground(0.0, 500.0);
        let rig = VehicleRig::spawn(&mut world, position, &RigDesc::default())
            .with_context(|| format!("spawning vehicle on {name}"))?;
        let sync = VehicleSync::new(config).context("invalid sync config")?;

        Ok(Self {
            name,
            world,
            rig,
            sync,
            facts,
            outbox: Outbox::new(),
            sequence: 0,
        })
    }

    pub fn role(&self) -> NetworkRole {
        self.facts.network_role()
    }

    pub fn transform(&self) -> Option<Transform> {
        self.world.body_transform(self.rig.chassis)
    }

    /// Samples and publishes the chassis when the send timer fires.
    pub fn publish(&mut self, now: f64, dt: f32) {
        let role = self.role();
        let body = self.rig.body(&mut self.world);
        self.sync
            .update_send(now, dt, role, &body, &mut self.outbox);
    }

    /// Plays back received states and carries out wheel requests.
    pub fn play_back(&mut self, now: f64, dt: f32) -> TickOutcome {
        let role = self.role();
        let mut requests = WheelRequests::empty();
        let mut body = self.rig.body(&mut self.world);
        let outcome = self.sync.tick(now, dt, role, &mut body, &mut requests);
        self.rig.apply_wheel_requests(&mut self.world, requests);
        outcome
    }

    /// Handles one packet as the server: forwards it to clients and applies it
    /// locally.
    pub fn relay(&mut self, message: SyncMessage, now: f64) {
        let role = self.role();
        match message {
            SyncMessage::State(state) => {
                self.sync.relay_state(state, now, role, &mut self.outbox);
            }
            SyncMessage::Rest(rest) => self.sync.relay_rest(rest, &mut self.outbox),
            SyncMessage::OwnerChanged => {
                self.outbox.send(SyncMessage::OwnerChanged);
                self.sync.on_owner_changed();
            }
        }
    }

    pub fn receive(&mut self, message: SyncMessage, now: f64) {
        let role = self.role();
        self.sync.on_message(message, now, role);
    }

    /// Pushes everything queued in the outbox onto `link`.
    pub fn flush(&mut self, link: &mut SimulatedLink, vehicle_id: u32, now: f64) -> Result<()> {
        for (channel, message) in self.outbox.drain() {
            let packet = Packet::new(PacketHeader::new(self.sequence, vehicle_id), message);
            self.sequence = self.sequence.wrapping_add(1);
            link.send(&packet, channel, now)
                .with_context(|| format!("{} failed to send", self.name))?;
        }
        Ok(())
    }
}
