use crate::net::{NetState, RestState, SyncMessage, Transport};
use crate::physics::{VehicleBody, WheelCollaborator};
use crate::role::NetworkRole;
use crate::sync::{
    ConfigError, FrameTime, InsertOutcome, MoveOutcome, Reconciler, RestStateTracker,
    SampleOutcome, SendTimer, StateQueue, SyncConfig, TickOutcome,
};

/// Notifications for the host, drained once per frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SyncEvent {
    /// Possession moved; any buffered playback was discarded.
    OwnerChanged,
    /// The chassis was too far from its target and was moved outright.
    Teleported,
    RestChanged { resting: bool },
    RoleChanged { from: NetworkRole, to: NetworkRole },
}

/// Network synchronization for one vehicle.
///
/// The host calls the inbound handlers as messages arrive, then
/// [`update_send`](Self::update_send) and [`tick`](Self::tick) once per frame
/// with the role it currently holds.
#[derive(Debug)]
pub struct VehicleSync {
    config: SyncConfig,
    reconciler: Reconciler,
    rest: RestState,
    tracker: RestStateTracker,
    timer: SendTimer,
    should_sync: bool,
    last_role: NetworkRole,
    events: Vec<SyncEvent>,
}

impl VehicleSync {
    pub fn new(config: SyncConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut timer = SendTimer::new(config.net_send_rate);
        if !config.replicate_movement {
            timer.stop();
        }

        Ok(Self {
            reconciler: Reconciler::new(&config),
            rest: RestState::awake(),
            tracker: RestStateTracker::new(),
            timer,
            should_sync: true,
            last_role: NetworkRole::None,
            events: Vec::new(),
            config,
        })
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn queue(&self) -> &StateQueue {
        self.reconciler.queue()
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub fn rest_state(&self) -> &RestState {
        &self.rest
    }

    pub fn tracker(&self) -> &RestStateTracker {
        &self.tracker
    }

    pub fn should_sync(&self) -> bool {
        self.should_sync
    }

    pub fn is_sending(&self) -> bool {
        self.timer.is_running()
    }

    /// Dispatches a message received from the authority.
    pub fn on_message(&mut self, message: SyncMessage, now: f64, role: NetworkRole) {
        match message {
            SyncMessage::State(state) => {
                self.on_state_received(state, now, role);
            }
            SyncMessage::Rest(rest) => self.on_rest_received(rest),
            SyncMessage::OwnerChanged => self.on_owner_changed(),
        }
    }

    /// Handles a state broadcast to every peer. Returns `None` when the state
    /// was ignored outright.
    pub fn on_state_received(
        &mut self,
        state: NetState,
        now: f64,
        role: NetworkRole,
    ) -> Option<InsertOutcome> {
        if !self.should_sync || role.is_owner() {
            return None;
        }
        Some(self.reconciler.insert(state, now, &self.config))
    }

    /// Server-side handler for a state sent by the owner: forwards it to every
    /// client and plays it locally like any other receiver.
    pub fn relay_state<T>(
        &mut self,
        state: NetState,
        now: f64,
        role: NetworkRole,
        transport: &mut T,
    ) -> Option<InsertOutcome>
    where
        T: Transport + ?Sized,
    {
        transport.send_unreliable(SyncMessage::State(state));
        self.on_state_received(state, now, role)
    }

    /// Applies a rest transition. Accepted even while not syncing.
    pub fn on_rest_received(&mut self, rest: RestState) {
        if rest.resting != self.rest.resting {
            log::debug!(
                "rest state -> {}",
                if rest.resting { "resting" } else { "awake" }
            );
            self.events.push(SyncEvent::RestChanged {
                resting: rest.resting,
            });
        }
        self.rest = rest;
    }

    /// Server-side handler for a rest transition from the owner.
    pub fn relay_rest<T>(&mut self, rest: RestState, transport: &mut T)
    where
        T: Transport + ?Sized,
    {
        transport.send_reliable(SyncMessage::Rest(rest));
        self.on_rest_received(rest);
    }

    pub fn on_owner_changed(&mut self) {
        log::info!("vehicle owner changed, dropping {} queued states", self.queue().len());
        self.reconciler.clear();
        self.events.push(SyncEvent::OwnerChanged);
    }

    pub fn possessed<T>(&mut self, has_authority: bool, transport: &mut T)
    where
        T: Transport + ?Sized,
    {
        self.possession_changed(has_authority, transport);
    }

    pub fn unpossessed<T>(&mut self, has_authority: bool, transport: &mut T)
    where
        T: Transport + ?Sized,
    {
        self.possession_changed(has_authority, transport);
    }

    fn possession_changed<T>(&mut self, has_authority: bool, transport: &mut T)
    where
        T: Transport + ?Sized,
    {
        if has_authority {
            transport.send_reliable(SyncMessage::OwnerChanged);
        }
        self.reconciler.clear();
    }

    pub fn set_should_sync(&mut self, should_sync: bool) {
        self.should_sync = should_sync;

        if self.config.replicate_movement && should_sync {
            self.timer.start();
        } else {
            self.timer.stop();
            self.rest = RestState::awake();
            self.reconciler.clear();
        }
    }

    /// Advances the send timer; on the owner, samples and publishes the body
    /// when it fires.
    pub fn update_send<B, T>(
        &mut self,
        now: f64,
        dt: f32,
        role: NetworkRole,
        body: &B,
        transport: &mut T,
    ) -> Option<SampleOutcome>
    where
        B: VehicleBody + ?Sized,
        T: Transport + ?Sized,
    {
        if !self.timer.advance(dt) || !role.is_owner() {
            return None;
        }

        let outcome = self.tracker.sample(now, &mut self.rest, body, transport);
        match outcome {
            SampleOutcome::Rested => self.events.push(SyncEvent::RestChanged { resting: true }),
            SampleOutcome::StateAndWake => {
                self.events.push(SyncEvent::RestChanged { resting: false })
            }
            _ => {}
        }

        if !self.reconciler.queue().is_empty() {
            self.reconciler.clear();
        }

        Some(outcome)
    }

    /// Plays queued states onto the body. Does nothing on the owner.
    pub fn tick<B, W>(
        &mut self,
        now: f64,
        dt: f32,
        role: NetworkRole,
        body: &mut B,
        wheels: &mut W,
    ) -> TickOutcome
    where
        B: VehicleBody + ?Sized,
        W: WheelCollaborator + ?Sized,
    {
        if role != self.last_role {
            log::info!("network role {} -> {}", self.last_role.as_str(), role.as_str());
            // The first observed role is not a handover; keep what arrived before it.
            if self.last_role != NetworkRole::None {
                self.reconciler.clear();
            }
            self.events.push(SyncEvent::RoleChanged {
                from: self.last_role,
                to: role,
            });
            self.last_role = role;
        }

        if !role.plays_back() || !self.config.replicate_movement || !self.should_sync {
            return TickOutcome::Idle;
        }

        let outcome = self.reconciler.tick(
            &self.config,
            &self.rest,
            FrameTime::new(now, dt),
            body,
            wheels,
        );

        let teleported = matches!(
            outcome,
            TickOutcome::Resting(MoveOutcome::Teleported)
                | TickOutcome::Blending {
                    movement: MoveOutcome::Teleported,
                    ..
                }
                | TickOutcome::Settled {
                    movement: MoveOutcome::Teleported
                }
        );
        if teleported {
            self.events.push(SyncEvent::Teleported);
        }

        outcome
    }

    pub fn drain_events(&mut self) -> impl Iterator<Item = SyncEvent> + '_ {
        self.events.drain(..)
    }
}

#[cfg(test)]
mod tests {
    use glam::{Quat, Vec3};

    use super::*;
    use crate::net::Outbox;
    use crate::physics::Transform;

    #[derive(Default)]
    struct Body {
        transform: Transform,
        awake: bool,
    }

    impl VehicleBody for Body {
        fn transform(&self) -> Option<Transform> {
            Some(self.transform)
        }
        fn set_transform(&mut self, transform: Transform, _teleport: bool) {
            self.transform = transform;
        }
        fn linear_velocity(&self) -> Option<Vec3> {
            Some(Vec3::ZERO)
        }
        fn set_linear_velocity(&mut self, _velocity: Vec3) {}
        fn angular_velocity(&self) -> Option<Vec3> {
            Some(Vec3::ZERO)
        }
        fn set_angular_velocity(&mut self, _velocity: Vec3) {}
        fn is_awake(&self) -> bool {
            self.awake
        }
        fn put_to_sleep(&mut self) {
            self.awake = false;
        }
    }

    fn state(timestamp: f64, x: f32) -> NetState {
        NetState::new(timestamp, Vec3::new(x, 0.0, 0.0), Quat::IDENTITY)
    }

    #[test]
    fn owner_ignores_inbound_states() {
        let mut sync = VehicleSync::new(SyncConfig::default()).unwrap();

        assert_eq!(sync.on_state_received(state(1.0, 1.0), 1.0, NetworkRole::Owner), None);
        assert!(sync.queue().is_empty());

        let outcome = sync.on_state_received(state(1.0, 1.0), 1.0, NetworkRole::Client);
        assert_eq!(outcome, Some(InsertOutcome::Queued { index: 0 }));
    }

    #[test]
    fn disabling_sync_clears_everything() {
        let mut sync = VehicleSync::new(SyncConfig::default()).unwrap();
        sync.on_state_received(state(1.0, 1.0), 1.0, NetworkRole::Client);
        sync.on_rest_received(RestState::resting(state(1.0, 1.0)));

        sync.set_should_sync(false);

        assert!(sync.queue().is_empty());
        assert!(!sync.rest_state().resting);
        assert!(!sync.is_sending());
        assert_eq!(sync.on_state_received(state(2.0, 1.0), 2.0, NetworkRole::Client), None);

        sync.set_should_sync(true);
        assert!(sync.is_sending());
    }

    #[test]
    fn possession_by_authority_announces_owner_change() {
        let mut sync = VehicleSync::new(SyncConfig::default()).unwrap();
        let mut outbox = Outbox::new();
        sync.on_state_received(state(1.0, 1.0), 1.0, NetworkRole::Server);

        sync.possessed(true, &mut outbox);
        sync.unpossessed(false, &mut outbox);

        assert!(sync.queue().is_empty());
        let reliable: Vec<_> = outbox.reliable().cloned().collect();
        assert_eq!(reliable, vec![SyncMessage::OwnerChanged]);
    }

    #[test]
    fn owner_changed_clears_and_notifies() {
        let mut sync = VehicleSync::new(SyncConfig::default()).unwrap();
        sync.on_state_received(state(1.0, 1.0), 1.0, NetworkRole::Client);

        sync.on_owner_changed();

        assert!(sync.queue().is_empty());
        assert_eq!(sync.drain_events().collect::<Vec<_>>(), vec![SyncEvent::OwnerChanged]);
    }

    #[test]
    fn relay_forwards_and_queues() {
        let mut sync = VehicleSync::new(SyncConfig::default()).unwrap();
        let mut outbox = Outbox::new();

        sync.relay_state(state(1.0, 1.0), 1.0, NetworkRole::Server, &mut outbox);

        assert_eq!(outbox.unreliable().count(), 1);
        assert_eq!(sync.queue().len(), 1);
    }

    #[test]
    fn owner_sends_on_timer_and_drops_stale_queue() {
        let mut sync = VehicleSync::new(SyncConfig::default()).unwrap();
        let mut outbox = Outbox::new();
        let body = Body {
            awake: true,
            ..Default::default()
        };
        sync.on_state_received(state(1.0, 1.0), 1.0, NetworkRole::Client);

        assert_eq!(
            sync.update_send(1.0, 0.01, NetworkRole::Owner, &body, &mut outbox),
            None
        );
        assert_eq!(
            sync.update_send(1.05, 0.05, NetworkRole::Owner, &body, &mut outbox),
            Some(SampleOutcome::State)
        );
        assert!(sync.queue().is_empty());
        assert_eq!(outbox.unreliable().count(), 1);
    }

    #[test]
    fn non_owner_never_samples() {
        let mut sync = VehicleSync::new(SyncConfig::default()).unwrap();
        let mut outbox = Outbox::new();
        let body = Body {
            awake: true,
            ..Default::default()
        };

        for i in 0..10 {
            sync.update_send(i as f64 * 0.1, 0.1, NetworkRole::Client, &body, &mut outbox);
        }

        assert!(outbox.is_empty());
    }

    #[test]
    fn tick_is_inert_on_owner() {
        let mut sync = VehicleSync::new(SyncConfig::default()).unwrap();
        let mut body = Body::default();
        sync.on_state_received(state(1.0, 50.0), 1.0, NetworkRole::Client);

        let outcome = sync.tick(1.2, 0.016, NetworkRole::Owner, &mut body, &mut ());

        assert_eq!(outcome, TickOutcome::Idle);
        assert_eq!(body.transform, Transform::default());
        assert!(matches!(
            sync.drain_events().next(),
            Some(SyncEvent::RoleChanged {
                to: NetworkRole::Owner,
                ..
            })
        ));
    }

    #[test]
    fn teleport_is_reported() {
        let mut sync = VehicleSync::new(SyncConfig::default()).unwrap();
        let mut body = Body::default();
        sync.on_state_received(state(1.0, 5000.0), 1.0, NetworkRole::Client);

        sync.tick(1.2, 0.016, NetworkRole::Client, &mut body, &mut ());

        assert!(sync.drain_events().any(|e| e == SyncEvent::Teleported));
        assert_eq!(body.transform.position.x, 5000.0);
    }

    #[test]
    fn role_change_abandons_segment() {
        let mut sync = VehicleSync::new(SyncConfig::default()).unwrap();
        let mut body = Body::default();
        sync.on_state_received(state(1.0, 5.0), 1.0, NetworkRole::Client);
        sync.on_state_received(state(1.05, 6.0), 1.0, NetworkRole::Client);

        let outcome = sync.tick(0.9, 0.016, NetworkRole::Client, &mut body, &mut ());
        assert!(matches!(outcome, TickOutcome::Blending { .. }));
        assert!(sync.reconciler().anchor().is_some());
        let before = body.transform;

        let outcome = sync.tick(0.95, 0.016, NetworkRole::ClientSpawned, &mut body, &mut ());

        assert_eq!(outcome, TickOutcome::Idle);
        assert!(sync.queue().is_empty());
        assert!(sync.reconciler().anchor().is_none());
        assert_eq!(body.transform, before);
    }

    #[test]
    fn first_role_keeps_early_states() {
        let mut sync = VehicleSync::new(SyncConfig::default()).unwrap();
        let mut body = Body::default();
        sync.on_state_received(state(1.0, 5.0), 1.0, NetworkRole::Client);

        let outcome = sync.tick(1.0, 0.016, NetworkRole::Client, &mut body, &mut ());

        assert!(matches!(outcome, TickOutcome::Blending { .. }));
        assert_eq!(sync.queue().len(), 1);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = SyncConfig {
            queue_capacity: 0,
            ..Default::default()
        };
        assert_eq!(VehicleSync::new(config).unwrap_err(), ConfigError::QueueCapacity);
    }
}
