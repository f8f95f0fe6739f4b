pub mod net;
pub mod physics;
pub mod role;
pub mod sync;
pub mod vehicle;

pub use net::{
    Channel, LinkStats, NetState, Outbox, Packet, PacketError, PacketHeader,
    PacketLossSimulation, RestState, SimulatedLink, SyncMessage, Transport,
};
pub use physics::{
    ChassisBody, PhysicsWorld, RigDesc, SetupError, Transform, VehicleBody, VehicleRig,
    WheelCollaborator, WheelRequests,
};
pub use role::{NetworkRole, RoleFacts, RoleSource};
pub use sync::{
    ConfigError, InsertOutcome, MoveOutcome, Reconciler, RestStateTracker, SampleOutcome,
    StateQueue, SyncAxes, SyncConfig, TickOutcome,
};
pub use vehicle::{SyncEvent, VehicleSync};
