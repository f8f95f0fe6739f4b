mod protocol;
mod simulator;
mod state;
mod transport;

pub use protocol::{
    Channel, MAX_PACKET_SIZE, PROTOCOL_MAGIC, PROTOCOL_VERSION, Packet, PacketError, PacketHeader,
    SyncMessage,
};
pub use simulator::{LinkRng, LinkStats, PacketLossSimulation, SimulatedLink};
pub use state::{NetState, RestState};
pub use transport::{Outbox, Transport};
