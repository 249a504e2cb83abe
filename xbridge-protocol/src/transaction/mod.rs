// Swap registry: the three partitions plus the unconfirmed and parked-packet tables

pub mod registry;
pub mod side_tables;

pub use registry::{RegistrySnapshot, TransactionRegistry, Transition};
pub use side_tables::{ParkedPacket, PendingPackets, UnconfirmedTable};
