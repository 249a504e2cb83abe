// Cross-chain swap coordination module entry point

pub mod inbound;
pub mod swap_coordinator;
pub mod types;

pub use swap_coordinator::{BridgeState, SwapCoordinator};
pub use types::{AcceptOutcome, CancelOutcome, Delivery, FinalizeOutcome, SwapRequest};
