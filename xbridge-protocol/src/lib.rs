// XBridge swap coordinator core: registry, routing and the swap state machine

pub mod address_book;
pub mod amount;
pub mod api;
pub mod config;
pub mod cross_chain;
pub mod data_structures;
pub mod error;
pub mod network;
pub mod session;
pub mod transaction;

pub mod test_utils; // Shared fixtures for unit and integration tests

pub use config::BridgeConfig;
pub use cross_chain::{BridgeState, SwapCoordinator};
pub use error::{BridgeError, BridgeResult, ErrorKind};
