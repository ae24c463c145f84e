//! Network side of LOIL.
//!
//! The [`engine`] runs the authoritative tick loop on its own thread and
//! publishes [`bridge::WorldSnapshot`]s. The [`server`] accepts WebSocket
//! clients, turns their [`protocol`] frames into engine commands and
//! broadcasts location updates read from the latest snapshot.

/// Projection of simulation state into wire snapshots.
pub mod bridge;
/// Tick-loop thread, command queue and snapshot publishing.
pub mod engine;
/// JSON message types exchanged with clients.
pub mod protocol;
/// WebSocket accept loop, sessions and broadcasting.
pub mod server;

#[cfg(test)]
mod testing;

/// Re-export of [`bridge::WorldSnapshot`].
pub use bridge::WorldSnapshot;
/// Re-exports of the engine types.
pub use engine::{Engine, EngineClient, EngineConfig, EngineError};
/// Re-exports of the protocol entry points.
pub use protocol::{ClientMessage, ErrorCode, ServerMessage, parse_client_message};
/// Re-exports of the server types.
pub use server::{Server, ServerConfig};
