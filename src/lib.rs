// GBA state reader: Pokémon Emerald memory introspection over an emulator debug server

pub mod client;
pub mod core;

pub use crate::client::config::Config;
pub use crate::client::http::HttpMemoryClient;
pub use crate::core::{assemble_snapshot, GameState, Layout, SnapshotOptions, Snapshotter};
