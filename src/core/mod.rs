//! Core module - platform-independent decoding engine
//!
//! Nothing in here performs I/O directly: every read goes through the
//! `ByteSource` trait so the whole engine runs against `MockMemory` in tests.

pub mod constants;
pub mod economy;
pub mod error;
pub mod inventory;
pub mod layout;
pub mod map_utils;
pub mod names;
pub mod pokemon;
pub mod snapshot;
pub mod status;
pub mod text;
pub mod traits;
pub mod types;

pub use error::{DecodeError, FieldError, MemoryError, SnapshotError};
pub use layout::{FieldLocation, Layout, Pocket};
pub use snapshot::{assemble_snapshot, SnapshotOptions, Snapshotter};
pub use status::{parse_status, EmulatorStatus};
pub use traits::ByteSource;
pub use types::{GameState, ItemSlot, Location, PokemonInfo, StatusCondition};
