//! Game constants - memory windows, structure sizes, caps
//!
//! All magic numbers from Pokémon Emerald that are not part of the
//! relocatable layout catalog (see `layout` for field addresses).

use num_enum::TryFromPrimitive;
use serde::Serialize;
use std::ops::RangeInclusive;
use std::time::Duration;

// =============================================================================
// ADDRESSABLE WINDOWS
// =============================================================================

/// On-board work RAM (EWRAM), 256 KiB
pub const EWRAM: RangeInclusive<u32> = 0x0200_0000..=0x0203_FFFF;

/// In-chip work RAM (IWRAM), 32 KiB
pub const IWRAM: RangeInclusive<u32> = 0x0300_0000..=0x0300_7FFF;

/// Windows a dereferenced pointer may land in
pub const WORK_RAM_WINDOWS: [RangeInclusive<u32>; 2] = [EWRAM, IWRAM];

/// Default per-byte request timeout
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(1);

// =============================================================================
// PARTY
// =============================================================================

/// Maximum number of Pokémon in the party
pub const MAX_PARTY_SIZE: u8 = 6;

/// Size of one party Pokémon structure
pub const POKEMON_BLOCK_SIZE: usize = 100;

/// Offset of the encrypted substructure payload
pub const ENCRYPTED_OFFSET: usize = 32;

/// Size of the encrypted payload (four substructures)
pub const ENCRYPTED_SIZE: usize = 48;

/// Size of one substructure
pub const SUBSTRUCTURE_SIZE: usize = 12;

/// Offset and length of the nickname
pub const NICKNAME_OFFSET: usize = 8;
pub const NICKNAME_LEN: usize = 10;

/// Offset of the language byte
pub const LANGUAGE_OFFSET: usize = 18;

/// Offset of the stored u16 checksum over the decrypted payload
pub const CHECKSUM_OFFSET: usize = 28;

/// Plaintext battle-stat region
pub const STATUS_OFFSET: usize = 80;
pub const LEVEL_OFFSET: usize = 84;
pub const CURRENT_HP_OFFSET: usize = 86;
pub const MAX_HP_OFFSET: usize = 88;

/// Shiny threshold for `(tid ^ sid ^ pid_hi ^ pid_lo)`
pub const SHINY_THRESHOLD: u32 = 8;

// =============================================================================
// ECONOMY & INVENTORY
// =============================================================================

/// Money cap; anything above means the key was wrong
pub const MAX_MONEY: u32 = 999_999;

/// Size of one bag slot (item id u16 + quantity u16)
pub const ITEM_SLOT_SIZE: usize = 4;

/// Largest quantity a bag or PC slot can hold
pub const MAX_ITEM_QUANTITY: u16 = 999;

// =============================================================================
// TEXT
// =============================================================================

/// String terminator
pub const TEXT_TERMINATOR: u8 = 0xFF;

/// Player name buffer length (7 glyphs + terminator)
pub const PLAYER_NAME_LEN: usize = 8;

/// Sentinel for names that decode to nothing
pub const UNKNOWN_TEXT: &str = "Unknown";

/// Sentinel for a location that could not be read
pub const UNKNOWN_LOCATION: &str = "Unknown Location";

// =============================================================================
// LANGUAGE
// =============================================================================

/// Game language stored in each Pokémon structure
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, TryFromPrimitive)]
pub enum Language {
    Japanese = 1,
    English = 2,
    French = 3,
    Italian = 4,
    German = 5,
    Spanish = 7,
}
