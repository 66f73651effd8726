//! Binary layout catalog
//!
//! Maps every field the snapshot needs to where it lives in memory. Several
//! blocks (coordinates, map, money, bag, player name) sit inside save blocks
//! that the game relocates at runtime; their base address is read from a
//! fixed pointer slot first. Swapping the `Layout` is the only change needed
//! to target another game revision, and it can be loaded from TOML.
//!
//! The coordinate and map offsets are the least verified entries in the
//! Emerald catalog; check them against a known save state before trusting
//! location data on a new ROM build.

use serde::{Deserialize, Serialize};

use super::constants::{ITEM_SLOT_SIZE, PLAYER_NAME_LEN, POKEMON_BLOCK_SIZE};
use super::economy::KeySource;
use super::error::MemoryError;
use super::traits::ByteSource;

// =============================================================================
// FIELD LOCATION
// =============================================================================

/// Where a field lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldLocation {
    /// Fixed address
    Absolute { address: u32 },
    /// Two-hop chain: read the pointer at `pointer_address`, then read at pointer + `offset`
    Pointer { pointer_address: u32, offset: i32 },
}

impl FieldLocation {
    /// Read `length` bytes at this location
    pub fn read<M: ByteSource + ?Sized>(
        &self,
        mem: &M,
        length: usize,
    ) -> Result<Vec<u8>, MemoryError> {
        match *self {
            FieldLocation::Absolute { address } => mem.read_bytes(address, length),
            FieldLocation::Pointer {
                pointer_address,
                offset,
            } => mem.read_via_pointer(pointer_address, offset, length),
        }
    }

    /// The same location shifted by `delta` bytes
    pub fn offset_by(&self, delta: i32) -> FieldLocation {
        match *self {
            FieldLocation::Absolute { address } => FieldLocation::Absolute {
                address: (address as i64 + delta as i64) as u32,
            },
            FieldLocation::Pointer {
                pointer_address,
                offset,
            } => FieldLocation::Pointer {
                pointer_address,
                offset: offset + delta,
            },
        }
    }
}

/// A located field with a fixed byte size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    #[serde(flatten)]
    pub location: FieldLocation,
    pub size: usize,
}

impl FieldSpec {
    pub const fn new(location: FieldLocation, size: usize) -> Self {
        Self { location, size }
    }

    /// Read exactly `size` bytes
    pub fn read<M: ByteSource + ?Sized>(&self, mem: &M) -> Result<Vec<u8>, MemoryError> {
        self.location.read(mem, self.size)
    }
}

// =============================================================================
// POCKETS
// =============================================================================

/// Bag pocket identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pocket {
    Items,
    KeyItems,
    PokeBalls,
    TmsHms,
    Berries,
}

impl Pocket {
    pub fn as_str(self) -> &'static str {
        match self {
            Pocket::Items => "items",
            Pocket::KeyItems => "key_items",
            Pocket::PokeBalls => "poke_balls",
            Pocket::TmsHms => "tms_hms",
            Pocket::Berries => "berries",
        }
    }
}

/// One fixed-capacity bag pocket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PocketDescriptor {
    pub pocket: Pocket,
    #[serde(flatten)]
    pub location: FieldLocation,
    pub capacity: usize,
}

impl PocketDescriptor {
    /// Location of slot `index` (4 bytes per slot)
    pub fn slot(&self, index: usize) -> FieldLocation {
        self.location.offset_by((index * ITEM_SLOT_SIZE) as i32)
    }
}

// =============================================================================
// LAYOUT
// =============================================================================

/// Full field catalog for one game revision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    /// Human-readable revision name, used in logs
    pub name: String,
    /// Party count byte
    pub party_count: FieldLocation,
    /// First party slot; slots follow every `party_stride` bytes
    pub party_base: FieldLocation,
    #[serde(default = "default_party_stride")]
    pub party_stride: usize,
    /// Player name, encoded text
    pub player_name: FieldSpec,
    /// x (s16) followed by y (s16)
    pub coordinates: FieldLocation,
    /// map bank (u8) followed by map id (u8)
    pub map: FieldLocation,
    /// Encrypted money (u32)
    pub money: FieldLocation,
    /// Money key strategies, tried in order
    pub money_key: Vec<KeySource>,
    /// Bag quantities are XORed with the low half of the money key
    #[serde(default)]
    pub bag_quantities_encrypted: bool,
    pub pockets: Vec<PocketDescriptor>,
}

fn default_party_stride() -> usize {
    POKEMON_BLOCK_SIZE
}

/// Fixed IWRAM slot holding the SaveBlock1 pointer (Emerald)
pub const EMERALD_SAVE_BLOCK_1_PTR: u32 = 0x0300_5D8C;

/// Fixed IWRAM slot holding the SaveBlock2 pointer (Emerald)
pub const EMERALD_SAVE_BLOCK_2_PTR: u32 = 0x0300_5D90;

/// Encryption key offset inside SaveBlock2
pub const EMERALD_ENCRYPTION_KEY_OFFSET: i32 = 0xAC;

/// Un-relocated SaveBlock2 image; fallback when the pointer is unusable
pub const EMERALD_SAVE_BLOCK_2_STATIC: u32 = 0x0202_4A54;

impl Layout {
    /// Pokémon Emerald (US)
    pub fn emerald() -> Self {
        let sb1 = |offset: i32| FieldLocation::Pointer {
            pointer_address: EMERALD_SAVE_BLOCK_1_PTR,
            offset,
        };
        let sb2 = |offset: i32| FieldLocation::Pointer {
            pointer_address: EMERALD_SAVE_BLOCK_2_PTR,
            offset,
        };
        let pocket = |pocket: Pocket, offset: i32, capacity: usize| PocketDescriptor {
            pocket,
            location: sb1(offset),
            capacity,
        };

        Self {
            name: "emerald".to_string(),
            party_count: FieldLocation::Absolute {
                address: 0x0202_44E9,
            },
            party_base: FieldLocation::Absolute {
                address: 0x0202_44EC,
            },
            party_stride: POKEMON_BLOCK_SIZE,
            player_name: FieldSpec::new(sb2(0x00), PLAYER_NAME_LEN),
            coordinates: sb1(0x00),
            map: sb1(0x04),
            money: sb1(0x490),
            money_key: vec![
                KeySource::Pointer {
                    pointer_address: EMERALD_SAVE_BLOCK_2_PTR,
                    offset: EMERALD_ENCRYPTION_KEY_OFFSET,
                },
                KeySource::Direct {
                    address: EMERALD_SAVE_BLOCK_2_STATIC + EMERALD_ENCRYPTION_KEY_OFFSET as u32,
                },
            ],
            bag_quantities_encrypted: true,
            pockets: vec![
                pocket(Pocket::Items, 0x560, 30),
                pocket(Pocket::KeyItems, 0x5D8, 30),
                pocket(Pocket::PokeBalls, 0x650, 16),
                pocket(Pocket::TmsHms, 0x690, 64),
                pocket(Pocket::Berries, 0x790, 46),
            ],
        }
    }

    /// Location of party slot `index`
    pub fn party_slot(&self, index: usize) -> FieldLocation {
        self.party_base
            .offset_by((index * self.party_stride) as i32)
    }
}

impl Default for Layout {
    fn default() -> Self {
        Self::emerald()
    }
}
