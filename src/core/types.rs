//! Core types - the snapshot value objects
//!
//! Every type here is produced fresh for each snapshot and never mutated in
//! place afterwards. All of them serialize to JSON for prompt builders and
//! debugging dashboards.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::constants::{Language, UNKNOWN_LOCATION};
use super::layout::Pocket;
use super::map_utils::format_map_label;
use super::names::map_name;

// =============================================================================
// STATUS CONDITION
// =============================================================================

/// Primary status condition, one at a time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusCondition {
    #[default]
    Ok,
    Sleep,
    Poison,
    Burn,
    Freeze,
    Paralysis,
}

impl StatusCondition {
    const SLEEP_MASK: u32 = 0b111;
    const POISON: u32 = 1 << 3;
    const BURN: u32 = 1 << 4;
    const FREEZE: u32 = 1 << 5;
    const PARALYSIS: u32 = 1 << 6;
    const TOXIC: u32 = 1 << 7;

    /// Decode the status bitfield
    ///
    /// If several bits are set, the display priority is
    /// Sleep > Paralysis > Freeze > Burn > Poison.
    pub fn from_bits(bits: u32) -> Self {
        if bits & Self::SLEEP_MASK != 0 {
            StatusCondition::Sleep
        } else if bits & Self::PARALYSIS != 0 {
            StatusCondition::Paralysis
        } else if bits & Self::FREEZE != 0 {
            StatusCondition::Freeze
        } else if bits & Self::BURN != 0 {
            StatusCondition::Burn
        } else if bits & (Self::POISON | Self::TOXIC) != 0 {
            StatusCondition::Poison
        } else {
            StatusCondition::Ok
        }
    }
}

// =============================================================================
// POKEMON
// =============================================================================

/// Six-stat spread (IVs or EVs), in HP/Atk/Def/Speed/SpAtk/SpDef order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StatSpread {
    pub hp: u8,
    pub attack: u8,
    pub defense: u8,
    pub speed: u8,
    pub sp_attack: u8,
    pub sp_defense: u8,
}

/// One decoded party member
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PokemonInfo {
    pub species_id: u16,
    pub species_name: Option<&'static str>,
    pub nickname: String,
    pub level: u8,
    pub current_hp: u16,
    pub max_hp: u16,
    pub status: StatusCondition,
    /// Non-empty move slots, in slot order
    pub moves: Vec<u16>,
    /// PP for each entry of `moves`
    pub move_pp: Vec<u8>,
    /// Name for each entry of `moves`, `None` for ids outside the table
    pub move_names: Vec<Option<&'static str>>,
    pub held_item: u16,
    /// Kept for level derivation; no experience curves are shipped
    pub experience: u32,
    pub friendship: u8,
    pub personality_id: u32,
    pub ot_id: u32,
    pub language: Option<Language>,
    pub is_shiny: bool,
    pub is_egg: bool,
    pub ivs: StatSpread,
    pub evs: StatSpread,
    /// Stored checksum matches the decrypted payload
    pub checksum_valid: bool,
}

// =============================================================================
// LOCATION
// =============================================================================

/// Player position on the current map
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Location {
    pub map_bank: u8,
    pub map_id: u8,
    pub x: i32,
    pub y: i32,
    pub display_name: String,
}

impl Location {
    /// Build a location, naming the map from the static table
    pub fn new(map_bank: u8, map_id: u8, x: i32, y: i32) -> Self {
        Self {
            map_bank,
            map_id,
            x,
            y,
            display_name: map_name(map_bank, map_id)
                .unwrap_or_else(|| format_map_label(map_bank, map_id)),
        }
    }

    /// Sentinel for an unreadable map
    pub fn unknown(x: i32, y: i32) -> Self {
        Self {
            map_bank: 0,
            map_id: 0,
            x,
            y,
            display_name: UNKNOWN_LOCATION.to_string(),
        }
    }

    pub fn is_known(&self) -> bool {
        self.display_name != UNKNOWN_LOCATION
    }
}

// =============================================================================
// INVENTORY
// =============================================================================

/// One non-empty bag entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ItemSlot {
    pub pocket: Pocket,
    pub item_id: u16,
    pub quantity: u16,
}

// =============================================================================
// GAME STATE
// =============================================================================

/// Snapshot field names, used to report failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    PartySize,
    PlayerName,
    Coordinates,
    MapId,
    MoneyKey,
    Money,
    PartySlot(usize),
    Pocket(Pocket),
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Field::PartySize => write!(f, "party_size"),
            Field::PlayerName => write!(f, "player_name"),
            Field::Coordinates => write!(f, "coordinates"),
            Field::MapId => write!(f, "map_id"),
            Field::MoneyKey => write!(f, "money_key"),
            Field::Money => write!(f, "money"),
            Field::PartySlot(i) => write!(f, "party_slot_{}", i),
            Field::Pocket(p) => write!(f, "pocket_{}", p.as_str()),
        }
    }
}

/// A field that was replaced by its sentinel
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldFailure {
    pub field: Field,
    pub reason: String,
}

/// One complete read of game state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameState {
    pub player_name: String,
    pub location: Location,
    /// `None` when the money could not be read or decrypted
    pub money: Option<u32>,
    pub party: Vec<PokemonInfo>,
    pub items: Vec<ItemSlot>,
    /// Fields that failed and hold sentinels
    pub unavailable: Vec<FieldFailure>,
    pub captured_at: DateTime<Utc>,
}

impl GameState {
    /// True when `field` failed in this snapshot
    pub fn is_unavailable(&self, field: Field) -> bool {
        self.unavailable.iter().any(|f| f.field == field)
    }

    /// True when every field decoded
    pub fn is_complete(&self) -> bool {
        self.unavailable.is_empty()
    }
}
