//! Snapshot assembly
//!
//! Builds a `GameState` from independent field reads. The party size is read
//! first and is the only fatal field; every other field that fails is
//! replaced by its sentinel and listed in `GameState::unavailable`, unless
//! strict mode asks for the first failure instead.
//!
//! Sentinels:
//! - player name: `"Unknown"`
//! - location: `"Unknown Location"` (coordinates fall back to 0,0)
//! - money: `None`
//! - party slot / pocket: omitted

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::constants::{MAX_PARTY_SIZE, UNKNOWN_TEXT};
use super::economy::{read_money, resolve_key};
use super::error::{DecodeError, FieldError, MemoryError, SnapshotError};
use super::inventory::read_pocket;
use super::layout::Layout;
use super::pokemon::read_pokemon;
use super::text;
use super::traits::ByteSource;
use super::types::{Field, FieldFailure, GameState, Location};

// =============================================================================
// OPTIONS
// =============================================================================

/// How the assembler reacts to field failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotOptions {
    /// Return the first field failure instead of a sentinel
    #[serde(default)]
    pub strict: bool,
    /// Extra attempts per field after a transport error
    #[serde(default = "default_transport_retries")]
    pub transport_retries: u32,
}

fn default_transport_retries() -> u32 {
    1
}

impl Default for SnapshotOptions {
    fn default() -> Self {
        Self {
            strict: false,
            transport_retries: default_transport_retries(),
        }
    }
}

// =============================================================================
// RETRIES AND FAILURE BOOKKEEPING
// =============================================================================

trait Retryable: std::fmt::Display {
    fn retryable(&self) -> bool;
}

impl Retryable for MemoryError {
    fn retryable(&self) -> bool {
        self.is_retryable()
    }
}

impl Retryable for FieldError {
    fn retryable(&self) -> bool {
        self.is_retryable()
    }
}

/// Run `op`, retrying up to `retries` extra times on transport errors only
fn with_retries<T, E: Retryable>(
    retries: u32,
    field: Field,
    mut op: impl FnMut() -> Result<T, E>,
) -> Result<T, E> {
    let mut attempt = 0;
    loop {
        match op() {
            Err(e) if e.retryable() && attempt < retries => {
                attempt += 1;
                debug!(%field, attempt, error = %e, "[snapshot] Transport error, retrying");
            }
            result => return result,
        }
    }
}

/// Collects field failures, or short-circuits in strict mode
struct Failures {
    strict: bool,
    entries: Vec<FieldFailure>,
}

impl Failures {
    fn new(strict: bool) -> Self {
        Self {
            strict,
            entries: Vec::new(),
        }
    }

    /// `Ok(Some)` on success, `Ok(None)` for a recorded failure
    fn record<T>(
        &mut self,
        field: Field,
        result: Result<T, FieldError>,
    ) -> Result<Option<T>, SnapshotError> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(source) if self.strict => Err(SnapshotError::Field {
                field: field.to_string(),
                source,
            }),
            Err(e) => {
                warn!(%field, error = %e, "[snapshot] Field unavailable, using sentinel");
                self.push(field, e.to_string());
                Ok(None)
            }
        }
    }

    /// Record a failure caused by another field's failure
    fn push(&mut self, field: Field, reason: String) {
        self.entries.push(FieldFailure { field, reason });
    }
}

// =============================================================================
// FIELD READERS
// =============================================================================

fn read_party_size<M: ByteSource + ?Sized>(mem: &M, layout: &Layout) -> Result<u8, MemoryError> {
    let bytes = layout.party_count.read(mem, 1)?;
    Ok(bytes[0])
}

fn read_player_name<M: ByteSource + ?Sized>(
    mem: &M,
    layout: &Layout,
) -> Result<String, FieldError> {
    let bytes = layout.player_name.read(mem)?;
    Ok(text::decode(&bytes))
}

fn read_coordinates<M: ByteSource + ?Sized>(
    mem: &M,
    layout: &Layout,
) -> Result<(i32, i32), FieldError> {
    let b = layout.coordinates.read(mem, 4)?;
    let x = i16::from_le_bytes([b[0], b[1]]) as i32;
    let y = i16::from_le_bytes([b[2], b[3]]) as i32;
    Ok((x, y))
}

fn read_map<M: ByteSource + ?Sized>(mem: &M, layout: &Layout) -> Result<(u8, u8), FieldError> {
    let b = layout.map.read(mem, 2)?;
    Ok((b[0], b[1]))
}

// =============================================================================
// ASSEMBLY
// =============================================================================

/// Take one snapshot of game state
///
/// Fails only when the party size cannot be read, or on the first field
/// failure when `options.strict` is set.
pub fn assemble_snapshot<M: ByteSource + ?Sized>(
    mem: &M,
    layout: &Layout,
    options: &SnapshotOptions,
) -> Result<GameState, SnapshotError> {
    let retries = options.transport_retries;
    let mut failures = Failures::new(options.strict);

    // Party size gates everything else
    let raw_party_size = with_retries(retries, Field::PartySize, || read_party_size(mem, layout))
        .map_err(|e| {
            warn!(error = %e, "[snapshot] Party size unreadable, aborting snapshot");
            SnapshotError::PartySize(e)
        })?;
    let party_size = if raw_party_size > MAX_PARTY_SIZE {
        warn!(raw_party_size, "[snapshot] Party size out of range, treating as empty");
        failures.record::<()>(
            Field::PartySize,
            Err(DecodeError::PartySizeOutOfRange(raw_party_size).into()),
        )?;
        0
    } else {
        raw_party_size as usize
    };

    let player_name = failures
        .record(
            Field::PlayerName,
            with_retries(retries, Field::PlayerName, || read_player_name(mem, layout)),
        )?
        .unwrap_or_else(|| UNKNOWN_TEXT.to_string());

    let (x, y) = failures
        .record(
            Field::Coordinates,
            with_retries(retries, Field::Coordinates, || read_coordinates(mem, layout)),
        )?
        .unwrap_or((0, 0));

    let location = match failures.record(
        Field::MapId,
        with_retries(retries, Field::MapId, || read_map(mem, layout)),
    )? {
        Some((map_bank, map_id)) => Location::new(map_bank, map_id, x, y),
        None => Location::unknown(x, y),
    };

    let key = failures.record(
        Field::MoneyKey,
        with_retries(retries, Field::MoneyKey, || {
            resolve_key(mem, &layout.money_key)
        }),
    )?;

    let money_result = key.map(|key| {
        with_retries(retries, Field::Money, || read_money(mem, &layout.money, key))
    });
    // Money over the cap means the key came from the wrong place
    let key_rejected = matches!(
        money_result,
        Some(Err(FieldError::Decode(DecodeError::MoneyOutOfRange { .. })))
    );
    let money = match money_result {
        Some(result) => failures.record(Field::Money, result)?,
        None => {
            failures.push(Field::Money, "money key unavailable".to_string());
            None
        }
    };

    let mut party = Vec::with_capacity(party_size);
    for index in 0..party_size {
        let slot = layout.party_slot(index);
        let field = Field::PartySlot(index);
        if let Some(pokemon) = failures.record(
            field,
            with_retries(retries, field, || read_pokemon(mem, &slot)),
        )? {
            party.push(pokemon);
        }
    }

    let quantity_key = match (layout.bag_quantities_encrypted, key) {
        (false, _) => Ok(0),
        (true, Some(_)) if key_rejected => Err("quantity key failed the money range check"),
        (true, Some(key)) => Ok(key as u16),
        (true, None) => Err("bag quantity key unavailable"),
    };

    let mut items = Vec::new();
    for descriptor in &layout.pockets {
        let field = Field::Pocket(descriptor.pocket);
        let quantity_key = match quantity_key {
            Ok(quantity_key) => quantity_key,
            Err(reason) => {
                failures.push(field, reason.to_string());
                continue;
            }
        };
        if let Some(pocket_items) = failures.record(
            field,
            with_retries(retries, field, || read_pocket(mem, descriptor, quantity_key)),
        )? {
            items.extend(pocket_items);
        }
    }

    let state = GameState {
        player_name,
        location,
        money,
        party,
        items,
        unavailable: failures.entries,
        captured_at: Utc::now(),
    };

    info!(
        layout = %layout.name,
        party = state.party.len(),
        items = state.items.len(),
        unavailable = state.unavailable.len(),
        "[snapshot] Snapshot assembled"
    );
    Ok(state)
}

/// Layout and options bundled for repeated polling
#[derive(Debug, Clone, Default)]
pub struct Snapshotter {
    layout: Layout,
    options: SnapshotOptions,
}

impl Snapshotter {
    pub fn new(layout: Layout, options: SnapshotOptions) -> Self {
        Self { layout, options }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn options(&self) -> &SnapshotOptions {
        &self.options
    }

    /// Take one snapshot from `mem`
    pub fn take<M: ByteSource + ?Sized>(&self, mem: &M) -> Result<GameState, SnapshotError> {
        assemble_snapshot(mem, &self.layout, &self.options)
    }
}
