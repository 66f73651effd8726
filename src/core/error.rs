//! Error types for memory access and decoding
//!
//! The taxonomy follows how callers are expected to react:
//! - transport errors may be retried,
//! - protocol errors mean the channel or emulator build is wrong,
//! - pointer errors and decode errors are replaced by a sentinel at the field level.

use thiserror::Error;

// =============================================================================
// MEMORY ERRORS
// =============================================================================

/// Errors raised while reading bytes from the emulator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    /// The request never produced a response (timeout, connection refused, ...)
    #[error("transport error reading {address:#010x}: {reason}")]
    Transport {
        address: u32,
        timed_out: bool,
        reason: String,
    },

    /// A response arrived but was not exactly two hex digits
    #[error("malformed response for {address:#010x}: {body:?}")]
    Protocol { address: u32, body: String },

    /// The pointer slot held 0x0
    #[error("null pointer at {pointer_address:#010x}")]
    NullPointer { pointer_address: u32 },

    /// The dereferenced span falls outside work RAM
    #[error("pointer at {pointer_address:#010x} resolves to {target:#x}, outside work RAM")]
    OutOfRange { pointer_address: u32, target: i64 },

    /// Fewer bytes than required came back from a bulk read
    #[error("short read at {address:#010x}: wanted {wanted} bytes, got {got}")]
    ShortRead {
        address: u32,
        wanted: usize,
        got: usize,
    },

    /// A multi-byte read stopped at `position` because one byte failed
    #[error("read of {length} bytes at {start:#010x} aborted at byte {position}: {cause}")]
    Aborted {
        start: u32,
        length: usize,
        position: usize,
        cause: Box<MemoryError>,
    },
}

impl MemoryError {
    /// Innermost error, skipping `Aborted` wrappers
    pub fn root_cause(&self) -> &MemoryError {
        match self {
            MemoryError::Aborted { cause, .. } => cause.root_cause(),
            other => other,
        }
    }

    /// True for transport failures only. Protocol errors are never retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self.root_cause(), MemoryError::Transport { .. })
    }

    /// True for null and out-of-range pointers
    pub fn is_pointer_error(&self) -> bool {
        matches!(
            self.root_cause(),
            MemoryError::NullPointer { .. } | MemoryError::OutOfRange { .. }
        )
    }
}

// =============================================================================
// DECODE ERRORS
// =============================================================================

/// Values that were read successfully but cannot be right
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Decrypted money above the in-game cap: the wrong key was resolved
    #[error("decrypted money {value} exceeds cap {cap}")]
    MoneyOutOfRange { value: u32, cap: u32 },

    /// Party count byte outside 0..=6
    #[error("party size {0} outside 0..=6")]
    PartySizeOutOfRange(u8),

    /// A Pokémon buffer shorter than the fixed block size
    #[error("pokemon block is {len} bytes, expected {expected}")]
    BlockTooShort { len: usize, expected: usize },

    /// Decrypted item quantity above the slot cap: the wrong key was resolved
    #[error("item {item_id} quantity {quantity} exceeds cap {cap}")]
    ItemQuantityOutOfRange { item_id: u16, quantity: u16, cap: u16 },

    /// No configured key source produced a key
    #[error("no key source resolved")]
    NoKeySource,
}

// =============================================================================
// FIELD AND SNAPSHOT ERRORS
// =============================================================================

/// Failure of a single snapshot field
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error(transparent)]
    Memory(#[from] MemoryError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl FieldError {
    /// Decode errors are deterministic; only transport failures are retried
    pub fn is_retryable(&self) -> bool {
        match self {
            FieldError::Memory(e) => e.is_retryable(),
            FieldError::Decode(_) => false,
        }
    }
}

/// Failure of a whole snapshot
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    /// The party size read failed; nothing else can be trusted
    #[error("party size unavailable: {0}")]
    PartySize(#[source] MemoryError),

    /// Strict mode only: the first field that failed
    #[error("field {field} failed: {source}")]
    Field {
        field: String,
        #[source]
        source: FieldError,
    },
}
