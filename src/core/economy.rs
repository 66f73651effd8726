//! Money decryption
//!
//! Money is stored XORed with a 32-bit key kept in SaveBlock2. Different
//! builds keep that key in different places, so the key is resolved from an
//! ordered list of `KeySource` strategies; the first one that reads wins.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::constants::MAX_MONEY;
use super::error::{DecodeError, FieldError, MemoryError};
use super::layout::FieldLocation;
use super::traits::{le_u32, ByteSource};

// =============================================================================
// KEY SOURCES
// =============================================================================

/// One strategy for locating the 4-byte XOR key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum KeySource {
    /// Key at pointer + offset (relocated save block)
    Pointer { pointer_address: u32, offset: i32 },
    /// Key at a fixed address
    Direct { address: u32 },
}

impl KeySource {
    /// Where the key bytes live
    pub fn location(&self) -> FieldLocation {
        match *self {
            KeySource::Pointer {
                pointer_address,
                offset,
            } => FieldLocation::Pointer {
                pointer_address,
                offset,
            },
            KeySource::Direct { address } => FieldLocation::Absolute { address },
        }
    }

    /// Read the key this strategy points at
    pub fn resolve<M: ByteSource + ?Sized>(&self, mem: &M) -> Result<u32, MemoryError> {
        let bytes = self.location().read(mem, 4)?;
        le_u32(self.anchor(), &bytes)
    }

    fn anchor(&self) -> u32 {
        match *self {
            KeySource::Pointer {
                pointer_address, ..
            } => pointer_address,
            KeySource::Direct { address } => address,
        }
    }
}

/// Try each source in order and return the first key that reads
///
/// Only a null or out-of-range pointer moves on to the next source. Transport
/// and protocol errors are returned as-is so the caller can retry the same
/// source instead of settling for a stale fallback copy. Returns the last
/// pointer error when every source is unusable, or `DecodeError::NoKeySource`
/// when the list is empty.
pub fn resolve_key<M: ByteSource + ?Sized>(
    mem: &M,
    sources: &[KeySource],
) -> Result<u32, FieldError> {
    let mut last_error: Option<MemoryError> = None;
    for source in sources {
        match source.resolve(mem) {
            Ok(key) => {
                debug!(?source, "[economy] Key resolved");
                return Ok(key);
            }
            Err(e) if e.is_pointer_error() => {
                warn!(?source, error = %e, "[economy] Key pointer unusable, trying next source");
                last_error = Some(e);
            }
            Err(e) => {
                warn!(?source, error = %e, "[economy] Key read failed");
                return Err(FieldError::Memory(e));
            }
        }
    }
    Err(match last_error {
        Some(e) => FieldError::Memory(e),
        None => FieldError::Decode(DecodeError::NoKeySource),
    })
}

// =============================================================================
// DECODING
// =============================================================================

/// Decrypt money: `encrypted ^ key`, rejected above the in-game cap
pub fn decode_money(encrypted: u32, key: u32) -> Result<u32, DecodeError> {
    let value = encrypted ^ key;
    if value > MAX_MONEY {
        return Err(DecodeError::MoneyOutOfRange {
            value,
            cap: MAX_MONEY,
        });
    }
    Ok(value)
}

/// Read the encrypted money at `location` and decrypt it with `key`
pub fn read_money<M: ByteSource + ?Sized>(
    mem: &M,
    location: &FieldLocation,
    key: u32,
) -> Result<u32, FieldError> {
    let bytes = location.read(mem, 4)?;
    let encrypted = le_u32(0, &bytes)?;
    Ok(decode_money(encrypted, key)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::traits::mocks::MockMemory;

    const SB2_PTR: u32 = 0x0300_5D90;
    const SB2: u32 = 0x0202_4A54;
    const DIRECT_KEY: u32 = 0x0202_4B00;

    fn sources() -> Vec<KeySource> {
        vec![
            KeySource::Pointer {
                pointer_address: SB2_PTR,
                offset: 0xAC,
            },
            KeySource::Direct {
                address: DIRECT_KEY,
            },
        ]
    }

    #[test]
    fn test_decode_money_is_xor() {
        let key = 0x1234_5678;
        for money in [0u32, 1, 3000, 123_456, MAX_MONEY] {
            assert_eq!(decode_money(money ^ key, key), Ok(money));
        }
    }

    #[test]
    fn test_decode_money_rejects_over_cap() {
        assert_eq!(
            decode_money(0xFFFF_FFFF, 0),
            Err(DecodeError::MoneyOutOfRange {
                value: 0xFFFF_FFFF,
                cap: MAX_MONEY
            })
        );
        assert!(decode_money(MAX_MONEY + 1, 0).is_err());
    }

    #[test]
    fn test_pointer_key_takes_priority() {
        let mut mem = MockMemory::new();
        mem.write_u32(SB2_PTR, SB2);
        mem.write_u32(SB2 + 0xAC, 0xAAAA_AAAA);
        mem.write_u32(DIRECT_KEY, 0xBBBB_BBBB);

        assert_eq!(resolve_key(&mem, &sources()), Ok(0xAAAA_AAAA));
        assert!(!mem.was_read(DIRECT_KEY));
    }

    #[test]
    fn test_null_pointer_falls_back_to_direct() {
        let mut mem = MockMemory::new();
        mem.write_u32(DIRECT_KEY, 0xBBBB_BBBB);

        assert_eq!(resolve_key(&mem, &sources()), Ok(0xBBBB_BBBB));
    }

    #[test]
    fn test_out_of_range_pointer_falls_back_to_direct() {
        let mut mem = MockMemory::new();
        mem.write_u32(SB2_PTR, 0x0800_0000);
        mem.write_u32(DIRECT_KEY, 0xCCCC_CCCC);

        assert_eq!(resolve_key(&mem, &sources()), Ok(0xCCCC_CCCC));
    }

    #[test]
    fn test_all_sources_fail_returns_last_error() {
        let mut mem = MockMemory::new();
        mem.timeout_at(DIRECT_KEY);

        let err = resolve_key(&mem, &sources()).unwrap_err();
        match err {
            FieldError::Memory(e) => assert!(e.is_retryable()),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_transport_error_does_not_fall_back() {
        let mut mem = MockMemory::new();
        mem.write_u32(SB2_PTR, SB2);
        mem.write_u32(SB2 + 0xAC, 0xAAAA_AAAA);
        mem.fail_times(SB2 + 0xAC, MockMemory::timeout(SB2 + 0xAC), 1);
        mem.write_u32(DIRECT_KEY, 0x0BAD_0BAD);

        let err = resolve_key(&mem, &sources()).unwrap_err();
        assert!(err.is_retryable());
        assert!(!mem.was_read(DIRECT_KEY));

        // The same source succeeds on the next attempt
        assert_eq!(resolve_key(&mem, &sources()), Ok(0xAAAA_AAAA));
    }

    #[test]
    fn test_protocol_error_does_not_fall_back() {
        let mut mem = MockMemory::new();
        mem.write_u32(SB2_PTR, SB2);
        mem.fail(
            SB2 + 0xAC,
            MemoryError::Protocol {
                address: SB2 + 0xAC,
                body: "zz".to_string(),
            },
        );
        mem.write_u32(DIRECT_KEY, 0x0BAD_0BAD);

        match resolve_key(&mem, &sources()) {
            Err(FieldError::Memory(e)) => {
                assert!(matches!(e.root_cause(), MemoryError::Protocol { .. }))
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(!mem.was_read(DIRECT_KEY));
    }

    #[test]
    fn test_empty_source_list() {
        let mem = MockMemory::new();
        assert_eq!(
            resolve_key(&mem, &[]),
            Err(FieldError::Decode(DecodeError::NoKeySource))
        );
    }

    #[test]
    fn test_read_money() {
        let mut mem = MockMemory::new();
        mem.write_u32(0x0200_0490, 3000 ^ 0x5555_0000);

        let location = FieldLocation::Absolute {
            address: 0x0200_0490,
        };
        assert_eq!(read_money(&mem, &location, 0x5555_0000), Ok(3000));
        assert!(matches!(
            read_money(&mem, &location, 0),
            Err(FieldError::Decode(DecodeError::MoneyOutOfRange { .. }))
        ));
    }
}
