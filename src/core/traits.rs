//! Core traits - abstractions over the emulator's memory interface
//!
//! The remote debug protocol only exposes single-byte reads. `ByteSource`
//! therefore asks implementors for `read_byte` alone and builds every wider
//! read (bulk bytes, little-endian integers, pointer dereferences) on top of it.
//! The HTTP implementation lives in `client::http`; tests use `mocks::MockMemory`.

use super::constants::WORK_RAM_WINDOWS;
use super::error::MemoryError;

// =============================================================================
// BYTE SOURCE
// =============================================================================

/// Byte-granular access to emulator memory
///
/// Implementations are stateless transport wrappers: no retries, no caching
/// of decoded values. Retry policy belongs to the snapshot assembler.
pub trait ByteSource {
    /// Read one byte at `address`
    fn read_byte(&self, address: u32) -> Result<u8, MemoryError>;

    /// Read `length` consecutive bytes, one request per byte
    ///
    /// Aborts on the first failing byte and reports its position.
    fn read_bytes(&self, address: u32, length: usize) -> Result<Vec<u8>, MemoryError> {
        let mut bytes = Vec::with_capacity(length);
        for position in 0..length {
            let byte_address = address.wrapping_add(position as u32);
            match self.read_byte(byte_address) {
                Ok(byte) => bytes.push(byte),
                Err(cause) => {
                    return Err(MemoryError::Aborted {
                        start: address,
                        length,
                        position,
                        cause: Box::new(cause),
                    })
                }
            }
        }
        Ok(bytes)
    }

    /// Read a u8
    fn read_u8(&self, address: u32) -> Result<u8, MemoryError> {
        self.read_byte(address)
    }

    /// Read a little-endian u16
    fn read_u16(&self, address: u32) -> Result<u16, MemoryError> {
        let bytes = self.read_bytes(address, 2)?;
        Ok(u16::from_le_bytes(exact::<2>(address, &bytes)?))
    }

    /// Read a little-endian u32
    fn read_u32(&self, address: u32) -> Result<u32, MemoryError> {
        let bytes = self.read_bytes(address, 4)?;
        le_u32(address, &bytes)
    }

    /// Read a 4-byte little-endian pointer
    fn read_pointer(&self, address: u32) -> Result<u32, MemoryError> {
        self.read_u32(address)
    }

    /// Dereference `pointer_address`, add `offset`, and read `length` bytes there
    ///
    /// The whole target span must sit inside one work RAM window.
    fn read_via_pointer(
        &self,
        pointer_address: u32,
        offset: i32,
        length: usize,
    ) -> Result<Vec<u8>, MemoryError> {
        let base = self.read_pointer(pointer_address)?;
        if base == 0 {
            return Err(MemoryError::NullPointer { pointer_address });
        }
        let target = base as i64 + offset as i64;
        if !in_work_ram(target, length) {
            return Err(MemoryError::OutOfRange {
                pointer_address,
                target,
            });
        }
        self.read_bytes(target as u32, length)
    }
}

impl<T: ByteSource + ?Sized> ByteSource for &T {
    fn read_byte(&self, address: u32) -> Result<u8, MemoryError> {
        (**self).read_byte(address)
    }
}

/// Check that `[target, target + length)` lies inside a single work RAM window
pub fn in_work_ram(target: i64, length: usize) -> bool {
    let last = target + length.saturating_sub(1) as i64;
    WORK_RAM_WINDOWS.iter().any(|window| {
        let start = *window.start() as i64;
        let end = *window.end() as i64;
        target >= start && last <= end
    })
}

/// Interpret exactly four bytes as a little-endian u32
pub fn le_u32(address: u32, bytes: &[u8]) -> Result<u32, MemoryError> {
    Ok(u32::from_le_bytes(exact::<4>(address, bytes)?))
}

fn exact<const N: usize>(address: u32, bytes: &[u8]) -> Result<[u8; N], MemoryError> {
    bytes.try_into().map_err(|_| MemoryError::ShortRead {
        address,
        wanted: N,
        got: bytes.len(),
    })
}

// =============================================================================
// TEST MOCKS
// =============================================================================


// =============================================================================
// TESTS
// =============================================================================
