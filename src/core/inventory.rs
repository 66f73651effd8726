//! Bag pocket decoding
//!
//! A pocket is a fixed-capacity array of 4-byte slots (item id u16, quantity
//! u16). The first slot with item id 0 ends the pocket; anything after it is
//! stale and never read. On revisions that encrypt bag quantities, each
//! quantity is XORed with the low 16 bits of the money key. A decrypted
//! quantity above `MAX_ITEM_QUANTITY` rejects the whole pocket.

use tracing::trace;

use super::constants::{ITEM_SLOT_SIZE, MAX_ITEM_QUANTITY};
use super::error::{DecodeError, FieldError};
use super::layout::{Pocket, PocketDescriptor};
use super::traits::ByteSource;
use super::types::ItemSlot;

/// Result of decoding one slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotEntry {
    /// Item id 0: no more items in this pocket
    End,
    /// Item present but quantity 0 after decryption
    Empty,
    Item(ItemSlot),
}

/// Decode one 4-byte slot
pub fn decode_slot(
    bytes: [u8; ITEM_SLOT_SIZE],
    pocket: Pocket,
    quantity_key: u16,
) -> Result<SlotEntry, DecodeError> {
    let item_id = u16::from_le_bytes([bytes[0], bytes[1]]);
    if item_id == 0 {
        return Ok(SlotEntry::End);
    }
    let quantity = u16::from_le_bytes([bytes[2], bytes[3]]) ^ quantity_key;
    if quantity == 0 {
        return Ok(SlotEntry::Empty);
    }
    if quantity > MAX_ITEM_QUANTITY {
        return Err(DecodeError::ItemQuantityOutOfRange {
            item_id,
            quantity,
            cap: MAX_ITEM_QUANTITY,
        });
    }
    Ok(SlotEntry::Item(ItemSlot {
        pocket,
        item_id,
        quantity,
    }))
}

/// Decode an already-read pocket buffer
///
/// A trailing partial slot is ignored.
pub fn decode_pocket(
    bytes: &[u8],
    pocket: Pocket,
    quantity_key: u16,
) -> Result<Vec<ItemSlot>, DecodeError> {
    let mut items = Vec::new();
    for chunk in bytes.chunks_exact(ITEM_SLOT_SIZE) {
        let slot = [chunk[0], chunk[1], chunk[2], chunk[3]];
        match decode_slot(slot, pocket, quantity_key)? {
            SlotEntry::End => break,
            SlotEntry::Empty => continue,
            SlotEntry::Item(item) => items.push(item),
        }
    }
    Ok(items)
}

/// Read a pocket from memory, one slot at a time
///
/// Stops at the sentinel so slots past it are never requested. Any failed
/// slot read fails the whole pocket.
pub fn read_pocket<M: ByteSource + ?Sized>(
    mem: &M,
    descriptor: &PocketDescriptor,
    quantity_key: u16,
) -> Result<Vec<ItemSlot>, FieldError> {
    let mut items = Vec::new();
    for index in 0..descriptor.capacity {
        let bytes = descriptor.slot(index).read(mem, ITEM_SLOT_SIZE)?;
        let slot = [bytes[0], bytes[1], bytes[2], bytes[3]];
        match decode_slot(slot, descriptor.pocket, quantity_key)? {
            SlotEntry::End => {
                trace!(pocket = descriptor.pocket.as_str(), index, "[inventory] Sentinel reached");
                break;
            }
            SlotEntry::Empty => continue,
            SlotEntry::Item(item) => items.push(item),
        }
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::layout::FieldLocation;
    use crate::core::traits::mocks::MockMemory;

    fn slot(item: u16, qty: u16) -> Vec<u8> {
        let mut v = item.to_le_bytes().to_vec();
        v.extend_from_slice(&qty.to_le_bytes());
        v
    }

    #[test]
    fn test_decode_pocket_stops_at_sentinel() {
        let mut bytes = Vec::new();
        bytes.extend(slot(13, 5));
        bytes.extend(slot(14, 2));
        bytes.extend(slot(20, 1));
        bytes.extend(slot(0, 0));
        // Stale garbage after the sentinel
        bytes.extend(slot(0xBEEF, 0xFFFF));
        bytes.extend(slot(99, 9));

        let items = decode_pocket(&bytes, Pocket::Items, 0).unwrap();
        let ids: Vec<u16> = items.iter().map(|i| i.item_id).collect();
        assert_eq!(ids, vec![13, 14, 20]);
        assert_eq!(items[0].quantity, 5);
        assert!(items.iter().all(|i| i.pocket == Pocket::Items));
    }

    #[test]
    fn test_zero_quantity_skipped() {
        let mut bytes = Vec::new();
        bytes.extend(slot(13, 0));
        bytes.extend(slot(14, 3));
        let items = decode_pocket(&bytes, Pocket::Berries, 0).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].item_id, 14);
    }

    #[test]
    fn test_quantities_decrypted_with_key() {
        let key = 0x5A5A;
        let mut bytes = Vec::new();
        bytes.extend(slot(4, 10 ^ key));
        // Encrypted zero is the key itself
        bytes.extend(slot(5, key));
        let items = decode_pocket(&bytes, Pocket::PokeBalls, key).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 10);
    }

    #[test]
    fn test_empty_and_partial_buffers() {
        assert!(decode_pocket(&[], Pocket::Items, 0).unwrap().is_empty());
        assert!(decode_pocket(&[13, 0, 1], Pocket::Items, 0).unwrap().is_empty());
    }

    #[test]
    fn test_quantity_over_cap_rejects_pocket() {
        let mut bytes = Vec::new();
        bytes.extend(slot(13, MAX_ITEM_QUANTITY));
        bytes.extend(slot(14, MAX_ITEM_QUANTITY + 1));
        assert_eq!(
            decode_pocket(&bytes, Pocket::Items, 0),
            Err(DecodeError::ItemQuantityOutOfRange {
                item_id: 14,
                quantity: 1000,
                cap: MAX_ITEM_QUANTITY
            })
        );
        assert_eq!(
            decode_slot([13, 0, 0xE7, 0x03], Pocket::Items, 0),
            Ok(SlotEntry::Item(ItemSlot {
                pocket: Pocket::Items,
                item_id: 13,
                quantity: 999
            }))
        );
    }

    #[test]
    fn test_read_pocket_with_wrong_key_is_decode_error() {
        let base = 0x0202_5000;
        let mut mem = MockMemory::new();
        mem.write(base, &slot(13, 5 ^ 0x5678));
        mem.write(base + 4, &slot(0, 0));

        let descriptor = PocketDescriptor {
            pocket: Pocket::Items,
            location: FieldLocation::Absolute { address: base },
            capacity: 30,
        };
        assert_eq!(read_pocket(&mem, &descriptor, 0x5678).unwrap()[0].quantity, 5);
        assert!(matches!(
            read_pocket(&mem, &descriptor, 0x0BAD),
            Err(FieldError::Decode(DecodeError::ItemQuantityOutOfRange { item_id: 13, .. }))
        ));
    }

    #[test]
    fn test_read_pocket_never_reads_past_sentinel() {
        let base = 0x0202_5000;
        let mut mem = MockMemory::new();
        let mut bytes = Vec::new();
        bytes.extend(slot(13, 5));
        bytes.extend(slot(14, 2));
        bytes.extend(slot(0, 0));
        mem.write(base, &bytes);
        // A read here would fail the pocket
        mem.timeout_at(base + 12);

        let descriptor = PocketDescriptor {
            pocket: Pocket::Items,
            location: FieldLocation::Absolute { address: base },
            capacity: 30,
        };
        let items = read_pocket(&mem, &descriptor, 0).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(mem.read_count(), 12);
        assert!(!mem.was_read(base + 12));
    }

    #[test]
    fn test_read_pocket_full_capacity() {
        let base = 0x0202_5000;
        let mut mem = MockMemory::new();
        for i in 0..4u32 {
            mem.write(base + i * 4, &slot(100 + i as u16, 1));
        }
        let descriptor = PocketDescriptor {
            pocket: Pocket::TmsHms,
            location: FieldLocation::Absolute { address: base },
            capacity: 4,
        };
        assert_eq!(read_pocket(&mem, &descriptor, 0).unwrap().len(), 4);
        assert!(!mem.was_read(base + 16));
    }

    #[test]
    fn test_read_pocket_failure_fails_pocket() {
        let base = 0x0202_5000;
        let mut mem = MockMemory::new();
        mem.write(base, &slot(13, 5));
        mem.timeout_at(base + 5);

        let descriptor = PocketDescriptor {
            pocket: Pocket::Items,
            location: FieldLocation::Absolute { address: base },
            capacity: 30,
        };
        assert!(matches!(
            read_pocket(&mem, &descriptor, 0),
            Err(FieldError::Memory(_))
        ));
    }
}
