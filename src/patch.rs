// bnkpatch
// Copyright (c) 2024 The bnkpatch Authors
//
// SPDX-License-Identifier: MIT

use std::collections::HashMap;
use std::ops::Range;

use byteorder::{ByteOrder, LittleEndian};

use crate::chunk::BankLayout;
use crate::error::{BankError, Result};
use crate::index::{entries, IndexEntry};

/// Byte offset of the size field within a 12 byte index record.
const SIZE_FIELD: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
    Patched { old_size: u32, new_size: u32 },
    /// No replacement was supplied for this id.
    Skipped,
    /// The replacement does not fit the slot; nothing was written.
    TooLarge { size: usize, capacity: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchRecord {
    pub id: u32,
    pub outcome: PatchOutcome,
}

struct SlotWrite<'r> {
    entry: IndexEntry,
    slot: Range<usize>,
    bytes: &'r [u8],
}

/// Overwrite indexed sub-resources in place.
///
/// Each replacement is written at the start of its slot and the rest of the
/// original slot is zeroed. The entry's size field is set to the new length
/// while its offset is kept, so no other entry moves and the buffer length
/// never changes.
///
/// Slot ranges are validated before anything is written: on error the buffer
/// is left exactly as it was. Patching two entries whose slots overlap is
/// rejected as malformed.
pub fn patch(
    buffer: &mut [u8],
    layout: &BankLayout,
    replacements: &HashMap<u32, Vec<u8>>,
) -> Result<Vec<PatchRecord>> {
    let table: Vec<IndexEntry> = entries(buffer, layout).collect();

    let mut records = Vec::with_capacity(table.len());
    let mut writes = Vec::new();

    for entry in table {
        let outcome = match replacements.get(&entry.id) {
            None => PatchOutcome::Skipped,
            Some(bytes) if bytes.len() > entry.size as usize => PatchOutcome::TooLarge {
                size: bytes.len(),
                capacity: entry.size,
            },
            Some(bytes) => {
                let slot = entry.range(layout)?;
                writes.push(SlotWrite { entry, slot, bytes });
                PatchOutcome::Patched { old_size: entry.size, new_size: bytes.len() as u32 }
            }
        };

        records.push(PatchRecord { id: entry.id, outcome });
    }

    // A later zero-fill would erase an earlier replacement.
    let mut planned: Vec<&SlotWrite> = writes.iter().filter(|w| !w.slot.is_empty()).collect();
    planned.sort_by_key(|w| w.slot.start);
    for pair in planned.windows(2) {
        if pair[1].slot.start < pair[0].slot.end {
            return Err(BankError::OverlappingEntries { id: pair[1].entry.id, other: pair[0].entry.id });
        }
    }

    for write in writes {
        let (head, tail) = buffer[write.slot].split_at_mut(write.bytes.len());
        head.copy_from_slice(write.bytes);
        tail.fill(0);

        let field = write.entry.position + SIZE_FIELD;
        LittleEndian::write_u32(&mut buffer[field..field + 4], write.bytes.len() as u32);
    }

    Ok(records)
}
