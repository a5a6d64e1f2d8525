// bnkpatch
// Copyright (c) 2024 The bnkpatch Authors
//
// SPDX-License-Identifier: MIT

use byteorder::{ByteOrder, LittleEndian};

use crate::chunk::BankLayout;
use crate::error::{BankError, Result};

pub const INDEX_ENTRY_SIZE: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    pub id: u32,
    /// Relative to the start of the DATA payload.
    pub offset: u32,
    pub size: u32,
    /// Absolute position of this record inside the bank buffer.
    pub position: usize,
}

impl IndexEntry {
    /// Absolute slot range, checked against the end of the DATA payload.
    pub fn range(&self, layout: &BankLayout) -> Result<std::ops::Range<usize>> {
        let start = layout.data_offset + self.offset as usize;
        let end = start + self.size as usize;
        let limit = layout.data_end();

        if end > limit {
            return Err(BankError::EntryOutOfBounds { id: self.id, start, end, limit });
        }

        Ok(start..end)
    }
}

/// A sub-resource borrowed out of the bank buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubResource<'a> {
    pub id: u32,
    pub data: &'a [u8],
}

/// Number of whole records in the DIDX payload. A trailing partial record is
/// ignored.
pub fn entry_count(layout: &BankLayout) -> usize {
    layout.didx_size / INDEX_ENTRY_SIZE
}

fn parse_entry(buffer: &[u8], position: usize) -> IndexEntry {
    let record = &buffer[position..position + INDEX_ENTRY_SIZE];

    IndexEntry {
        id: LittleEndian::read_u32(&record[0..4]),
        offset: LittleEndian::read_u32(&record[4..8]),
        size: LittleEndian::read_u32(&record[8..12]),
        position,
    }
}

/// Iterates the DIDX records in table order.
///
/// `locate` has already checked that the DIDX payload fits in the buffer.
pub fn entries<'a>(buffer: &'a [u8], layout: &BankLayout) -> impl Iterator<Item = IndexEntry> + 'a {
    let didx_offset = layout.didx_offset;
    (0..entry_count(layout)).map(move |i| parse_entry(buffer, didx_offset + i * INDEX_ENTRY_SIZE))
}

/// Lazily carves every indexed sub-resource out of the bank, in DIDX order.
///
/// An entry pointing past the DATA payload yields an error for that item
/// only; the remaining entries are still produced.
pub fn extract<'a>(
    buffer: &'a [u8],
    layout: &BankLayout,
) -> impl Iterator<Item = Result<SubResource<'a>>> + 'a {
    let layout = *layout;
    entries(buffer, &layout).map(move |entry| {
        let range = entry.range(&layout)?;
        Ok(SubResource { id: entry.id, data: &buffer[range] })
    })
}
