// bnkpatch
// Copyright (c) 2024 The bnkpatch Authors
//
// SPDX-License-Identifier: MIT

use std::fs::File;
use std::io::Read;
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};
use memchr::memmem;

use crate::error::{BankError, Result};

pub const BANK_HEADER_TAG: [u8; 4] = *b"BKHD";
pub const DATA_INDEX_TAG: [u8; 4] = *b"DIDX";
pub const DATA_TAG: [u8; 4] = *b"DATA";

pub const CHUNK_HEADER_SIZE: usize = 8;

const PROBE_SIZE: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    pub tag: [u8; 4],
    /// Absolute offset of the payload (just past the 8 byte header).
    pub offset: usize,
    pub length: u32,
}

impl ChunkHeader {
    pub fn end(&self) -> usize {
        self.offset.saturating_add(self.length as usize)
    }

    pub fn tag_str(&self) -> String {
        String::from_utf8_lossy(&self.tag).into_owned()
    }
}

/// Where the index table and payload blob live inside a bank buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BankLayout {
    pub anchor: usize,
    pub didx_offset: usize,
    pub didx_size: usize,
    pub data_offset: usize,
    pub data_size: usize,
}

impl BankLayout {
    pub fn data_end(&self) -> usize {
        self.data_offset + self.data_size
    }
}

/// Walks consecutive chunk headers starting at `position`.
pub struct Chunks<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> Iterator for Chunks<'a> {
    type Item = ChunkHeader;

    fn next(&mut self) -> Option<ChunkHeader> {
        let remaining = self.buffer.len().checked_sub(self.position)?;
        if remaining < CHUNK_HEADER_SIZE {
            return None;
        }

        let mut header = &self.buffer[self.position..self.position + CHUNK_HEADER_SIZE];
        let mut tag = [0u8; 4];
        header.read_exact(&mut tag).ok()?;
        let length = header.read_u32::<LittleEndian>().ok()?;

        let offset = self.position + CHUNK_HEADER_SIZE;
        self.position = offset.saturating_add(length as usize);

        Some(ChunkHeader { tag, offset, length })
    }
}

pub fn find_anchor(buffer: &[u8]) -> Option<usize> {
    memmem::find(buffer, &BANK_HEADER_TAG)
}

pub fn chunks(buffer: &[u8], anchor: usize) -> Chunks<'_> {
    Chunks { buffer, position: anchor }
}

fn check_bounds(chunk: &ChunkHeader, tag: &'static str, limit: usize) -> Result<()> {
    if chunk.end() > limit {
        return Err(BankError::ChunkOutOfBounds {
            tag,
            offset: chunk.offset,
            length: chunk.length as usize,
            limit,
        });
    }
    Ok(())
}

/// Find the DIDX and DATA chunks of a bank.
///
/// The walk always runs to the end of the buffer; when a tag appears more
/// than once the last occurrence wins.
pub fn locate(buffer: &[u8]) -> Result<BankLayout> {
    let anchor = find_anchor(buffer).ok_or(BankError::NotABank)?;

    let mut didx: Option<ChunkHeader> = None;
    let mut data: Option<ChunkHeader> = None;

    for chunk in chunks(buffer, anchor) {
        match chunk.tag {
            DATA_INDEX_TAG => didx = Some(chunk),
            DATA_TAG => data = Some(chunk),
            _ => {}
        }
    }

    let didx = didx.ok_or(BankError::MissingChunk { tag: "DIDX" })?;
    let data = data.ok_or(BankError::MissingChunk { tag: "DATA" })?;

    check_bounds(&didx, "DIDX", buffer.len())?;
    check_bounds(&data, "DATA", buffer.len())?;

    Ok(BankLayout {
        anchor,
        didx_offset: didx.offset,
        didx_size: didx.length as usize,
        data_offset: data.offset,
        data_size: data.length as usize,
    })
}

/// Cheap pre-check on the first few KiB of a file, used to skip files that
/// are obviously not banks without reading them whole.
pub fn probe<P: AsRef<Path>>(path: P) -> Result<bool> {
    let file = File::open(path)?;
    let mut head = Vec::with_capacity(PROBE_SIZE);
    file.take(PROBE_SIZE as u64).read_to_end(&mut head)?;

    Ok(find_anchor(&head).is_some())
}
