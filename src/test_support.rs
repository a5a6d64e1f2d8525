// bnkpatch
// Copyright (c) 2024 The bnkpatch Authors
//
// SPDX-License-Identifier: MIT

use byteorder::{LittleEndian, WriteBytesExt};

pub fn chunk(tag: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(8 + payload.len());
    out.extend_from_slice(tag);
    out.write_u32::<LittleEndian>(payload.len() as u32).unwrap();
    out.extend_from_slice(payload);
    out
}

/// Builds a minimal `BKHD`/`DIDX`/`DATA` bank in memory.
pub struct BankBuilder {
    entries: Vec<(u32, u32, u32)>,
    data: Vec<u8>,
}

impl BankBuilder {
    pub fn new() -> Self {
        BankBuilder { entries: Vec::new(), data: Vec::new() }
    }

    /// Appends `payload` to DATA and indexes it under `id`.
    pub fn entry(mut self, id: u32, payload: &[u8]) -> Self {
        let offset = self.data.len() as u32;
        self.data.extend_from_slice(payload);
        self.entries.push((id, offset, payload.len() as u32));
        self
    }

    /// Indexes an arbitrary slot without touching DATA.
    pub fn raw_entry(mut self, id: u32, offset: u32, size: u32) -> Self {
        self.entries.push((id, offset, size));
        self
    }

    pub fn data(mut self, data: &[u8]) -> Self {
        self.data = data.to_vec();
        self
    }

    pub fn didx(&self) -> Vec<u8> {
        let mut didx = Vec::with_capacity(self.entries.len() * 12);
        for (id, offset, size) in &self.entries {
            didx.write_u32::<LittleEndian>(*id).unwrap();
            didx.write_u32::<LittleEndian>(*offset).unwrap();
            didx.write_u32::<LittleEndian>(*size).unwrap();
        }
        didx
    }

    pub fn build(&self) -> Vec<u8> {
        let mut header = Vec::new();
        header.write_u32::<LittleEndian>(0x8c).unwrap();
        header.write_u32::<LittleEndian>(0x1234_5678).unwrap();

        let mut out = chunk(b"BKHD", &header);
        out.extend(chunk(b"DIDX", &self.didx()));
        out.extend(chunk(b"DATA", &self.data));
        out.extend(chunk(b"HIRC", &[0x42; 12]));
        out
    }
}
