// bnkpatch
// Copyright (c) 2024 The bnkpatch Authors
//
// SPDX-License-Identifier: MIT

#![allow(dead_code)]

use byteorder::{LittleEndian, WriteBytesExt};

pub fn chunk(tag: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(8 + payload.len());
    out.extend_from_slice(tag);
    out.write_u32::<LittleEndian>(payload.len() as u32).unwrap();
    out.extend_from_slice(payload);
    out
}

/// A bank with the given `(id, offset, size)` records over `data`.
pub fn bank(entries: &[(u32, u32, u32)], data: &[u8]) -> Vec<u8> {
    let mut didx = Vec::new();
    for (id, offset, size) in entries {
        didx.write_u32::<LittleEndian>(*id).unwrap();
        didx.write_u32::<LittleEndian>(*offset).unwrap();
        didx.write_u32::<LittleEndian>(*size).unwrap();
    }

    let mut out = chunk(b"BKHD", &[0x8c, 0, 0, 0, 1, 2, 3, 4]);
    out.extend(chunk(b"DIDX", &didx));
    out.extend(chunk(b"DATA", data));
    out.extend(chunk(b"HIRC", &[0x11; 20]));
    out
}

/// ids 10, 11, 12 at offsets 0, 100, 250 with sizes 100, 150, 50.
pub fn three_entry_bank() -> Vec<u8> {
    let data: Vec<u8> = (0..300u32).map(|b| (b % 200) as u8 + 1).collect();
    bank(&[(10, 0, 100), (11, 100, 150), (12, 250, 50)], &data)
}
