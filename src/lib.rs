// bnkpatch
// Copyright (c) 2024 The bnkpatch Authors
//
// SPDX-License-Identifier: MIT

//! Reading, extracting and in-place patching of Wwise SoundBank (`.bnk`)
//! files.
//!
//! A bank is a run of `tag + length + payload` chunks starting at `BKHD`.
//! The `DIDX` chunk is a table of `(id, offset, size)` records pointing into
//! the `DATA` chunk, one per embedded sub-resource (usually a WEM stream).
//!
//! - [`chunk::locate`] finds the `DIDX` and `DATA` chunks.
//! - [`index::extract`] carves sub-resources out of a bank.
//! - [`patch::patch`] overwrites sub-resources without moving anything.
//! - [`batch`] drives these over files on disk.

pub mod batch;
pub mod chunk;
pub mod config;
pub mod error;
pub mod index;
pub mod patch;
pub mod tools;

#[cfg(test)]
mod test_support;

pub use chunk::{locate, BankLayout};
pub use config::Config;
pub use error::{BankError, Result};
pub use index::{extract, IndexEntry, SubResource};
pub use patch::{patch, PatchOutcome, PatchRecord};
