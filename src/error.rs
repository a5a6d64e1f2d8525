// bnkpatch
// Copyright (c) 2024 The bnkpatch Authors
//
// SPDX-License-Identifier: MIT

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while reading, extracting or patching a bank.
///
/// Every variant is local to one file (or one sub-resource for the tool
/// variants); batch callers log it and move on to the next file.
#[derive(Error, Debug)]
pub enum BankError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// No `BKHD` signature anywhere in the buffer.
    #[error("no BKHD header found")]
    NotABank,

    /// The chunk walk finished without seeing a required chunk.
    #[error("malformed bank: missing {tag} chunk")]
    MissingChunk { tag: &'static str },

    /// A chunk declares a payload that runs past the end of the file.
    #[error("malformed bank: {tag} chunk at {offset:#x} with length {length:#x} exceeds file size {limit:#x}")]
    ChunkOutOfBounds {
        tag: &'static str,
        offset: usize,
        length: usize,
        limit: usize,
    },

    /// An index entry points outside the DATA payload.
    #[error("malformed bank: entry {id} range {start:#x}..{end:#x} exceeds DATA end {limit:#x}")]
    EntryOutOfBounds {
        id: u32,
        start: usize,
        end: usize,
        limit: usize,
    },

    /// Two index entries that are both being patched share bytes.
    #[error("malformed bank: entry {id} overlaps entry {other}")]
    OverlappingEntries { id: u32, other: u32 },

    /// Another bank in the same batch already extracts into `dir`.
    #[error("{} is already used by {}", .dir.display(), .first.display())]
    DuplicateOutput { dir: PathBuf, first: PathBuf },

    #[error("{tool}: {reason}")]
    ExternalTool { tool: PathBuf, reason: String },

    #[error("expected output missing: {}", .0.display())]
    ToolOutputMissing(PathBuf),

    #[error("invalid config: {0}")]
    Config(#[from] toml::de::Error),
}

impl BankError {
    /// True for the structural failures: anchor present but the chunk
    /// layout or index cannot be trusted.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            BankError::MissingChunk { .. }
                | BankError::ChunkOutOfBounds { .. }
                | BankError::EntryOutOfBounds { .. }
                | BankError::OverlappingEntries { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, BankError>;
