// bnkpatch
// Copyright (c) 2024 The bnkpatch Authors
//
// SPDX-License-Identifier: MIT

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::Result;

pub const DEFAULT_CONFIG_FILE: &str = "bnkpatch.toml";

/// Paths and options shared by every command. Built once at start-up and
/// passed by reference; nothing mutates it afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Encoder executable or `.cmd`/`.bat` wrapper.
    pub encoder_path: Option<PathBuf>,
    /// Decoder executable (vgmstream-cli).
    pub decoder_path: Option<PathBuf>,
    /// Directory holding the source banks.
    pub bank_dir: PathBuf,
    /// Extraction root; one sub-directory per bank.
    pub audio_dir: PathBuf,
    /// Replacement sub-resources named `<id>.<ext>`.
    pub replacement_dir: PathBuf,
    /// Destination for patched banks and encoded files.
    pub output_dir: PathBuf,
    pub subresource_extension: String,
    pub decoded_extension: String,
    pub encode_quality: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            encoder_path: None,
            decoder_path: None,
            bank_dir: PathBuf::from("BNK"),
            audio_dir: PathBuf::from("AudioFiles"),
            replacement_dir: PathBuf::from("NewWAVandWEMS"),
            output_dir: PathBuf::from("Output"),
            subresource_extension: "wem".to_string(),
            decoded_extension: "wav".to_string(),
            encode_quality: None,
        }
    }
}

impl Config {
    pub fn from_toml(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let source = fs::read_to_string(path.as_ref())?;
        debug!("Loaded config from {}", path.as_ref().display());
        Self::from_toml(&source)
    }

    /// Load `path` if given, otherwise `bnkpatch.toml` in the working
    /// directory when present, otherwise the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => Self::load(DEFAULT_CONFIG_FILE),
            None => Ok(Self::default()),
        }
    }

    /// Fill unset tool paths from the usual `Settings/` layout under `base`.
    pub fn detect_tools(mut self, base: &Path) -> Self {
        let settings = base.join("Settings");

        if self.encoder_path.is_none() {
            self.encoder_path = Some(settings.join("Sound2Wem.cmd")).filter(|p| p.is_file());
        }

        if self.decoder_path.is_none() {
            let mut candidates = Vec::new();
            for dir in ["vgmstream", "vgstream"] {
                for exe in ["vgmstream-cli.exe", "vgmstream-cli"] {
                    candidates.push(settings.join(dir).join(exe));
                }
            }
            self.decoder_path = candidates.into_iter().find(|p| p.is_file());
        }

        self
    }
}
