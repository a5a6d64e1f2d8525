// bnkpatch
// Copyright (c) 2024 The bnkpatch Authors
//
// SPDX-License-Identifier: MIT

//! File-level driving of the bank codec: reading banks from disk, writing
//! extracted and patched output, and calling out to the external tools.
//!
//! Every function here logs one line per outcome and reports failures per
//! file (or per sub-resource) so a batch always runs to the end.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tempfile::NamedTempFile;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::chunk::{locate, probe};
use crate::config::Config;
use crate::error::{BankError, Result};
use crate::index::{entries, extract, SubResource};
use crate::patch::{patch, PatchOutcome, PatchRecord};
use crate::tools::{Decoder, Encoder};

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn stem_of(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string())
}

fn list_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::from)?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Every regular file directly inside `dir`, sorted by name.
pub fn list_banks(dir: &Path) -> Result<Vec<PathBuf>> {
    list_files(dir)
}

/// Replacement files in `dir` keyed by the numeric id in their file name.
///
/// Only files with `extension` (any case) and a decimal stem are picked up.
pub fn collect_replacements(dir: &Path, extension: &str) -> Result<HashMap<u32, PathBuf>> {
    let mut replacements = HashMap::new();

    for path in list_files(dir)? {
        if !path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case(extension)) {
            continue;
        }

        match path.file_stem().and_then(|s| s.to_str()).and_then(|s| s.parse::<u32>().ok()) {
            Some(id) => {
                replacements.insert(id, path);
            }
            None => debug!("Ignoring {}: no numeric id", display_name(&path)),
        }
    }

    Ok(replacements)
}

/// Write `bytes` to a temporary file next to `path` and rename it into place.
///
/// The temporary file is created owner-only, so `permissions` are applied
/// before the rename.
pub fn write_atomically(path: &Path, bytes: &[u8], permissions: fs::Permissions) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp_file = NamedTempFile::new_in(dir)?;
    temp_file.write_all(bytes)?;
    temp_file.as_file().set_permissions(permissions)?;
    temp_file.as_file().sync_all()?;
    temp_file.persist(path).map_err(|e| BankError::Io(e.error))?;

    Ok(())
}

#[derive(Debug, Default)]
pub struct ExtractReport {
    pub bank: PathBuf,
    pub output_dir: PathBuf,
    /// Ids written, in index order.
    pub extracted: Vec<u32>,
    pub decoded: usize,
    pub decode_failures: Vec<u32>,
}

fn decode_one(decoder: &dyn Decoder, input: &Path, output: &Path) -> Result<()> {
    decoder.decode(input, output)?;

    // A zero exit status is not enough; the file has to be there.
    if !output.is_file() {
        return Err(BankError::ToolOutputMissing(output.to_path_buf()));
    }
    Ok(())
}

/// Extract every sub-resource of one bank into `<audio_dir>/<bank stem>/`.
///
/// The whole index is validated before the first file is written, so a
/// malformed bank produces no output at all. When a decoder is given each
/// sub-resource is also decoded into `<audio_dir>/<bank stem>_WAV/`; decode
/// failures are recorded per id and do not stop the bank.
pub fn extract_bank(bank: &Path, config: &Config, decoder: Option<&dyn Decoder>) -> Result<ExtractReport> {
    let buffer = fs::read(bank)?;
    let layout = locate(&buffer)?;
    let resources: Vec<SubResource> = extract(&buffer, &layout).collect::<Result<_>>()?;

    let stem = stem_of(bank);
    let output_dir = config.audio_dir.join(&stem);
    fs::create_dir_all(&output_dir)?;

    let decoded_dir = config.audio_dir.join(format!("{}_WAV", stem));
    if decoder.is_some() {
        fs::create_dir_all(&decoded_dir)?;
    }

    let mut report = ExtractReport {
        bank: bank.to_path_buf(),
        output_dir: output_dir.clone(),
        ..ExtractReport::default()
    };

    for resource in resources {
        let path = output_dir.join(format!("{}.{}", resource.id, config.subresource_extension));
        fs::write(&path, resource.data)?;
        report.extracted.push(resource.id);

        if let Some(decoder) = decoder {
            let decoded = decoded_dir.join(format!("{}.{}", resource.id, config.decoded_extension));
            match decode_one(decoder, &path, &decoded) {
                Ok(()) => report.decoded += 1,
                Err(e) => {
                    warn!("[FAIL] decode {}/{}: {}", stem, resource.id, e);
                    report.decode_failures.push(resource.id);
                }
            }
        }
    }

    Ok(report)
}

/// Extract a batch of banks, one independent task per file.
///
/// Results come back in input order. Files without a `BKHD` header in their
/// first 4 KiB are skipped as [`BankError::NotABank`]. Banks sharing a file
/// stem would extract into the same directory, so only the first of them is
/// extracted and the rest fail with [`BankError::DuplicateOutput`].
pub fn extract_banks(
    banks: &[PathBuf],
    config: &Config,
    decoder: Option<&dyn Decoder>,
) -> Vec<(PathBuf, Result<ExtractReport>)> {
    let probed: Vec<Result<bool>> = banks.par_iter().map(|bank| probe(bank)).collect();

    // Stems are compared case-insensitively for case-insensitive filesystems.
    let mut owners: HashMap<String, &Path> = HashMap::new();
    let checked: Vec<Result<()>> = banks
        .iter()
        .zip(probed)
        .map(|(bank, probed)| match probed {
            Ok(true) => match owners.entry(stem_of(bank).to_lowercase()) {
                Entry::Occupied(first) => Err(BankError::DuplicateOutput {
                    dir: config.audio_dir.join(stem_of(bank)),
                    first: first.get().to_path_buf(),
                }),
                Entry::Vacant(slot) => {
                    slot.insert(bank);
                    Ok(())
                }
            },
            Ok(false) => Err(BankError::NotABank),
            Err(e) => Err(e),
        })
        .collect();

    banks
        .par_iter()
        .zip(checked)
        .map(|(bank, checked)| {
            let name = display_name(bank);
            let result = checked.and_then(|()| {
                info!("Extracting: {}", name);
                extract_bank(bank, config, decoder)
            });

            match &result {
                Ok(report) => info!(
                    "[OK] {}: extracted {} files to {}",
                    name,
                    report.extracted.len(),
                    report.output_dir.display()
                ),
                Err(BankError::NotABank) => warn!("[SKIP] {} is not a bank", name),
                Err(e @ BankError::DuplicateOutput { .. }) => warn!("[SKIP] {}: {}", name, e),
                Err(e) => error!("[FAIL] {}: {}", name, e),
            }

            (bank.clone(), result)
        })
        .collect()
}

#[derive(Debug)]
pub struct PatchReport {
    pub bank: PathBuf,
    /// Where the patched bank was written; `None` when nothing was patched.
    pub output: Option<PathBuf>,
    pub records: Vec<PatchRecord>,
}

impl PatchReport {
    pub fn patched(&self) -> usize {
        self.count(|o| matches!(o, PatchOutcome::Patched { .. }))
    }

    pub fn rejected(&self) -> usize {
        self.count(|o| matches!(o, PatchOutcome::TooLarge { .. }))
    }

    fn count(&self, f: impl Fn(&PatchOutcome) -> bool) -> usize {
        self.records.iter().filter(|r| f(&r.outcome)).count()
    }
}

/// Patch one bank with the replacements found in `config.replacement_dir`
/// and write it, under the same file name, to `config.output_dir`.
pub fn patch_bank(bank: &Path, config: &Config) -> Result<PatchReport> {
    let name = display_name(bank);
    info!("Patching {}", name);

    let mut buffer = fs::read(bank)?;
    let permissions = fs::metadata(bank)?.permissions();
    let layout = locate(&buffer)?;

    let available = collect_replacements(&config.replacement_dir, &config.subresource_extension)?;

    // Only load replacements this bank can use.
    let mut replacements = HashMap::new();
    for entry in entries(&buffer, &layout) {
        if replacements.contains_key(&entry.id) {
            continue;
        }
        if let Some(path) = available.get(&entry.id) {
            replacements.insert(entry.id, fs::read(path)?);
        }
    }

    let records = patch(&mut buffer, &layout, &replacements)?;

    for record in &records {
        match record.outcome {
            PatchOutcome::Patched { old_size, new_size } => {
                info!("[OK] {} ({} -> {} bytes)", record.id, old_size, new_size)
            }
            PatchOutcome::TooLarge { size, capacity } => warn!(
                "[FAIL] {} too big by {} bytes ({} > {})",
                record.id,
                size - capacity as usize,
                size,
                capacity
            ),
            PatchOutcome::Skipped => {}
        }
    }

    let mut report = PatchReport { bank: bank.to_path_buf(), output: None, records };

    if report.patched() == 0 {
        warn!("No replacements applied to {}; nothing written", name);
        return Ok(report);
    }

    fs::create_dir_all(&config.output_dir)?;
    let output = config.output_dir.join(bank.file_name().unwrap_or(bank.as_os_str()));
    write_atomically(&output, &buffer, permissions)?;
    info!("Saved {} ({} patched, {} rejected)", output.display(), report.patched(), report.rejected());

    report.output = Some(output);
    Ok(report)
}

/// Encode source audio files into `<output_dir>/<stem>.<extension>`.
///
/// Files are encoded one after another; a failure is logged and the next file
/// is attempted.
pub fn encode_files(
    inputs: &[PathBuf],
    output_dir: &Path,
    extension: &str,
    encoder: &dyn Encoder,
) -> Result<Vec<(PathBuf, Result<PathBuf>)>> {
    fs::create_dir_all(output_dir)?;

    let results = inputs
        .iter()
        .map(|input| {
            let output = output_dir.join(format!("{}.{}", stem_of(input), extension));
            let result = encoder.encode(input, &output).map(|()| output);

            match &result {
                Ok(output) => info!("[OK] {} -> {}", display_name(input), display_name(output)),
                Err(e) => error!("[FAIL] {}: {}", display_name(input), e),
            }

            (input.clone(), result)
        })
        .collect();

    Ok(results)
}
