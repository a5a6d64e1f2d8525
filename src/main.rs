// bnkpatch
// Copyright (c) 2024 The bnkpatch Authors
//
// SPDX-License-Identifier: MIT

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::{info, Level};

use bnkpatch::batch::{encode_files, extract_banks, list_banks, patch_bank};
use bnkpatch::chunk::{chunks, locate};
use bnkpatch::index::entries;
use bnkpatch::tools::{CommandDecoder, CommandEncoder, Decoder};
use bnkpatch::Config;

#[derive(Parser)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Config file (defaults to ./bnkpatch.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the chunks and indexed sub-resources of a bank
    List {
        /// Bank filename
        filename: PathBuf,
    },

    /// Extract the sub-resources of one or more banks
    Extract {
        /// Banks to extract (defaults to every file in the bank directory)
        banks: Vec<PathBuf>,

        /// Directory to extract into
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also decode every extracted sub-resource with the decoder
        #[arg(short, long)]
        decode: bool,
    },

    /// Replace sub-resources of a bank in place
    Patch {
        /// Bank to patch
        filename: PathBuf,

        /// Directory of replacement files named <id>.<ext>
        #[arg(short, long)]
        replacements: Option<PathBuf>,

        /// Directory to write the patched bank into
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Encode audio files into sub-resources with the encoder
    Convert {
        /// Audio files to encode
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Directory to write encoded files into
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => Level::WARN,
        (false, 0) => Level::INFO,
        (false, 1) => Level::DEBUG,
        (false, _) => Level::TRACE,
    };

    tracing_subscriber::fmt().with_max_level(level).with_target(false).init();
}

fn list_command(filename: &Path) -> anyhow::Result<()> {
    let buffer = fs::read(filename).with_context(|| format!("Failed to read {}", filename.display()))?;
    let layout = locate(&buffer).with_context(|| format!("{}", filename.display()))?;

    for chunk in chunks(&buffer, layout.anchor) {
        println!("{}: offset = {:#x}, size = {:#x}", chunk.tag_str(), chunk.offset, chunk.length);
    }

    for entry in entries(&buffer, &layout) {
        println!("{}: offset = {:#x}, size = {:#x}", entry.id, entry.offset, entry.size);
    }

    Ok(())
}

fn extract_command(config: &Config, banks: &[PathBuf], decode: bool) -> anyhow::Result<()> {
    let banks = if banks.is_empty() {
        list_banks(&config.bank_dir)
            .with_context(|| format!("Failed to list {}", config.bank_dir.display()))?
    } else {
        banks.to_vec()
    };

    if banks.is_empty() {
        bail!("No bank files to extract");
    }

    let decoder = if decode {
        let tool = match &config.decoder_path {
            Some(tool) if tool.is_file() => tool,
            Some(tool) => bail!("Decoder missing at {}", tool.display()),
            None => bail!("No decoder configured"),
        };
        Some(CommandDecoder::new(tool))
    } else {
        None
    };

    let results = extract_banks(&banks, config, decoder.as_ref().map(|d| d as &dyn Decoder));

    let total: usize = results
        .iter()
        .filter_map(|(_, result)| result.as_ref().ok())
        .map(|report| report.extracted.len())
        .sum();
    let failed = results.iter().filter(|(_, result)| result.is_err()).count();

    info!("Extraction complete: {} files from {} banks ({} skipped)", total, banks.len() - failed, failed);

    Ok(())
}

fn patch_command(config: &Config, filename: &Path) -> anyhow::Result<()> {
    let report = patch_bank(filename, config).with_context(|| format!("Failed to patch {}", filename.display()))?;

    if report.output.is_none() {
        info!("No matching ids found in {}", filename.display());
    }

    Ok(())
}

fn convert_command(config: &Config, inputs: &[PathBuf]) -> anyhow::Result<()> {
    let Some(tool) = &config.encoder_path else {
        bail!("No encoder configured");
    };
    let encoder = CommandEncoder::new(tool, config.encode_quality.clone());

    let results = encode_files(inputs, &config.output_dir, &config.subresource_extension, &encoder)?;
    let failed = results.iter().filter(|(_, result)| result.is_err()).count();

    info!("Convert complete: {} encoded, {} failed", results.len() - failed, failed);

    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let base = std::env::current_dir()?;
    let mut config = Config::load_or_default(cli.config.as_deref())?.detect_tools(&base);

    match &cli.command {
        Commands::List { filename } => list_command(filename)?,
        Commands::Extract { banks, output, decode } => {
            if let Some(output) = output {
                config.audio_dir = output.clone();
            }
            extract_command(&config, banks, *decode)?
        }
        Commands::Patch { filename, replacements, output } => {
            if let Some(replacements) = replacements {
                config.replacement_dir = replacements.clone();
            }
            if let Some(output) = output {
                config.output_dir = output.clone();
            }
            patch_command(&config, filename)?
        }
        Commands::Convert { inputs, output } => {
            if let Some(output) = output {
                config.output_dir = output.clone();
            }
            convert_command(&config, inputs)?
        }
    }

    Ok(())
}
