// bnkpatch
// Copyright (c) 2024 The bnkpatch Authors
//
// SPDX-License-Identifier: MIT

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

use tracing::{debug, warn};

use crate::error::{BankError, Result};

/// Turns a source audio file into a sub-resource file.
pub trait Encoder: Sync {
    fn encode(&self, input: &Path, output: &Path) -> Result<()>;
}

/// Turns an extracted sub-resource into a playable audio file.
pub trait Decoder: Sync {
    fn decode(&self, input: &Path, output: &Path) -> Result<()>;
}

/// Runs `command` to completion. Only a failure to start is an error here.
fn spawn(tool: &Path, command: &mut Command) -> Result<ExitStatus> {
    debug!("Running {:?}", command);

    command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map_err(|e| BankError::ExternalTool {
            tool: tool.to_path_buf(),
            reason: format!("failed to start: {}", e),
        })
}

fn check_status(tool: &Path, status: ExitStatus) -> Result<()> {
    if !status.success() {
        return Err(BankError::ExternalTool {
            tool: tool.to_path_buf(),
            reason: format!("exited with {}", status),
        });
    }
    Ok(())
}

fn run(tool: &Path, command: &mut Command) -> Result<()> {
    let status = spawn(tool, command)?;
    check_status(tool, status)
}

fn is_script(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("cmd") || ext.eq_ignore_ascii_case("bat"))
}

/// Runs an external encoder executable or Windows wrapper script.
#[derive(Debug, Clone)]
pub struct CommandEncoder {
    pub tool: PathBuf,
    /// Passed to wrapper scripts as `--conversion:<quality>`.
    pub quality: Option<String>,
}

impl CommandEncoder {
    pub fn new(tool: impl Into<PathBuf>, quality: Option<String>) -> Self {
        CommandEncoder { tool: tool.into(), quality }
    }

    fn command(&self, input: &Path, output: &Path) -> Command {
        if is_script(&self.tool) {
            let mut command = Command::new("cmd.exe");
            command.arg("/c").arg(&self.tool);
            if let Some(quality) = &self.quality {
                command.arg(format!("--conversion:{}", quality));
            }
            command.arg(input);
            command
        } else {
            let mut command = Command::new(&self.tool);
            command.arg("-encode").arg(input).arg(output);
            command
        }
    }

    /// Places where the tool may have dropped its output.
    fn candidates(&self, input: &Path, output: &Path) -> Vec<PathBuf> {
        let mut candidates = vec![output.to_path_buf()];
        if let Some(name) = output.file_name() {
            for dir in [input.parent(), self.tool.parent()].into_iter().flatten() {
                candidates.push(dir.join(name));
            }
        }
        candidates
    }
}

impl Encoder for CommandEncoder {
    fn encode(&self, input: &Path, output: &Path) -> Result<()> {
        // Anything at a search location afterwards must come from this run.
        let candidates: Vec<PathBuf> = self
            .candidates(input, output)
            .into_iter()
            .filter(|candidate| candidate != input)
            .collect();
        for candidate in &candidates {
            if candidate.is_file() {
                debug!("Removing stale {}", candidate.display());
                fs::remove_file(candidate)?;
            }
        }

        let status = spawn(&self.tool, &mut self.command(input, output))?;

        // Wrapper scripts ignore the requested output path and may exit
        // non-zero after writing their output.
        for candidate in candidates {
            if !candidate.is_file() {
                continue;
            }
            if !status.success() {
                warn!("{} exited with {} but wrote {}", self.tool.display(), status, candidate.display());
            }
            if candidate != output {
                debug!("Moving {} to {}", candidate.display(), output.display());
                fs::rename(&candidate, output)?;
            }
            return Ok(());
        }

        check_status(&self.tool, status)?;
        Err(BankError::ToolOutputMissing(output.to_path_buf()))
    }
}

/// Runs a vgmstream-style decoder: `<tool> -o <output> <input>`.
#[derive(Debug, Clone)]
pub struct CommandDecoder {
    pub tool: PathBuf,
}

impl CommandDecoder {
    pub fn new(tool: impl Into<PathBuf>) -> Self {
        CommandDecoder { tool: tool.into() }
    }
}

impl Decoder for CommandDecoder {
    fn decode(&self, input: &Path, output: &Path) -> Result<()> {
        run(&self.tool, Command::new(&self.tool).arg("-o").arg(output).arg(input))
    }
}
