// SPDX-License-Identifier: Apache-2.0

//! Generic invocation of one external pipeline stage (conversion, golden
//! generation, simulation) with a hard wall-clock timeout, combined output
//! capture, tool-diagnostic scanning, and artifact postconditions.
//!
//! A stage failure is a value, never a panic: the orchestrator short-circuits
//! on it and the reporter renders it without re-deriving anything.

use std::ffi::OsString;
use std::io::{Read, Seek, SeekFrom};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

/// Hard ceiling for a Vivado batch simulation run. Simulations are expensive
/// and not safe to blindly rerun, so a timeout is fatal for the stage and
/// there is no retry.
pub const SIM_TIMEOUT: Duration = Duration::from_secs(600);

/// Ceiling for the lightweight helper tools (conversion, golden model).
pub const TOOL_TIMEOUT: Duration = Duration::from_secs(120);

const POLL_INTERVAL: Duration = Duration::from_millis(50);
const OUTPUT_TAIL_LINES: usize = 20;

/// One external invocation: what to run, where, for how long, and which
/// artifacts must exist (non-empty) afterwards.
#[derive(Debug)]
pub struct StageSpec {
    pub label: &'static str,
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub cwd: Option<PathBuf>,
    pub timeout: Duration,
    pub required_outputs: Vec<PathBuf>,
}

/// Why a stage invocation failed. Carries enough detail for the reporter to
/// explain the failure on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageFailure {
    /// The executable could not be located or launched.
    Launch { program: PathBuf, error: String },
    /// The process exceeded the wall-clock ceiling and was killed.
    Timeout { limit: Duration },
    /// The tool's combined output contained `ERROR:` diagnostic lines.
    ToolErrors { lines: Vec<String> },
    /// Nonzero exit status; `tail` is the end of the combined output.
    NonZeroExit { status: String, tail: Vec<String> },
    /// Required output artifacts missing or empty after an apparent success.
    MissingArtifact { paths: Vec<String> },
    /// An in-process step of the stage failed (artifact move, bundled
    /// conversion).
    Internal { message: String },
}

impl std::fmt::Display for StageFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StageFailure::Launch { program, error } => {
                write!(f, "could not launch {}: {}", program.display(), error)
            }
            StageFailure::Timeout { limit } => {
                write!(f, "timed out after {} seconds", limit.as_secs())
            }
            StageFailure::ToolErrors { lines } => {
                write!(f, "tool reported {} error line(s)", lines.len())
            }
            StageFailure::NonZeroExit { status, .. } => write!(f, "{}", status),
            StageFailure::MissingArtifact { paths } => {
                write!(f, "missing or empty output: {}", paths.join(", "))
            }
            StageFailure::Internal { message } => write!(f, "{}", message),
        }
    }
}

impl StageFailure {
    pub fn internal(message: impl Into<String>) -> Self {
        StageFailure::Internal {
            message: message.into(),
        }
    }
}

/// Runs one stage to completion and classifies the result.
///
/// Classification order: launch failure, timeout, `ERROR:` diagnostics in
/// the combined output, nonzero exit status, then missing/empty artifacts.
pub fn run_stage(spec: &StageSpec) -> Result<(), StageFailure> {
    log::info!(
        "run_stage: {} ({} {:?})",
        spec.label,
        spec.program.display(),
        spec.args
    );

    // Capture stdout and stderr combined into one temp file, as the child
    // writes them. Piping both back through the parent risks a full-pipe
    // deadlock on chatty tools; a file sidesteps that.
    let mut capture = tempfile::tempfile()
        .map_err(|e| StageFailure::internal(format!("could not create capture file: {}", e)))?;
    let stdout = capture
        .try_clone()
        .map_err(|e| StageFailure::internal(format!("could not clone capture file: {}", e)))?;
    let stderr = capture
        .try_clone()
        .map_err(|e| StageFailure::internal(format!("could not clone capture file: {}", e)))?;

    let mut command = Command::new(&spec.program);
    command
        .args(&spec.args)
        .stdin(Stdio::null())
        .stdout(Stdio::from(stdout))
        .stderr(Stdio::from(stderr));
    if let Some(cwd) = &spec.cwd {
        command.current_dir(cwd);
    }

    let mut child = command.spawn().map_err(|e| StageFailure::Launch {
        program: spec.program.clone(),
        error: e.to_string(),
    })?;

    let started = Instant::now();
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {
                if started.elapsed() >= spec.timeout {
                    log::warn!("{}: killing after timeout", spec.label);
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(StageFailure::Timeout {
                        limit: spec.timeout,
                    });
                }
                std::thread::sleep(POLL_INTERVAL);
            }
            Err(e) => {
                return Err(StageFailure::internal(format!(
                    "could not wait for {}: {}",
                    spec.label, e
                )))
            }
        }
    };

    let mut bytes = Vec::new();
    if let Err(e) = capture
        .seek(SeekFrom::Start(0))
        .and_then(|_| capture.read_to_end(&mut bytes))
    {
        return Err(StageFailure::internal(format!(
            "could not read captured output: {}",
            e
        )));
    }
    let combined = String::from_utf8_lossy(&bytes);
    log::debug!("{}: {} bytes of combined output", spec.label, bytes.len());

    let error_lines: Vec<String> = combined
        .lines()
        .filter(|line| line.trim_start().starts_with("ERROR:"))
        .map(str::to_string)
        .collect();
    if !error_lines.is_empty() {
        return Err(StageFailure::ToolErrors { lines: error_lines });
    }

    if !status.success() {
        let tail: Vec<String> = {
            let lines: Vec<&str> = combined.lines().collect();
            let skip = lines.len().saturating_sub(OUTPUT_TAIL_LINES);
            lines[skip..].iter().map(|s| s.to_string()).collect()
        };
        return Err(StageFailure::NonZeroExit {
            status: status.to_string(),
            tail,
        });
    }

    let missing: Vec<String> = spec
        .required_outputs
        .iter()
        .filter_map(|path| match std::fs::metadata(path) {
            Ok(meta) if meta.len() > 0 => None,
            Ok(_) => Some(format!("{} (exists but is empty)", path.display())),
            Err(_) => Some(path.display().to_string()),
        })
        .collect();
    if !missing.is_empty() {
        return Err(StageFailure::MissingArtifact { paths: missing });
    }

    Ok(())
}

/// Forcibly terminates stale processes by executable name, ignoring
/// failures. A lingering simulator kernel from a previous run can hold the
/// shared log/output files and silently corrupt or block the next run, so
/// this is a required precondition of the simulation stage.
pub fn kill_stale_processes(names: &[&str]) {
    for name in names {
        let result = if cfg!(windows) {
            Command::new("taskkill")
                .args(["/F", "/IM"])
                .arg(name)
                .output()
        } else {
            Command::new("pkill").arg("-x").arg(name).output()
        };
        match result {
            Ok(output) => log::debug!("kill_stale_processes: {} -> {}", name, output.status),
            Err(e) => log::debug!("kill_stale_processes: {} -> {}", name, e),
        }
    }
}
