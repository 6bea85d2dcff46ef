// SPDX-License-Identifier: Apache-2.0

//! Locating the external tools of the verification pipeline and building
//! the stage specifications that invoke them.
//!
//! Three tools exist: `instr_transfer` (test-case description to
//! instruction-memory image), `golden_result` (independent reference
//! model), and Vivado itself (batch RTL simulation).

use std::path::{Path, PathBuf};

use anyhow::anyhow;

use crate::layout::ProjectLayout;
use crate::stage::{StageSpec, SIM_TIMEOUT, TOOL_TIMEOUT};
use crate::toolchain_config::ToolchainConfig;

/// Simulator kernel processes that can survive a previous run and keep the
/// shared simulate.log/output files locked.
#[cfg(windows)]
pub const STALE_SIM_PROCESSES: &[&str] = &["xsim.exe", "xsimk.exe"];
#[cfg(not(windows))]
pub const STALE_SIM_PROCESSES: &[&str] = &["xsim", "xsimk"];

/// Unified installer layout (2022+) and standalone layout (pre-2022) on
/// Windows, plus the conventional install roots on Linux.
const VIVADO_SEARCH_GLOBS: &[&str] = &[
    "C:/Xilinx/*/Vivado/bin/vivado.bat",
    "C:/Xilinx/Vivado/*/bin/vivado.bat",
    "/opt/Xilinx/*/Vivado/bin/vivado",
    "/opt/Xilinx/Vivado/*/bin/vivado",
    "/tools/Xilinx/Vivado/*/bin/vivado",
];

/// Tool locations resolved once, up front, for a batch run.
#[derive(Debug, Clone)]
pub struct ResolvedTools {
    pub vivado: PathBuf,
    /// Helper tools may be absent; the affected stage then fails as a
    /// launch failure for each attempted case rather than aborting the
    /// batch.
    pub instr_transfer: Option<PathBuf>,
    pub golden_result: Option<PathBuf>,
}

/// Searches for the Vivado executable: configured path first, then PATH,
/// then the installation glob patterns (newest version first).
pub fn find_vivado(config: &Option<ToolchainConfig>) -> Option<PathBuf> {
    if let Some(configured) = config.as_ref().and_then(|c| c.vivado_path.as_deref()) {
        let path = PathBuf::from(configured);
        if path.exists() {
            return Some(path);
        }
        log::warn!("configured vivado_path {} does not exist", configured);
        return None;
    }

    if let Ok(path) = which::which("vivado") {
        log::info!("found vivado on PATH: {}", path.display());
        return Some(path);
    }

    let configured_globs = config
        .as_ref()
        .and_then(|c| c.vivado_search_globs.as_deref());
    let patterns: Vec<&str> = match configured_globs {
        Some(globs) => globs.iter().map(String::as_str).collect(),
        None => VIVADO_SEARCH_GLOBS.to_vec(),
    };

    for pattern in patterns {
        let mut matches: Vec<PathBuf> = match glob::glob(pattern) {
            Ok(paths) => paths.filter_map(Result::ok).collect(),
            Err(e) => {
                log::warn!("bad vivado search pattern '{}': {}", pattern, e);
                continue;
            }
        };
        // The version number is embedded in the path, so the
        // lexicographically greatest match is the newest install.
        matches.sort();
        if let Some(newest) = matches.pop() {
            log::info!("found vivado via '{}': {}", pattern, newest.display());
            return Some(newest);
        }
    }

    None
}

/// Resolves a helper tool: `<tool_path>/<name>` when a tool directory is
/// configured, otherwise PATH lookup.
pub fn find_stage_tool(name: &str, config: &Option<ToolchainConfig>) -> Option<PathBuf> {
    if let Some(tool_path) = config.as_ref().and_then(|c| c.tool_path.as_deref()) {
        let candidate = Path::new(tool_path).join(name);
        if candidate.exists() {
            return Some(candidate);
        }
        log::warn!("{} not found in tool_path {}", name, tool_path);
        return None;
    }
    which::which(name).ok()
}

/// One up-front discovery pass. Vivado absence is fatal for a run: there is
/// nothing to simulate with. Helper tools degrade per case instead.
pub fn resolve_tools(config: &Option<ToolchainConfig>) -> anyhow::Result<ResolvedTools> {
    let vivado = find_vivado(config).ok_or_else(|| {
        anyhow!(
            "Vivado executable not found; searched PATH and {}",
            VIVADO_SEARCH_GLOBS.join(", ")
        )
    })?;
    Ok(ResolvedTools {
        vivado,
        instr_transfer: find_stage_tool("instr_transfer", config),
        golden_result: find_stage_tool("golden_result", config),
    })
}

/// Invocation of `instr_transfer <Pattern/TestCaseN.dat>`; the tool writes
/// `IM.dat` into the project root.
pub fn instr_transfer_spec(tool: &Path, layout: &ProjectLayout, case: u32) -> StageSpec {
    StageSpec {
        label: "instruction transfer",
        program: tool.to_path_buf(),
        args: vec![layout.test_case(case).into_os_string()],
        cwd: Some(layout.root().to_path_buf()),
        timeout: TOOL_TIMEOUT,
        required_outputs: vec![layout.im_dat_staging()],
    }
}

/// Invocation of the reference model from inside `Testbench/`; it must
/// leave both golden files behind.
pub fn golden_result_spec(tool: &Path, layout: &ProjectLayout) -> StageSpec {
    StageSpec {
        label: "golden reference generation",
        program: tool.to_path_buf(),
        args: vec![],
        cwd: Some(layout.testbench_dir()),
        timeout: TOOL_TIMEOUT,
        required_outputs: vec![layout.rf_golden(), layout.dm_golden()],
    }
}

/// Vivado batch-mode invocation of the simulation script; the testbench
/// writes the two observed dump files.
pub fn simulation_spec(vivado: &Path, layout: &ProjectLayout) -> StageSpec {
    StageSpec {
        label: "Vivado batch simulation",
        program: vivado.to_path_buf(),
        args: vec![
            "-mode".into(),
            "batch".into(),
            "-source".into(),
            layout.sim_script().into_os_string(),
            "-nolog".into(),
            "-nojournal".into(),
        ],
        cwd: Some(layout.root().to_path_buf()),
        timeout: SIM_TIMEOUT,
        required_outputs: vec![layout.rf_out(), layout.dm_out()],
    }
}
