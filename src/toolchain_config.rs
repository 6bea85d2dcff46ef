// SPDX-License-Identifier: Apache-2.0

use serde::Deserialize;

/// `[toolchain]` table of `regress-toolchain.toml`. Every field is optional;
/// the driver falls back to PATH lookup and the well-known Xilinx
/// installation layouts.
#[derive(Deserialize, Default)]
pub struct ToolchainConfig {
    /// Explicit path to the Vivado executable. Takes precedence over any
    /// search.
    pub vivado_path: Option<String>,

    /// Glob patterns searched for a Vivado installation when the executable
    /// is neither configured nor on PATH. Replaces the built-in patterns
    /// when present.
    pub vivado_search_globs: Option<Vec<String>>,

    /// Directory holding the pipeline helper tools (`instr_transfer`,
    /// `golden_result`). When unset the tools are resolved from PATH.
    pub tool_path: Option<String>,
}
