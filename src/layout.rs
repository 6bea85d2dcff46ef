// SPDX-License-Identifier: Apache-2.0

//! Filesystem conventions of the verification working tree.
//!
//! Test-case inputs live under `Pattern/`, everything the stages exchange
//! lives under `Testbench/`, and the simulation batch script sits at the
//! project root. All stage working directories and artifact postconditions
//! are derived from here so the rest of the driver never spells out a path.

use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct ProjectLayout {
    root: PathBuf,
}

impl ProjectLayout {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        ProjectLayout { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn testbench_dir(&self) -> PathBuf {
        self.root.join("Testbench")
    }

    /// Input artifact for one test case, e.g. `Pattern/TestCase3.dat`.
    pub fn test_case(&self, id: u32) -> PathBuf {
        self.root.join("Pattern").join(format!("TestCase{}.dat", id))
    }

    /// Staging location where the instruction-transfer tool drops its output
    /// (project root); the orchestrator moves it into `Testbench/`.
    pub fn im_dat_staging(&self) -> PathBuf {
        self.root.join("IM.dat")
    }

    pub fn im_dat(&self) -> PathBuf {
        self.testbench_dir().join("IM.dat")
    }

    pub fn im_coe(&self) -> PathBuf {
        self.testbench_dir().join("IM.coe")
    }

    pub fn rf_out(&self) -> PathBuf {
        self.testbench_dir().join("RF.out")
    }

    pub fn dm_out(&self) -> PathBuf {
        self.testbench_dir().join("DM.out")
    }

    pub fn rf_golden(&self) -> PathBuf {
        self.testbench_dir().join("RF.golden")
    }

    pub fn dm_golden(&self) -> PathBuf {
        self.testbench_dir().join("DM.golden")
    }

    pub fn sim_script(&self) -> PathBuf {
        self.root.join("Script.tcl")
    }
}
