// SPDX-License-Identifier: Apache-2.0

//! Comparison of an observed sparse memory image against its golden
//! reference.
//!
//! The comparison walks the union of indices present on either side in
//! ascending order; an index recorded on only one side is always a
//! mismatch (the other side reads as the `MISSING` sentinel), never a
//! silent pass. Mismatch ordering is load-bearing: reports must be
//! deterministic and diffable across runs.

use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::mem_image::MemImage;

/// Sentinel reported for an index that one side did not record.
pub const MISSING: &str = "MISSING";

/// The two independently verified data sets of a test case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    RegisterFile,
    DataMemory,
}

impl Channel {
    pub fn label(&self) -> &'static str {
        match self {
            Channel::RegisterFile => "Register File",
            Channel::DataMemory => "Data Memory",
        }
    }

    pub fn short(&self) -> &'static str {
        match self {
            Channel::RegisterFile => "RF",
            Channel::DataMemory => "DM",
        }
    }
}

/// Which input of a comparison a statement refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// The simulation dump.
    Observed,
    /// The golden reference.
    Expected,
}

impl Side {
    pub fn describe(&self) -> &'static str {
        match self {
            Side::Observed => "simulation output",
            Side::Expected => "golden reference",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    pub index: u64,
    pub observed: String,
    pub expected: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComparisonResult {
    /// In ascending index order.
    pub mismatches: Vec<Mismatch>,
}

impl ComparisonResult {
    pub fn passed(&self) -> bool {
        self.mismatches.is_empty()
    }

    pub fn mismatch_count(&self) -> usize {
        self.mismatches.len()
    }
}

/// Outcome of verifying one channel of a test case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelOutcome {
    Compared(ComparisonResult),
    /// One input file was absent; no comparison was attempted.
    SideMissing { side: Side, path: PathBuf },
}

impl ChannelOutcome {
    pub fn passed(&self) -> bool {
        match self {
            ChannelOutcome::Compared(result) => result.passed(),
            ChannelOutcome::SideMissing { .. } => false,
        }
    }

    pub fn mismatch_count(&self) -> usize {
        match self {
            ChannelOutcome::Compared(result) => result.mismatch_count(),
            ChannelOutcome::SideMissing { .. } => 0,
        }
    }
}

/// Compares the observed dump against the golden reference for one channel.
///
/// `None` on either side means the corresponding file was absent; the
/// result then names which side is missing and carries its path so the
/// reporter can say so without re-deriving anything.
pub fn compare_channel(
    observed: Option<&MemImage>,
    expected: Option<&MemImage>,
    observed_path: &std::path::Path,
    expected_path: &std::path::Path,
) -> ChannelOutcome {
    let observed = match observed {
        Some(image) => image,
        None => {
            return ChannelOutcome::SideMissing {
                side: Side::Observed,
                path: observed_path.to_path_buf(),
            }
        }
    };
    let expected = match expected {
        Some(image) => image,
        None => {
            return ChannelOutcome::SideMissing {
                side: Side::Expected,
                path: expected_path.to_path_buf(),
            }
        }
    };

    let all_indices: BTreeSet<u64> = observed.keys().chain(expected.keys()).copied().collect();

    let mut mismatches = Vec::new();
    for index in all_indices {
        let observed_val = observed.get(&index).map(String::as_str).unwrap_or(MISSING);
        let expected_val = expected.get(&index).map(String::as_str).unwrap_or(MISSING);
        if observed_val != expected_val {
            mismatches.push(Mismatch {
                index,
                observed: observed_val.to_string(),
                expected: expected_val.to_string(),
            });
        }
    }

    ChannelOutcome::Compared(ComparisonResult { mismatches })
}
