// SPDX-License-Identifier: Apache-2.0

//! The per-test-case verification pipeline.
//!
//! One test case runs through a strict stage sequence with short-circuit on
//! failure:
//!
//! ```text
//! Locate -> Convert -> GenerateGolden -> Simulate -> Verify
//! ```
//!
//! The sequence is an explicit state machine so that every terminal state
//! and the precondition that caused it is a tagged value rather than a
//! buried conditional. No stage is ever retried; a failing stage ends the
//! case for this run.

use std::path::PathBuf;

use crate::coe;
use crate::compare::{compare_channel, Channel, ChannelOutcome, Side};
use crate::layout::ProjectLayout;
use crate::mem_image::parse_dump;
use crate::report::Reporter;
use crate::stage::{run_stage, kill_stale_processes, StageFailure};
use crate::tools::{
    golden_result_spec, instr_transfer_spec, simulation_spec, ResolvedTools, STALE_SIM_PROCESSES,
};

/// The externally visible steps of one case, in invocation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageKind {
    InstrTransfer,
    CoeConvert,
    GoldenModel,
    Simulation,
}

impl StageKind {
    pub const STEP_COUNT: usize = 4;

    pub fn step(&self) -> usize {
        match self {
            StageKind::InstrTransfer => 1,
            StageKind::CoeConvert => 2,
            StageKind::GoldenModel => 3,
            StageKind::Simulation => 4,
        }
    }
}

/// Why a case never reached simulation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    InputNotFound(PathBuf),
    ConversionFailed(StageFailure),
    GoldenGenerationFailed(StageFailure),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::InputNotFound(path) => write!(f, "{} not found", path.display()),
            SkipReason::ConversionFailed(failure) => write!(f, "conversion failed: {}", failure),
            SkipReason::GoldenGenerationFailed(failure) => {
                write!(f, "golden generation failed: {}", failure)
            }
        }
    }
}

/// Both comparison channels of a case that reached verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedCase {
    pub rf: ChannelOutcome,
    pub dm: ChannelOutcome,
}

impl VerifiedCase {
    pub fn passed(&self) -> bool {
        self.rf.passed() && self.dm.passed()
    }
}

/// Terminal state of one test case for one run. Exactly one variant holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaseOutcome {
    /// An input-side stage failed; the design under test was never run.
    Skipped(SkipReason),
    /// Conversion and golden generation succeeded but the toolchain run of
    /// the design under test did not.
    SimulationFailed(StageFailure),
    /// Both channels were compared (possibly failing).
    Verified(VerifiedCase),
}

impl CaseOutcome {
    pub fn passed(&self) -> bool {
        match self {
            CaseOutcome::Verified(verified) => verified.passed(),
            _ => false,
        }
    }
}

/// Pipeline control states. `Locate` is the entry state; each terminal
/// returns out of [`run_case`] with a `CaseOutcome`.
#[derive(Debug, Clone, Copy)]
enum PipelineStage {
    Locate,
    Convert,
    GenerateGolden,
    Simulate,
    Verify,
}

/// Drives one test case through the pipeline.
pub fn run_case(
    id: u32,
    layout: &ProjectLayout,
    tools: &ResolvedTools,
    reporter: &mut dyn Reporter,
) -> CaseOutcome {
    log::info!("run_case: TestCase{}", id);
    let mut stage = PipelineStage::Locate;
    loop {
        stage = match stage {
            PipelineStage::Locate => {
                let input = layout.test_case(id);
                if !input.exists() {
                    return CaseOutcome::Skipped(SkipReason::InputNotFound(input));
                }
                PipelineStage::Convert
            }
            PipelineStage::Convert => match convert(id, layout, tools, reporter) {
                Ok(()) => PipelineStage::GenerateGolden,
                Err(failure) => {
                    return CaseOutcome::Skipped(SkipReason::ConversionFailed(failure))
                }
            },
            PipelineStage::GenerateGolden => match generate_golden(id, layout, tools, reporter) {
                Ok(()) => PipelineStage::Simulate,
                Err(failure) => {
                    return CaseOutcome::Skipped(SkipReason::GoldenGenerationFailed(failure))
                }
            },
            PipelineStage::Simulate => match simulate(id, layout, tools, reporter) {
                Ok(()) => PipelineStage::Verify,
                Err(failure) => return CaseOutcome::SimulationFailed(failure),
            },
            PipelineStage::Verify => return CaseOutcome::Verified(verify(layout, reporter)),
        };
    }
}

/// Translates the test case into the instruction-memory image (external
/// tool), moves it into the testbench tree, and derives the COE
/// initialization file from it (statically-bound converter).
fn convert(
    id: u32,
    layout: &ProjectLayout,
    tools: &ResolvedTools,
    reporter: &mut dyn Reporter,
) -> Result<(), StageFailure> {
    reporter.stage_started(id, StageKind::InstrTransfer);
    let result = match tools.instr_transfer.as_deref() {
        Some(tool) => run_stage(&instr_transfer_spec(tool, layout, id)),
        None => Err(StageFailure::Launch {
            program: PathBuf::from("instr_transfer"),
            error: "not found on PATH or in tool_path".to_string(),
        }),
    };
    let result = result.and_then(|()| stage_im_dat(layout));
    reporter.stage_finished(id, StageKind::InstrTransfer, as_event(&result));
    result?;

    reporter.stage_started(id, StageKind::CoeConvert);
    let result = coe::dat_to_coe(&layout.im_dat(), &layout.im_coe())
        .map(|_| ())
        .map_err(|e| StageFailure::internal(format!("{:#}", e)));
    reporter.stage_finished(id, StageKind::CoeConvert, as_event(&result));
    result
}

/// The transfer tool drops `IM.dat` in the project root; the testbench
/// reads it from `Testbench/`.
fn stage_im_dat(layout: &ProjectLayout) -> Result<(), StageFailure> {
    let from = layout.im_dat_staging();
    let to = layout.im_dat();
    // A leftover from the previous case would make the rename fail on some
    // platforms.
    let _ = std::fs::remove_file(&to);
    std::fs::rename(&from, &to).map_err(|e| {
        StageFailure::internal(format!(
            "could not move {} to {}: {}",
            from.display(),
            to.display(),
            e
        ))
    })
}

fn generate_golden(
    id: u32,
    layout: &ProjectLayout,
    tools: &ResolvedTools,
    reporter: &mut dyn Reporter,
) -> Result<(), StageFailure> {
    reporter.stage_started(id, StageKind::GoldenModel);
    let result = match tools.golden_result.as_deref() {
        Some(tool) => run_stage(&golden_result_spec(tool, layout)),
        None => Err(StageFailure::Launch {
            program: PathBuf::from("golden_result"),
            error: "not found on PATH or in tool_path".to_string(),
        }),
    };
    reporter.stage_finished(id, StageKind::GoldenModel, as_event(&result));
    result
}

fn simulate(
    id: u32,
    layout: &ProjectLayout,
    tools: &ResolvedTools,
    reporter: &mut dyn Reporter,
) -> Result<(), StageFailure> {
    // A stale simulator kernel from an earlier run can hold simulate.log
    // and the dump files locked.
    kill_stale_processes(STALE_SIM_PROCESSES);

    reporter.stage_started(id, StageKind::Simulation);
    let result = run_stage(&simulation_spec(&tools.vivado, layout));
    reporter.stage_finished(id, StageKind::Simulation, as_event(&result));
    result
}

/// Parses the four dump artifacts and compares both channels. Missing files
/// here (including artifacts deleted between Simulate and Verify) surface
/// as comparison failures, never as a fault.
fn verify(layout: &ProjectLayout, reporter: &mut dyn Reporter) -> VerifiedCase {
    let rf_observed = parse_dump(&layout.rf_out());
    reporter.artifact_loaded(
        Channel::RegisterFile,
        Side::Observed,
        rf_observed.as_ref().map(|image| image.len()),
    );
    let rf_expected = parse_dump(&layout.rf_golden());
    reporter.artifact_loaded(
        Channel::RegisterFile,
        Side::Expected,
        rf_expected.as_ref().map(|image| image.len()),
    );
    let dm_observed = parse_dump(&layout.dm_out());
    reporter.artifact_loaded(
        Channel::DataMemory,
        Side::Observed,
        dm_observed.as_ref().map(|image| image.len()),
    );
    let dm_expected = parse_dump(&layout.dm_golden());
    reporter.artifact_loaded(
        Channel::DataMemory,
        Side::Expected,
        dm_expected.as_ref().map(|image| image.len()),
    );

    let rf = compare_channel(
        rf_observed.as_ref(),
        rf_expected.as_ref(),
        &layout.rf_out(),
        &layout.rf_golden(),
    );
    reporter.channel_compared(Channel::RegisterFile, &rf);

    let dm = compare_channel(
        dm_observed.as_ref(),
        dm_expected.as_ref(),
        &layout.dm_out(),
        &layout.dm_golden(),
    );
    reporter.channel_compared(Channel::DataMemory, &dm);

    VerifiedCase { rf, dm }
}

fn as_event(result: &Result<(), StageFailure>) -> Result<(), &StageFailure> {
    match result {
        Ok(()) => Ok(()),
        Err(failure) => Err(failure),
    }
}

#[cfg(test)]
#[cfg(unix)]
mod tests {
    use super::*;
    use crate::report::RecordingReporter;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;

    /// Builds a scratch project tree plus a stub tool directory, returning
    /// the layout and resolved tools. Stub behavior is controlled by the
    /// shell bodies passed in.
    fn scratch_project(
        instr_transfer: &str,
        golden_result: &str,
        vivado: &str,
    ) -> (tempfile::TempDir, ProjectLayout, ResolvedTools) {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path();
        std::fs::create_dir_all(root.join("Pattern")).expect("mkdir Pattern");
        std::fs::create_dir_all(root.join("Testbench")).expect("mkdir Testbench");
        std::fs::write(root.join("Script.tcl"), "# batch script\n").expect("write tcl");

        let tools_dir = root.join("tools");
        std::fs::create_dir_all(&tools_dir).expect("mkdir tools");
        let tools = ResolvedTools {
            vivado: write_stub(&tools_dir.join("vivado"), vivado),
            instr_transfer: Some(write_stub(&tools_dir.join("instr_transfer"), instr_transfer)),
            golden_result: Some(write_stub(&tools_dir.join("golden_result"), golden_result)),
        };
        let layout = ProjectLayout::new(root);
        (dir, layout, tools)
    }

    fn write_stub(path: &Path, body: &str) -> std::path::PathBuf {
        std::fs::write(path, format!("#!/bin/sh\n{}\n", body)).expect("write stub");
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
            .expect("chmod stub");
        path.to_path_buf()
    }

    fn write_case_input(layout: &ProjectLayout, id: u32) {
        std::fs::write(layout.test_case(id), "00000013\n").expect("write case input");
    }

    const PASSING_INSTR_TRANSFER: &str = "cp \"$1\" IM.dat";
    const PASSING_GOLDEN: &str = "printf '[0] aa\\n' > RF.golden; printf '[0] bb\\n' > DM.golden";
    const MATCHING_VIVADO: &str =
        "printf '[0] AA\\n' > Testbench/RF.out; printf '[0] BB\\n' > Testbench/DM.out";

    #[test]
    fn missing_input_skips_before_any_stage_runs() {
        let (_dir, layout, tools) =
            scratch_project(PASSING_INSTR_TRANSFER, PASSING_GOLDEN, MATCHING_VIVADO);
        let mut reporter = RecordingReporter::default();
        let outcome = run_case(4, &layout, &tools, &mut reporter);
        match outcome {
            CaseOutcome::Skipped(SkipReason::InputNotFound(path)) => {
                assert!(path.ends_with("Pattern/TestCase4.dat"), "{:?}", path);
            }
            other => panic!("expected InputNotFound skip, got {:?}", other),
        }
        assert!(reporter.events.is_empty(), "no stage may run: {:?}", reporter.events);
    }

    #[test]
    fn fully_matching_case_is_verified_pass() {
        let (_dir, layout, tools) =
            scratch_project(PASSING_INSTR_TRANSFER, PASSING_GOLDEN, MATCHING_VIVADO);
        write_case_input(&layout, 1);
        let mut reporter = RecordingReporter::default();
        let outcome = run_case(1, &layout, &tools, &mut reporter);
        assert!(outcome.passed(), "outcome: {:?}", outcome);
        // The staged image must have been moved into the testbench tree and
        // converted.
        assert!(layout.im_dat().exists());
        assert!(layout.im_coe().exists());
        assert!(!layout.im_dat_staging().exists());
        assert_eq!(
            reporter.events.last().map(String::as_str),
            Some("channel_compared:DM:pass")
        );
    }

    #[test]
    fn dm_only_mismatch_fails_overall_but_passes_rf() {
        let vivado = "printf '[0] aa\\n' > Testbench/RF.out; printf '[0] ee\\n' > Testbench/DM.out";
        let (_dir, layout, tools) =
            scratch_project(PASSING_INSTR_TRANSFER, PASSING_GOLDEN, vivado);
        write_case_input(&layout, 1);
        let mut reporter = RecordingReporter::default();
        match run_case(1, &layout, &tools, &mut reporter) {
            CaseOutcome::Verified(verified) => {
                assert!(verified.rf.passed());
                assert!(!verified.dm.passed());
                assert!(!verified.passed());
            }
            other => panic!("expected Verified, got {:?}", other),
        }
    }

    #[test]
    fn conversion_failure_skips_and_never_reaches_golden() {
        let (_dir, layout, tools) = scratch_project("exit 2", PASSING_GOLDEN, MATCHING_VIVADO);
        write_case_input(&layout, 1);
        let mut reporter = RecordingReporter::default();
        match run_case(1, &layout, &tools, &mut reporter) {
            CaseOutcome::Skipped(SkipReason::ConversionFailed(StageFailure::NonZeroExit {
                ..
            })) => {}
            other => panic!("expected ConversionFailed skip, got {:?}", other),
        }
        assert!(!layout.rf_golden().exists(), "golden stage must not run");
        assert!(!reporter
            .events
            .iter()
            .any(|event| event.contains("GoldenModel")));
    }

    #[test]
    fn golden_failure_skips_and_never_simulates() {
        let (_dir, layout, tools) =
            scratch_project(PASSING_INSTR_TRANSFER, "exit 1", MATCHING_VIVADO);
        write_case_input(&layout, 1);
        let mut reporter = RecordingReporter::default();
        match run_case(1, &layout, &tools, &mut reporter) {
            CaseOutcome::Skipped(SkipReason::GoldenGenerationFailed(_)) => {}
            other => panic!("expected GoldenGenerationFailed skip, got {:?}", other),
        }
        assert!(!layout.rf_out().exists(), "simulation must not run");
    }

    #[test]
    fn simulation_failure_is_distinct_from_skip() {
        let (_dir, layout, tools) =
            scratch_project(PASSING_INSTR_TRANSFER, PASSING_GOLDEN, "exit 9");
        write_case_input(&layout, 1);
        let mut reporter = RecordingReporter::default();
        match run_case(1, &layout, &tools, &mut reporter) {
            CaseOutcome::SimulationFailed(StageFailure::NonZeroExit { .. }) => {}
            other => panic!("expected SimulationFailed, got {:?}", other),
        }
    }

    #[test]
    fn simulation_without_dump_files_fails_on_postcondition() {
        let (_dir, layout, tools) = scratch_project(PASSING_INSTR_TRANSFER, PASSING_GOLDEN, "true");
        write_case_input(&layout, 1);
        let mut reporter = RecordingReporter::default();
        match run_case(1, &layout, &tools, &mut reporter) {
            CaseOutcome::SimulationFailed(StageFailure::MissingArtifact { paths }) => {
                assert_eq!(paths.len(), 2);
            }
            other => panic!("expected MissingArtifact, got {:?}", other),
        }
    }

    #[test]
    fn missing_helper_tool_is_a_per_case_launch_failure() {
        let (_dir, layout, mut tools) =
            scratch_project(PASSING_INSTR_TRANSFER, PASSING_GOLDEN, MATCHING_VIVADO);
        tools.instr_transfer = None;
        write_case_input(&layout, 1);
        let mut reporter = RecordingReporter::default();
        match run_case(1, &layout, &tools, &mut reporter) {
            CaseOutcome::Skipped(SkipReason::ConversionFailed(StageFailure::Launch {
                ..
            })) => {}
            other => panic!("expected Launch failure skip, got {:?}", other),
        }
    }
}
