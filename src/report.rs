// SPDX-License-Identifier: Apache-2.0

//! Structured progress and result reporting.
//!
//! Orchestration code emits typed events through the [`Reporter`] trait and
//! never prints; `ConsoleReporter` owns every banner, step line, and summary
//! table. Tests substitute a recording implementation.

use colored::Colorize;

use crate::batch::BatchSummary;
use crate::compare::{Channel, ChannelOutcome, Side};
use crate::stage::StageFailure;
use crate::testcase::{CaseOutcome, StageKind};

pub trait Reporter {
    /// Pre-prompt listing: which case inputs are present on disk.
    fn cases_available(&mut self, _cases: &[(u32, bool)]) {}

    fn case_started(&mut self, _id: u32, _position: usize, _total: usize) {}

    fn stage_started(&mut self, _id: u32, _stage: StageKind) {}

    fn stage_finished(&mut self, _id: u32, _stage: StageKind, _result: Result<(), &StageFailure>) {}

    /// A verification artifact was loaded (or found absent).
    fn artifact_loaded(&mut self, _channel: Channel, _side: Side, _entries: Option<usize>) {}

    fn channel_compared(&mut self, _channel: Channel, _outcome: &ChannelOutcome) {}

    fn case_finished(&mut self, _id: u32, _outcome: &CaseOutcome) {}

    fn batch_finished(&mut self, _summary: &BatchSummary) {}
}

/// Console renderer. The layout follows the project's long-standing script
/// output: 60-column banners, `[Step k/4]` progress lines, green checks and
/// red crosses, and a final per-case table.
pub struct ConsoleReporter;

const BANNER_WIDTH: usize = 60;

impl ConsoleReporter {
    pub fn banner(&self, title: &str) {
        println!("\n{}", "=".repeat(BANNER_WIDTH).bold());
        println!("{}", format!("{:^width$}", title, width = BANNER_WIDTH).bold());
        println!("{}\n", "=".repeat(BANNER_WIDTH).bold());
    }

    fn step_tag(stage: StageKind) -> String {
        format!("[Step {}/{}]", stage.step(), StageKind::STEP_COUNT)
    }
}

impl Reporter for ConsoleReporter {
    fn cases_available(&mut self, cases: &[(u32, bool)]) {
        println!("{}", "Available Test Cases:".cyan());
        for (id, present) in cases {
            if *present {
                println!("  [{}] TestCase{}.dat ✓", id, id);
            } else {
                println!("  [{}] TestCase{}.dat {}", id, id, "(not found)".red());
            }
        }
    }

    fn case_started(&mut self, id: u32, _position: usize, total: usize) {
        if total > 1 {
            self.banner(&format!("[ TestCase {} / {} ]", id, total));
        } else {
            self.banner(&format!("TestCase {}", id));
        }
    }

    fn stage_started(&mut self, id: u32, stage: StageKind) {
        let tag = Self::step_tag(stage);
        match stage {
            StageKind::InstrTransfer => {
                println!("{} Converting TestCase{}.dat to IM.dat...", tag.cyan(), id)
            }
            StageKind::CoeConvert => println!("{} Converting IM.dat to IM.coe...", tag.cyan()),
            StageKind::GoldenModel => println!("{} Generating golden reference...", tag.cyan()),
            StageKind::Simulation => {
                println!("{} Launching Vivado batch simulation...", tag.cyan());
                println!(
                    "  {}",
                    "This may take several minutes. Please wait...".yellow()
                );
            }
        }
    }

    fn stage_finished(&mut self, _id: u32, stage: StageKind, result: Result<(), &StageFailure>) {
        let failure = match result {
            Ok(()) => {
                let message = match stage {
                    StageKind::InstrTransfer => "✓ Converted and moved to Testbench/IM.dat",
                    StageKind::CoeConvert => "✓ Converted to Testbench/IM.coe",
                    StageKind::GoldenModel => "✓ Generated RF.golden and DM.golden",
                    StageKind::Simulation => "✓ Simulation complete. RF.out and DM.out generated.",
                };
                println!("{}", message.green());
                return;
            }
            Err(failure) => failure,
        };

        println!("{}", failure.to_string().red());
        match failure {
            StageFailure::ToolErrors { lines } => {
                for line in lines {
                    println!("  {}", line);
                }
            }
            StageFailure::NonZeroExit { tail, .. } => {
                println!("{}", "Output (last 20 lines):".yellow());
                for line in tail {
                    println!("  {}", line);
                }
            }
            StageFailure::Timeout { .. } if stage == StageKind::Simulation => {
                println!(
                    "{}",
                    "Tip: check that Script.tcl ends with close_sim and close_project.".yellow()
                );
            }
            _ => {}
        }
    }

    fn artifact_loaded(&mut self, channel: Channel, side: Side, entries: Option<usize>) {
        println!(
            "{} {} {}...",
            "Loading".blue(),
            channel.label(),
            side.describe()
        );
        let unit = match channel {
            Channel::RegisterFile => "register",
            Channel::DataMemory => "memory",
        };
        println!("      Loaded {} {} values", entries.unwrap_or(0), unit);
    }

    fn channel_compared(&mut self, channel: Channel, outcome: &ChannelOutcome) {
        println!(
            "\n{}",
            format!("{} ({}) Verification:", channel.label(), channel.short()).bold()
        );
        match outcome {
            ChannelOutcome::Compared(result) if result.passed() => {
                println!("  {} - all recorded values match", "✓ PASSED".green());
            }
            ChannelOutcome::Compared(result) => {
                println!(
                    "  {} {}",
                    "✗ FAILED".red(),
                    format!("- {} mismatch(es):", result.mismatch_count()).red()
                );
                for mismatch in &result.mismatches {
                    println!(
                        "    [{}] Simulation: {:<12} Golden: {:<12}",
                        mismatch.index, mismatch.observed, mismatch.expected
                    );
                }
            }
            ChannelOutcome::SideMissing { side, path } => {
                println!(
                    "  {} - {} not found: {}",
                    "✗ FAILED".red(),
                    side.describe(),
                    path.display()
                );
            }
        }
    }

    fn case_finished(&mut self, id: u32, outcome: &CaseOutcome) {
        match outcome {
            CaseOutcome::Skipped(reason) => {
                println!("\n{}", format!("Skipped: {}", reason).yellow());
            }
            CaseOutcome::SimulationFailed(failure) => {
                println!(
                    "\n{}",
                    format!("TestCase{} simulation failed: {}", id, failure).red()
                );
            }
            CaseOutcome::Verified(verified) if verified.passed() => {
                println!("\n  {}", format!("✓ TestCase{} PASSED", id).green().bold());
            }
            CaseOutcome::Verified(verified) => {
                println!(
                    "\n  {}",
                    format!(
                        "✗ TestCase{} FAILED  (RF: {}, DM: {})",
                        id,
                        channel_label(&verified.rf),
                        channel_label(&verified.dm)
                    )
                    .red()
                    .bold()
                );
            }
        }
    }

    fn batch_finished(&mut self, summary: &BatchSummary) {
        self.banner("Final Summary");

        println!("  {:<12}  {:<14}  {:<14}  Result", "TestCase", "RF", "DM");
        println!(
            "  {}  {}  {}  {}",
            "-".repeat(12),
            "-".repeat(14),
            "-".repeat(14),
            "-".repeat(10)
        );
        for (id, outcome) in summary.outcomes() {
            let name = format!("TestCase{}", id);
            match outcome {
                CaseOutcome::Skipped(_) => println!(
                    "  {:<12}  {:<14}  {:<14}  {}",
                    name,
                    "N/A",
                    "N/A",
                    "— SKIPPED".yellow()
                ),
                CaseOutcome::SimulationFailed(_) => println!(
                    "  {:<12}  {:<14}  {:<14}  {}",
                    name,
                    "N/A",
                    "N/A",
                    "✗ SIM FAIL".red()
                ),
                CaseOutcome::Verified(verified) => {
                    // Pad before coloring so the ANSI codes do not break the
                    // column widths.
                    let rf = format!("{:<14}", channel_label(&verified.rf));
                    let dm = format!("{:<14}", channel_label(&verified.dm));
                    let rf = if verified.rf.passed() { rf.green() } else { rf.red() };
                    let dm = if verified.dm.passed() { dm.green() } else { dm.red() };
                    let result = if verified.passed() {
                        "✓ PASS".green()
                    } else {
                        "✗ FAIL".red()
                    };
                    println!("  {:<12}  {}  {}  {}", name, rf, dm, result);
                }
            }
        }

        let verify_failed = summary.verify_failed();
        if !verify_failed.is_empty() {
            self.banner("Failure Details");
            for (id, verified) in &verify_failed {
                println!("{}", format!("TestCase{}:", id).bold());
                print_channel_details(Channel::RegisterFile, &verified.rf);
                print_channel_details(Channel::DataMemory, &verified.dm);
            }
        }

        println!();
        if summary.all_passed() {
            println!(
                "  {}",
                format!("ALL {} TEST CASES PASSED!", summary.outcomes().len())
                    .green()
                    .bold()
            );
        } else {
            println!(
                "  Passed : {}",
                format!("{}/{}", summary.passed_ids().len(), summary.outcomes().len()).green()
            );
            let skipped = summary.skipped_ids();
            if !skipped.is_empty() {
                println!(
                    "  Skipped : {}  ({})",
                    skipped.len().to_string().yellow(),
                    id_list(&skipped)
                );
            }
            let sim_failed = summary.sim_failed_ids();
            if !sim_failed.is_empty() {
                println!(
                    "  Sim failures : {}  ({})",
                    sim_failed.len().to_string().red(),
                    id_list(&sim_failed)
                );
            }
            let failed = summary.verify_failed_ids();
            if !failed.is_empty() {
                println!(
                    "  Failed : {}  ({})",
                    failed.len().to_string().red(),
                    id_list(&failed)
                );
            }
        }
        println!();
    }
}

fn channel_label(outcome: &ChannelOutcome) -> String {
    match outcome {
        outcome if outcome.passed() => "PASS".to_string(),
        ChannelOutcome::Compared(result) => format!("FAIL({})", result.mismatch_count()),
        ChannelOutcome::SideMissing { .. } => "FAIL(missing)".to_string(),
    }
}

fn print_channel_details(channel: Channel, outcome: &ChannelOutcome) {
    match outcome {
        ChannelOutcome::Compared(result) if !result.passed() => {
            println!("  {}:", channel.label());
            for mismatch in &result.mismatches {
                println!(
                    "    [{}] Simulation: {:<12} Golden: {:<12}",
                    mismatch.index, mismatch.observed, mismatch.expected
                );
            }
        }
        ChannelOutcome::SideMissing { side, path } => {
            println!(
                "  {}: {} not found: {}",
                channel.label(),
                side.describe(),
                path.display()
            );
        }
        _ => {}
    }
}

fn id_list(ids: &[u32]) -> String {
    let rendered: Vec<String> = ids.iter().map(|id| format!("TestCase{}", id)).collect();
    rendered.join(", ")
}

/// Records the event stream for assertions; used by orchestration tests.
#[cfg(test)]
#[derive(Default)]
pub struct RecordingReporter {
    pub events: Vec<String>,
}

#[cfg(test)]
impl Reporter for RecordingReporter {
    fn case_started(&mut self, id: u32, position: usize, total: usize) {
        self.events
            .push(format!("case_started:{}:{}:{}", id, position, total));
    }

    fn stage_started(&mut self, id: u32, stage: StageKind) {
        self.events.push(format!("stage_started:{}:{:?}", id, stage));
    }

    fn stage_finished(&mut self, id: u32, stage: StageKind, result: Result<(), &StageFailure>) {
        let verdict = if result.is_ok() { "ok" } else { "err" };
        self.events
            .push(format!("stage_finished:{}:{:?}:{}", id, stage, verdict));
    }

    fn channel_compared(&mut self, channel: Channel, outcome: &ChannelOutcome) {
        self.events.push(format!(
            "channel_compared:{}:{}",
            channel.short(),
            if outcome.passed() { "pass" } else { "fail" }
        ));
    }

    fn case_finished(&mut self, id: u32, outcome: &CaseOutcome) {
        let tag = match outcome {
            CaseOutcome::Skipped(_) => "skipped",
            CaseOutcome::SimulationFailed(_) => "sim_failed",
            CaseOutcome::Verified(verified) if verified.passed() => "verified_pass",
            CaseOutcome::Verified(_) => "verified_fail",
        };
        self.events.push(format!("case_finished:{}:{}", id, tag));
    }
}
