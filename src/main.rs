// SPDX-License-Identifier: Apache-2.0

//! Command line driver that automates regression verification of the
//! RISC-V CPU design.
//!
//! For each selected test case it converts the test-case description into
//! the instruction-memory initialization artifacts, generates the golden
//! reference with the independent model, runs the Vivado batch simulation,
//! and verifies the register-file and data-memory dumps against the golden
//! reference.
//!
//! Sample usage:
//!
//! ```shell
//! $ riscv-regress 3                 # run test case 3
//! $ riscv-regress all               # run the whole regression set
//! $ riscv-regress                   # interactive prompt
//! $ riscv-regress --toolchain=$HOME/regress-toolchain.toml all
//! ```
//!
//! The process exit status is the machine-readable result: 0 iff every
//! attempted case verified clean, 1 on any mismatch, skip, or failure.

mod batch;
mod coe;
mod compare;
mod layout;
mod mem_image;
mod report;
mod report_cli_error;
mod stage;
mod testcase;
mod toolchain_config;
mod tools;

use std::io::Write;

use clap::{Arg, ArgAction};
use colored::Colorize;
use serde::Deserialize;

use crate::batch::{run_batch, CASE_RANGE};
use crate::layout::ProjectLayout;
use crate::report::{ConsoleReporter, Reporter};
use crate::report_cli_error::report_cli_error_and_exit;
use crate::toolchain_config::ToolchainConfig;

#[derive(Deserialize)]
struct RegressToolchain {
    toolchain: ToolchainConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Selection {
    One(u32),
    All,
}

fn parse_selection(input: &str) -> Option<Selection> {
    let input = input.trim().to_lowercase();
    if input == "all" {
        return Some(Selection::All);
    }
    match input.parse::<u32>() {
        Ok(id) if CASE_RANGE.contains(&id) => Some(Selection::One(id)),
        _ => None,
    }
}

/// Interactive selection: list the available inputs, then read until the
/// user names a runnable case or `all`. Returns `None` when the user
/// cancels (EOF or a broken stdin), which is a clean exit, not a failure.
fn prompt_selection(layout: &ProjectLayout, reporter: &mut ConsoleReporter) -> Option<Selection> {
    let available: Vec<(u32, bool)> = CASE_RANGE
        .map(|id| (id, layout.test_case(id).exists()))
        .collect();
    reporter.cases_available(&available);

    let mut input = String::new();
    loop {
        print!(
            "\n{}",
            format!(
                "Enter test case [{}-{}] or 'all' to run all: ",
                CASE_RANGE.start(),
                CASE_RANGE.end()
            )
            .bold()
        );
        let _ = std::io::stdout().flush();
        input.clear();
        match std::io::stdin().read_line(&mut input) {
            Ok(0) | Err(_) => return None,
            Ok(_) => {}
        }
        match parse_selection(&input) {
            Some(Selection::One(id)) if !layout.test_case(id).exists() => {
                println!(
                    "{}",
                    format!("TestCase{}.dat not found. Please choose another.", id).red()
                );
            }
            Some(selection) => return Some(selection),
            None => {
                println!(
                    "{}",
                    format!(
                        "Invalid input. Please enter a number between {} and {}, or 'all'.",
                        CASE_RANGE.start(),
                        CASE_RANGE.end()
                    )
                    .red()
                );
            }
        }
    }
}

fn load_toolchain_config(toolchain_flag: Option<&String>) -> Option<ToolchainConfig> {
    let mut toml_path: Option<String> = toolchain_flag.map(|s| s.to_string());

    // If there is no toolchain flag specified, but there is a
    // regress-toolchain.toml in the current directory, use that.
    if toml_path.is_none() {
        if let Ok(cwd) = std::env::current_dir() {
            let cwd_toml_path = cwd.join("regress-toolchain.toml");
            if cwd_toml_path.exists() {
                log::info!(
                    "Using regress-toolchain.toml in current directory: {}",
                    cwd_toml_path.display()
                );
                toml_path = Some(cwd_toml_path.display().to_string());
            }
        }
    }

    toml_path.map(|path| {
        if !std::path::Path::new(&path).exists() {
            report_cli_error_and_exit(
                "toolchain toml file does not exist",
                vec![("path", &path)],
            );
        }
        let toml_str = match std::fs::read_to_string(&path) {
            Ok(toml_str) => toml_str,
            Err(e) => report_cli_error_and_exit(
                "could not read toolchain toml file",
                vec![("path", &path), ("error", &e.to_string())],
            ),
        };
        let parsed: RegressToolchain = match toml::from_str(&toml_str) {
            Ok(parsed) => parsed,
            Err(e) => report_cli_error_and_exit(
                "could not parse toolchain toml file",
                vec![("path", &path), ("error", &e.to_string())],
            ),
        };
        parsed.toolchain
    })
}

fn main() {
    let _ = env_logger::try_init();

    let matches = clap::Command::new("riscv-regress")
        .version(env!("CARGO_PKG_VERSION"))
        .about(
            "Converts test cases, generates the golden reference, runs the Vivado \
             batch simulation, and verifies the resulting dumps",
        )
        .arg(
            Arg::new("toolchain")
                .long("toolchain")
                .value_name("TOML_FILE")
                .help("Path to a regress-toolchain.toml file")
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("project_dir")
                .long("project_dir")
                .value_name("DIR")
                .help("Root of the verification tree (holds Pattern/, Testbench/, Script.tcl)")
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("case")
                .value_name("CASE")
                .help("Test case number or 'all'; prompts interactively when omitted")
                .index(1),
        )
        .get_matches();

    let config = load_toolchain_config(matches.get_one::<String>("toolchain"));
    let layout = ProjectLayout::new(
        matches
            .get_one::<String>("project_dir")
            .map(String::as_str)
            .unwrap_or("."),
    );

    let mut reporter = ConsoleReporter;
    reporter.banner("RISC-V CPU Automated Verification");

    let selection = match matches.get_one::<String>("case") {
        Some(arg) => match parse_selection(arg) {
            Some(selection) => selection,
            None => report_cli_error_and_exit(
                "invalid CASE argument",
                vec![
                    ("got", arg.as_str()),
                    ("expected", "a test case number in range, or 'all'"),
                ],
            ),
        },
        None => match prompt_selection(&layout, &mut reporter) {
            Some(selection) => selection,
            None => {
                println!("\n{}", "Operation cancelled by user.".yellow());
                return;
            }
        },
    };

    let resolved = match tools::resolve_tools(&config) {
        Ok(resolved) => resolved,
        Err(e) => {
            let details = e.to_string();
            report_cli_error_and_exit(
                "Vivado executable not found",
                vec![
                    ("details", details.as_str()),
                    (
                        "hint",
                        "add the Vivado bin directory to PATH, or set vivado_path in \
                         regress-toolchain.toml",
                    ),
                ],
            )
        }
    };
    log::info!("using vivado: {}", resolved.vivado.display());

    let sim_script = layout.sim_script();
    if !sim_script.exists() {
        report_cli_error_and_exit(
            "simulation batch script not found",
            vec![("path", &sim_script.display().to_string())],
        );
    }

    let range = match selection {
        Selection::One(id) => id..=id,
        Selection::All => CASE_RANGE,
    };
    let summary = run_batch(range, &layout, &resolved, &mut reporter);
    std::process::exit(if summary.all_passed() { 0 } else { 1 });
}

#[cfg(test)]
mod tests {
    use super::{parse_selection, Selection};

    #[test]
    fn selection_accepts_in_range_numbers_and_all() {
        assert_eq!(parse_selection("1"), Some(Selection::One(1)));
        assert_eq!(parse_selection(" 12 "), Some(Selection::One(12)));
        assert_eq!(parse_selection("all"), Some(Selection::All));
        assert_eq!(parse_selection("ALL"), Some(Selection::All));
    }

    #[test]
    fn selection_rejects_out_of_range_and_noise() {
        assert_eq!(parse_selection("0"), None);
        assert_eq!(parse_selection("13"), None);
        assert_eq!(parse_selection("-3"), None);
        assert_eq!(parse_selection("afew"), None);
        assert_eq!(parse_selection(""), None);
    }
}
