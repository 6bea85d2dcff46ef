// SPDX-License-Identifier: Apache-2.0

// Expose the modules needed by the integration tests and external users.
// Keep this facade minimal to avoid pulling in the CLI surface.
pub mod batch;
pub mod coe;
pub mod compare;
pub mod layout;
pub mod mem_image;
pub mod report;
pub mod report_cli_error;
pub mod stage;
pub mod testcase;
pub mod toolchain_config;
pub mod tools;
