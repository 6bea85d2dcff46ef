// SPDX-License-Identifier: Apache-2.0

//! Batch execution across a range of test-case ids and aggregation of the
//! per-case outcomes.
//!
//! Every id in the range is attempted exactly once; one case's failure
//! never prevents the remaining ids from running. The external toolchain
//! writes to fixed shared paths, so cases run strictly one at a time.

use std::ops::RangeInclusive;

use crate::layout::ProjectLayout;
use crate::report::Reporter;
use crate::testcase::{run_case, CaseOutcome, VerifiedCase};
use crate::tools::ResolvedTools;

/// The fixed regression set of this project.
pub const CASE_RANGE: RangeInclusive<u32> = 1..=12;

/// Ordered per-case outcomes of one run, one entry per attempted id.
#[derive(Debug)]
pub struct BatchSummary {
    outcomes: Vec<(u32, CaseOutcome)>,
}

impl BatchSummary {
    pub fn new(outcomes: Vec<(u32, CaseOutcome)>) -> Self {
        BatchSummary { outcomes }
    }

    pub fn outcomes(&self) -> &[(u32, CaseOutcome)] {
        &self.outcomes
    }

    pub fn passed_ids(&self) -> Vec<u32> {
        self.ids_where(|outcome| outcome.passed())
    }

    pub fn skipped_ids(&self) -> Vec<u32> {
        self.ids_where(|outcome| matches!(outcome, CaseOutcome::Skipped(_)))
    }

    pub fn sim_failed_ids(&self) -> Vec<u32> {
        self.ids_where(|outcome| matches!(outcome, CaseOutcome::SimulationFailed(_)))
    }

    /// Cases that were fully compared and found mismatching.
    pub fn verify_failed_ids(&self) -> Vec<u32> {
        self.verify_failed().iter().map(|(id, _)| *id).collect()
    }

    pub fn verify_failed(&self) -> Vec<(u32, &VerifiedCase)> {
        self.outcomes
            .iter()
            .filter_map(|(id, outcome)| match outcome {
                CaseOutcome::Verified(verified) if !verified.passed() => Some((*id, verified)),
                _ => None,
            })
            .collect()
    }

    /// True iff every attempted case was verified and matched. Skips and
    /// simulation failures count against the batch even though they are
    /// reported in their own categories.
    pub fn all_passed(&self) -> bool {
        !self.outcomes.is_empty() && self.outcomes.iter().all(|(_, outcome)| outcome.passed())
    }

    fn ids_where(&self, predicate: impl Fn(&CaseOutcome) -> bool) -> Vec<u32> {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| predicate(outcome))
            .map(|(id, _)| *id)
            .collect()
    }
}

/// Runs every id in `range` through the pipeline, in ascending order.
pub fn run_batch(
    range: RangeInclusive<u32>,
    layout: &ProjectLayout,
    tools: &ResolvedTools,
    reporter: &mut dyn Reporter,
) -> BatchSummary {
    let total = range.clone().count();
    log::info!("run_batch: {} case(s)", total);
    let mut outcomes = Vec::with_capacity(total);
    for (position, id) in range.enumerate() {
        reporter.case_started(id, position + 1, total);
        let outcome = run_case(id, layout, tools, reporter);
        reporter.case_finished(id, &outcome);
        outcomes.push((id, outcome));
    }
    let summary = BatchSummary::new(outcomes);
    reporter.batch_finished(&summary);
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::{ChannelOutcome, ComparisonResult, Mismatch};
    use crate::stage::StageFailure;
    use crate::testcase::SkipReason;
    use std::path::PathBuf;

    fn passing_channel() -> ChannelOutcome {
        ChannelOutcome::Compared(ComparisonResult { mismatches: vec![] })
    }

    fn failing_channel() -> ChannelOutcome {
        ChannelOutcome::Compared(ComparisonResult {
            mismatches: vec![Mismatch {
                index: 3,
                observed: "0".to_string(),
                expected: "1".to_string(),
            }],
        })
    }

    fn verified(rf: ChannelOutcome, dm: ChannelOutcome) -> CaseOutcome {
        CaseOutcome::Verified(VerifiedCase { rf, dm })
    }

    fn mixed_summary() -> BatchSummary {
        BatchSummary::new(vec![
            (1, verified(passing_channel(), passing_channel())),
            (
                2,
                CaseOutcome::Skipped(SkipReason::InputNotFound(PathBuf::from(
                    "Pattern/TestCase2.dat",
                ))),
            ),
            (
                3,
                CaseOutcome::SimulationFailed(StageFailure::Timeout {
                    limit: std::time::Duration::from_secs(600),
                }),
            ),
            (4, verified(passing_channel(), failing_channel())),
        ])
    }

    #[test]
    fn categories_partition_the_id_range() {
        let summary = mixed_summary();
        assert_eq!(summary.passed_ids(), vec![1]);
        assert_eq!(summary.skipped_ids(), vec![2]);
        assert_eq!(summary.sim_failed_ids(), vec![3]);
        assert_eq!(summary.verify_failed_ids(), vec![4]);

        let mut all: Vec<u32> = summary
            .passed_ids()
            .into_iter()
            .chain(summary.skipped_ids())
            .chain(summary.sim_failed_ids())
            .chain(summary.verify_failed_ids())
            .collect();
        all.sort();
        let ids: Vec<u32> = summary.outcomes().iter().map(|(id, _)| *id).collect();
        assert_eq!(all, ids, "every id must land in exactly one category");
    }

    #[test]
    fn any_skip_or_failure_fails_the_batch() {
        assert!(!mixed_summary().all_passed());

        let all_pass = BatchSummary::new(vec![
            (1, verified(passing_channel(), passing_channel())),
            (2, verified(passing_channel(), passing_channel())),
        ]);
        assert!(all_pass.all_passed());

        let skipped_only = BatchSummary::new(vec![(
            1,
            CaseOutcome::Skipped(SkipReason::InputNotFound(PathBuf::from("x"))),
        )]);
        assert!(!skipped_only.all_passed());
    }

    #[test]
    fn empty_batch_is_not_a_pass() {
        assert!(!BatchSummary::new(vec![]).all_passed());
    }
}
