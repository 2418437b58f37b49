// Slow-test regression detection for a finished build
//
// The current build's passed tests are compared against the reference build
// (last successfully finished build before it) and against every finished
// build in between. A test is reported when the decision policy calls its
// current duration slow relative to one of those executions.

use crate::model::{Build, BuildId, BuildStatistics, TestName};
use crate::provider::{
    BuildProblem, HistoryProvider, ProblemSink, ReferenceBuildProvider, StatisticsProvider,
};
use crate::regression::history::builds_between;
use crate::regression::policy::{slowdown_percent, DecisionPolicy};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const PROBLEM_TYPE: &str = "testDurationFailureCondition";

/// Durations and run identities behind one regression
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestSlowdownInfo {
    pub current_run_id: u64,
    pub current_duration_ms: u64,
    pub reference_run_id: u64,
    pub reference_duration_ms: u64,
    pub reference_build_id: BuildId,
}

/// One detected regression of one test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegressionReport {
    pub test_name: TestName,
    /// Whole percent, truncated toward zero
    pub slowdown_percent: i64,
    #[serde(flatten)]
    pub info: TestSlowdownInfo,
}

impl RegressionReport {
    /// Stable identity derived from the current test run
    pub fn problem_id(&self) -> String {
        format!("{}.{}", PROBLEM_TYPE, self.info.current_run_id)
    }

    pub fn message(&self) -> String {
        format!(
            "Test '{}' became {}% slower",
            self.test_name, self.slowdown_percent
        )
    }

    pub fn to_build_problem(&self) -> BuildProblem {
        BuildProblem {
            problem_id: self.problem_id(),
            problem_type: PROBLEM_TYPE.to_string(),
            message: self.message(),
            details: serde_json::to_string(&self.info).unwrap_or_default(),
        }
    }
}

/// Detector behavior switches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorOptions {
    /// Report a test at most once, against the first corroborating execution
    /// found slow. Off by default: every slow execution yields its own report.
    pub stop_at_first_regression: bool,
}

impl Default for DetectorOptions {
    fn default() -> Self {
        Self {
            stop_at_first_regression: false,
        }
    }
}

enum Slot {
    Pending,
    Ready(BuildStatistics),
    Failed,
}

/// Reference build followed by the chain, with statistics fetched on first use
struct CorroborationSet<'a> {
    statistics: &'a dyn StatisticsProvider,
    builds: Vec<(Build, Slot)>,
}

impl<'a> CorroborationSet<'a> {
    fn new(
        statistics: &'a dyn StatisticsProvider,
        reference: Build,
        reference_stats: Slot,
        chain: Vec<Build>,
    ) -> Self {
        let mut builds = Vec::with_capacity(chain.len() + 1);
        builds.push((reference, reference_stats));
        builds.extend(chain.into_iter().map(|b| (b, Slot::Pending)));
        Self { statistics, builds }
    }

    fn len(&self) -> usize {
        self.builds.len()
    }

    fn build_id(&self, idx: usize) -> BuildId {
        self.builds[idx].0.id
    }

    fn stats(&mut self, idx: usize) -> Option<&BuildStatistics> {
        let (build, slot) = &mut self.builds[idx];
        if let Slot::Pending = slot {
            *slot = match self.statistics.passed_test_statistics(build) {
                Ok(stats) => Slot::Ready(stats),
                Err(e) => {
                    tracing::warn!("Skipping build {} for comparison: {}", build.id, e);
                    Slot::Failed
                }
            };
        }
        match &*slot {
            Slot::Ready(stats) => Some(stats),
            Slot::Pending | Slot::Failed => None,
        }
    }
}

/// Regression detector wired to its collaborators
pub struct Detector<'a> {
    history: &'a dyn HistoryProvider,
    references: &'a dyn ReferenceBuildProvider,
    statistics: &'a dyn StatisticsProvider,
    options: DetectorOptions,
}

impl<'a> Detector<'a> {
    pub fn new(
        history: &'a dyn HistoryProvider,
        references: &'a dyn ReferenceBuildProvider,
        statistics: &'a dyn StatisticsProvider,
    ) -> Self {
        Self {
            history,
            references,
            statistics,
            options: DetectorOptions::default(),
        }
    }

    /// Detector backed by a single provider serving all three roles
    pub fn from_provider<P>(provider: &'a P) -> Self
    where
        P: HistoryProvider + ReferenceBuildProvider + StatisticsProvider,
    {
        Self::new(provider, provider, provider)
    }

    pub fn with_options(mut self, options: DetectorOptions) -> Self {
        self.options = options;
        self
    }

    /// Detect slow tests in `current`
    ///
    /// Returns nothing when the policy is inert or when no successfully
    /// finished build precedes `current`. Provider failures never abort the
    /// run; the affected build is skipped.
    pub fn detect(&self, policy: &DecisionPolicy, current: &Build) -> Vec<RegressionReport> {
        if policy.is_inert() {
            tracing::debug!("Policy is inert, skipping build {}", current.id);
            return Vec::new();
        }

        let reference = match self.references.previous_successfully_finished(current) {
            Ok(Some(reference)) => reference,
            Ok(None) => {
                tracing::debug!("No successful build before {}, nothing to compare", current.id);
                return Vec::new();
            }
            Err(e) => {
                tracing::warn!("Reference build lookup for {} failed: {}", current.id, e);
                return Vec::new();
            }
        };

        self.compare_test_durations(policy, reference, current)
    }

    /// Detect and hand every regression to `sink`
    pub fn check_build(
        &self,
        policy: &DecisionPolicy,
        current: &Build,
        sink: &mut dyn ProblemSink,
    ) -> Vec<RegressionReport> {
        let reports = self.detect(policy, current);
        for report in &reports {
            sink.report(report.to_build_problem());
        }
        reports
    }

    /// Compare `current` against `reference` and the builds between them
    pub fn compare_test_durations(
        &self,
        policy: &DecisionPolicy,
        reference: Build,
        current: &Build,
    ) -> Vec<RegressionReport> {
        let current_stats = match self.statistics.passed_test_statistics(current) {
            Ok(stats) => stats,
            Err(e) => {
                tracing::warn!("No statistics for build {}: {}", current.id, e);
                return Vec::new();
            }
        };

        let reference_stats = match self.statistics.passed_test_statistics(&reference) {
            Ok(stats) => Slot::Ready(stats),
            Err(e) => {
                tracing::warn!("Skipping reference build {}: {}", reference.id, e);
                Slot::Failed
            }
        };

        let chain = builds_between(self.history, &reference, current).unwrap_or_else(|e| {
            tracing::warn!(
                "History between {} and {} unavailable: {}",
                reference.id,
                current.id,
                e
            );
            Vec::new()
        });

        tracing::info!(
            "Comparing build {} against reference {} and {} intermediate build(s) ({})",
            current.id,
            reference.id,
            chain.len(),
            policy
        );

        let mut corroboration =
            CorroborationSet::new(self.statistics, reference, reference_stats, chain);
        let reports = self.process_tests(policy, &current_stats, &mut corroboration);

        tracing::info!(
            "Build {}: {} slow test report(s)",
            current.id,
            reports.len()
        );
        reports
    }

    fn process_tests(
        &self,
        policy: &DecisionPolicy,
        current_stats: &BuildStatistics,
        corroboration: &mut CorroborationSet<'_>,
    ) -> Vec<RegressionReport> {
        let mut processed: HashSet<&TestName> = HashSet::new();
        let mut reports = Vec::new();

        for run in current_stats.passed_tests() {
            if !policy.is_interesting(run.name.as_str()) {
                continue;
            }
            if !processed.insert(&run.name) {
                continue;
            }

            'builds: for idx in 0..corroboration.len() {
                let build_id = corroboration.build_id(idx);
                let Some(stats) = corroboration.stats(idx) else {
                    continue;
                };

                for earlier in self.statistics.find_records(stats, &run.name) {
                    if !earlier.is_comparable() {
                        continue;
                    }
                    if !policy.is_slow(earlier.duration_ms, run.duration_ms) {
                        continue;
                    }
                    let Some(slowdown) = slowdown_percent(earlier.duration_ms, run.duration_ms)
                    else {
                        continue;
                    };

                    tracing::info!(
                        "Test '{}' became {}% slower ({} ms -> {} ms, build {})",
                        run.name,
                        slowdown,
                        earlier.duration_ms,
                        run.duration_ms,
                        build_id
                    );
                    reports.push(RegressionReport {
                        test_name: run.name.clone(),
                        slowdown_percent: slowdown,
                        info: TestSlowdownInfo {
                            current_run_id: run.run_id,
                            current_duration_ms: run.duration_ms,
                            reference_run_id: earlier.run_id,
                            reference_duration_ms: earlier.duration_ms,
                            reference_build_id: build_id,
                        },
                    });

                    if self.options.stop_at_first_regression {
                        break 'builds;
                    }
                }
            }
        }

        reports
    }
}
