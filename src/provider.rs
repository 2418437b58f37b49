//! Collaborator interfaces used by regression detection
//!
//! The detector never reaches into a global registry; the host supplies
//! build history, reference-build lookup, test statistics, and a problem sink
//! through these traits.

use crate::model::{Build, BuildId, BuildStatistics, PipelineId, TestName, TestRun};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors raised by history and statistics providers
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Build not found: {0}")]
    BuildNotFound(BuildId),

    /// The build exists but its test statistics cannot be read, e.g. a
    /// remote statistics store is offline. Host providers raise this; the
    /// file-backed `HistoryStore` holds every build in memory and never does.
    #[error("Statistics unavailable for build {build}: {reason}")]
    StatisticsUnavailable { build: BuildId, reason: String },

    /// The history query itself failed. The detector then compares against
    /// the reference build alone.
    #[error("History query failed: {0}")]
    HistoryUnavailable(String),
}

pub type Result<T> = std::result::Result<T, ProviderError>;

/// Finished-build history of pipelines
pub trait HistoryProvider {
    /// Finished builds of `pipeline` starting at `build` (inclusive), in
    /// provider-native order (newest first)
    fn entries_since(&self, build: &Build, pipeline: &PipelineId) -> Result<Vec<Build>>;
}

/// Lookup of the reference build a new build is compared against
pub trait ReferenceBuildProvider {
    /// Most recent build of the same pipeline, strictly before `build`, that
    /// finished successfully
    fn previous_successfully_finished(&self, build: &Build) -> Result<Option<Build>>;
}

/// Per-build passed-test statistics
pub trait StatisticsProvider {
    fn passed_test_statistics(&self, build: &Build) -> Result<BuildStatistics>;

    fn find_records<'a>(&self, stats: &'a BuildStatistics, name: &TestName) -> Vec<&'a TestRun> {
        stats.find_tests_by(name)
    }
}

/// A build problem raised against the current build
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildProblem {
    /// Stable identity; reporting the same id twice is a no-op
    pub problem_id: String,
    pub problem_type: String,
    pub message: String,
    /// Machine-readable detail (JSON text)
    pub details: String,
}

/// Destination of raised problems
pub trait ProblemSink {
    fn report(&mut self, problem: BuildProblem);
}

/// In-memory sink keyed by problem id
///
/// The first report for a given id is kept; later reports with the same id
/// are dropped.
#[derive(Debug, Default, Clone)]
pub struct ProblemLog {
    problems: BTreeMap<String, BuildProblem>,
}

impl ProblemLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn problems(&self) -> impl Iterator<Item = &BuildProblem> {
        self.problems.values()
    }

    pub fn get(&self, problem_id: &str) -> Option<&BuildProblem> {
        self.problems.get(problem_id)
    }

    pub fn len(&self) -> usize {
        self.problems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.problems.is_empty()
    }
}

impl ProblemSink for ProblemLog {
    fn report(&mut self, problem: BuildProblem) {
        self.problems
            .entry(problem.problem_id.clone())
            .or_insert(problem);
    }
}

impl ProblemSink for Vec<BuildProblem> {
    fn report(&mut self, problem: BuildProblem) {
        self.push(problem);
    }
}
