//! Build and test-run records consumed by regression detection
//!
//! A `Build` is one run of a pipeline. Its passed tests are captured as a
//! `BuildStatistics` snapshot, indexed by `TestName` so the same test can be
//! looked up across builds.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Normalized test name used as the join key across builds
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct TestName(String);

impl TestName {
    /// Create a test name, trimming surrounding whitespace
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(name.as_ref().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for TestName {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl From<&str> for TestName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<TestName> for String {
    fn from(name: TestName) -> Self {
        name.0
    }
}

impl fmt::Display for TestName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Build identifier, monotonically increasing within a server
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct BuildId(pub u64);

impl fmt::Display for BuildId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Pipeline (build configuration) identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PipelineId(pub String);

impl PipelineId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for PipelineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Overall outcome of a build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildStatus {
    Success,
    Failure,
    Running,
}

impl BuildStatus {
    pub fn is_finished(self) -> bool {
        !matches!(self, BuildStatus::Running)
    }
}

/// A single run of a pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Build {
    pub id: BuildId,
    pub pipeline: PipelineId,
    pub status: BuildStatus,
}

impl Build {
    pub fn new(id: u64, pipeline: impl Into<String>, status: BuildStatus) -> Self {
        Self {
            id: BuildId(id),
            pipeline: PipelineId::new(pipeline),
            status,
        }
    }
}

/// One execution of a test inside a build
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestRun {
    /// Server-wide unique id of this execution
    pub run_id: u64,
    pub name: TestName,
    pub duration_ms: u64,
    pub build_id: BuildId,
    #[serde(default)]
    pub ignored: bool,
    #[serde(default)]
    pub muted: bool,
}

impl TestRun {
    /// Ignored and muted runs never take part in duration comparison
    pub fn is_comparable(&self) -> bool {
        !self.ignored && !self.muted
    }
}

/// Passed-test snapshot of one build
///
/// A test may appear more than once (reruns); `find_tests_by` returns every
/// execution in capture order.
#[derive(Debug, Clone, Default)]
pub struct BuildStatistics {
    passed: Vec<TestRun>,
    by_name: HashMap<TestName, Vec<usize>>,
}

impl BuildStatistics {
    pub fn new(passed: Vec<TestRun>) -> Self {
        let mut by_name: HashMap<TestName, Vec<usize>> = HashMap::new();
        for (idx, run) in passed.iter().enumerate() {
            by_name.entry(run.name.clone()).or_default().push(idx);
        }
        Self { passed, by_name }
    }

    /// Passed test executions in capture order
    pub fn passed_tests(&self) -> &[TestRun] {
        &self.passed
    }

    pub fn find_tests_by(&self, name: &TestName) -> Vec<&TestRun> {
        self.by_name
            .get(name)
            .map(|indices| indices.iter().map(|&i| &self.passed[i]).collect())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.passed.is_empty()
    }

    pub fn len(&self) -> usize {
        self.passed.len()
    }
}
