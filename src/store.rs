//! JSON-backed build history
//!
//! Serves the history, reference-build, and statistics provider roles from a
//! single file so detection can run outside a CI server.
//!
//! # Example history.json
//!
//! ```json
//! {
//!   "builds": [
//!     { "id": 10, "pipeline": "app_tests", "status": "success",
//!       "tests": [ { "run_id": 100, "name": "suite.test_a", "duration_ms": 1000 } ] },
//!     { "id": 11, "pipeline": "app_tests", "status": "running",
//!       "tests": [ { "run_id": 110, "name": "suite.test_a", "duration_ms": 2100 } ] }
//!   ]
//! }
//! ```

use crate::model::{Build, BuildId, BuildStatistics, BuildStatus, PipelineId, TestName, TestRun};
use crate::provider::{
    HistoryProvider, ProviderError, ReferenceBuildProvider, StatisticsProvider,
};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Outcome of one test execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestStatus {
    #[default]
    Passed,
    Failed,
}

/// Test execution as stored in the history file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredTest {
    pub run_id: u64,
    pub name: TestName,
    pub duration_ms: u64,
    #[serde(default)]
    pub status: TestStatus,
    #[serde(default)]
    pub ignored: bool,
    #[serde(default)]
    pub muted: bool,
}

/// Build as stored in the history file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredBuild {
    pub id: BuildId,
    pub pipeline: PipelineId,
    pub status: BuildStatus,
    #[serde(default)]
    pub tests: Vec<StoredTest>,
}

impl StoredBuild {
    pub fn build(&self) -> Build {
        Build {
            id: self.id,
            pipeline: self.pipeline.clone(),
            status: self.status,
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
struct HistoryFile {
    #[serde(default)]
    builds: Vec<StoredBuild>,
}

/// In-memory build history keyed by build id
#[derive(Debug, Clone, Default)]
pub struct HistoryStore {
    builds: BTreeMap<BuildId, StoredBuild>,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a history file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read history file: {}", path.display()))?;
        Self::from_json(&content)
            .with_context(|| format!("Failed to load history file: {}", path.display()))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let file: HistoryFile = serde_json::from_str(content).context("Failed to parse JSON")?;
        let mut store = Self::new();
        for build in file.builds {
            if store.builds.contains_key(&build.id) {
                bail!("Duplicate build id {}", build.id);
            }
            store.insert(build);
        }
        tracing::debug!("Loaded {} build(s) from history", store.builds.len());
        Ok(store)
    }

    pub fn insert(&mut self, build: StoredBuild) {
        self.builds.insert(build.id, build);
    }

    pub fn build(&self, id: BuildId) -> Option<Build> {
        self.builds.get(&id).map(StoredBuild::build)
    }

    pub fn len(&self) -> usize {
        self.builds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.builds.is_empty()
    }
}

impl HistoryProvider for HistoryStore {
    fn entries_since(
        &self,
        build: &Build,
        pipeline: &PipelineId,
    ) -> Result<Vec<Build>, ProviderError> {
        Ok(self
            .builds
            .range(build.id..)
            .rev()
            .map(|(_, stored)| stored)
            .filter(|stored| &stored.pipeline == pipeline && stored.status.is_finished())
            .map(StoredBuild::build)
            .collect())
    }
}

impl ReferenceBuildProvider for HistoryStore {
    fn previous_successfully_finished(
        &self,
        build: &Build,
    ) -> Result<Option<Build>, ProviderError> {
        Ok(self
            .builds
            .range(..build.id)
            .rev()
            .map(|(_, stored)| stored)
            .find(|stored| {
                stored.pipeline == build.pipeline && stored.status == BuildStatus::Success
            })
            .map(StoredBuild::build))
    }
}

impl StatisticsProvider for HistoryStore {
    fn passed_test_statistics(&self, build: &Build) -> Result<BuildStatistics, ProviderError> {
        let stored = self
            .builds
            .get(&build.id)
            .ok_or(ProviderError::BuildNotFound(build.id))?;

        let passed = stored
            .tests
            .iter()
            .filter(|t| t.status == TestStatus::Passed)
            .map(|t| TestRun {
                run_id: t.run_id,
                name: t.name.clone(),
                duration_ms: t.duration_ms,
                build_id: stored.id,
                ignored: t.ignored,
                muted: t.muted,
            })
            .collect();

        Ok(BuildStatistics::new(passed))
    }
}
