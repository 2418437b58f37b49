//! Text and JSON rendering of a detection run

use crate::model::BuildId;
use crate::regression::RegressionReport;
use serde::{Deserialize, Serialize};

/// Outcome of one detection run, as printed by the CLI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionSummary {
    pub build_id: BuildId,
    pub policy: String,
    pub regressions: Vec<RegressionReport>,
    /// Distinct build problems raised; reports sharing a problem id count once
    pub problems: usize,
}

impl DetectionSummary {
    pub fn new(
        build_id: BuildId,
        policy: String,
        regressions: Vec<RegressionReport>,
        problems: usize,
    ) -> Self {
        Self {
            build_id,
            policy,
            regressions,
            problems,
        }
    }

    pub fn has_regressions(&self) -> bool {
        !self.regressions.is_empty()
    }

    /// Generate human-readable report
    pub fn to_report_string(&self) -> String {
        let mut report = String::new();

        if self.regressions.is_empty() {
            report.push_str(&format!("✅ NO SLOW TESTS in build {}\n", self.build_id));
        } else {
            report.push_str(&format!(
                "❌ SLOW TESTS DETECTED in build {} ({} problem(s), {} report(s))\n",
                self.build_id,
                self.problems,
                self.regressions.len()
            ));
        }
        report.push_str(&format!("Policy: {}\n", self.policy));

        if !self.regressions.is_empty() {
            report.push_str("\n📊 Regressions:\n");
            for r in &self.regressions {
                report.push_str(&format!(
                    "  {} (+{}%: {} ms -> {} ms, compared with build {})\n",
                    r.test_name,
                    r.slowdown_percent,
                    r.info.reference_duration_ms,
                    r.info.current_duration_ms,
                    r.info.reference_build_id
                ));
            }
        }

        report
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
