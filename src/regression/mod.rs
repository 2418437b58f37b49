// Slow-test regression detection across successive builds of a pipeline
//
// A finished build is compared with its reference build, the last build of the
// same pipeline that finished successfully, and with every finished build in
// between. Each passed test whose name matches the configured pattern is
// reported when its duration grew past the threshold relative to one of those
// earlier executions.
//
// Components:
// - policy: raw feature parameters -> decision policy (inert when malformed)
// - history: the chain of builds between reference and current build
// - detector: per-test comparison and problem reporting

mod detector;
mod history;
mod policy;

pub use detector::{
    Detector, DetectorOptions, RegressionReport, TestSlowdownInfo, PROBLEM_TYPE,
};
pub use history::builds_between;
pub use policy::{
    default_parameters, slowdown_percent, slowdown_ratio, DecisionPolicy, FeatureParameters,
    DEFAULT_MIN_DURATION_MS, DEFAULT_TEST_NAMES_PATTERN, DEFAULT_THRESHOLD_PERCENT,
    FALLBACK_MIN_DURATION_MS, MIN_DURATION_PARAM, TEST_NAMES_PATTERNS_PARAM, THRESHOLD_PARAM,
};
