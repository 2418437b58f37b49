// Decision policy for slow-test detection
//
// Raw feature parameters (strings, as the host stores them) are resolved once
// per detection run into a policy. A malformed pattern or threshold yields the
// inert policy, which finds nothing; a malformed minimum duration falls back to
// a fixed floor.

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub const TEST_NAMES_PATTERNS_PARAM: &str = "testNamesPatterns";
pub const MIN_DURATION_PARAM: &str = "minDuration";
pub const THRESHOLD_PARAM: &str = "threshold";

/// Minimum duration offered by default when the feature is configured
pub const DEFAULT_MIN_DURATION_MS: u64 = 1000;

/// Minimum duration used when the configured value does not parse as an
/// integer; negative integers turn the floor off instead
pub const FALLBACK_MIN_DURATION_MS: u64 = 300;

pub const DEFAULT_TEST_NAMES_PATTERN: &str = ".*";
pub const DEFAULT_THRESHOLD_PERCENT: f64 = 80.0;

/// Raw feature parameters keyed by parameter name
///
/// Values are kept as text so malformed input reaches `DecisionPolicy::resolve`
/// instead of failing earlier. Numbers and booleans in a config file are
/// accepted and stored in their textual form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FeatureParameters(BTreeMap<String, String>);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
}

impl RawValue {
    fn into_text(self) -> String {
        match self {
            RawValue::Text(s) => s,
            RawValue::Integer(i) => i.to_string(),
            RawValue::Float(f) => f.to_string(),
            RawValue::Bool(b) => b.to_string(),
        }
    }
}

impl<'de> Deserialize<'de> for FeatureParameters {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, RawValue>::deserialize(deserializer)?;
        Ok(Self(
            raw.into_iter().map(|(k, v)| (k, v.into_text())).collect(),
        ))
    }
}

impl FeatureParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Overlay `other` on top of `self`; keys in `other` win
    pub fn merge(&mut self, other: &FeatureParameters) {
        for (k, v) in &other.0 {
            self.0.insert(k.clone(), v.clone());
        }
    }
}

/// Parameters a newly configured feature starts with
pub fn default_parameters() -> FeatureParameters {
    FeatureParameters::new()
        .with(TEST_NAMES_PATTERNS_PARAM, DEFAULT_TEST_NAMES_PATTERN)
        .with(MIN_DURATION_PARAM, DEFAULT_MIN_DURATION_MS.to_string())
        .with(THRESHOLD_PARAM, DEFAULT_THRESHOLD_PERCENT.to_string())
}

/// Which tests are compared and what counts as slow
#[derive(Debug, Clone)]
pub enum DecisionPolicy {
    /// Tests whose name fully matches `pattern` are compared
    Matching {
        pattern: Regex,
        threshold_percent: f64,
        min_duration_ms: u64,
    },
    /// Configuration was malformed; nothing is interesting, nothing is slow
    Inert,
}

impl DecisionPolicy {
    /// Resolve raw parameters into a policy
    ///
    /// # Example
    /// ```
    /// use slowtest::regression::{default_parameters, DecisionPolicy};
    ///
    /// let policy = DecisionPolicy::resolve(&default_parameters());
    /// assert!(policy.is_interesting("suite.test_login"));
    /// assert!(policy.is_slow(1000, 2000));
    /// assert!(!policy.is_slow(1000, 1700));
    /// ```
    pub fn resolve(params: &FeatureParameters) -> Self {
        let min_duration_ms = params
            .get(MIN_DURATION_PARAM)
            .and_then(|s| s.trim().parse::<i64>().ok())
            .map(|ms| ms.max(0) as u64)
            .unwrap_or_else(|| {
                tracing::debug!(
                    "{} is missing or invalid, using {} ms",
                    MIN_DURATION_PARAM,
                    FALLBACK_MIN_DURATION_MS
                );
                FALLBACK_MIN_DURATION_MS
            });

        let Some(pattern) = params.get(TEST_NAMES_PATTERNS_PARAM) else {
            tracing::warn!("{} is not set, detection disabled", TEST_NAMES_PATTERNS_PARAM);
            return Self::Inert;
        };
        let pattern = match compile_full_match(pattern) {
            Ok(re) => re,
            Err(e) => {
                tracing::warn!("Invalid {} '{}': {}", TEST_NAMES_PATTERNS_PARAM, pattern, e);
                return Self::Inert;
            }
        };

        let threshold_percent = match params.get(THRESHOLD_PARAM).map(|s| s.trim().parse::<f64>())
        {
            Some(Ok(t)) => t,
            Some(Err(e)) => {
                tracing::warn!("Invalid {}: {}", THRESHOLD_PARAM, e);
                return Self::Inert;
            }
            None => {
                tracing::warn!("{} is not set, detection disabled", THRESHOLD_PARAM);
                return Self::Inert;
            }
        };

        Self::Matching {
            pattern,
            threshold_percent,
            min_duration_ms,
        }
    }

    pub fn is_inert(&self) -> bool {
        matches!(self, Self::Inert)
    }

    /// True iff the whole test name matches the configured pattern
    pub fn is_interesting(&self, test_name: &str) -> bool {
        match self {
            Self::Matching { pattern, .. } => pattern.is_match(test_name),
            Self::Inert => false,
        }
    }

    /// Floor check, then percentage check against the threshold
    ///
    /// A zero reference duration is never slow.
    pub fn is_slow(&self, reference_ms: u64, current_ms: u64) -> bool {
        match self {
            Self::Matching {
                threshold_percent,
                min_duration_ms,
                ..
            } => {
                if current_ms < *min_duration_ms {
                    return false;
                }
                match slowdown_ratio(reference_ms, current_ms) {
                    Some(pct) => pct > *threshold_percent,
                    None => false,
                }
            }
            Self::Inert => false,
        }
    }
}

impl fmt::Display for DecisionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Matching {
                pattern,
                threshold_percent,
                min_duration_ms,
            } => write!(
                f,
                "pattern={} threshold={}% min_duration={}ms",
                pattern.as_str(),
                threshold_percent,
                min_duration_ms
            ),
            Self::Inert => f.write_str("inert"),
        }
    }
}

/// Slowdown in percent, or `None` when the reference duration is zero
pub fn slowdown_ratio(reference_ms: u64, current_ms: u64) -> Option<f64> {
    if reference_ms == 0 {
        return None;
    }
    Some((current_ms as f64 - reference_ms as f64) * 100.0 / reference_ms as f64)
}

/// Slowdown in whole percent, truncated toward zero
pub fn slowdown_percent(reference_ms: u64, current_ms: u64) -> Option<i64> {
    slowdown_ratio(reference_ms, current_ms).map(|pct| pct as i64)
}

// The raw pattern is compiled on its own first so that anchoring cannot turn
// an invalid pattern into a valid one.
fn compile_full_match(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(pattern)?;
    Regex::new(&format!("^(?:{})$", pattern))
}
