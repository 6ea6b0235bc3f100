use crate::core::{ConvergeError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default number of probe evaluations per verification.
pub const DEFAULT_MAX_ITERATIONS: u32 = 200;

/// Default pause between probe evaluations.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(100);

/// Retry budget shared by every verifier
///
/// Bounds a verification to `max_iterations` probe evaluations separated by
/// `interval`, so the longest possible wait is `max_iterations * interval`.
/// The interval has millisecond granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RetryBudgetFile", into = "RetryBudgetFile")]
pub struct RetryBudget {
    max_iterations: u32,
    interval: Duration,
}

/// On-disk shape of a retry budget.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct RetryBudgetFile {
    #[serde(default = "default_max_iterations")]
    max_iterations: u32,
    #[serde(default = "default_interval_ms")]
    interval_ms: u64,
}

fn default_max_iterations() -> u32 {
    DEFAULT_MAX_ITERATIONS
}

fn default_interval_ms() -> u64 {
    whole_millis(DEFAULT_INTERVAL)
}

fn whole_millis(interval: Duration) -> u64 {
    u64::try_from(interval.as_millis()).unwrap_or(u64::MAX)
}

impl TryFrom<RetryBudgetFile> for RetryBudget {
    type Error = String;

    fn try_from(file: RetryBudgetFile) -> std::result::Result<Self, Self::Error> {
        let budget = RetryBudget {
            max_iterations: file.max_iterations,
            interval: Duration::from_millis(file.interval_ms),
        };
        budget.validate()?;
        Ok(budget)
    }
}

impl From<RetryBudget> for RetryBudgetFile {
    fn from(budget: RetryBudget) -> Self {
        RetryBudgetFile {
            max_iterations: budget.max_iterations,
            interval_ms: whole_millis(budget.interval),
        }
    }
}

impl RetryBudget {
    /// Create a validated budget
    pub fn new(max_iterations: u32, interval: Duration) -> Result<Self> {
        let budget = Self {
            max_iterations,
            interval,
        };
        budget.validate().map_err(ConvergeError::InvalidBudget)?;
        Ok(budget)
    }

    /// Set the maximum number of probe evaluations
    pub fn max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set the pause between probe evaluations
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn iterations(&self) -> u32 {
        self.max_iterations
    }

    pub fn pause(&self) -> Duration {
        self.interval
    }

    /// Longest time a verification can sleep before giving up
    pub fn total_wait(&self) -> Duration {
        self.interval.saturating_mul(self.max_iterations)
    }

    /// Validate the budget
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.max_iterations == 0 {
            return Err("max_iterations must be greater than 0".to_string());
        }
        if self.interval.subsec_nanos() % 1_000_000 != 0 {
            return Err(format!(
                "interval must be a whole number of milliseconds, got {:?}",
                self.interval
            ));
        }
        if u64::try_from(self.interval.as_millis()).is_err() {
            return Err("interval does not fit in u64 milliseconds".to_string());
        }
        Ok(())
    }

    /// Parse from JSON
    ///
    /// Format: `{"max_iterations": 200, "interval_ms": 100}`; missing fields
    /// take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|err| {
            ConvergeError::Config(format!("cannot read '{}': {}", path.display(), err))
        })?;
        Self::from_json_str(&contents)
    }

    /// Serialize to JSON; an invalid budget is refused rather than rounded.
    pub fn to_json(&self) -> Result<String> {
        self.validate().map_err(ConvergeError::InvalidBudget)?;
        Ok(serde_json::to_string(self)?)
    }
}

impl Default for RetryBudget {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            interval: DEFAULT_INTERVAL,
        }
    }
}
