use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Passed,
    Failed,
    #[default]
    Pending,
    Skipped,
}

impl TestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestStatus::Passed => "passed",
            TestStatus::Failed => "failed",
            TestStatus::Pending => "pending",
            TestStatus::Skipped => "skipped",
        }
    }

    /// Pending and skipped tests share one bucket everywhere in the report.
    pub fn is_pending(&self) -> bool {
        matches!(self, TestStatus::Pending | TestStatus::Skipped)
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Speed marker rendered on passing tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speed {
    #[default]
    Fast,
    Medium,
    Slow,
}

impl Speed {
    pub fn as_class(&self) -> &'static str {
        match self {
            Speed::Fast => "fast",
            Speed::Medium => "medium",
            Speed::Slow => "slow",
        }
    }

    /// Classify a duration against a "slow" threshold: above it is slow,
    /// above half of it is medium.
    pub fn classify(duration_ms: u64, slow_ms: u64) -> Self {
        if duration_ms > slow_ms {
            Speed::Slow
        } else if duration_ms > slow_ms / 2 {
            Speed::Medium
        } else {
            Speed::Fast
        }
    }
}
