use serde::{Deserialize, Serialize};

use super::status::{Speed, TestStatus};

/// What some runtimes produce when an error object is stringified generically.
const OPAQUE_ERROR: &str = "[object Error]";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suite {
    pub title: String,
}

impl Suite {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub title: String,
    pub status: TestStatus,
    pub duration_ms: Option<u64>,
    pub speed: Option<Speed>,
    pub error: Option<TestError>,
    /// Source text of the test body, signature included.
    pub source: Option<String>,
}

impl TestResult {
    pub fn passed(title: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            title: title.into(),
            status: TestStatus::Passed,
            duration_ms: Some(duration_ms),
            ..Self::default()
        }
    }

    pub fn failed(title: impl Into<String>, error: TestError) -> Self {
        Self {
            title: title.into(),
            status: TestStatus::Failed,
            error: Some(error),
            ..Self::default()
        }
    }

    pub fn pending(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            status: TestStatus::Pending,
            ..Self::default()
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_speed(mut self, speed: Speed) -> Self {
        self.speed = Some(speed);
        self
    }

    /// Text shown in the error block of a failed test.
    pub fn failure_text(&self) -> String {
        match self.error {
            Some(ref error) => error.report_text(),
            None => "unknown error".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestError {
    pub message: Option<String>,
    pub stack: Option<String>,
    /// The runtime's own string conversion of the error, if it supplied one.
    pub display: Option<String>,
    pub source_url: Option<String>,
    pub line: Option<u32>,
}

impl TestError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    pub fn with_location(mut self, source_url: impl Into<String>, line: u32) -> Self {
        self.source_url = Some(source_url.into());
        self.line = Some(line);
        self
    }

    fn stack(&self) -> Option<&str> {
        self.stack.as_deref().filter(|s| !s.is_empty())
    }

    /// Resolve the text to display for this error.
    ///
    /// The stack wins when present. Some runtimes leave the message out of
    /// the stack, so it is prepended whenever it does not already appear.
    /// Without a stack, a known source location is appended as a last-resort
    /// trace line.
    pub fn report_text(&self) -> String {
        let message = self.message.as_deref().unwrap_or_default();

        let mut text = match self.stack() {
            Some(stack) => stack.to_string(),
            None => self
                .display
                .clone()
                .unwrap_or_else(|| message.to_string()),
        };

        if !text.contains(message) {
            text = format!("{}\n{}", message, text);
        }

        if text == OPAQUE_ERROR {
            text = message.to_string();
        }

        if self.stack().is_none()
            && let (Some(url), Some(line)) = (self.source_url.as_deref(), self.line)
        {
            text.push_str(&format!("\n({}:{})", url, line));
        }

        if text.trim().is_empty() {
            return "unknown error".to_string();
        }

        text
    }
}
