//! Live HTML reporter for a test engine's lifecycle events.
//!
//! An engine emits `pre:all`, `pre:suite`, `post:suite`, `post:test` and
//! `post:all`; [`reporter::use_reporter`] subscribes to them and keeps an
//! in-memory [`dom::Document`] current: a stats bar with progress and
//! counters, and a nested list of suites and tests with collapsible,
//! highlighted source.

pub mod config;
pub mod dom;
pub mod error;
pub mod events;
pub mod highlight;
pub mod models;
pub mod renderer;
pub mod reporter;
pub mod runner;
pub mod source;
pub mod stats;

pub use config::{Config, ReportConfig};
pub use dom::{Container, Document, NodeId};
pub use error::{ReportError, Result};
pub use events::{Engine, Event, EventBus, EventKind, RunContext};
pub use models::{Speed, Suite, TestError, TestResult, TestStatus};
pub use reporter::{Filter, ReporterHandle, use_reporter};
pub use stats::{Clock, ManualClock, StatsSnapshot, StatsTracker, SystemClock};
