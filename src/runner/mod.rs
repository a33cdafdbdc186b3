pub mod ndjson;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::events::Event;

/// What an event source hands to the reporter loop.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceEvent {
    /// The engine announced how many tests it will run.
    Plan { total: usize },
    Lifecycle(Event),
    /// A line that was not a lifecycle event (engine banner, stderr).
    Output { line: String },
    Error { message: String },
}

/// Adapter that produces lifecycle events for the reporter.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Stream events until the input is exhausted.
    async fn stream(&self, tx: mpsc::UnboundedSender<SourceEvent>) -> Result<()>;

    /// Display name for this source (e.g., "stdin").
    fn name(&self) -> &str;
}

/// Where to read events from, in order of precedence.
#[derive(Debug, Clone, Default)]
pub struct SourceOptions {
    /// A file path, or `-` for stdin.
    pub input: Option<PathBuf>,
    /// Engine command whose stdout carries the events.
    pub command: Option<String>,
    pub workspace: PathBuf,
    pub slow_ms: Option<u64>,
}

/// Pick the event source. An explicit input wins over a command, with `-`
/// naming stdin. Without an input the command runs, and stdin is the
/// fallback when neither is given.
pub fn detect(options: SourceOptions) -> Arc<dyn EventSource> {
    match (options.input, options.command) {
        (Some(path), _) if path.as_os_str() == "-" => {
            Arc::new(ndjson::FileSource::new(None, options.slow_ms))
        }
        (Some(path), _) => Arc::new(ndjson::FileSource::new(Some(path), options.slow_ms)),
        (None, Some(command)) => Arc::new(ndjson::CommandSource::new(
            command,
            options.workspace,
            options.slow_ms,
        )),
        (None, None) => Arc::new(ndjson::FileSource::new(None, options.slow_ms)),
    }
}
