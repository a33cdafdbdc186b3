use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::debug;

use crate::events::Event;
use crate::models::{Speed, Suite, TestError, TestResult, TestStatus};

use super::{EventSource, SourceEvent};

/// Guard that kills the child process (and its entire process group) on drop.
struct ChildGuard {
    child: Option<tokio::process::Child>,
    /// Process group ID saved at spawn time so we can kill the whole group.
    #[cfg(unix)]
    pgid: Option<u32>,
}

impl ChildGuard {
    fn new(child: tokio::process::Child) -> Self {
        #[cfg(unix)]
        let pgid = child.id();
        Self {
            child: Some(child),
            #[cfg(unix)]
            pgid,
        }
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        // Engines fork workers; take the whole group down with the child.
        #[cfg(unix)]
        if let Some(pgid) = self.pgid {
            unsafe { libc::kill(-(pgid as libc::pid_t), libc::SIGKILL) };
        }
        if let Some(ref mut child) = self.child {
            let _ = child.start_kill();
        }
    }
}

// --- NDJSON deserialization types ---

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum WireEvent {
    #[serde(rename = "pre:all")]
    PreAll {
        #[serde(default)]
        total: Option<usize>,
    },
    #[serde(rename = "pre:suite")]
    PreSuite {
        #[serde(default)]
        title: String,
    },
    #[serde(rename = "post:suite")]
    PostSuite {
        #[serde(default)]
        title: String,
    },
    #[serde(rename = "post:test")]
    PostTest {
        #[serde(default)]
        title: String,
        #[serde(default)]
        status: String,
        duration: Option<f64>,
        speed: Option<Speed>,
        error: Option<WireError>,
        source: Option<String>,
    },
    #[serde(rename = "post:all")]
    PostAll,
}

#[derive(Debug, Deserialize)]
struct WireError {
    message: Option<String>,
    stack: Option<String>,
    display: Option<String>,
    #[serde(rename = "sourceURL")]
    source_url: Option<String>,
    line: Option<u32>,
}

impl WireEvent {
    fn into_events(self, slow_ms: Option<u64>) -> Vec<SourceEvent> {
        match self {
            WireEvent::PreAll { total } => {
                let mut events = Vec::with_capacity(2);
                if let Some(total) = total {
                    events.push(SourceEvent::Plan { total });
                }
                events.push(SourceEvent::Lifecycle(Event::PreAll));
                events
            }
            WireEvent::PreSuite { title } => {
                vec![SourceEvent::Lifecycle(Event::PreSuite(Suite::new(title)))]
            }
            WireEvent::PostSuite { title } => {
                vec![SourceEvent::Lifecycle(Event::PostSuite(Suite::new(title)))]
            }
            WireEvent::PostTest {
                title,
                status,
                duration,
                speed,
                error,
                source,
            } => {
                let status = match status.as_str() {
                    "passed" => TestStatus::Passed,
                    "failed" => TestStatus::Failed,
                    "skipped" => TestStatus::Skipped,
                    _ => TestStatus::Pending,
                };
                let duration_ms = duration.map(|d| d.max(0.0).round() as u64);
                let speed = speed.or_else(|| {
                    let (duration, slow) = (duration_ms?, slow_ms?);
                    Some(Speed::classify(duration, slow))
                });
                let error = if status == TestStatus::Failed {
                    error.map(|e| TestError {
                        message: e.message.map(|s| strip_ansi(&s)),
                        stack: e.stack.map(|s| strip_ansi(&s)),
                        display: e.display.map(|s| strip_ansi(&s)),
                        source_url: e.source_url,
                        line: e.line,
                    })
                } else {
                    None
                };

                vec![SourceEvent::Lifecycle(Event::PostTest(TestResult {
                    title,
                    status,
                    duration_ms,
                    speed,
                    error,
                    source,
                }))]
            }
            WireEvent::PostAll => vec![SourceEvent::Lifecycle(Event::PostAll)],
        }
    }
}

/// Decode one line of engine output.
pub fn parse_line(line: &str, slow_ms: Option<u64>) -> Vec<SourceEvent> {
    let line = line.trim();
    if line.is_empty() {
        return Vec::new();
    }
    match serde_json::from_str::<WireEvent>(line) {
        Ok(event) => event.into_events(slow_ms),
        Err(e) => {
            debug!(error = %e, "forwarding non-event line");
            vec![SourceEvent::Output {
                line: line.to_string(),
            }]
        }
    }
}

async fn pump<R>(reader: R, tx: &mpsc::UnboundedSender<SourceEvent>, slow_ms: Option<u64>) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    while let Some(line) = lines.next_line().await.context("failed to read event stream")? {
        for event in parse_line(&line, slow_ms) {
            if tx.send(event).is_err() {
                debug!("event receiver closed");
                return Ok(());
            }
        }
    }
    Ok(())
}

/// Reads events from a file, or from stdin when no path is given.
pub struct FileSource {
    path: Option<PathBuf>,
    name: String,
    slow_ms: Option<u64>,
}

impl FileSource {
    pub fn new(path: Option<PathBuf>, slow_ms: Option<u64>) -> Self {
        let name = match path {
            Some(ref p) => p.display().to_string(),
            None => "stdin".to_string(),
        };
        Self {
            path,
            name,
            slow_ms,
        }
    }
}

#[async_trait]
impl EventSource for FileSource {
    async fn stream(&self, tx: mpsc::UnboundedSender<SourceEvent>) -> Result<()> {
        match self.path {
            Some(ref path) => {
                let file = tokio::fs::File::open(path)
                    .await
                    .with_context(|| format!("failed to open {}", path.display()))?;
                pump(file, &tx, self.slow_ms).await
            }
            None => pump(tokio::io::stdin(), &tx, self.slow_ms).await,
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Spawns an engine and reads events from its stdout. Stderr lines are
/// forwarded as output.
pub struct CommandSource {
    command: String,
    cwd: PathBuf,
    slow_ms: Option<u64>,
}

impl CommandSource {
    pub fn new(command: String, cwd: PathBuf, slow_ms: Option<u64>) -> Self {
        Self {
            command,
            cwd,
            slow_ms,
        }
    }
}

#[async_trait]
impl EventSource for CommandSource {
    async fn stream(&self, tx: mpsc::UnboundedSender<SourceEvent>) -> Result<()> {
        let parts = shell_words::split(&self.command)
            .with_context(|| format!("failed to parse command `{}`", self.command))?;
        let (program, args) = parts
            .split_first()
            .with_context(|| format!("empty command `{}`", self.command))?;

        let mut cmd = Command::new(program);
        cmd.args(args);

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.as_std_mut().process_group(0);
        }

        debug!(command = %self.command, cwd = %self.cwd.display(), "spawning engine");
        let mut child = cmd
            .current_dir(&self.cwd)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to spawn `{}`", program))?;

        let stdout = child.stdout.take().context("missing stdout")?;
        let stderr = child.stderr.take().context("missing stderr")?;

        // The child stays in the guard so an aborted task still kills it.
        let mut child_guard = ChildGuard::new(child);

        let tx_err = tx.clone();
        let stderr_handle = tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let _ = tx_err.send(SourceEvent::Output { line });
            }
        });

        pump(stdout, &tx, self.slow_ms).await?;
        stderr_handle.await.ok();

        if let Some(ref mut child) = child_guard.child {
            let status = child.wait().await.context("failed to wait for engine")?;
            if !status.success() {
                let _ = tx.send(SourceEvent::Error {
                    message: format!("`{}` exited with code {}", program, status.code().unwrap_or(-1)),
                });
            }
        }

        Ok(())
    }

    fn name(&self) -> &str {
        &self.command
    }
}

/// Strip ANSI escape sequences from a string.
fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\x1b' {
            // Skip until we hit a letter (end of escape sequence)
            for c2 in chars.by_ref() {
                if c2.is_ascii_alphabetic() {
                    break;
                }
            }
        } else {
            out.push(c);
        }
    }
    out
}
