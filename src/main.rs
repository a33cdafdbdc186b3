use std::cell::RefCell;
use std::path::PathBuf;
use std::process::ExitCode;
use std::rc::Rc;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use hydro_html::reporter::page::render_page;
use hydro_html::runner::{self, SourceEvent, SourceOptions};
use hydro_html::{Config, Document, Event, EventBus, SystemClock, use_reporter};

/// Render a test engine's NDJSON lifecycle events as an HTML report
#[derive(Parser, Debug)]
#[command(name = "hydro-html")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// NDJSON event file, or `-` for stdin
    input: Option<PathBuf>,

    /// Engine command to spawn; its stdout carries the events
    #[arg(long, short, env = "HYDRO_COMMAND")]
    command: Option<String>,

    /// Where to write the HTML page
    #[arg(long, short, default_value = "hydro-report.html")]
    output: PathBuf,

    /// Path to config file (default: hydro.toml in the current directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the final stats as JSON
    #[arg(long, short)]
    json: bool,
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("HYDRO_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();
    init_logging();

    let workspace = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let config = match args.config {
        Some(ref path) => Config::load_from(path),
        None => Config::load(&workspace),
    };

    let source = runner::detect(SourceOptions {
        input: args.input.clone(),
        command: args.command.clone().or_else(|| config.source.command.clone()),
        workspace,
        slow_ms: config.source.slow_ms,
    });
    info!(source = source.name(), "reading events");

    let page = Rc::new(RefCell::new(Document::new()));
    let mut bus = EventBus::new();
    let reporter = use_reporter(
        &mut bus,
        Rc::clone(&page),
        None,
        &config.report,
        Rc::new(SystemClock),
    )
    .context("failed to mount reporter")?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let streamer = tokio::spawn(async move { source.stream(tx).await });

    let mut finished = false;
    let mut source_errors = 0usize;
    while let Some(event) = rx.recv().await {
        match event {
            SourceEvent::Plan { total } => bus.plan(total),
            SourceEvent::Lifecycle(event) => {
                finished = matches!(event, Event::PostAll);
                bus.emit(&event);
            }
            SourceEvent::Output { line } => {
                debug!(%line, "engine output");
                eprintln!("{}", line);
            }
            SourceEvent::Error { message } => {
                warn!(%message, "event source error");
                source_errors += 1;
            }
        }
    }

    streamer
        .await
        .map_err(|e| anyhow!("event source task failed: {}", e))?
        .context("failed to read events")?;

    if !finished {
        warn!("event stream ended without post:all");
        bus.emit(&Event::PostAll);
    }

    let html = render_page(&page.borrow(), &config.report.title);
    std::fs::write(&args.output, html)
        .with_context(|| format!("failed to write {}", args.output.display()))?;

    let snap = reporter.snapshot();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&snap)?);
    } else {
        println!(
            "{} passing, {} failing, {} pending ({}s) -> {}",
            snap.passes,
            snap.failures,
            snap.pending,
            snap.seconds_label(),
            args.output.display()
        );
    }

    if snap.failures > 0 || source_errors > 0 {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}
