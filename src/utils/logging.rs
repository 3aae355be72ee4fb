use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Where log lines go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogSink {
    Stderr,
    File(PathBuf),
    /// The TUI owns the terminal and no log file was requested.
    Discard,
}

pub fn level_from_cli(cli: &crate::cli::args::Cli) -> tracing::Level {
    if cli.debug {
        tracing::Level::DEBUG
    } else if cli.verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    }
}

/// Pick the sink for the chosen front end; an explicit log file always wins.
pub fn sink_for(log_file: Option<PathBuf>, interactive: bool) -> LogSink {
    match log_file {
        Some(path) => LogSink::File(path),
        None if interactive => LogSink::Discard,
        None => LogSink::Stderr,
    }
}

pub fn init(level: tracing::Level, sink: LogSink) -> Result<()> {
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("dircrawler={}", level).parse()?)
        .add_directive(level.into());

    let (writer, ansi) = match sink {
        LogSink::Stderr => (BoxMakeWriter::new(io::stderr), true),
        LogSink::Discard => (BoxMakeWriter::new(io::sink), false),
        LogSink::File(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("Failed to open log file: {:?}", path))?;
            (BoxMakeWriter::new(Mutex::new(file)), false)
        }
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false)
                .with_ansi(ansi)
                .with_writer(writer),
        )
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}
