// Copyright 2024 insight-agent contributors
// SPDX-License-Identifier: MIT

//! Process logging for the insight agent.
//!
//! Installs a [`log::Log`] implementation that writes one line per record to
//! stdout, tagged with the execution id of the current run:
//!
//! ```text
//!  2024-05-02 10:14:03,512 INFO (6f1d...) Starting Execution...6f1d...
//! ```
//!
//! The free functions ([`info`], [`warning`], ...) are what the other crates
//! call; they go through the `log` facade so third-party records end up in the
//! same stream.

use chrono::Local;
use log::{Level, LevelFilter, Log, Metadata, Record};
use once_cell::sync::{Lazy, OnceCell};
use std::io::Write;
use std::sync::RwLock;

/// Verbosity of the process log
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    fn filter(self) -> LevelFilter {
        match self {
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Warning => LevelFilter::Warn,
            LogLevel::Error => LevelFilter::Error,
        }
    }
}

struct AgentLogger {
    execution_id: RwLock<String>,
}

impl Log for AgentLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let execution_id = self
            .execution_id
            .read()
            .map(|id| id.clone())
            .unwrap_or_default();
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S,%3f").to_string();
        let line = format_line(
            &timestamp,
            record.level(),
            &execution_id,
            &record.args().to_string(),
        );

        // A closed stdout must not take the run down with it
        let _ = writeln!(std::io::stdout().lock(), "{}", line);
    }

    fn flush(&self) {
        let _ = std::io::stdout().lock().flush();
    }
}

static LOGGER: Lazy<AgentLogger> = Lazy::new(|| AgentLogger {
    execution_id: RwLock::new(String::new()),
});

static INSTALLED: OnceCell<()> = OnceCell::new();

/// Install the process logger and tag every following line with `execution_id`.
///
/// Safe to call more than once; later calls only replace the execution id.
pub fn init(execution_id: &str) {
    if let Ok(mut id) = LOGGER.execution_id.write() {
        *id = execution_id.to_string();
    }

    INSTALLED.get_or_init(|| {
        // Another logger may already be installed (e.g. by a test harness)
        if log::set_logger(&*LOGGER).is_ok() {
            log::set_max_level(LogLevel::Info.filter());
        }
    });
}

/// Set the minimum level written to the process log
pub fn set_log_level(level: LogLevel) {
    log::set_max_level(level.filter());
}

pub fn debug(message: &str) {
    log::debug!(target: "insight", "{}", message);
}

pub fn info(message: &str) {
    log::info!(target: "insight", "{}", message);
}

pub fn warning(message: &str) {
    log::warn!(target: "insight", "{}", message);
}

pub fn error(message: &str) {
    log::error!(target: "insight", "{}", message);
}

fn level_name(level: Level) -> &'static str {
    match level {
        Level::Error => "ERROR",
        Level::Warn => "WARNING",
        Level::Info => "INFO",
        Level::Debug | Level::Trace => "DEBUG",
    }
}

fn format_line(timestamp: &str, level: Level, execution_id: &str, message: &str) -> String {
    format!(
        " {} {} ({}) {}",
        timestamp,
        level_name(level),
        execution_id,
        message
    )
}
