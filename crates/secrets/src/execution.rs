// Copyright 2024 insight-agent contributors
// SPDX-License-Identifier: MIT

//! Per-run execution log and the structured report emitted at the end

use insight_models::{ResolvedSecret, SignedInUser};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogKind {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    pub message: String,
    #[serde(rename = "type")]
    pub kind: LogKind,
}

/// Entries produced while resolving one run. Recording an entry also writes
/// it to the process log; it never changes control flow.
#[derive(Debug, Clone, Default)]
pub struct ExecutionLog {
    entries: Vec<LogEntry>,
}

impl ExecutionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn info(&mut self, message: impl Into<String>) {
        let message = message.into();
        insight_logging::info(&message);
        self.entries.push(LogEntry {
            message,
            kind: LogKind::Info,
        });
    }

    pub fn error(&mut self, message: impl Into<String>) {
        let message = message.into();
        insight_logging::error(&message);
        self.entries.push(LogEntry {
            message,
            kind: LogKind::Error,
        });
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn errors(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter().filter(|e| e.kind == LogKind::Error)
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Split into `(messages, errors)`, each in recording order
    pub fn partition(&self) -> (Vec<LogEntry>, Vec<LogEntry>) {
        self.entries
            .iter()
            .cloned()
            .partition(|entry| entry.kind == LogKind::Info)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportInput {
    pub secret_list: String,
    pub folder_list: String,
    pub managed_account_list: String,
    pub secret_safe_url: String,
    pub user: Option<SignedInUser>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportOutput {
    /// Key paths of the resolved secrets; values never appear here
    pub secrets: Vec<String>,
    pub messages: Vec<LogEntry>,
    pub errors: Vec<LogEntry>,
}

/// The structured record of one run written to the process log
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionReport {
    pub execution_id: String,
    pub input: ReportInput,
    pub output: ReportOutput,
}

impl ExecutionReport {
    pub fn new(
        execution_id: impl Into<String>,
        input: ReportInput,
        secrets: &[ResolvedSecret],
        log: &ExecutionLog,
    ) -> Self {
        let (messages, errors) = log.partition();
        Self {
            execution_id: execution_id.into(),
            input,
            output: ReportOutput {
                secrets: secrets.iter().map(ResolvedSecret::key_path).collect(),
                messages,
                errors,
            },
        }
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
