//! JSONL audit logging for tg-forward
//!
//! Records one entry per inbound message decision for later analysis.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::engine::forward::Decision;
use crate::input::MessageEvent;

/// Log level for audit entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Forwarded,
    Skipped,
    Ignored,
    Failed,
}

/// An audit log entry
#[derive(Debug, Serialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,

    pub level: LogLevel,

    /// Chat the message arrived in
    pub chat_id: i64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<i64>,

    /// Labels of the rules that matched
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub matched: Vec<String>,

    /// Truncated message text
    pub text_summary: String,

    pub reason: String,
}

impl AuditEntry {
    /// Create a new audit entry from an event and the decision taken for it
    pub fn new(event: &MessageEvent, decision: &Decision) -> Self {
        let (level, matched, reason) = match decision {
            Decision::Forwarded { matched } => {
                (LogLevel::Forwarded, matched.clone(), "matched rules".to_string())
            }
            Decision::Skipped => (LogLevel::Skipped, Vec::new(), "no rule matched".to_string()),
            Decision::Ignored { reason } => (LogLevel::Ignored, Vec::new(), reason.to_string()),
            Decision::Failed { matched, error } => {
                (LogLevel::Failed, matched.clone(), error.clone())
            }
        };

        Self {
            timestamp: Utc::now(),
            level,
            chat_id: event.chat_id,
            message_id: event.message_id,
            matched,
            text_summary: event.summary(),
            reason,
        }
    }
}

/// Audit logger
#[derive(Default)]
pub struct AuditLogger {
    writer: Option<BufWriter<File>>,
}

impl AuditLogger {
    /// Create a new audit logger; `None` or an unopenable path disables it
    pub fn new(path: Option<&Path>) -> Self {
        let writer = path.and_then(|p| {
            if let Some(parent) = p.parent() {
                let _ = std::fs::create_dir_all(parent);
            }

            OpenOptions::new()
                .create(true)
                .append(true)
                .open(p)
                .ok()
                .map(BufWriter::new)
        });

        Self { writer }
    }

    pub fn log(&mut self, entry: &AuditEntry) -> Result<(), std::io::Error> {
        if let Some(ref mut writer) = self.writer {
            let json = serde_json::to_string(entry)?;
            writeln!(writer, "{}", json)?;
            writer.flush()?;
        }
        Ok(())
    }

    pub fn log_decision(
        &mut self,
        event: &MessageEvent,
        decision: &Decision,
    ) -> Result<(), std::io::Error> {
        let entry = AuditEntry::new(event, decision);
        self.log(&entry)
    }

    pub fn is_enabled(&self) -> bool {
        self.writer.is_some()
    }
}
