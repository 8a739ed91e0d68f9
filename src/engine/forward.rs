//! Forward loop: drains inbound message events and relays matches
//!
//! A single consumer pulls events off the channel in arrival order, tests each
//! against the rule service's current matcher, and hands matches to the
//! outbound `Forwarder`.

use serde::Serialize;
use std::fmt;
use std::io::Write;
use std::sync::mpsc::Receiver;
use std::sync::Mutex;

use tracing::{debug, info, warn};

use super::RuleService;
use crate::audit::AuditLogger;
use crate::error::ForwardError;
use crate::input::MessageEvent;

/// Where forwarded messages are delivered
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForwardTarget {
    ChatId(i64),
    Username(String),
}

impl fmt::Display for ForwardTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForwardTarget::ChatId(id) => write!(f, "{}", id),
            ForwardTarget::Username(name) => write!(f, "@{}", name.trim_start_matches('@')),
        }
    }
}

/// Outbound delivery collaborator
pub trait Forwarder {
    fn forward(&self, text: &str) -> Result<(), ForwardError>;
}

impl<F: Forwarder + ?Sized> Forwarder for &F {
    fn forward(&self, text: &str) -> Result<(), ForwardError> {
        (**self).forward(text)
    }
}

/// JSON line written by `WriterForwarder`
#[derive(Debug, Serialize)]
struct Delivery<'a> {
    target: String,
    text: &'a str,
}

/// Forwarder that writes one JSON line per delivery
pub struct WriterForwarder<W: Write> {
    target: ForwardTarget,
    writer: Mutex<W>,
}

impl<W: Write> WriterForwarder<W> {
    pub fn new(target: ForwardTarget, writer: W) -> Self {
        Self {
            target,
            writer: Mutex::new(writer),
        }
    }

    pub fn target(&self) -> &ForwardTarget {
        &self.target
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner().unwrap_or_else(|e| e.into_inner())
    }
}

impl<W: Write> Forwarder for WriterForwarder<W> {
    fn forward(&self, text: &str) -> Result<(), ForwardError> {
        let line = serde_json::to_string(&Delivery {
            target: self.target.to_string(),
            text,
        })?;
        let mut writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        writeln!(writer, "{}", line)?;
        writer.flush()?;
        Ok(())
    }
}

/// What happened to one inbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Matched and delivered
    Forwarded { matched: Vec<String> },

    /// No rule matched
    Skipped,

    /// Not evaluated (outgoing, from the relay bot, or empty)
    Ignored { reason: &'static str },

    /// Matched but delivery failed
    Failed { matched: Vec<String>, error: String },
}

impl Decision {
    pub fn is_forwarded(&self) -> bool {
        matches!(self, Decision::Forwarded { .. })
    }
}

/// Counters returned when the loop ends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ForwardStats {
    pub received: u64,
    pub forwarded: u64,
    pub skipped: u64,
    pub ignored: u64,
    pub failed: u64,
}

impl ForwardStats {
    fn record(&mut self, decision: &Decision) {
        self.received += 1;
        match decision {
            Decision::Forwarded { .. } => self.forwarded += 1,
            Decision::Skipped => self.skipped += 1,
            Decision::Ignored { .. } => self.ignored += 1,
            Decision::Failed { .. } => self.failed += 1,
        }
    }
}

/// Single consumer of inbound message events
pub struct ForwardLoop<'a, F: Forwarder> {
    service: &'a RuleService,
    forwarder: F,
    ignore_sender: Option<i64>,
    audit: AuditLogger,
}

impl<'a, F: Forwarder> ForwardLoop<'a, F> {
    pub fn new(service: &'a RuleService, forwarder: F) -> Self {
        Self {
            service,
            forwarder,
            ignore_sender: None,
            audit: AuditLogger::default(),
        }
    }

    /// Skip messages authored by this sender (the relay bot itself)
    pub fn ignore_sender(mut self, sender_id: Option<i64>) -> Self {
        self.ignore_sender = sender_id;
        self
    }

    pub fn with_audit(mut self, audit: AuditLogger) -> Self {
        self.audit = audit;
        self
    }

    pub fn forwarder(&self) -> &F {
        &self.forwarder
    }

    /// Evaluate one event against the current matcher and forward it on match
    pub fn handle(&mut self, event: &MessageEvent) -> Decision {
        let decision = self.decide(event);

        if let Err(e) = self.audit.log_decision(event, &decision) {
            warn!(error = %e, "failed to write audit log");
        }
        decision
    }

    fn decide(&self, event: &MessageEvent) -> Decision {
        if event.outgoing {
            return Decision::Ignored {
                reason: "outgoing message",
            };
        }
        if self.ignore_sender.is_some() && event.sender_id == self.ignore_sender {
            return Decision::Ignored {
                reason: "message from relay bot",
            };
        }
        if event.text.trim().is_empty() {
            return Decision::Ignored {
                reason: "empty message",
            };
        }

        let matcher = self.service.current_matcher();
        let matched = matcher.find_matches(&event.text);
        if matched.is_empty() {
            debug!(chat_id = event.chat_id, version = matcher.version(), "no rule matched");
            return Decision::Skipped;
        }

        match self.forwarder.forward(&event.text) {
            Ok(()) => {
                info!(chat_id = event.chat_id, rules = ?matched, "message forwarded");
                Decision::Forwarded { matched }
            }
            Err(e) => {
                warn!(chat_id = event.chat_id, error = %e, "failed to forward message");
                Decision::Failed {
                    matched,
                    error: e.to_string(),
                }
            }
        }
    }

    /// Drain the channel in arrival order until every sender is dropped
    pub fn run(mut self, events: Receiver<MessageEvent>) -> ForwardStats {
        let mut stats = ForwardStats::default();

        for event in events {
            let decision = self.handle(&event);
            stats.record(&decision);
        }

        info!(
            received = stats.received,
            forwarded = stats.forwarded,
            failed = stats.failed,
            "event channel closed"
        );
        stats
    }
}
