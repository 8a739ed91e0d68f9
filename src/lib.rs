//! tg-forward - Rule-driven message forwarding bridge
//!
//! Observes messages arriving at a personal account, evaluates them against a
//! runtime-editable set of rules, and relays matches to a target chat.
//!
//! # Features
//!
//! - **Normalized matching**: case, punctuation and (optionally) accent insensitive
//! - **Two rule kinds**: regular expressions, or keyword sets that must all appear
//! - **Hot-swappable rules**: mutations publish a freshly built matcher atomically
//! - **Pluggable storage**: JSON file or in-memory repositories
//! - **Portable sessions**: compact, URL-safe session strings
//! - **Audit logging**: JSONL log of every forwarding decision
//!
//! # Example
//!
//! ```
//! use tg_forward::{MemoryRepository, Normalizer, RuleDraft, RuleService};
//!
//! let service = RuleService::new(MemoryRepository::new(), Normalizer::default()).unwrap();
//! service.add_rule(RuleDraft::keywords("outage", ["server", "down"])).unwrap();
//!
//! let matcher = service.current_matcher();
//! assert!(matcher.is_match("The SERVER is down!"));
//! assert!(!matcher.is_match("The server is up"));
//! ```

pub mod audit;
pub mod config;
pub mod engine;
pub mod error;
pub mod input;
pub mod output;
pub mod repository;
pub mod rules;
pub mod session;

// Re-exports for convenience
pub use config::Config;
pub use engine::forward::{
    Decision, ForwardLoop, ForwardStats, ForwardTarget, Forwarder, WriterForwarder,
};
pub use engine::RuleService;
pub use error::{CodecError, ConfigError, ForwardError, RuleError};
pub use input::MessageEvent;
pub use output::{ApiError, ApiResponse};
pub use repository::{JsonFileRepository, MemoryRepository, RuleRepository};
pub use rules::{normalize, Matcher, Normalizer, Rule, RuleDraft};
pub use session::SessionHandle;
