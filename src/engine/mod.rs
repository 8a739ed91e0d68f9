//! Rule service for tg-forward
//!
//! Coordinates repository mutations with matcher rebuilds and owns the
//! single authoritative "current matcher".
//!
//! ```text
//! inbound message -> RuleService::current_matcher() -> ArcSwap::load_full() -> Matcher
//!                                                          (lock-free read)
//!
//! rule mutation -> validate -> repository -> Matcher::build -> ArcSwap::store()
//!                                                             (atomic publish)
//! ```
//!
//! Readers see either the matcher from before a mutation or the one fully
//! built after it, never anything in between. Mutations are serialized
//! against each other by a writer lock; readers never take it. When two
//! mutations overlap, the one that takes the lock last is the one left
//! visible.

pub mod forward;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use arc_swap::ArcSwap;
use tracing::{info, warn};

use crate::error::RuleError;
use crate::repository::RuleRepository;
use crate::rules::{Matcher, Normalizer, Rule, RuleDraft};

/// Owns the rule repository and the current matcher
pub struct RuleService {
    repo: Box<dyn RuleRepository>,
    normalizer: Normalizer,
    current: ArcSwap<Matcher>,
    version: AtomicU64,
    write_lock: Mutex<()>,
}

impl RuleService {
    /// Create a service, building the initial matcher from whatever the repository holds
    pub fn new<R>(repo: R, normalizer: Normalizer) -> Result<Self, RuleError>
    where
        R: RuleRepository + 'static,
    {
        let rules = repo.list_rules()?;
        let matcher = Matcher::build(&rules, normalizer)?.with_version(1);
        info!(rules = matcher.len(), version = 1, "initial matcher built");

        Ok(Self {
            repo: Box::new(repo),
            normalizer,
            current: ArcSwap::from_pointee(matcher),
            version: AtomicU64::new(1),
            write_lock: Mutex::new(()),
        })
    }

    /// The matcher readers should use right now
    pub fn current_matcher(&self) -> Arc<Matcher> {
        self.current.load_full()
    }

    /// Version of the current matcher; bumped on every publish
    pub fn version(&self) -> u64 {
        self.current.load().version()
    }

    pub fn normalizer(&self) -> Normalizer {
        self.normalizer
    }

    pub fn get_rules(&self) -> Result<Vec<Rule>, RuleError> {
        self.repo.list_rules()
    }

    pub fn get_rule(&self, id: &str) -> Result<Rule, RuleError> {
        self.repo.get_rule(id)
    }

    /// Replace the whole rule set.
    ///
    /// Every rule is validated and compiled before the repository is touched.
    /// An empty set is rejected.
    pub fn update_rules(&self, rules: Vec<Rule>) -> Result<Vec<Rule>, RuleError> {
        if rules.is_empty() {
            return Err(RuleError::validation("at least one rule is required"));
        }
        Matcher::build(&rules, self.normalizer)?;

        let _guard = self.lock_writes();
        let stored = self.repo.replace_all(rules).inspect_err(|e| {
            warn!(error = %e, "failed to save rules");
        })?;
        self.publish(&stored)?;

        info!(rules = stored.len(), "rules replaced");
        Ok(stored)
    }

    /// Add a single rule, then rebuild from the full stored list
    pub fn add_rule(&self, draft: RuleDraft) -> Result<Rule, RuleError> {
        draft.criterion(self.normalizer)?;

        let _guard = self.lock_writes();
        let rule = self.repo.add_one(draft)?;
        self.rebuild_from_repository()?;

        info!(id = %rule.id, name = %rule.name, "rule added");
        Ok(rule)
    }

    /// Replace the content of one rule by id, then rebuild from the full stored list
    pub fn update_rule(&self, id: &str, draft: RuleDraft) -> Result<Rule, RuleError> {
        draft.criterion(self.normalizer)?;

        let _guard = self.lock_writes();
        let rule = self.repo.update_one(id, draft)?;
        self.rebuild_from_repository()?;

        info!(id = %rule.id, name = %rule.name, "rule updated");
        Ok(rule)
    }

    /// Remove one rule by id, then rebuild from the full stored list
    pub fn remove_rule(&self, id: &str) -> Result<(), RuleError> {
        let _guard = self.lock_writes();
        self.repo.remove_one(id)?;
        self.rebuild_from_repository()?;

        info!(id = %id, "rule removed");
        Ok(())
    }

    fn lock_writes(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn rebuild_from_repository(&self) -> Result<(), RuleError> {
        let rules = self.repo.list_rules()?;
        self.publish(&rules)
    }

    /// Build a matcher from rules the repository already holds and swap it in.
    ///
    /// A build failure here means stored and in-memory rules disagree; the
    /// previous matcher stays current.
    fn publish(&self, rules: &[Rule]) -> Result<(), RuleError> {
        let matcher = Matcher::build(rules, self.normalizer).map_err(|e| {
            warn!(error = %e, "stored rules no longer build a matcher");
            RuleError::Inconsistent(e.to_string())
        })?;

        let version = self.version.fetch_add(1, Ordering::SeqCst) + 1;
        self.current.store(Arc::new(matcher.with_version(version)));

        info!(rules = rules.len(), version, "matcher published");
        Ok(())
    }
}

impl std::fmt::Debug for RuleService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleService")
            .field("normalizer", &self.normalizer)
            .field("version", &self.version())
            .field("rules", &self.current.load().len())
            .finish()
    }
}
