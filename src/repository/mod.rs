//! Durable storage for forwarding rules
//!
//! The rule service only depends on the `RuleRepository` contract, so any
//! backing store that satisfies it is interchangeable.

pub mod file;
pub mod memory;

use std::collections::HashSet;

use crate::error::RuleError;
use crate::rules::{Rule, RuleDraft};

pub use file::JsonFileRepository;
pub use memory::MemoryRepository;

/// Storage contract for rules
pub trait RuleRepository: Send + Sync {
    /// All rules, in stored order
    fn list_rules(&self) -> Result<Vec<Rule>, RuleError>;

    /// A single rule by id
    fn get_rule(&self, id: &str) -> Result<Rule, RuleError> {
        self.list_rules()?
            .into_iter()
            .find(|r| r.id == id)
            .ok_or_else(|| RuleError::NotFound(id.to_string()))
    }

    /// Replace the whole rule set. Rules with an empty id get a fresh one.
    fn replace_all(&self, rules: Vec<Rule>) -> Result<Vec<Rule>, RuleError>;

    /// Append a rule and return it with its new id
    fn add_one(&self, draft: RuleDraft) -> Result<Rule, RuleError>;

    /// Replace the content of an existing rule, keeping its id
    fn update_one(&self, id: &str, draft: RuleDraft) -> Result<Rule, RuleError>;

    /// Delete a rule by id
    fn remove_one(&self, id: &str) -> Result<(), RuleError>;
}

impl<R: RuleRepository + ?Sized> RuleRepository for Box<R> {
    fn list_rules(&self) -> Result<Vec<Rule>, RuleError> {
        (**self).list_rules()
    }

    fn get_rule(&self, id: &str) -> Result<Rule, RuleError> {
        (**self).get_rule(id)
    }

    fn replace_all(&self, rules: Vec<Rule>) -> Result<Vec<Rule>, RuleError> {
        (**self).replace_all(rules)
    }

    fn add_one(&self, draft: RuleDraft) -> Result<Rule, RuleError> {
        (**self).add_one(draft)
    }

    fn update_one(&self, id: &str, draft: RuleDraft) -> Result<Rule, RuleError> {
        (**self).update_one(id, draft)
    }

    fn remove_one(&self, id: &str) -> Result<(), RuleError> {
        (**self).remove_one(id)
    }
}

/// Generate a new rule id
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Fill in missing ids and reject duplicates
pub(crate) fn assign_ids(mut rules: Vec<Rule>) -> Result<Vec<Rule>, RuleError> {
    let mut seen = HashSet::with_capacity(rules.len());

    for rule in &mut rules {
        if rule.id.is_empty() {
            rule.id = generate_id();
        }
        if !seen.insert(rule.id.clone()) {
            return Err(RuleError::validation(format!(
                "duplicate rule id: {}",
                rule.id
            )));
        }
    }

    Ok(rules)
}
