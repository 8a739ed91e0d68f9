//! In-memory rule repository

use std::sync::RwLock;

use super::{assign_ids, generate_id, RuleRepository};
use crate::error::RuleError;
use crate::rules::{Rule, RuleDraft};

/// Rule repository kept entirely in memory
#[derive(Debug, Default)]
pub struct MemoryRepository {
    rules: RwLock<Vec<Rule>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the repository with rules (ids are assigned where missing)
    pub fn with_rules(rules: Vec<Rule>) -> Result<Self, RuleError> {
        Ok(Self {
            rules: RwLock::new(assign_ids(rules)?),
        })
    }
}

impl RuleRepository for MemoryRepository {
    fn list_rules(&self) -> Result<Vec<Rule>, RuleError> {
        let rules = self.rules.read().unwrap_or_else(|e| e.into_inner());
        Ok(rules.clone())
    }

    fn replace_all(&self, rules: Vec<Rule>) -> Result<Vec<Rule>, RuleError> {
        let rules = assign_ids(rules)?;
        let mut stored = self.rules.write().unwrap_or_else(|e| e.into_inner());
        *stored = rules.clone();
        Ok(rules)
    }

    fn add_one(&self, draft: RuleDraft) -> Result<Rule, RuleError> {
        let rule = draft.into_rule(generate_id());
        let mut stored = self.rules.write().unwrap_or_else(|e| e.into_inner());
        stored.push(rule.clone());
        Ok(rule)
    }

    fn update_one(&self, id: &str, draft: RuleDraft) -> Result<Rule, RuleError> {
        let mut stored = self.rules.write().unwrap_or_else(|e| e.into_inner());
        let slot = stored
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| RuleError::NotFound(id.to_string()))?;
        *slot = draft.into_rule(id);
        Ok(slot.clone())
    }

    fn remove_one(&self, id: &str) -> Result<(), RuleError> {
        let mut stored = self.rules.write().unwrap_or_else(|e| e.into_inner());
        let index = stored
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| RuleError::NotFound(id.to_string()))?;
        stored.remove(index);
        Ok(())
    }
}
