//! Compiled, immutable view over a rule set
//!
//! A `Matcher` is built once from a validated list of rules and never
//! mutated afterwards. Replacing the rule set means building a new one.

use regex::Regex;

use super::{Criterion, Normalizer, Rule};
use crate::error::RuleError;

/// Compiled form of a single rule's criterion
#[derive(Debug)]
enum Compiled {
    Pattern(Regex),
    /// Keywords already passed through the matcher's normalizer
    Keywords(Vec<String>),
}

#[derive(Debug)]
struct CompiledRule {
    rule_id: String,
    label: String,
    compiled: Compiled,
}

impl CompiledRule {
    fn is_match(&self, normalized: &str) -> bool {
        match &self.compiled {
            Compiled::Pattern(regex) => regex.is_match(normalized),
            Compiled::Keywords(keywords) => {
                keywords.iter().all(|k| normalized.contains(k.as_str()))
            }
        }
    }
}

/// Immutable snapshot of all rules, used to test inbound text
#[derive(Debug)]
pub struct Matcher {
    rules: Vec<CompiledRule>,
    normalizer: Normalizer,
    version: u64,
}

impl Matcher {
    /// A matcher with no rules. Matches nothing.
    pub fn empty(normalizer: Normalizer) -> Self {
        Self {
            rules: Vec::new(),
            normalizer,
            version: 0,
        }
    }

    /// Compile a rule list, preserving rule order.
    ///
    /// All-or-nothing: the first invalid rule aborts the build.
    pub fn build(rules: &[Rule], normalizer: Normalizer) -> Result<Self, RuleError> {
        let mut compiled_rules = Vec::with_capacity(rules.len());

        for rule in rules {
            let criterion = rule.criterion(normalizer)?;
            let label = criterion.label();
            let compiled = match criterion {
                Criterion::Pattern(pattern) => {
                    Compiled::Pattern(super::validate_pattern(&pattern)?)
                }
                Criterion::Keywords(keywords) => Compiled::Keywords(
                    keywords
                        .iter()
                        .map(|k| normalizer.normalize(k))
                        .collect(),
                ),
            };

            compiled_rules.push(CompiledRule {
                rule_id: rule.id.clone(),
                label,
                compiled,
            });
        }

        Ok(Self {
            rules: compiled_rules,
            normalizer,
            version: 0,
        })
    }

    /// Tag this matcher with a publish version
    pub fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    /// True if any rule matches. Stops at the first satisfied rule.
    pub fn is_match(&self, text: &str) -> bool {
        self.first_match(text).is_some()
    }

    /// Label of the first satisfied rule, in rule order
    pub fn first_match(&self, text: &str) -> Option<&str> {
        let normalized = self.normalizer.normalize(text);
        self.rules
            .iter()
            .find(|r| r.is_match(&normalized))
            .map(|r| r.label.as_str())
    }

    /// Labels of every satisfied rule, in rule order, without deduplication.
    ///
    /// Pattern rules report their source pattern, keyword rules their
    /// keywords joined with ", ".
    pub fn find_matches(&self, text: &str) -> Vec<String> {
        let normalized = self.normalizer.normalize(text);
        self.rules
            .iter()
            .filter(|r| r.is_match(&normalized))
            .map(|r| r.label.clone())
            .collect()
    }

    /// Ids of every satisfied rule, in rule order
    pub fn matching_rule_ids(&self, text: &str) -> Vec<&str> {
        let normalized = self.normalizer.normalize(text);
        self.rules
            .iter()
            .filter(|r| r.is_match(&normalized))
            .map(|r| r.rule_id.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn normalizer(&self) -> Normalizer {
        self.normalizer
    }
}
