//! Forwarding rules for tg-forward
//!
//! A rule is either a regular expression or a keyword conjunction, never both.

pub mod matcher;
pub mod normalize;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::RuleError;

pub use matcher::Matcher;
pub use normalize::{normalize, Normalizer};

/// A persisted forwarding rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// Unique identifier, assigned by the repository
    #[serde(default)]
    pub id: String,

    /// Human-readable label
    pub name: String,

    /// Regular expression matched against normalized text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    /// Literal keywords that must all appear in normalized text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<String>>,
}

impl Rule {
    /// Create a pattern rule
    pub fn with_pattern(
        id: impl Into<String>,
        name: impl Into<String>,
        pattern: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            pattern: Some(pattern.into()),
            keywords: None,
        }
    }

    /// Create a keyword rule
    pub fn with_keywords<I, S>(id: impl Into<String>, name: impl Into<String>, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            name: name.into(),
            pattern: None,
            keywords: Some(keywords.into_iter().map(Into::into).collect()),
        }
    }

    /// Validate this rule and return its matching criterion
    pub fn criterion(&self, normalizer: Normalizer) -> Result<Criterion, RuleError> {
        validate(
            &self.name,
            self.pattern.as_deref(),
            self.keywords.as_deref(),
            normalizer,
        )
    }

    /// The same rule content without its id
    pub fn to_draft(&self) -> RuleDraft {
        RuleDraft {
            name: self.name.clone(),
            pattern: self.pattern.clone(),
            keywords: self.keywords.clone(),
        }
    }
}

/// Rule content submitted for creation or by-id update
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleDraft {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<String>>,
}

impl RuleDraft {
    pub fn pattern(name: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pattern: Some(pattern.into()),
            keywords: None,
        }
    }

    pub fn keywords<I, S>(name: impl Into<String>, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            pattern: None,
            keywords: Some(keywords.into_iter().map(Into::into).collect()),
        }
    }

    pub fn criterion(&self, normalizer: Normalizer) -> Result<Criterion, RuleError> {
        validate(
            &self.name,
            self.pattern.as_deref(),
            self.keywords.as_deref(),
            normalizer,
        )
    }

    /// Attach an id, producing a full rule
    pub fn into_rule(self, id: impl Into<String>) -> Rule {
        Rule {
            id: id.into(),
            name: self.name,
            pattern: self.pattern,
            keywords: self.keywords,
        }
    }
}

/// The validated matching criterion of a rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Criterion {
    Pattern(String),
    Keywords(Vec<String>),
}

impl Criterion {
    /// Label reported by `Matcher::find_matches`
    pub fn label(&self) -> String {
        match self {
            Criterion::Pattern(pattern) => pattern.clone(),
            Criterion::Keywords(keywords) => keywords.join(", "),
        }
    }
}

/// Check the rule invariant: non-empty name and exactly one of pattern or keywords.
///
/// An empty pattern string or an empty keyword list counts as absent. Keywords
/// are checked with the same normalizer the matcher will use.
pub fn validate(
    name: &str,
    pattern: Option<&str>,
    keywords: Option<&[String]>,
    normalizer: Normalizer,
) -> Result<Criterion, RuleError> {
    if name.trim().is_empty() {
        return Err(RuleError::validation("rule name is required"));
    }

    let pattern = pattern.filter(|p| !p.is_empty());
    let keywords = keywords.filter(|k| !k.is_empty());

    match (pattern, keywords) {
        (Some(_), Some(_)) => Err(RuleError::validation(format!(
            "rule '{}' must have either pattern or keywords, not both",
            name
        ))),
        (None, None) => Err(RuleError::validation(format!(
            "rule '{}' must have either pattern or keywords",
            name
        ))),
        (Some(pattern), None) => {
            validate_pattern(pattern)?;
            Ok(Criterion::Pattern(pattern.to_string()))
        }
        (None, Some(keywords)) => {
            let blank = keywords
                .iter()
                .find(|k| normalizer.normalize(k).trim().is_empty());
            if let Some(blank) = blank {
                return Err(RuleError::validation(format!(
                    "rule '{}' has a keyword with no letters or digits: {:?}",
                    name, blank
                )));
            }
            Ok(Criterion::Keywords(keywords.to_vec()))
        }
    }
}

/// Check that a pattern compiles
pub fn validate_pattern(pattern: &str) -> Result<Regex, RuleError> {
    Regex::new(pattern).map_err(|e| {
        RuleError::validation(format!("invalid regex pattern '{}': {}", pattern, e))
    })
}
