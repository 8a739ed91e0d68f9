//! Flat-file rule repository
//!
//! Stores rules as pretty-printed JSON: `{"rules": [{"id", "name", "pattern"?, "keywords"?}]}`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use super::{assign_ids, generate_id, RuleRepository};
use crate::error::RuleError;
use crate::rules::{Rule, RuleDraft};

/// On-disk document layout
#[derive(Debug, Default, Serialize, Deserialize)]
struct RulesFile {
    #[serde(default)]
    rules: Vec<Rule>,
}

/// Rule repository backed by a single JSON file
#[derive(Debug)]
pub struct JsonFileRepository {
    path: PathBuf,
    rules: RwLock<Vec<Rule>>,
}

impl JsonFileRepository {
    /// Open the file at `path`, creating an empty one if it does not exist
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, RuleError> {
        let path = path.into();

        let rules = match fs::read_to_string(&path) {
            Ok(content) => {
                let file: RulesFile = serde_json::from_str(&content).map_err(|e| {
                    RuleError::persistence(format!("failed to parse {}", path.display()), e)
                })?;

                // Hand-edited files may omit ids; fill them in and save once
                let missing_ids = file.rules.iter().any(|r| r.id.is_empty());
                let rules = assign_ids(file.rules)?;
                if missing_ids {
                    write_rules(&path, &rules)?;
                }
                rules
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                write_rules(&path, &[])?;
                Vec::new()
            }
            Err(e) => {
                return Err(RuleError::persistence(
                    format!("failed to load {}", path.display()),
                    e,
                ))
            }
        };

        Ok(Self {
            path,
            rules: RwLock::new(rules),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply a change to a copy of the rules, save it, and only then commit it
    fn mutate<T>(
        &self,
        change: impl FnOnce(&mut Vec<Rule>) -> Result<T, RuleError>,
    ) -> Result<T, RuleError> {
        let mut stored = self.rules.write().unwrap_or_else(|e| e.into_inner());
        let mut next = stored.clone();
        let result = change(&mut next)?;
        write_rules(&self.path, &next)?;
        *stored = next;
        Ok(result)
    }
}

/// Write the rules file atomically (temp file + rename)
fn write_rules(path: &Path, rules: &[Rule]) -> Result<(), RuleError> {
    let doc = RulesFile {
        rules: rules.to_vec(),
    };
    let data = serde_json::to_string_pretty(&doc)
        .map_err(|e| RuleError::persistence("failed to marshal rules", e))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| {
            RuleError::persistence(format!("failed to create {}", parent.display()), e)
        })?;
    }

    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, data)
        .map_err(|e| RuleError::persistence("failed to write rules file", e))?;
    fs::rename(&tmp, path).map_err(|e| RuleError::persistence("failed to write rules file", e))
}

impl RuleRepository for JsonFileRepository {
    fn list_rules(&self) -> Result<Vec<Rule>, RuleError> {
        let rules = self.rules.read().unwrap_or_else(|e| e.into_inner());
        Ok(rules.clone())
    }

    fn replace_all(&self, rules: Vec<Rule>) -> Result<Vec<Rule>, RuleError> {
        let rules = assign_ids(rules)?;
        self.mutate(|stored| {
            *stored = rules.clone();
            Ok(rules)
        })
    }

    fn add_one(&self, draft: RuleDraft) -> Result<Rule, RuleError> {
        let rule = draft.into_rule(generate_id());
        self.mutate(|stored| {
            stored.push(rule.clone());
            Ok(rule)
        })
    }

    fn update_one(&self, id: &str, draft: RuleDraft) -> Result<Rule, RuleError> {
        self.mutate(|stored| {
            let slot = stored
                .iter_mut()
                .find(|r| r.id == id)
                .ok_or_else(|| RuleError::NotFound(id.to_string()))?;
            *slot = draft.into_rule(id);
            Ok(slot.clone())
        })
    }

    fn remove_one(&self, id: &str) -> Result<(), RuleError> {
        self.mutate(|stored| {
            let index = stored
                .iter()
                .position(|r| r.id == id)
                .ok_or_else(|| RuleError::NotFound(id.to_string()))?;
            stored.remove(index);
            Ok(())
        })
    }
}
