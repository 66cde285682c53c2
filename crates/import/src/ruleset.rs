use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

use crate::rules::{InvalidRuleDefinition, Rule, RuleRecord};

#[derive(Error, Debug)]
pub enum RuleSetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse JSON rules: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Failed to parse TOML rules: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Failed to write TOML rules: {0}")]
    TomlWrite(#[from] toml::ser::Error),
    #[error(transparent)]
    InvalidRule(#[from] InvalidRuleDefinition),
}

/// On-disk encoding, picked from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleFormat {
    Json,
    Toml,
}

impl RuleFormat {
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => RuleFormat::Toml,
            _ => RuleFormat::Json,
        }
    }
}

/// TOML has no top-level arrays, so rules live under `[[rule]]`.
#[derive(Debug, Default, Serialize, Deserialize)]
struct TomlRuleFile {
    #[serde(default)]
    rule: Vec<RuleRecord>,
}

/// Rules in evaluation order: ascending `order`, insertion order among ties.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new(mut rules: Vec<Rule>) -> Self {
        // `sort_by` is stable, which keeps equal-order rules in file order.
        rules.sort_by(Rule::cmp_order);
        Self { rules }
    }

    /// Builds every rule or none: the first invalid record aborts the load.
    pub fn from_records(records: Vec<RuleRecord>) -> Result<Self, InvalidRuleDefinition> {
        let rules = records
            .into_iter()
            .map(Rule::from_record)
            .collect::<Result<Vec<_>, _>>()?;

        let mut seen = HashSet::new();
        for rule in &rules {
            if !seen.insert(rule.name()) {
                tracing::warn!("Rule name '{}' is used more than once", rule.name());
            }
        }

        Ok(Self::new(rules))
    }

    pub fn to_records(&self) -> Vec<RuleRecord> {
        self.rules.iter().map(Rule::to_record).collect()
    }

    pub fn from_json(json: &str) -> Result<Self, RuleSetError> {
        let records: Vec<RuleRecord> = serde_json::from_str(json)?;
        Ok(Self::from_records(records)?)
    }

    pub fn to_json(&self) -> Result<String, RuleSetError> {
        Ok(serde_json::to_string_pretty(&self.to_records())?)
    }

    pub fn from_toml(toml_content: &str) -> Result<Self, RuleSetError> {
        let file: TomlRuleFile = toml::from_str(toml_content)?;
        Ok(Self::from_records(file.rule)?)
    }

    pub fn to_toml(&self) -> Result<String, RuleSetError> {
        let file = TomlRuleFile {
            rule: self.to_records(),
        };
        Ok(toml::to_string_pretty(&file)?)
    }

    /// Reads a rule file. A file that does not exist yet is an empty set.
    pub fn load(path: &Path) -> Result<Self, RuleSetError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No rules file at {}, starting with no rules", path.display());
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };

        let rules = match RuleFormat::for_path(path) {
            RuleFormat::Json => Self::from_json(&content)?,
            RuleFormat::Toml => Self::from_toml(&content)?,
        };
        tracing::info!("Loaded {} rules from {}", rules.len(), path.display());
        Ok(rules)
    }

    pub fn save(&self, path: &Path) -> Result<(), RuleSetError> {
        let content = match RuleFormat::for_path(path) {
            RuleFormat::Json => self.to_json()?,
            RuleFormat::Toml => self.to_toml()?,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        tracing::info!("Saved {} rules to {}", self.len(), path.display());
        Ok(())
    }

    /// Adds a rule after any existing rules with the same order.
    pub fn insert(&mut self, rule: Rule) {
        let at = self.rules.partition_point(|r| r.order() <= rule.order());
        self.rules.insert(at, rule);
    }

    /// Removes the first rule with this name.
    pub fn remove(&mut self, name: &str) -> Option<Rule> {
        let at = self.rules.iter().position(|r| r.name() == name)?;
        Some(self.rules.remove(at))
    }

    pub fn get(&self, name: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.name() == name)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Rule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl<'a> IntoIterator for &'a RuleSet {
    type Item = &'a Rule;
    type IntoIter = std::slice::Iter<'a, Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}
