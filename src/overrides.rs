//! Project-local overrides.
//!
//! A project may carry `.guidekit/overrides.md`: front-matter declaring rule
//! overrides, and an optional markdown body that becomes the project guide.
//! The file is re-read for every session; a missing file means no overrides.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_yaml_ng::Value;

use crate::errors::{GuideError, Result};
use crate::models::{GuideDocument, RuleScope};
use crate::parser::{has_frontmatter, parse_frontmatter, read_file_checked};

/// Directory holding project-local configuration.
pub const OVERRIDE_DIR: &str = ".guidekit";
/// Override file name inside [`OVERRIDE_DIR`].
pub const OVERRIDE_FILE: &str = "overrides.md";

/// Where the override file lives for a project root.
#[must_use]
pub fn default_override_path(project: &Path) -> PathBuf {
    project.join(OVERRIDE_DIR).join(OVERRIDE_FILE)
}

/// A single rule override.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverrideRule {
    #[serde(flatten)]
    pub scope: RuleScope,
    pub rule_key: String,
    pub rule_value: Value,
    pub source_file: PathBuf,
}

impl OverrideRule {
    /// Whether the rule's scope is present among the resolved languages and
    /// frameworks. Global rules always apply.
    #[must_use]
    pub fn applies_to(&self, languages: &BTreeSet<String>, frameworks: &BTreeSet<String>) -> bool {
        match &self.scope {
            RuleScope::Global => true,
            RuleScope::Language(lang) => languages.contains(lang),
            RuleScope::Framework(name) => frameworks.contains(name),
        }
    }
}

/// Everything read from one override file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverrideSet {
    pub rules: Vec<OverrideRule>,
    /// Project guide built from the file's body, if the body is non-empty.
    pub project_guide: Option<GuideDocument>,
    /// The file the set was read from; `None` when no file exists.
    pub source: Option<PathBuf>,
}

impl OverrideSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty() && self.project_guide.is_none()
    }

    /// Add a rule programmatically.
    #[must_use]
    pub fn with_rule(mut self, scope: RuleScope, key: &str, value: impl Into<Value>) -> Self {
        let source_file = self.source.clone().unwrap_or_default();
        self.rules.push(OverrideRule {
            scope,
            rule_key: key.to_string(),
            rule_value: value.into(),
            source_file,
        });
        self
    }

    /// Attach project guidance programmatically.
    #[must_use]
    pub fn with_project_guide(mut self, body: &str) -> Self {
        self.project_guide = Some(GuideDocument::project(body));
        self
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawRule {
    scope: String,
    #[serde(default)]
    target: Option<String>,
    rule_key: String,
    rule_value: Value,
}

impl RawRule {
    fn into_rule(self, source_file: &Path) -> std::result::Result<OverrideRule, String> {
        let target = self
            .target
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty());
        let scope = match (self.scope.trim().to_lowercase().as_str(), target) {
            ("global", None) => RuleScope::Global,
            ("global", Some(t)) => {
                return Err(format!("global rule '{}' must not name a target ('{t}')", self.rule_key))
            }
            ("language", Some(t)) => RuleScope::Language(t),
            ("framework", Some(t)) => RuleScope::Framework(t),
            ("language" | "framework", None) => {
                return Err(format!(
                    "{} rule '{}' requires a `target`",
                    self.scope, self.rule_key
                ))
            }
            (other, _) => {
                return Err(format!(
                    "unknown scope '{other}' (expected global, language or framework)"
                ))
            }
        };
        let rule_key = self.rule_key.trim().to_string();
        if rule_key.is_empty() {
            return Err("`ruleKey` must not be empty".into());
        }
        Ok(OverrideRule {
            scope,
            rule_key,
            rule_value: self.rule_value,
            source_file: source_file.to_path_buf(),
        })
    }
}

/// Read the override file at its default location under `project`.
pub fn load_overrides(project: &Path) -> Result<OverrideSet> {
    load_override_file(&default_override_path(project))
}

/// Read an override file. A missing file is an empty set, not an error.
pub fn load_override_file(path: &Path) -> Result<OverrideSet> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no override file");
        return Ok(OverrideSet::new());
    }
    let content = read_file_checked(path).map_err(|e| GuideError::Override {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let set = parse_overrides(&content, path)?;
    tracing::debug!(
        path = %path.display(),
        rules = set.rules.len(),
        project_guide = set.project_guide.is_some(),
        "loaded overrides"
    );
    Ok(set)
}

/// Parse override file content. `path` is recorded on each rule and names the
/// file in errors.
pub fn parse_overrides(content: &str, path: &Path) -> Result<OverrideSet> {
    let invalid = |message: String| GuideError::Override {
        path: path.to_path_buf(),
        message,
    };

    let (map, body) = if has_frontmatter(content) {
        parse_frontmatter(content).map_err(|e| invalid(e.to_string()))?
    } else {
        (BTreeMap::new(), content.to_string())
    };

    let raw_rules = raw_rules(map).map_err(invalid)?;
    let rules = raw_rules
        .into_iter()
        .map(|raw| raw.into_rule(path))
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(invalid)?;

    let project_guide = if body.trim().is_empty() {
        None
    } else {
        Some(GuideDocument::project(&body))
    };

    Ok(OverrideSet {
        rules,
        project_guide,
        source: Some(path.to_path_buf()),
    })
}

/// Split front-matter into rule entries: either a `rules:` list or the whole
/// map as one rule.
fn raw_rules(map: BTreeMap<String, Value>) -> std::result::Result<Vec<RawRule>, String> {
    if map.is_empty() {
        return Ok(Vec::new());
    }
    let mapping = |m: BTreeMap<String, Value>| -> Value {
        Value::Mapping(m.into_iter().map(|(k, v)| (Value::String(k), v)).collect())
    };

    if map.contains_key("rules") {
        if let Some(extra) = map.keys().find(|k| *k != "rules") {
            return Err(format!("unexpected key '{extra}' next to `rules`"));
        }
        let items = match map.get("rules") {
            Some(Value::Sequence(items)) => items.clone(),
            Some(Value::Null) => return Ok(Vec::new()),
            _ => return Err("`rules` must be a list".into()),
        };
        items
            .into_iter()
            .enumerate()
            .map(|(i, item)| {
                serde_yaml_ng::from_value(item).map_err(|e| format!("rules[{i}]: {e}"))
            })
            .collect()
    } else {
        serde_yaml_ng::from_value(mapping(map))
            .map(|rule| vec![rule])
            .map_err(|e| e.to_string())
    }
}
