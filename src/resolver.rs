//! Guide resolution.
//!
//! [`resolve_with`] is a pure function of the registry, a signal set, the
//! project overrides and a [`ResolverConfig`]. It selects guides in fixed
//! priority order:
//!
//! 1. every universal guardrail, ordered by id;
//! 2. language guides matched by any signal;
//! 3. framework guides matched by manifest or explicit-mention signals, only
//!    when their language guide was selected, up to a per-session cap;
//! 4. the project guide from the override file.
//!
//! Rule defaults from the selected guides are folded into effective rules,
//! with override rules replacing guide values at the same scope.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::Serialize;
use serde_yaml_ng::Value;

use crate::diagnostics::{Diagnostic, Severity, R001, R002, R003};
use crate::models::{Category, GuideDocument, RuleScope};
use crate::overrides::{OverrideRule, OverrideSet};
use crate::registry::GuideRegistry;
use crate::signals::{Confidence, Signal, SignalKind, SignalSet};

/// Default number of framework guides loaded per session.
pub const DEFAULT_MAX_FRAMEWORKS: usize = 3;

/// Resolver tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Maximum number of framework guides in one result.
    pub max_frameworks: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_frameworks: DEFAULT_MAX_FRAMEWORKS,
        }
    }
}

/// Where an effective rule value came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "from", rename_all = "lowercase")]
pub enum RuleOrigin {
    /// Default declared by the guide with this id.
    Guide(String),
    /// Override read from this file.
    Override(std::path::PathBuf),
}

/// A rule value after layering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EffectiveRule {
    pub value: Value,
    pub origin: RuleOrigin,
}

type RuleMap = BTreeMap<RuleScope, BTreeMap<String, EffectiveRule>>;

/// Outcome of one resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolutionResult {
    /// Guides to load, in load order.
    pub guides: Vec<Arc<GuideDocument>>,
    /// Override rules whose scope is present in this result.
    pub applied_overrides: Vec<OverrideRule>,
    pub diagnostics: Vec<Diagnostic>,
    effective: RuleMap,
}

impl ResolutionResult {
    /// Guide ids in load order.
    #[must_use]
    pub fn ids(&self) -> Vec<&str> {
        self.guides.iter().map(|g| g.id.as_str()).collect()
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.guides.iter().any(|g| g.id == id)
    }

    /// Languages with a resolved language guide.
    #[must_use]
    pub fn languages(&self) -> BTreeSet<String> {
        self.of_category(Category::Language)
            .filter_map(|g| g.language.clone())
            .collect()
    }

    /// Frameworks with a resolved framework guide.
    #[must_use]
    pub fn frameworks(&self) -> BTreeSet<String> {
        self.of_category(Category::Framework)
            .filter_map(|g| g.framework.clone())
            .collect()
    }

    /// All effective rules, grouped by scope.
    #[must_use]
    pub fn effective_rules(&self) -> &BTreeMap<RuleScope, BTreeMap<String, EffectiveRule>> {
        &self.effective
    }

    /// Effective rule at `scope`, if any layer declared it.
    #[must_use]
    pub fn effective_rule(&self, scope: &RuleScope, key: &str) -> Option<&EffectiveRule> {
        self.effective.get(scope).and_then(|rules| rules.get(key))
    }

    /// Effective value at `scope`, if any layer declared it.
    #[must_use]
    pub fn effective_value(&self, scope: &RuleScope, key: &str) -> Option<&Value> {
        self.effective_rule(scope, key).map(|rule| &rule.value)
    }

    fn of_category(&self, category: Category) -> impl Iterator<Item = &Arc<GuideDocument>> {
        self.guides.iter().filter(move |g| g.category == category)
    }
}

/// Rank of a match: higher confidence first, then earlier signal.
type Rank = (Reverse<Confidence>, usize);

fn best_rank<'a>(
    signals: impl Iterator<Item = (usize, &'a Signal)>,
    mut matches: impl FnMut(&Signal) -> bool,
) -> Option<Rank> {
    signals
        .filter(|(_, s)| matches(s))
        .map(|(i, s)| (Reverse(s.confidence), i))
        .min()
}

fn language_matches(doc: &GuideDocument, signal: &Signal) -> bool {
    let v = signal.value.as_str();
    let is_language = doc.language.as_deref() == Some(v);
    match signal.kind {
        SignalKind::Extension => is_language || doc.trigger_extensions.contains(v),
        SignalKind::ManifestKey => is_language || doc.trigger_manifest_keys.contains(v),
        SignalKind::ExplicitMention => is_language || doc.id == v || doc.aliases.contains(v),
    }
}

fn framework_matches(doc: &GuideDocument, signal: &Signal) -> bool {
    if signal.kind == SignalKind::Extension {
        return false;
    }
    let v = signal.value.as_str();
    doc.framework.as_deref() == Some(v)
        || doc.id == v
        || doc.aliases.contains(v)
        || doc.trigger_manifest_keys.contains(v)
}

/// Resolve with no overrides and the default configuration.
#[must_use]
pub fn resolve(registry: &GuideRegistry, signals: &SignalSet) -> ResolutionResult {
    resolve_with(
        registry,
        signals,
        &OverrideSet::new(),
        &ResolverConfig::default(),
    )
}

/// Resolve the load set for a signal set.
///
/// Never fails: the worst case is the universal guardrails alone, with a
/// diagnostic explaining why nothing else matched.
#[must_use]
pub fn resolve_with(
    registry: &GuideRegistry,
    signals: &SignalSet,
    overrides: &OverrideSet,
    config: &ResolverConfig,
) -> ResolutionResult {
    let indexed = || signals.iter().enumerate();
    let mut diagnostics = Vec::new();
    let mut guides: Vec<Arc<GuideDocument>> = registry
        .all_universal()
        .into_iter()
        .cloned()
        .collect();

    // Language layer.
    let mut languages: Vec<(Rank, &str, &Arc<GuideDocument>)> = registry
        .iter()
        .filter(|doc| doc.category == Category::Language)
        .filter_map(|doc| {
            let rank = best_rank(indexed(), |s| language_matches(doc, s))?;
            Some((rank, doc.language.as_deref()?, doc))
        })
        .collect();
    languages.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(b.1)));

    if languages.is_empty() {
        diagnostics.push(
            Diagnostic::new(
                Severity::Info,
                R001,
                "no language detected; loading universal guardrails only",
            )
            .with_suggestion("Open a source file, add a manifest, or name the language"),
        );
    }
    let selected_languages: BTreeSet<&str> = languages.iter().map(|(_, lang, _)| *lang).collect();
    guides.extend(languages.iter().map(|(_, _, doc)| Arc::clone(doc)));

    // Framework layer.
    let mut frameworks: Vec<(Rank, &str, &Arc<GuideDocument>)> = registry
        .iter()
        .filter(|doc| doc.category == Category::Framework)
        .filter_map(|doc| {
            let rank = best_rank(indexed(), |s| framework_matches(doc, s))?;
            Some((rank, doc.framework.as_deref()?, doc))
        })
        .collect();
    frameworks.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(b.1)));

    let mut kept = 0usize;
    for (_, name, doc) in frameworks {
        let lang = doc.language.as_deref().unwrap_or_default();
        if !selected_languages.contains(lang) {
            diagnostics.push(Diagnostic::new(
                Severity::Info,
                R002,
                format!("framework '{name}' matched but its language guide '{lang}' is not loaded"),
            ));
            continue;
        }
        if kept >= config.max_frameworks {
            diagnostics.push(
                Diagnostic::new(
                    Severity::Info,
                    R003,
                    format!(
                        "framework '{name}' dropped: cap of {} frameworks reached",
                        config.max_frameworks
                    ),
                )
                .with_suggestion("Raise the cap with --max-frameworks"),
            );
            continue;
        }
        kept += 1;
        guides.push(Arc::clone(doc));
    }

    // Project layer.
    if let Some(project) = &overrides.project_guide {
        guides.push(Arc::new(project.clone()));
    }

    let mut result = ResolutionResult {
        guides,
        applied_overrides: Vec::new(),
        diagnostics,
        effective: BTreeMap::new(),
    };
    let (langs, fws) = (result.languages(), result.frameworks());
    result.applied_overrides = overrides
        .rules
        .iter()
        .filter(|rule| {
            let applies = rule.applies_to(&langs, &fws);
            if !applies {
                tracing::debug!(scope = %rule.scope, key = %rule.rule_key, "override target not resolved; ignoring");
            }
            applies
        })
        .cloned()
        .collect();
    result.effective = fold_rules(&result.guides, &result.applied_overrides);

    tracing::debug!(guides = ?result.ids(), "resolved");
    result
}

/// Layer guide defaults in load order, then let overrides win.
fn fold_rules(guides: &[Arc<GuideDocument>], overrides: &[OverrideRule]) -> RuleMap {
    let mut rules = RuleMap::new();
    for guide in guides {
        let scope = guide.rule_scope();
        for (key, value) in &guide.rules {
            rules.entry(scope.clone()).or_default().insert(
                key.clone(),
                EffectiveRule {
                    value: value.clone(),
                    origin: RuleOrigin::Guide(guide.id.clone()),
                },
            );
        }
    }
    for rule in overrides {
        rules.entry(rule.scope.clone()).or_default().insert(
            rule.rule_key.clone(),
            EffectiveRule {
                value: rule.rule_value.clone(),
                origin: RuleOrigin::Override(rule.source_file.clone()),
            },
        );
    }
    rules
}
