use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml_ng::Value;

use crate::errors::{GuideError, Result};

/// Layer a guide document belongs to.
///
/// Variant order is the load priority: universal guardrails first, the
/// project layer last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Universal,
    Language,
    Framework,
    Project,
}

impl Category {
    /// Lowercase name as written in front-matter.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Universal => "universal",
            Category::Language => "language",
            Category::Framework => "framework",
            Category::Project => "project",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Registry key: `(category, language | framework name)`.
///
/// Universal and project guides have no language or framework, so they are
/// keyed by their id instead.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GuideKey {
    pub category: Category,
    pub name: String,
}

impl fmt::Display for GuideKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.category, self.name)
    }
}

/// Scope a rule applies at.
///
/// Guides contribute rules at the scope of their layer; overrides name the
/// scope explicitly.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(tag = "scope", content = "target", rename_all = "lowercase")]
pub enum RuleScope {
    Global,
    Language(String),
    Framework(String),
}

impl fmt::Display for RuleScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleScope::Global => f.write_str("global"),
            RuleScope::Language(lang) => write!(f, "language:{lang}"),
            RuleScope::Framework(name) => write!(f, "framework:{name}"),
        }
    }
}

/// Where the content of a guide lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentSource {
    /// Content held in memory.
    Inline(String),
    /// Body of a guide file beneath its front-matter.
    Body(PathBuf),
    /// A separate file, passed through whole.
    File(PathBuf),
}

impl ContentSource {
    /// Backing path, if the content lives on disk.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            ContentSource::Inline(_) => None,
            ContentSource::Body(path) | ContentSource::File(path) => Some(path),
        }
    }
}

/// Parsed properties from a guide file's front-matter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GuideProperties {
    pub name: String,
    pub description: String,
    pub category: Category,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub framework: Option<String>,

    #[serde(
        default,
        deserialize_with = "list_field",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub extensions: Vec<String>,

    #[serde(
        default,
        deserialize_with = "list_field",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub manifest_keys: Vec<String>,

    #[serde(
        default,
        deserialize_with = "list_field",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub aliases: Vec<String>,

    /// Relative path to an external body, in place of the file's own body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub rules: BTreeMap<String, Value>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, Value>,
}

/// Accept either a comma-separated string or a YAML sequence of strings.
fn list_field<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ListField {
        Csv(String),
        Items(Vec<String>),
    }

    let items = match Option::<ListField>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(ListField::Csv(s)) => s.split(',').map(str::to_string).collect(),
        Some(ListField::Items(items)) => items,
    };
    Ok(items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect())
}

/// A registered unit of guidance.
///
/// Documents are immutable once registered; the registry hands out shared
/// references only.
#[derive(Debug, Clone, PartialEq)]
pub struct GuideDocument {
    pub id: String,
    pub description: String,
    pub category: Category,
    pub language: Option<String>,
    pub framework: Option<String>,
    pub trigger_extensions: BTreeSet<String>,
    pub trigger_manifest_keys: BTreeSet<String>,
    pub aliases: BTreeSet<String>,
    /// Rule defaults contributed at this guide's scope.
    pub rules: BTreeMap<String, Value>,
    pub metadata: BTreeMap<String, Value>,
    pub version: String,
    pub content: ContentSource,
}

/// Id of the project guide built from an override file; no catalog guide may
/// use it.
pub const PROJECT_GUIDE_ID: &str = "project";

/// Version reported for guides whose metadata declares none.
pub const UNVERSIONED: &str = "0";

impl GuideDocument {
    fn bare(id: &str, category: Category, content: ContentSource) -> Self {
        Self {
            id: id.to_lowercase(),
            description: String::new(),
            category,
            language: None,
            framework: None,
            trigger_extensions: BTreeSet::new(),
            trigger_manifest_keys: BTreeSet::new(),
            aliases: BTreeSet::new(),
            rules: BTreeMap::new(),
            metadata: BTreeMap::new(),
            version: UNVERSIONED.to_string(),
            content,
        }
    }

    /// A universal guardrail document.
    #[must_use]
    pub fn universal(id: &str, content: ContentSource) -> Self {
        Self::bare(id, Category::Universal, content)
    }

    /// A language guide.
    #[must_use]
    pub fn language(id: &str, language: &str, content: ContentSource) -> Self {
        let mut doc = Self::bare(id, Category::Language, content);
        doc.language = Some(language.to_lowercase());
        doc
    }

    /// A framework guide supplementing the guide for `language`.
    #[must_use]
    pub fn framework(id: &str, language: &str, framework: &str, content: ContentSource) -> Self {
        let mut doc = Self::bare(id, Category::Framework, content);
        doc.language = Some(language.to_lowercase());
        doc.framework = Some(framework.to_lowercase());
        doc
    }

    /// The project-local guide built from an override file's body.
    #[must_use]
    pub fn project(body: &str) -> Self {
        Self::bare(PROJECT_GUIDE_ID, Category::Project, ContentSource::Inline(body.to_string()))
    }

    #[must_use]
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    #[must_use]
    pub fn with_extensions(mut self, extensions: &[&str]) -> Self {
        self.trigger_extensions
            .extend(extensions.iter().map(|e| normalize_extension(e)));
        self
    }

    #[must_use]
    pub fn with_manifest_keys(mut self, keys: &[&str]) -> Self {
        self.trigger_manifest_keys
            .extend(keys.iter().map(|k| k.trim().to_lowercase()));
        self
    }

    #[must_use]
    pub fn with_aliases(mut self, aliases: &[&str]) -> Self {
        self.aliases.extend(aliases.iter().map(|a| a.trim().to_lowercase()));
        self
    }

    #[must_use]
    pub fn with_rule(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.rules.insert(key.to_string(), value.into());
        self
    }

    #[must_use]
    pub fn with_version(mut self, version: &str) -> Self {
        self.version = version.to_string();
        self
    }

    /// Build a document from parsed front-matter.
    ///
    /// `path` is the guide file; it anchors relative `content` paths and
    /// names the file in errors.
    pub fn from_properties(props: GuideProperties, path: &Path) -> Result<Self> {
        let invalid = |message: String| GuideError::InvalidGuide {
            path: path.to_path_buf(),
            message,
        };

        let language = non_empty(props.language.as_deref());
        let framework = non_empty(props.framework.as_deref());

        match props.category {
            Category::Universal => {
                if framework.is_some() {
                    return Err(invalid("universal guides cannot name a framework".into()));
                }
            }
            Category::Language => {
                if language.is_none() {
                    return Err(invalid("language guides require a 'language'".into()));
                }
                if framework.is_some() {
                    return Err(invalid(
                        "language guides cannot name a framework; use category: framework".into(),
                    ));
                }
            }
            Category::Framework => {
                if language.is_none() {
                    return Err(invalid(
                        "framework guides require the 'language' they supplement".into(),
                    ));
                }
                if framework.is_none() {
                    return Err(invalid("framework guides require a 'framework'".into()));
                }
            }
            Category::Project => {
                return Err(invalid(
                    "project guides belong in the project's override file, not the catalog".into(),
                ));
            }
        }

        let content = match props.content.as_deref().map(str::trim) {
            Some(rel) if !rel.is_empty() => {
                let base = path.parent().unwrap_or_else(|| Path::new("."));
                ContentSource::File(base.join(rel))
            }
            _ => ContentSource::Body(path.to_path_buf()),
        };

        let version = match props.metadata.get("version") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => UNVERSIONED.to_string(),
        };

        Ok(Self {
            id: props.name.trim().to_lowercase(),
            description: props.description,
            category: props.category,
            language: language.map(|l| l.to_lowercase()),
            framework: framework.map(|f| f.to_lowercase()),
            trigger_extensions: props
                .extensions
                .iter()
                .map(|e| normalize_extension(e))
                .collect(),
            trigger_manifest_keys: props
                .manifest_keys
                .iter()
                .map(|k| k.to_lowercase())
                .collect(),
            aliases: props.aliases.iter().map(|a| a.to_lowercase()).collect(),
            rules: props.rules,
            metadata: props.metadata,
            version,
            content,
        })
    }

    /// Registry key for this document.
    #[must_use]
    pub fn key(&self) -> GuideKey {
        let name = match self.category {
            Category::Language => self.language.clone(),
            Category::Framework => self.framework.clone(),
            Category::Universal | Category::Project => None,
        };
        GuideKey {
            category: self.category,
            name: name.unwrap_or_else(|| self.id.clone()),
        }
    }

    /// Scope at which this guide's rules apply.
    #[must_use]
    pub fn rule_scope(&self) -> RuleScope {
        match (self.category, &self.language, &self.framework) {
            (Category::Language, Some(lang), _) => RuleScope::Language(lang.clone()),
            (Category::Framework, _, Some(name)) => RuleScope::Framework(name.clone()),
            _ => RuleScope::Global,
        }
    }

    /// Author recorded in metadata, if any.
    #[must_use]
    pub fn author(&self) -> Option<&str> {
        self.metadata.get("author").and_then(Value::as_str)
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

/// Lowercase an extension and drop any leading dots.
#[must_use]
pub fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(yaml: &str) -> GuideProperties {
        serde_yaml_ng::from_str(yaml).unwrap()
    }

    #[test]
    fn deserialize_minimal_universal() {
        let p = props("name: core\ndescription: Core rules\ncategory: universal\n");
        assert_eq!(p.name, "core");
        assert_eq!(p.category, Category::Universal);
        assert!(p.language.is_none());
        assert!(p.extensions.is_empty());
        assert!(p.rules.is_empty());
    }

    #[test]
    fn extensions_accept_comma_separated_string() {
        let p = props(
            "name: ts\ndescription: d\ncategory: language\nlanguage: typescript\nextensions: ts, tsx,  .js\n",
        );
        assert_eq!(p.extensions, vec!["ts", "tsx", ".js"]);
    }

    #[test]
    fn extensions_accept_sequence() {
        let p = props(
            "name: ts\ndescription: d\ncategory: language\nlanguage: typescript\nextensions: [ts, tsx]\n",
        );
        assert_eq!(p.extensions, vec!["ts", "tsx"]);
    }

    #[test]
    fn manifest_keys_use_kebab_case() {
        let p = props(
            "name: nextjs\ndescription: d\ncategory: framework\nlanguage: typescript\nframework: nextjs\nmanifest-keys: next\n",
        );
        assert_eq!(p.manifest_keys, vec!["next"]);
    }

    #[test]
    fn unknown_category_fails() {
        let r = serde_yaml_ng::from_str::<GuideProperties>(
            "name: x\ndescription: d\ncategory: tooling\n",
        );
        assert!(r.is_err());
    }

    #[test]
    fn missing_description_fails() {
        let r = serde_yaml_ng::from_str::<GuideProperties>("name: x\ncategory: universal\n");
        assert!(r.is_err());
    }

    #[test]
    fn from_properties_normalizes_triggers() {
        let p = props(
            "name: TypeScript\ndescription: d\ncategory: language\nlanguage: TypeScript\nextensions: .TS, tsx\nmetadata:\n  version: 1.2.0\n  author: docs team\n",
        );
        let doc = GuideDocument::from_properties(p, Path::new("guides/ts.md")).unwrap();
        assert_eq!(doc.id, "typescript");
        assert_eq!(doc.language.as_deref(), Some("typescript"));
        assert!(doc.trigger_extensions.contains("ts"));
        assert!(doc.trigger_extensions.contains("tsx"));
        assert_eq!(doc.version, "1.2.0");
        assert_eq!(doc.author(), Some("docs team"));
        assert_eq!(doc.content, ContentSource::Body(PathBuf::from("guides/ts.md")));
    }

    #[test]
    fn from_properties_resolves_external_content() {
        let p = props("name: core\ndescription: d\ncategory: universal\ncontent: bodies/core.md\n");
        let doc = GuideDocument::from_properties(p, Path::new("guides/core.md")).unwrap();
        assert_eq!(
            doc.content,
            ContentSource::File(PathBuf::from("guides/bodies/core.md"))
        );
    }

    #[test]
    fn framework_guide_requires_language() {
        let p = props("name: react\ndescription: d\ncategory: framework\nframework: react\n");
        let err = GuideDocument::from_properties(p, Path::new("react.md")).unwrap_err();
        assert!(err.to_string().contains("language"));
    }

    #[test]
    fn language_guide_requires_language() {
        let p = props("name: go\ndescription: d\ncategory: language\n");
        assert!(GuideDocument::from_properties(p, Path::new("go.md")).is_err());
    }

    #[test]
    fn project_category_rejected_in_catalog() {
        let p = props("name: local\ndescription: d\ncategory: project\n");
        assert!(GuideDocument::from_properties(p, Path::new("local.md")).is_err());
    }

    #[test]
    fn keys_per_category() {
        let inline = || ContentSource::Inline(String::new());
        assert_eq!(
            GuideDocument::universal("core", inline()).key().to_string(),
            "universal:core"
        );
        assert_eq!(
            GuideDocument::language("py-guide", "python", inline())
                .key()
                .to_string(),
            "language:python"
        );
        assert_eq!(
            GuideDocument::framework("next-guide", "typescript", "nextjs", inline())
                .key()
                .to_string(),
            "framework:nextjs"
        );
    }

    #[test]
    fn rule_scope_follows_category() {
        let inline = || ContentSource::Inline(String::new());
        assert_eq!(
            GuideDocument::universal("core", inline()).rule_scope(),
            RuleScope::Global
        );
        assert_eq!(
            GuideDocument::language("go", "go", inline()).rule_scope(),
            RuleScope::Language("go".into())
        );
        assert_eq!(
            GuideDocument::framework("gin", "go", "gin", inline()).rule_scope(),
            RuleScope::Framework("gin".into())
        );
    }

    #[test]
    fn category_order_is_load_priority() {
        assert!(Category::Universal < Category::Language);
        assert!(Category::Language < Category::Framework);
        assert!(Category::Framework < Category::Project);
    }

    #[test]
    fn normalize_extension_strips_dots() {
        assert_eq!(normalize_extension(".TSX"), "tsx");
        assert_eq!(normalize_extension(" rs "), "rs");
    }
}
