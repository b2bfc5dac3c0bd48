//! The guide catalog.
//!
//! A [`GuideRegistry`] is built once, either programmatically with
//! [`GuideRegistry::register`] or from a directory of guide files with
//! [`GuideRegistry::from_dir`], and is read-only afterward. It is passed by
//! reference to the resolver; there is no process-wide instance.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::errors::{GuideError, Result};
use crate::fs_util::{is_regular_dir, is_regular_file};
use crate::models::{Category, GuideDocument, GuideKey, PROJECT_GUIDE_ID};
use crate::parser::{has_frontmatter, read_file_checked, read_guide};

/// Maximum recursion depth for guide discovery.
const MAX_DISCOVERY_DEPTH: usize = 10;

/// A path skipped during guide discovery, with the reason.
#[derive(Debug, Clone)]
pub struct DiscoveryWarning {
    pub path: PathBuf,
    pub message: String,
}

/// Static catalog of guide documents keyed by `(category, name)`.
#[derive(Debug, Clone, Default)]
pub struct GuideRegistry {
    guides: BTreeMap<GuideKey, Arc<GuideDocument>>,
    ids: BTreeMap<String, GuideKey>,
}

impl GuideRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a document to the catalog.
    ///
    /// Fails with [`GuideError::DuplicateGuide`] if its key or its id is
    /// already taken, and with [`GuideError::ReservedId`] for the id
    /// `project`; the registry is left unchanged in either case.
    pub fn register(&mut self, doc: GuideDocument) -> Result<()> {
        if doc.id == PROJECT_GUIDE_ID {
            return Err(GuideError::ReservedId { id: doc.id });
        }
        let key = doc.key();
        if let Some(existing) = self.guides.get(&key) {
            return Err(GuideError::DuplicateGuide {
                key,
                id: existing.id.clone(),
            });
        }
        if let Some(existing_key) = self.ids.get(&doc.id) {
            return Err(GuideError::DuplicateGuide {
                key: existing_key.clone(),
                id: doc.id.clone(),
            });
        }
        tracing::debug!(%key, id = %doc.id, "registered guide");
        self.ids.insert(doc.id.clone(), key.clone());
        self.guides.insert(key, Arc::new(doc));
        Ok(())
    }

    /// Build a catalog from every guide file under `root`.
    ///
    /// Guide files are markdown files that open with front-matter; other
    /// markdown (READMEs, notes) is ignored. Files are registered in sorted
    /// path order. Any malformed guide or duplicate key aborts the build.
    pub fn from_dir(root: &Path) -> Result<Self> {
        let (paths, warnings) = discover_guides(root);
        for w in &warnings {
            tracing::debug!(path = %w.path.display(), message = %w.message, "skipped during discovery");
        }

        let mut registry = Self::new();
        for path in paths {
            let doc = read_guide(&path)?;
            registry.register(doc).map_err(|e| GuideError::InvalidGuide {
                path: path.clone(),
                message: e.to_string(),
            })?;
        }
        tracing::debug!(root = %root.display(), guides = registry.len(), "catalog built");
        Ok(registry)
    }

    /// The language guide for `language`, if registered.
    #[must_use]
    pub fn find_by_language(&self, language: &str) -> Option<&Arc<GuideDocument>> {
        self.guides.get(&GuideKey {
            category: Category::Language,
            name: language.to_lowercase(),
        })
    }

    /// The framework guide for `name`, if registered.
    #[must_use]
    pub fn find_by_framework(&self, name: &str) -> Option<&Arc<GuideDocument>> {
        self.guides.get(&GuideKey {
            category: Category::Framework,
            name: name.to_lowercase(),
        })
    }

    /// All universal guardrail documents, ordered by id.
    #[must_use]
    pub fn all_universal(&self) -> Vec<&Arc<GuideDocument>> {
        self.by_category(Category::Universal).collect()
    }

    /// Framework guides that supplement `language`, ordered by framework name.
    #[must_use]
    pub fn frameworks_for_language(&self, language: &str) -> Vec<&Arc<GuideDocument>> {
        let language = language.to_lowercase();
        self.by_category(Category::Framework)
            .filter(|doc| doc.language.as_deref() == Some(language.as_str()))
            .collect()
    }

    /// Language tags that have a language guide.
    #[must_use]
    pub fn languages(&self) -> BTreeSet<&str> {
        self.by_category(Category::Language)
            .filter_map(|doc| doc.language.as_deref())
            .collect()
    }

    /// Look a document up by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Arc<GuideDocument>> {
        self.ids
            .get(&id.to_lowercase())
            .and_then(|key| self.guides.get(key))
    }

    /// All documents in key order (universal, language, framework).
    pub fn iter(&self) -> impl Iterator<Item = &Arc<GuideDocument>> {
        self.guides.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.guides.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.guides.is_empty()
    }

    fn by_category(&self, category: Category) -> impl Iterator<Item = &Arc<GuideDocument>> {
        self.guides
            .range(
                GuideKey {
                    category,
                    name: String::new(),
                }..,
            )
            .take_while(move |(key, _)| key.category == category)
            .map(|(_, doc)| doc)
    }
}

/// Find guide files under `root`, collecting warnings for paths that could
/// not be read.
///
/// Returns `(guide_paths, warnings)` with paths sorted. Hidden directories
/// are skipped and recursion stops beyond a fixed depth.
#[must_use]
pub fn discover_guides(root: &Path) -> (Vec<PathBuf>, Vec<DiscoveryWarning>) {
    let mut guides = Vec::new();
    let mut warnings = Vec::new();
    if is_regular_file(root) {
        guides.push(root.to_path_buf());
    } else {
        discover_recursive(root, &mut guides, &mut warnings, 0);
    }
    guides.sort();
    (guides, warnings)
}

fn discover_recursive(
    dir: &Path,
    results: &mut Vec<PathBuf>,
    warnings: &mut Vec<DiscoveryWarning>,
    depth: usize,
) {
    if depth > MAX_DISCOVERY_DEPTH {
        return;
    }
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) => {
            warnings.push(DiscoveryWarning {
                path: dir.to_path_buf(),
                message: format!("cannot read directory: {e}"),
            });
            return;
        }
    };

    let mut subdirs = Vec::new();
    for entry_result in entries {
        let entry = match entry_result {
            Ok(entry) => entry,
            Err(e) => {
                warnings.push(DiscoveryWarning {
                    path: dir.to_path_buf(),
                    message: format!("cannot read directory entry: {e}"),
                });
                continue;
            }
        };
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name.starts_with('.') {
            continue;
        }
        if is_regular_dir(&path) {
            subdirs.push(path);
        } else if is_regular_file(&path) && is_markdown(&path) {
            match read_file_checked(&path) {
                Ok(content) if has_frontmatter(&content) => results.push(path),
                Ok(_) => warnings.push(DiscoveryWarning {
                    path,
                    message: "no front-matter; not a guide".into(),
                }),
                Err(e) => warnings.push(DiscoveryWarning {
                    path,
                    message: e.to_string(),
                }),
            }
        }
    }

    for subdir in subdirs {
        discover_recursive(&subdir, results, warnings, depth + 1);
    }
}

fn is_markdown(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("md"))
}
