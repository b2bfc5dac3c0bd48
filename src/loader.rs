//! Lazy guide content loading.
//!
//! The loader reads a guide's content the first time the guide appears in a
//! resolution and serves it from its cache afterward. The cache belongs to
//! the caller's loader instance; there is no shared state.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;

use crate::diagnostics::{Diagnostic, Severity, L001};
use crate::errors::Result;
use crate::models::{Category, ContentSource, GuideDocument};
use crate::parser::{read_body, read_file_checked};
use crate::resolver::ResolutionResult;

/// Content of one loaded guide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedGuide {
    pub id: String,
    pub category: Category,
    pub content: Arc<str>,
}

/// Result of loading a resolution: guide contents in load order plus
/// warnings for guides that could not be read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadOutput {
    pub guides: Vec<LoadedGuide>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Reads and caches guide content for the lifetime of the process.
#[derive(Debug, Default)]
pub struct GuideLoader {
    cache: HashMap<String, Arc<str>>,
    reads: usize,
}

impl GuideLoader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Materialize every guide in `result`, in order.
    ///
    /// A guide whose backing content is missing or unreadable is skipped with
    /// an `L001` warning; the remaining guides still load.
    pub fn load(&mut self, result: &ResolutionResult) -> LoadOutput {
        let mut output = LoadOutput::default();
        for doc in &result.guides {
            match self.content(doc) {
                Ok(content) => output.guides.push(LoadedGuide {
                    id: doc.id.clone(),
                    category: doc.category,
                    content,
                }),
                Err(e) => {
                    tracing::warn!(guide = %doc.id, error = %e, "guide unavailable");
                    output.diagnostics.push(
                        Diagnostic::new(
                            Severity::Warning,
                            L001,
                            format!("guide '{}' is unavailable: {e}", doc.id),
                        )
                        .with_field("content"),
                    );
                }
            }
        }
        output
    }

    /// Content of a single guide, read on first use.
    pub fn content(&mut self, doc: &GuideDocument) -> Result<Arc<str>> {
        let path = match &doc.content {
            ContentSource::Inline(text) => return Ok(Arc::from(text.as_str())),
            ContentSource::Body(path) | ContentSource::File(path) => path,
        };
        if let Some(cached) = self.cache.get(&doc.id) {
            tracing::debug!(guide = %doc.id, "cache hit");
            return Ok(Arc::clone(cached));
        }

        let text = match &doc.content {
            ContentSource::Body(_) => read_body(path)?,
            _ => read_file_checked(path)?,
        };
        self.reads += 1;
        tracing::debug!(guide = %doc.id, path = %path.display(), "loaded guide content");
        let content: Arc<str> = Arc::from(text);
        self.cache.insert(doc.id.clone(), Arc::clone(&content));
        Ok(content)
    }

    /// Number of content reads performed so far.
    #[must_use]
    pub fn reads(&self) -> usize {
        self.reads
    }

    #[must_use]
    pub fn is_cached(&self, id: &str) -> bool {
        self.cache.contains_key(id)
    }
}

/// Render loaded guides as one markdown context block.
#[must_use]
pub fn render(output: &LoadOutput) -> String {
    let mut out = String::new();
    for (i, guide) in output.guides.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let _ = writeln!(out, "<!-- guide: {} ({}) -->", guide.id, guide.category);
        out.push_str(&guide.content);
        if !guide.content.ends_with('\n') {
            out.push('\n');
        }
    }
    out
}
