//! Signal extraction from a target project.
//!
//! Produces the evidence the resolver matches guides against: the active
//! file's language, manifest ecosystems and their dependency names, and
//! languages or frameworks named explicitly in free text. Extraction is
//! read-only and never fails; anything unreadable is skipped and noted as
//! an informational diagnostic.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::path::{Path, PathBuf};

use serde::Serialize;
use unicode_normalization::UnicodeNormalization;

use crate::diagnostics::{Diagnostic, Severity, X001};
use crate::fs_util::{is_regular_dir, is_regular_file, should_skip_dir};
use crate::manifest::{ManifestRule, MANIFEST_RULES};
use crate::models::{normalize_extension, Category, GuideDocument};
use crate::probe::{query_overlap, STRONG_MATCH};
use crate::registry::GuideRegistry;

/// Maximum depth of the downward manifest search below the project root.
pub const MAX_SCAN_DEPTH: usize = 3;

/// Maximum number of levels walked upward from the active file.
const MAX_ASCENT: usize = 32;

/// Fixed mapping from file extension to canonical language tag.
pub const EXTENSION_LANGUAGES: &[(&str, &str)] = &[
    ("ts", "typescript"),
    ("tsx", "typescript"),
    ("mts", "typescript"),
    ("cts", "typescript"),
    ("js", "typescript"),
    ("jsx", "typescript"),
    ("mjs", "typescript"),
    ("cjs", "typescript"),
    ("py", "python"),
    ("pyi", "python"),
    ("go", "go"),
    ("rs", "rust"),
    ("kt", "kotlin"),
    ("kts", "kotlin"),
    ("java", "java"),
    ("cs", "csharp"),
    ("dart", "dart"),
    ("swift", "swift"),
    ("rb", "ruby"),
    ("php", "php"),
    ("scala", "scala"),
    ("ex", "elixir"),
    ("exs", "elixir"),
    ("c", "c"),
    ("h", "c"),
    ("cc", "cpp"),
    ("cpp", "cpp"),
    ("cxx", "cpp"),
    ("hpp", "cpp"),
];

/// Canonical language tag for a file extension (with or without a dot).
#[must_use]
pub fn language_for_extension(ext: &str) -> Option<&'static str> {
    let ext = normalize_extension(ext);
    EXTENSION_LANGUAGES
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, lang)| *lang)
}

/// Returns `true` if the extension or manifest tables know this language.
#[must_use]
pub fn is_known_language(language: &str) -> bool {
    EXTENSION_LANGUAGES.iter().any(|(_, l)| *l == language)
        || MANIFEST_RULES.iter().any(|r| r.language == language)
}

/// Kind of evidence a signal came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignalKind {
    Extension,
    ManifestKey,
    ExplicitMention,
}

impl SignalKind {
    /// Confidence tier of this kind: explicit mention > manifest > extension.
    #[must_use]
    pub fn confidence(self) -> Confidence {
        match self {
            SignalKind::Extension => Confidence::Low,
            SignalKind::ManifestKey => Confidence::Medium,
            SignalKind::ExplicitMention => Confidence::High,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SignalKind::Extension => "extension",
            SignalKind::ManifestKey => "manifest-key",
            SignalKind::ExplicitMention => "explicit-mention",
        }
    }
}

/// Confidence tier; ordered so that a higher tier compares greater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Confidence::Low => "low",
            Confidence::Medium => "medium",
            Confidence::High => "high",
        }
    }
}

/// One piece of evidence about what a project uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Signal {
    pub kind: SignalKind,
    /// Lowercased value: a language tag, dependency name, or mentioned term.
    pub value: String,
    pub confidence: Confidence,
    /// Where the signal came from (file path or `query`).
    pub source: String,
}

impl Signal {
    #[must_use]
    pub fn new(kind: SignalKind, value: &str, source: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.trim().to_lowercase(),
            confidence: kind.confidence(),
            source: source.into(),
        }
    }

    #[must_use]
    pub fn extension(value: &str, source: impl Into<String>) -> Self {
        Self::new(SignalKind::Extension, value, source)
    }

    #[must_use]
    pub fn manifest_key(value: &str, source: impl Into<String>) -> Self {
        Self::new(SignalKind::ManifestKey, value, source)
    }

    #[must_use]
    pub fn explicit_mention(value: &str, source: impl Into<String>) -> Self {
        Self::new(SignalKind::ExplicitMention, value, source)
    }
}

/// Ordered, deduplicated set of signals.
///
/// Insertion order is significant: it is the declaration order the resolver
/// uses to break ties within a confidence tier. A `(kind, value)` pair is kept
/// only at its first position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SignalSet {
    signals: Vec<Signal>,
}

impl SignalSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a signal; returns `false` if an equal `(kind, value)` was present.
    pub fn push(&mut self, signal: Signal) -> bool {
        if self.contains(signal.kind, &signal.value) || signal.value.is_empty() {
            return false;
        }
        self.signals.push(signal);
        true
    }

    #[must_use]
    pub fn contains(&self, kind: SignalKind, value: &str) -> bool {
        self.signals
            .iter()
            .any(|s| s.kind == kind && s.value == value)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Signal> {
        self.signals.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.signals.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    /// Keep only signals for which `keep` returns `true`, preserving order.
    pub fn retain(&mut self, keep: impl FnMut(&Signal) -> bool) {
        self.signals.retain(keep);
    }
}

impl Extend<Signal> for SignalSet {
    fn extend<T: IntoIterator<Item = Signal>>(&mut self, iter: T) {
        for signal in iter {
            self.push(signal);
        }
    }
}

impl FromIterator<Signal> for SignalSet {
    fn from_iter<T: IntoIterator<Item = Signal>>(iter: T) -> Self {
        let mut set = SignalSet::new();
        set.extend(iter);
        set
    }
}

impl<'a> IntoIterator for &'a SignalSet {
    type Item = &'a Signal;
    type IntoIter = std::slice::Iter<'a, Signal>;

    fn into_iter(self) -> Self::IntoIter {
        self.signals.iter()
    }
}

/// Inputs to one extraction.
#[derive(Debug, Clone, Copy)]
pub struct ExtractRequest<'a> {
    /// Project root.
    pub root: &'a Path,
    /// File currently being edited, absolute or relative to `root`.
    pub file: Option<&'a Path>,
    /// Free-text user input.
    pub text: Option<&'a str>,
}

impl<'a> ExtractRequest<'a> {
    #[must_use]
    pub fn new(root: &'a Path) -> Self {
        Self {
            root,
            file: None,
            text: None,
        }
    }

    #[must_use]
    pub fn with_file(mut self, file: &'a Path) -> Self {
        self.file = Some(file);
        self
    }

    #[must_use]
    pub fn with_text(mut self, text: &'a str) -> Self {
        self.text = Some(text);
        self
    }
}

/// Result of an extraction: the signals plus what was skipped along the way.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub signals: SignalSet,
    /// Manifests that were scanned, nearest first.
    pub manifests: Vec<PathBuf>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Extract the signal set for a project, an optional active file, and
/// optional free text.
///
/// The registry supplies the framework vocabulary for explicit mentions.
#[must_use]
pub fn extract_signals(request: &ExtractRequest<'_>, registry: &GuideRegistry) -> Extraction {
    let mut extraction = Extraction::default();

    if let Some(text) = request.text {
        extraction.signals.extend(mention_signals(text, registry));
    }

    let active = request.file.map(|f| {
        if f.is_absolute() {
            f.to_path_buf()
        } else {
            request.root.join(f)
        }
    });

    if let Some(file) = &active {
        extraction
            .signals
            .extend(extension_signals(file, request.root));
    }

    for dir in manifest_dirs(request.root, active.as_deref()) {
        scan_manifest_dir(&dir, request.root, &mut extraction);
    }

    tracing::debug!(
        signals = extraction.signals.len(),
        manifests = extraction.manifests.len(),
        "extracted signals"
    );
    extraction
}

/// Extension signals for a file.
///
/// A table extension yields its canonical language tag followed by the raw
/// extension, so guides declaring the extension as a trigger still match.
/// An unknown extension yields the raw extension only.
#[must_use]
pub fn extension_signals(file: &Path, root: &Path) -> Vec<Signal> {
    let Some(ext) = file.extension().and_then(|e| e.to_str()) else {
        return Vec::new();
    };
    let raw = normalize_extension(ext);
    let source = display_relative(file, root);
    let mut signals = Vec::new();
    if let Some(lang) = language_for_extension(&raw) {
        signals.push(Signal::extension(lang, source.clone()));
    }
    if !signals.iter().any(|s| s.value == raw) {
        signals.push(Signal::extension(&raw, source));
    }
    signals
}

/// Directories whose manifests should be scanned, nearest to the active
/// file first.
fn manifest_dirs(root: &Path, active: Option<&Path>) -> Vec<PathBuf> {
    let mut dirs = Vec::new();

    if let Some(nearest) = active.and_then(|file| nearest_manifest_dir(root, file)) {
        dirs.push(nearest);
    }
    if !dirs.iter().any(|d| d == root) && !manifests_in(root).is_empty() {
        dirs.push(root.to_path_buf());
    }
    if dirs.is_empty() && active.is_none() {
        dirs.extend(descend_for_manifests(root));
    }
    dirs
}

/// Walk upward from the active file's directory, stopping at the first
/// level that holds a manifest or at the project root.
fn nearest_manifest_dir(root: &Path, file: &Path) -> Option<PathBuf> {
    let mut dir = file.parent()?;
    if !dir.starts_with(root) {
        return None;
    }
    for _ in 0..MAX_ASCENT {
        if !manifests_in(dir).is_empty() {
            return Some(dir.to_path_buf());
        }
        if dir == root {
            return None;
        }
        dir = dir.parent()?;
    }
    None
}

/// Breadth-first search below the root, bounded by [`MAX_SCAN_DEPTH`].
///
/// Returns every manifest directory on the shallowest level that has any.
fn descend_for_manifests(root: &Path) -> Vec<PathBuf> {
    let mut level: VecDeque<PathBuf> = VecDeque::from([root.to_path_buf()]);
    for depth in 1..=MAX_SCAN_DEPTH {
        let mut next = Vec::new();
        for dir in level.drain(..) {
            next.extend(subdirectories(&dir));
        }
        next.sort();
        let found: Vec<PathBuf> = next
            .iter()
            .filter(|d| !manifests_in(d).is_empty())
            .cloned()
            .collect();
        if !found.is_empty() {
            tracing::debug!(depth, dirs = found.len(), "manifests found below root");
            return found;
        }
        level.extend(next);
    }
    Vec::new()
}

fn subdirectories(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        tracing::debug!(dir = %dir.display(), "cannot read directory; skipping");
        return Vec::new();
    };
    entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| {
            is_regular_dir(p)
                && p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| !should_skip_dir(n))
        })
        .collect()
}

/// Manifest files directly inside `dir`, in trigger-table order.
fn manifests_in(dir: &Path) -> Vec<(PathBuf, &'static ManifestRule)> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut found: Vec<(usize, PathBuf, &'static ManifestRule)> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| is_regular_file(p))
        .filter_map(|path| {
            let name = path.file_name()?.to_str()?.to_string();
            MANIFEST_RULES
                .iter()
                .position(|r| r.matches(&name))
                .map(|i| (i, path, &MANIFEST_RULES[i]))
        })
        .collect();
    found.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
    found.into_iter().map(|(_, p, r)| (p, r)).collect()
}

fn scan_manifest_dir(dir: &Path, root: &Path, extraction: &mut Extraction) {
    for (path, rule) in manifests_in(dir) {
        let source = display_relative(&path, root);
        extraction
            .signals
            .push(Signal::manifest_key(rule.language, source.clone()));

        let deps = std::fs::read_to_string(&path)
            .map_err(|e| e.to_string())
            .and_then(|content| rule.dependencies(&content));
        match deps {
            Ok(names) => {
                for name in names {
                    extraction
                        .signals
                        .push(Signal::manifest_key(&name, source.clone()));
                }
            }
            Err(message) => {
                tracing::debug!(manifest = %path.display(), %message, "skipping manifest dependencies");
                extraction.diagnostics.push(Diagnostic::new(
                    Severity::Info,
                    X001,
                    format!("skipped dependencies of {source}: {message}"),
                ));
            }
        }
        extraction.manifests.push(path);
    }
}

fn display_relative(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}

/// Language names that are also everyday words. They count as a mention only
/// where the text is naming a language.
const AMBIGUOUS_TERMS: &[&str] = &["c", "dart", "elixir", "go", "ruby", "rust", "swift"];

/// Words after which an ambiguous term names a language ("rewrite it in go").
const NAMING_CONTEXT: &[&str] = &["in", "into", "using", "with", "via", "from"];

/// A word of free text.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Token {
    /// Lowercased word.
    text: String,
    /// The word started with an uppercase letter.
    capitalized: bool,
    /// The word opens a sentence.
    sentence_start: bool,
}

fn is_token_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '.' | '+' | '#' | '-' | '_')
}

/// Split free text into word tokens.
///
/// `.`, `+`, `#`, `-` and `_` stay inside tokens so names like `next.js`,
/// `c++` and `c#` survive; they are trimmed from token edges, except for the
/// trailing `+`/`#` of `c++`/`c#`. A word ending in `.`, or a `!`, `?` or
/// line break, ends a sentence.
fn tokenize(text: &str) -> Vec<Token> {
    let normalized: String = text.nfkc().collect();
    let mut tokens = Vec::new();
    let mut sentence_start = true;
    for piece in normalized.split_inclusive(|c: char| !is_token_char(c)) {
        let (word, sep) = match piece.chars().last() {
            Some(c) if !is_token_char(c) => (&piece[..piece.len() - c.len_utf8()], Some(c)),
            _ => (piece, None),
        };
        let trimmed = word
            .trim_start_matches(['.', '-', '_', '+', '#'])
            .trim_end_matches(['.', '-', '_']);
        if !trimmed.is_empty() {
            tokens.push(Token {
                text: trimmed.to_lowercase(),
                capitalized: trimmed.chars().next().is_some_and(char::is_uppercase),
                sentence_start,
            });
            sentence_start = false;
        }
        if word.ends_with('.') || matches!(sep, Some('!' | '?' | '\n')) {
            sentence_start = true;
        }
    }
    tokens
}

/// Whether the token at `i` names a language rather than using an everyday
/// word: unambiguous terms always do; ambiguous ones need a capital letter
/// mid-sentence or a preceding naming word.
fn names_term(tokens: &[Token], i: usize) -> bool {
    let token = &tokens[i];
    if !AMBIGUOUS_TERMS.contains(&token.text.as_str()) {
        return true;
    }
    if token.sentence_start {
        return false;
    }
    token.capitalized || (i > 0 && NAMING_CONTEXT.contains(&tokens[i - 1].text.as_str()))
}

/// Signal values a mention of `doc` emits: the language, or the framework
/// followed by its language.
fn mention_values(doc: &GuideDocument) -> Option<Vec<String>> {
    match (doc.category, &doc.language, &doc.framework) {
        (Category::Language, Some(lang), _) => Some(vec![lang.clone()]),
        (Category::Framework, Some(lang), Some(name)) => Some(vec![name.clone(), lang.clone()]),
        _ => None,
    }
}

/// Terms that count as an explicit mention, mapped to the signal values they
/// emit (the term's canonical name, then its language for frameworks).
fn mention_vocabulary(registry: &GuideRegistry) -> BTreeMap<String, Vec<String>> {
    let mut vocab: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut add = |term: &str, values: &[String]| {
        let entry = vocab.entry(term.to_lowercase()).or_default();
        for v in values {
            if !entry.contains(v) {
                entry.push(v.clone());
            }
        }
    };

    let table_languages: BTreeSet<&str> = EXTENSION_LANGUAGES
        .iter()
        .map(|(_, l)| *l)
        .chain(MANIFEST_RULES.iter().map(|r| r.language))
        .collect();
    for lang in table_languages {
        add(lang, &[lang.to_string()]);
    }

    for doc in registry.iter() {
        let Some(values) = mention_values(doc) else {
            continue;
        };
        add(values[0].as_str(), &values);
        add(doc.id.as_str(), &values);
        for alias in &doc.aliases {
            add(alias.as_str(), &values);
        }
    }
    vocab
}

/// Explicit-mention signals for languages and frameworks named in `text`.
///
/// A guide is mentioned when the text names it (language, framework, id or
/// alias) or when the text strongly overlaps its description. Naming a
/// framework also mentions the language it supplements.
#[must_use]
pub fn mention_signals(text: &str, registry: &GuideRegistry) -> Vec<Signal> {
    let mut signals: Vec<Signal> = Vec::new();
    let mut push = |value: &str, source: String| {
        if !signals.iter().any(|s| s.value == value) {
            signals.push(Signal::explicit_mention(value, source));
        }
    };

    let vocab = mention_vocabulary(registry);
    let tokens = tokenize(text);
    for (i, token) in tokens.iter().enumerate() {
        let Some(values) = vocab.get(&token.text) else {
            continue;
        };
        if !names_term(&tokens, i) {
            tracing::debug!(term = %token.text, "ambiguous term not used as a name");
            continue;
        }
        for value in values {
            push(value.as_str(), "query".to_string());
        }
    }

    for doc in registry.iter() {
        let Some(values) = mention_values(doc) else {
            continue;
        };
        if query_overlap(text, &doc.description) < STRONG_MATCH {
            continue;
        }
        for value in &values {
            push(value.as_str(), format!("query (description of {})", doc.id));
        }
    }
    signals
}
