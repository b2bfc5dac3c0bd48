use std::collections::BTreeMap;
use std::path::Path;

use serde_yaml_ng::Value;
use unicode_normalization::UnicodeNormalization;

use crate::diagnostics::{
    Diagnostic, Severity, E000, E001, E002, E003, E004, E005, E006, E007, E008, E010, E011, E012,
    E020, E021, E022, E023, W001, W002, W003,
};
use crate::models::PROJECT_GUIDE_ID;
use crate::parser::{parse_frontmatter, read_file_checked, KNOWN_KEYS};
use crate::signals::is_known_language;

const MAX_NAME_LEN: usize = 64;
const MAX_DESCRIPTION_LEN: usize = 1024;

const CATEGORIES: &[&str] = &["universal", "language", "framework"];

/// Collapse consecutive hyphens into a single hyphen.
fn collapse_hyphens(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut prev_hyphen = false;
    for c in s.chars() {
        if c == '-' && prev_hyphen {
            continue;
        }
        prev_hyphen = c == '-';
        result.push(c);
    }
    result
}

/// Validate a guide id after NFKC normalization.
fn validate_name(name: &str) -> Vec<Diagnostic> {
    let mut diags = Vec::new();
    let normalized: String = name.nfkc().collect();

    if normalized.is_empty() {
        diags.push(
            Diagnostic::new(Severity::Error, E001, "name must not be empty").with_field("name"),
        );
        return diags;
    }

    if normalized.chars().count() > MAX_NAME_LEN {
        let truncated: String = {
            let s: String = normalized.chars().take(MAX_NAME_LEN).collect();
            match s.rfind('-') {
                Some(pos) => s[..pos].to_string(),
                None => s,
            }
        };
        diags.push(
            Diagnostic::new(
                Severity::Error,
                E002,
                format!("name exceeds {MAX_NAME_LEN} characters"),
            )
            .with_field("name")
            .with_suggestion(format!("Truncate to: '{truncated}'")),
        );
    }

    // One E003 for uppercase, one per other invalid character.
    let mut invalid_chars: Vec<char> = Vec::new();
    let mut has_uppercase = false;
    for c in normalized.chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' {
            continue;
        }
        if c.is_alphabetic() && !c.is_uppercase() {
            continue;
        }
        if c.is_uppercase() {
            has_uppercase = true;
        } else if !invalid_chars.contains(&c) {
            invalid_chars.push(c);
        }
    }
    if has_uppercase {
        diags.push(
            Diagnostic::new(Severity::Error, E003, "name contains uppercase characters")
                .with_field("name")
                .with_suggestion(format!("Use lowercase: '{}'", normalized.to_lowercase())),
        );
    }
    for c in invalid_chars {
        diags.push(
            Diagnostic::new(
                Severity::Error,
                E003,
                format!("name contains invalid character: '{c}'"),
            )
            .with_field("name"),
        );
    }

    if normalized.starts_with('-') {
        diags.push(
            Diagnostic::new(Severity::Error, E004, "name must not start with a hyphen")
                .with_field("name"),
        );
    }
    if normalized.ends_with('-') {
        diags.push(
            Diagnostic::new(Severity::Error, E005, "name must not end with a hyphen")
                .with_field("name"),
        );
    }
    if normalized.contains("--") {
        diags.push(
            Diagnostic::new(Severity::Error, E006, "name contains consecutive hyphens")
                .with_field("name")
                .with_suggestion(format!(
                    "Remove consecutive hyphens: '{}'",
                    collapse_hyphens(&normalized)
                )),
        );
    }
    if normalized.to_lowercase() == PROJECT_GUIDE_ID {
        diags.push(
            Diagnostic::new(
                Severity::Error,
                E008,
                "name 'project' is reserved for the project guide",
            )
            .with_field("name")
            .with_suggestion("Move project guidance into .guidekit/overrides.md"),
        );
    }

    diags
}

fn validate_description(description: &str) -> Vec<Diagnostic> {
    let mut diags = Vec::new();

    if description.trim().is_empty() {
        diags.push(
            Diagnostic::new(Severity::Error, E010, "description must not be empty")
                .with_field("description"),
        );
        return diags;
    }

    if description.chars().count() > MAX_DESCRIPTION_LEN {
        diags.push(
            Diagnostic::new(
                Severity::Error,
                E011,
                format!("description exceeds {MAX_DESCRIPTION_LEN} characters"),
            )
            .with_field("description"),
        );
    }

    diags
}

fn string_field<'a>(metadata: &'a BTreeMap<String, Value>, key: &str) -> Option<&'a str> {
    metadata
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Items of a list field written either as a comma-separated string or as a
/// YAML sequence.
fn list_items(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(s)) => s
            .split(',')
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect(),
        Some(Value::Sequence(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

/// Check that `category`, `language` and `framework` agree with each other.
fn validate_category(metadata: &BTreeMap<String, Value>) -> Vec<Diagnostic> {
    let mut diags = Vec::new();

    let category = match metadata.get("category").and_then(Value::as_str) {
        Some(c) if CATEGORIES.contains(&c) => c,
        Some(other) => {
            diags.push(
                Diagnostic::new(
                    Severity::Error,
                    E020,
                    format!("unknown category: '{other}'"),
                )
                .with_field("category")
                .with_suggestion(format!("Use one of: {}", CATEGORIES.join(", "))),
            );
            return diags;
        }
        None => {
            diags.push(
                Diagnostic::new(
                    Severity::Error,
                    E020,
                    "missing or non-string field `category`",
                )
                .with_field("category"),
            );
            return diags;
        }
    };

    let language = string_field(metadata, "language");
    let framework = string_field(metadata, "framework");

    if matches!(category, "language" | "framework") && language.is_none() {
        diags.push(
            Diagnostic::new(
                Severity::Error,
                E021,
                format!("{category} guides require a `language`"),
            )
            .with_field("language"),
        );
    }
    if category == "framework" && framework.is_none() {
        diags.push(
            Diagnostic::new(Severity::Error, E022, "framework guides require a `framework`")
                .with_field("framework"),
        );
    }
    if category != "framework" && framework.is_some() {
        diags.push(
            Diagnostic::new(
                Severity::Error,
                E023,
                format!("`framework` is only valid on framework guides, not {category} guides"),
            )
            .with_field("framework")
            .with_suggestion("Set `category: framework` or remove `framework`"),
        );
    }

    let extensions = list_items(metadata.get("extensions"));
    for ext in extensions.iter().filter(|e| e.starts_with('.')) {
        diags.push(
            Diagnostic::new(
                Severity::Warning,
                W002,
                format!("extension '{ext}' has a leading dot"),
            )
            .with_field("extensions")
            .with_suggestion(format!("Write it as '{}'", ext.trim_start_matches('.'))),
        );
    }

    if category == "language" {
        let has_triggers =
            !extensions.is_empty() || !list_items(metadata.get("manifest-keys")).is_empty();
        if let Some(lang) = language {
            if !has_triggers && !is_known_language(&lang.to_lowercase()) {
                diags.push(
                    Diagnostic::new(
                        Severity::Warning,
                        W003,
                        format!(
                            "language '{lang}' has no triggers and is not in the extension table; only explicit mentions will select it"
                        ),
                    )
                    .with_field("extensions"),
                );
            }
        }
    }

    diags
}

/// Validate guide front-matter.
///
/// Expects the raw `parse_frontmatter` map. Returns a list of diagnostics
/// (empty = valid).
#[must_use]
pub fn validate_metadata(metadata: &BTreeMap<String, Value>) -> Vec<Diagnostic> {
    let mut diags = Vec::new();

    match metadata.get("name") {
        Some(Value::String(name)) => diags.extend(validate_name(name)),
        _ => diags.push(
            Diagnostic::new(Severity::Error, E007, "`name` is missing or not a string")
                .with_field("name"),
        ),
    }

    match metadata.get("description") {
        Some(Value::String(desc)) => diags.extend(validate_description(desc)),
        _ => diags.push(
            Diagnostic::new(
                Severity::Error,
                E012,
                "`description` is missing or not a string",
            )
            .with_field("description"),
        ),
    }

    diags.extend(validate_category(metadata));

    // BTreeMap keys are already sorted.
    for key in metadata.keys() {
        if !KNOWN_KEYS.contains(&key.as_str()) {
            diags.push(
                Diagnostic::new(
                    Severity::Warning,
                    W001,
                    format!("unexpected front-matter field: '{key}'"),
                )
                .with_field("metadata")
                .with_suggestion("Move custom fields under `metadata`"),
            );
        }
    }

    diags
}

/// Validate one guide file: read, parse, and check all rules.
///
/// Infrastructure failures (unreadable file, broken front-matter) are
/// reported as a single `E000` diagnostic.
#[must_use]
pub fn validate_guide(path: &Path) -> Vec<Diagnostic> {
    let content = match read_file_checked(path) {
        Ok(c) => c,
        Err(e) => return vec![Diagnostic::new(Severity::Error, E000, e.to_string())],
    };

    match parse_frontmatter(&content) {
        Ok((metadata, _body)) => validate_metadata(&metadata),
        Err(e) => vec![Diagnostic::new(Severity::Error, E000, e.to_string())],
    }
}
