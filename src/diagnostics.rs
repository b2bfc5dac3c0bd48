//! Structured diagnostics for validation, resolution, and loading.
//!
//! Non-fatal issues travel as typed diagnostics carrying stable codes,
//! severity levels, and optional fix suggestions. Fatal configuration
//! problems use [`crate::errors::GuideError`] instead.

use std::fmt;

use serde::Serialize;

/// Severity of a diagnostic message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// A rule violation that causes validation failure.
    Error,
    /// A potential issue that does not cause failure.
    Warning,
    /// An informational note.
    Info,
}

/// A structured diagnostic message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    /// Severity level.
    pub severity: Severity,
    /// Stable code (e.g., `"E001"`, `"R001"`, `"L001"`).
    pub code: &'static str,
    /// Human-readable message.
    pub message: String,
    /// Field that caused the diagnostic (e.g., `"name"`, `"category"`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<&'static str>,
    /// Suggested fix (actionable text).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl Diagnostic {
    /// Create a new diagnostic with the given severity, code, and message.
    #[must_use]
    pub fn new(severity: Severity, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
            field: None,
            suggestion: None,
        }
    }

    /// Set the field that caused this diagnostic.
    #[must_use]
    pub fn with_field(mut self, field: &'static str) -> Self {
        self.field = Some(field);
        self
    }

    /// Set a suggested fix for this diagnostic.
    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Returns `true` if this diagnostic is an error.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Returns `true` if this diagnostic is a warning.
    #[must_use]
    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }

    /// Returns `true` if this diagnostic is informational.
    #[must_use]
    pub fn is_info(&self) -> bool {
        self.severity == Severity::Info
    }
}

/// Display format:
/// - Errors: `"message"` (no prefix)
/// - Warnings: `"warning: message"`
/// - Info: `"info: message"`
impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.severity {
            Severity::Error => write!(f, "{}", self.message),
            Severity::Warning => write!(f, "warning: {}", self.message),
            Severity::Info => write!(f, "info: {}", self.message),
        }
    }
}

// ── Codes ───────────────────────────────────────────────────────────────

// Infrastructure errors (E000)

/// Infrastructure error (file not found, IO error, parse failure).
pub const E000: &str = "E000";

// Name validation errors (E001–E008)

/// Name must not be empty.
pub const E001: &str = "E001";
/// Name exceeds 64 characters.
pub const E002: &str = "E002";
/// Name contains invalid character.
pub const E003: &str = "E003";
/// Name starts with hyphen.
pub const E004: &str = "E004";
/// Name ends with hyphen.
pub const E005: &str = "E005";
/// Name contains consecutive hyphens.
pub const E006: &str = "E006";
/// `name` is missing or not a string.
pub const E007: &str = "E007";
/// Name is reserved for the project guide.
pub const E008: &str = "E008";

// Description validation errors (E010–E012)

/// Description must not be empty.
pub const E010: &str = "E010";
/// Description exceeds 1024 characters.
pub const E011: &str = "E011";
/// `description` is missing or not a string.
pub const E012: &str = "E012";

// Category consistency errors (E020–E023)

/// Missing or unknown category value.
pub const E020: &str = "E020";
/// Language or framework guide without a `language`.
pub const E021: &str = "E021";
/// Framework guide without a `framework`.
pub const E022: &str = "E022";
/// `framework` set on a guide that is not a framework guide.
pub const E023: &str = "E023";

// Warning codes (W001–W003)

/// Unexpected front-matter field.
pub const W001: &str = "W001";
/// Trigger extension written with a leading dot.
pub const W002: &str = "W002";
/// Language guide declares no triggers and no table entry covers its language.
pub const W003: &str = "W003";

// Resolution diagnostics (R001–R003)

/// No language signal matched any language guide.
pub const R001: &str = "R001";
/// Framework matched but its language guide is not part of the result.
pub const R002: &str = "R002";
/// Framework matched but was dropped by the per-session cap.
pub const R003: &str = "R003";

// Loader diagnostics (L001)

/// Backing content for a resolved guide is missing or unreadable.
pub const L001: &str = "L001";

// Signal extraction diagnostics (X001)

/// A manifest was found but could not be read or parsed.
pub const X001: &str = "X001";
