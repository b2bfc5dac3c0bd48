use std::collections::BTreeMap;
use std::path::Path;

use serde_yaml_ng::{Mapping, Value};

use crate::errors::{GuideError, Result};
use crate::models::{GuideDocument, GuideProperties};

/// Front-matter keys recognized in guide files.
pub const KNOWN_KEYS: &[&str] = &[
    "name",
    "description",
    "category",
    "language",
    "framework",
    "extensions",
    "manifest-keys",
    "aliases",
    "content",
    "rules",
    "metadata",
];

/// Largest guide or override file we are willing to read.
const MAX_FILE_SIZE: u64 = 4 * 1024 * 1024;

const DELIMITER: &str = "---";

/// Returns `true` if the content opens with a front-matter delimiter.
#[must_use]
pub fn has_frontmatter(content: &str) -> bool {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    content
        .lines()
        .next()
        .is_some_and(|line| line.trim_end() == DELIMITER)
}

/// Extract YAML front-matter between `---` delimiters.
///
/// Returns `(metadata_map, body_text)`. The body is everything after the
/// closing delimiter line, unmodified.
pub fn parse_frontmatter(content: &str) -> Result<(BTreeMap<String, Value>, String)> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut lines = content.split_inclusive('\n');

    match lines.next() {
        Some(first) if first.trim_end() == DELIMITER => {}
        _ => {
            return Err(GuideError::Parse {
                message: "front-matter must start with '---'".into(),
            })
        }
    }

    let mut consumed = content.split_inclusive('\n').next().map_or(0, str::len);
    let mut yaml = String::new();
    let mut closed = false;
    for line in lines {
        consumed += line.len();
        if line.trim_end() == DELIMITER {
            closed = true;
            break;
        }
        yaml.push_str(line);
    }
    if !closed {
        return Err(GuideError::Parse {
            message: "front-matter is not closed with '---'".into(),
        });
    }

    let body = content[consumed..].to_string();
    if yaml.trim().is_empty() {
        return Ok((BTreeMap::new(), body));
    }

    let value: Value = serde_yaml_ng::from_str(&yaml)?;
    let mapping = match value {
        Value::Mapping(m) => m,
        Value::Null => Mapping::new(),
        _ => {
            return Err(GuideError::Parse {
                message: "front-matter must be a YAML mapping".into(),
            })
        }
    };

    let mut map = BTreeMap::new();
    for (key, value) in mapping {
        match key {
            Value::String(k) => {
                map.insert(k, value);
            }
            other => {
                return Err(GuideError::Parse {
                    message: format!("front-matter keys must be strings, found {other:?}"),
                })
            }
        }
    }
    Ok((map, body))
}

/// Read a file, refusing anything larger than the size limit.
pub(crate) fn read_file_checked(path: &Path) -> Result<String> {
    let meta = std::fs::metadata(path)?;
    if meta.len() > MAX_FILE_SIZE {
        return Err(GuideError::Parse {
            message: format!(
                "{} is too large ({} bytes, limit {MAX_FILE_SIZE})",
                path.display(),
                meta.len()
            ),
        });
    }
    Ok(std::fs::read_to_string(path)?)
}

/// Turn a front-matter map into typed guide properties.
pub fn properties_from_map(map: &BTreeMap<String, Value>) -> Result<GuideProperties> {
    let mapping: Mapping = map
        .iter()
        .map(|(k, v)| (Value::String(k.clone()), v.clone()))
        .collect();
    Ok(serde_yaml_ng::from_value(Value::Mapping(mapping))?)
}

/// Full pipeline for one guide file: read → parse → type → document.
///
/// Every failure is reported as [`GuideError::InvalidGuide`] naming the file.
pub fn read_guide(path: &Path) -> Result<GuideDocument> {
    let invalid = |e: GuideError| GuideError::InvalidGuide {
        path: path.to_path_buf(),
        message: e.to_string(),
    };
    let content = read_file_checked(path).map_err(invalid)?;
    let (map, _body) = parse_frontmatter(&content).map_err(invalid)?;
    let props = properties_from_map(&map).map_err(invalid)?;
    GuideDocument::from_properties(props, path)
}

/// Read only the body of a guide file, dropping its front-matter.
pub fn read_body(path: &Path) -> Result<String> {
    let content = read_file_checked(path)?;
    let (_, body) = parse_frontmatter(&content)?;
    Ok(body)
}
