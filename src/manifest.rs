//! Manifest trigger table and dependency-name extraction.
//!
//! Each known manifest file maps to the language of its ecosystem and to a
//! rule extracting dependency names in declaration order. Names are
//! lowercased; duplicates keep their first position.

use std::sync::LazyLock;

use regex::Regex;

/// Outcome of a dependency extraction: names, or a parse failure message.
pub type Extracted = std::result::Result<Vec<String>, String>;

/// How a manifest file is recognized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestPattern {
    /// Exact file name (`package.json`).
    Exact(&'static str),
    /// Any file with this extension (`*.csproj`).
    Extension(&'static str),
}

/// One row of the manifest trigger table.
#[derive(Debug, Clone, Copy)]
pub struct ManifestRule {
    pub pattern: ManifestPattern,
    /// Canonical language tag of the ecosystem.
    pub language: &'static str,
    extract: fn(&str) -> Extracted,
}

impl ManifestRule {
    /// Returns `true` if a file with this name is handled by this rule.
    #[must_use]
    pub fn matches(&self, file_name: &str) -> bool {
        match self.pattern {
            ManifestPattern::Exact(name) => file_name == name,
            ManifestPattern::Extension(ext) => file_name
                .rsplit_once('.')
                .is_some_and(|(stem, e)| !stem.is_empty() && e.eq_ignore_ascii_case(ext)),
        }
    }

    /// Extract dependency names from the manifest's content.
    pub fn dependencies(&self, content: &str) -> Extracted {
        (self.extract)(content).map(dedup)
    }
}

/// The fixed manifest trigger table.
pub const MANIFEST_RULES: &[ManifestRule] = &[
    ManifestRule {
        pattern: ManifestPattern::Exact("package.json"),
        language: "typescript",
        extract: extract_package_json,
    },
    ManifestRule {
        pattern: ManifestPattern::Exact("pyproject.toml"),
        language: "python",
        extract: extract_pyproject,
    },
    ManifestRule {
        pattern: ManifestPattern::Exact("requirements.txt"),
        language: "python",
        extract: extract_requirements,
    },
    ManifestRule {
        pattern: ManifestPattern::Exact("go.mod"),
        language: "go",
        extract: extract_go_mod,
    },
    ManifestRule {
        pattern: ManifestPattern::Exact("Cargo.toml"),
        language: "rust",
        extract: extract_cargo_toml,
    },
    ManifestRule {
        pattern: ManifestPattern::Exact("pom.xml"),
        language: "java",
        extract: extract_pom_xml,
    },
    ManifestRule {
        pattern: ManifestPattern::Exact("build.gradle.kts"),
        language: "kotlin",
        extract: extract_gradle,
    },
    ManifestRule {
        pattern: ManifestPattern::Exact("build.gradle"),
        language: "java",
        extract: extract_gradle,
    },
    ManifestRule {
        pattern: ManifestPattern::Extension("csproj"),
        language: "csharp",
        extract: extract_csproj,
    },
    ManifestRule {
        pattern: ManifestPattern::Exact("pubspec.yaml"),
        language: "dart",
        extract: extract_pubspec,
    },
    ManifestRule {
        pattern: ManifestPattern::Exact("composer.json"),
        language: "php",
        extract: extract_composer_json,
    },
    ManifestRule {
        pattern: ManifestPattern::Exact("Gemfile"),
        language: "ruby",
        extract: extract_gemfile,
    },
];

/// Find the rule handling a file name, if any.
#[must_use]
pub fn rule_for(file_name: &str) -> Option<&'static ManifestRule> {
    MANIFEST_RULES.iter().find(|r| r.matches(file_name))
}

fn dedup(names: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(names.len());
    for name in names {
        let name = name.trim().to_lowercase();
        if !name.is_empty() && !out.contains(&name) {
            out.push(name);
        }
    }
    out
}

fn json_keys(value: &serde_json::Value, sections: &[&str]) -> Vec<String> {
    sections
        .iter()
        .filter_map(|s| value.get(*s).and_then(serde_json::Value::as_object))
        .flat_map(|obj| obj.keys().cloned())
        .collect()
}

fn extract_package_json(content: &str) -> Extracted {
    let value: serde_json::Value = serde_json::from_str(content).map_err(|e| e.to_string())?;
    Ok(json_keys(
        &value,
        &["dependencies", "devDependencies", "peerDependencies"],
    ))
}

fn extract_composer_json(content: &str) -> Extracted {
    let value: serde_json::Value = serde_json::from_str(content).map_err(|e| e.to_string())?;
    Ok(json_keys(&value, &["require", "require-dev"])
        .into_iter()
        .filter(|name| name != "php" && !name.starts_with("ext-"))
        .collect())
}

/// Name portion of a PEP 508 requirement string.
fn requirement_name(spec: &str) -> Option<String> {
    let name: String = spec
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        .collect();
    if name.is_empty() {
        None
    } else {
        Some(name.to_lowercase().replace('_', "-"))
    }
}

fn extract_requirements(content: &str) -> Extracted {
    Ok(content
        .lines()
        .map(|line| line.split('#').next().unwrap_or_default().trim())
        .filter(|line| !line.is_empty() && !line.starts_with('-'))
        .filter_map(requirement_name)
        .collect())
}

fn toml_table_keys(table: &toml::Table, path: &[&str]) -> Vec<String> {
    let mut current = table;
    for segment in path {
        match current.get(*segment).and_then(toml::Value::as_table) {
            Some(t) => current = t,
            None => return Vec::new(),
        }
    }
    current.keys().cloned().collect()
}

fn extract_pyproject(content: &str) -> Extracted {
    let table: toml::Table = content.parse().map_err(|e: toml::de::Error| e.to_string())?;
    let mut names: Vec<String> = table
        .get("project")
        .and_then(|p| p.get("dependencies"))
        .and_then(toml::Value::as_array)
        .map(|deps| {
            deps.iter()
                .filter_map(toml::Value::as_str)
                .filter_map(requirement_name)
                .collect()
        })
        .unwrap_or_default();
    names.extend(
        toml_table_keys(&table, &["tool", "poetry", "dependencies"])
            .into_iter()
            .filter(|name| name != "python")
            .map(|name| name.replace('_', "-")),
    );
    Ok(names)
}

fn extract_cargo_toml(content: &str) -> Extracted {
    let table: toml::Table = content.parse().map_err(|e: toml::de::Error| e.to_string())?;
    let sections: [&[&str]; 4] = [
        &["dependencies"],
        &["dev-dependencies"],
        &["build-dependencies"],
        &["workspace", "dependencies"],
    ];
    Ok(sections
        .iter()
        .flat_map(|path| toml_table_keys(&table, path))
        .collect())
}

fn extract_go_mod(content: &str) -> Extracted {
    let mut names = Vec::new();
    let mut in_block = false;
    for line in content.lines() {
        let line = line.split("//").next().unwrap_or_default().trim();
        if in_block {
            if line.starts_with(')') {
                in_block = false;
            } else if let Some(module) = line.split_whitespace().next() {
                names.push(module.to_string());
            }
            continue;
        }
        let Some(rest) = line.strip_prefix("require") else {
            continue;
        };
        let rest = rest.trim();
        if rest.starts_with('(') {
            in_block = true;
        } else if let Some(module) = rest.split_whitespace().next() {
            names.push(module.to_string());
        }
    }
    if in_block {
        return Err("unterminated require block".into());
    }
    Ok(names)
}

static POM_DEPENDENCY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<dependency>(.*?)</dependency>").expect("dependency regex must compile")
});

static POM_ARTIFACT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<artifactId>\s*([^<\s]+)\s*</artifactId>").expect("artifact regex must compile")
});

fn extract_pom_xml(content: &str) -> Extracted {
    if !content.contains("<project") {
        return Err("missing <project> element".into());
    }
    Ok(POM_DEPENDENCY_RE
        .captures_iter(content)
        .filter_map(|dep| {
            POM_ARTIFACT_RE
                .captures(&dep[1])
                .map(|artifact| artifact[1].to_string())
        })
        .collect())
}

static CSPROJ_REFERENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<PackageReference\s+[^>]*?Include\s*=\s*"([^"]+)""#)
        .expect("package reference regex must compile")
});

fn extract_csproj(content: &str) -> Extracted {
    Ok(CSPROJ_REFERENCE_RE
        .captures_iter(content)
        .map(|c| c[1].to_string())
        .collect())
}

static GRADLE_COORDINATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?m)^\s*(?:implementation|api|compileOnly|runtimeOnly|testImplementation|kapt|ksp)\s*\(?\s*["']([^:"'\s]+):([^:"'\s]+)"#,
    )
    .expect("gradle coordinate regex must compile")
});

fn extract_gradle(content: &str) -> Extracted {
    Ok(GRADLE_COORDINATE_RE
        .captures_iter(content)
        .map(|c| c[2].to_string())
        .collect())
}

static GEM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^\s*gem\s+["']([^"']+)["']"#).expect("gem regex must compile")
});

fn extract_gemfile(content: &str) -> Extracted {
    Ok(GEM_RE
        .captures_iter(content)
        .map(|c| c[1].to_string())
        .collect())
}

fn extract_pubspec(content: &str) -> Extracted {
    let value: serde_yaml_ng::Value =
        serde_yaml_ng::from_str(content).map_err(|e| e.to_string())?;
    let mut names = Vec::new();
    for section in ["dependencies", "dev_dependencies"] {
        if let Some(map) = value.get(section).and_then(serde_yaml_ng::Value::as_mapping) {
            names.extend(map.keys().filter_map(|k| k.as_str().map(str::to_string)));
        }
    }
    Ok(names)
}
