use std::fs;
use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::{tempdir, TempDir};

/// Return a `Command` for the `guidekit` binary built by Cargo.
fn guidekit() -> Command {
    let mut cmd = cargo_bin_cmd!("guidekit");
    cmd.env_remove("RUST_LOG");
    cmd
}

fn write(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

/// A small catalog: one universal guide, three languages, three frameworks.
fn catalog() -> TempDir {
    let dir = tempdir().unwrap();
    let root = dir.path();
    write(
        &root.join("universal/core.md"),
        "---\nname: core\ndescription: Guardrails for every change\ncategory: universal\nrules:\n  maxFunctionLines: 50\n---\nKeep functions short.\n",
    );
    write(
        &root.join("languages/typescript.md"),
        "---\nname: typescript\ndescription: TypeScript conventions and strict typing\ncategory: language\nlanguage: typescript\nextensions: ts, tsx, js, jsx\nmetadata:\n  version: 2.1.0\n---\nEnable strict mode.\n",
    );
    write(
        &root.join("languages/go.md"),
        "---\nname: go\ndescription: Go formatting and error handling\ncategory: language\nlanguage: go\nextensions: go\n---\nRun gofmt.\n",
    );
    write(
        &root.join("languages/python.md"),
        "---\nname: python\ndescription: Python typing and packaging\ncategory: language\nlanguage: python\nextensions: py\n---\nUse type hints.\n",
    );
    write(
        &root.join("frameworks/nextjs.md"),
        "---\nname: nextjs\ndescription: Next.js app router patterns\ncategory: framework\nlanguage: typescript\nframework: nextjs\nmanifest-keys: next\naliases: next.js\n---\nPrefer server components.\n",
    );
    write(
        &root.join("frameworks/express.md"),
        "---\nname: express\ndescription: Express middleware and routing\ncategory: framework\nlanguage: typescript\nframework: express\n---\nCentralize error middleware.\n",
    );
    write(
        &root.join("frameworks/react.md"),
        "---\nname: react\ndescription: React components and hooks\ncategory: framework\nlanguage: typescript\nframework: react\n---\nKeep components pure.\n",
    );
    write(&root.join("README.md"), "# Guides\n\nNot a guide.\n");
    dir
}

fn resolve_json(guides: &Path, project: &Path, extra: &[&str]) -> serde_json::Value {
    let output = guidekit()
        .args(["resolve", "--format", "json", "--guides"])
        .arg(guides)
        .arg("--project")
        .arg(project)
        .args(extra)
        .output()
        .unwrap();
    assert!(output.status.success(), "{output:?}");
    serde_json::from_slice(&output.stdout).unwrap()
}

fn ids(json: &serde_json::Value) -> Vec<String> {
    json["guides"]
        .as_array()
        .unwrap()
        .iter()
        .map(|g| g["id"].as_str().unwrap().to_string())
        .collect()
}

fn codes(json: &serde_json::Value) -> Vec<String> {
    json["diagnostics"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["code"].as_str().unwrap().to_string())
        .collect()
}

// ── Global flags ────────────────────────────────────────────────────

#[test]
fn help_flag() {
    guidekit()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Resolve and load coding-assistant guides"));
}

#[test]
fn version_flag() {
    guidekit()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn about_flag() {
    guidekit()
        .arg("--about")
        .assert()
        .success()
        .stdout(predicate::str::contains("guidekit:"))
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")))
        .stdout(predicate::str::contains("licence:"));
}

#[test]
fn no_args_shows_usage() {
    guidekit()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

// ── resolve ─────────────────────────────────────────────────────────

#[test]
fn resolve_tsx_file_with_next_dependency() {
    let guides = catalog();
    let project = tempdir().unwrap();
    write(
        &project.path().join("package.json"),
        r#"{"name": "web", "dependencies": {"next": "14.0.0"}}"#,
    );
    write(&project.path().join("app.tsx"), "export default function App() {}\n");
    let json = resolve_json(guides.path(), project.path(), &["--file", "app.tsx"]);
    assert_eq!(ids(&json), vec!["core", "typescript", "nextjs"]);
    assert!(codes(&json).is_empty());
}

#[test]
fn resolve_go_module_without_file() {
    let guides = catalog();
    let project = tempdir().unwrap();
    write(&project.path().join("go.mod"), "module example.com/svc\n\ngo 1.22\n");
    let json = resolve_json(guides.path(), project.path(), &[]);
    assert_eq!(ids(&json), vec!["core", "go"]);
}

#[test]
fn resolve_empty_project_reports_no_language() {
    let guides = catalog();
    let project = tempdir().unwrap();
    let json = resolve_json(guides.path(), project.path(), &[]);
    assert_eq!(ids(&json), vec!["core"]);
    assert_eq!(codes(&json), vec!["R001"]);
}

#[test]
fn resolve_ts_file_with_two_frameworks() {
    let guides = catalog();
    let project = tempdir().unwrap();
    write(
        &project.path().join("package.json"),
        r#"{"dependencies": {"express": "^4.19.0", "react": "^18.2.0"}}"#,
    );
    let json = resolve_json(guides.path(), project.path(), &["--file", "src/server.ts"]);
    assert_eq!(ids(&json), vec!["core", "typescript", "express", "react"]);
}

#[test]
fn resolve_override_wins_over_universal_default() {
    let guides = catalog();
    let project = tempdir().unwrap();
    write(
        &project.path().join(".guidekit/overrides.md"),
        "---\nscope: global\nruleKey: maxFunctionLines\nruleValue: 80\n---\n",
    );
    guidekit()
        .args(["resolve", "--guides"])
        .arg(guides.path())
        .arg("--project")
        .arg(project.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("global maxFunctionLines = 80"))
        .stdout(predicate::str::contains("maxFunctionLines = 50").not());
}

#[test]
fn resolve_json_reports_effective_rule_origin() {
    let guides = catalog();
    let project = tempdir().unwrap();
    let json = resolve_json(guides.path(), project.path(), &[]);
    let rules = json["effective_rules"].as_array().unwrap();
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0]["key"], "maxFunctionLines");
    assert_eq!(rules[0]["value"], 50);
    assert_eq!(rules[0]["origin"]["kind"], "guide");
    assert_eq!(rules[0]["origin"]["from"], "core");
}

#[test]
fn resolve_query_mentions_framework() {
    let guides = catalog();
    let project = tempdir().unwrap();
    let json = resolve_json(
        guides.path(),
        project.path(),
        &["--query", "add a route handler in Next.js"],
    );
    assert_eq!(ids(&json), vec!["core", "typescript", "nextjs"]);
}

#[test]
fn resolve_query_matches_description_without_everyday_words() {
    let guides = catalog();
    let project = tempdir().unwrap();
    write(&project.path().join("package.json"), r#"{"dependencies": {}}"#);
    let json = resolve_json(
        guides.path(),
        project.path(),
        &[
            "--file",
            "src/page.tsx",
            "--query",
            "Go ahead and fix app router patterns",
        ],
    );
    assert_eq!(ids(&json), vec!["core", "typescript", "nextjs"]);
}

#[test]
fn resolve_table_extension_declared_by_guide() {
    let guides = catalog();
    write(
        &guides.path().join("languages/javascript.md"),
        "---\nname: javascript\ndescription: Plain JavaScript\ncategory: language\nlanguage: javascript\nextensions: js, jsx\n---\nUse strict equality.\n",
    );
    let project = tempdir().unwrap();
    let json = resolve_json(guides.path(), project.path(), &["--file", "app.js"]);
    assert_eq!(ids(&json), vec!["core", "typescript", "javascript"]);
}

#[test]
fn resolve_framework_cap_flag() {
    let guides = catalog();
    let project = tempdir().unwrap();
    write(
        &project.path().join("package.json"),
        r#"{"dependencies": {"react": "18", "express": "4", "next": "14"}}"#,
    );
    let json = resolve_json(guides.path(), project.path(), &["--max-frameworks", "1"]);
    assert_eq!(ids(&json), vec!["core", "typescript", "react"]);
    assert_eq!(codes(&json), vec!["R003", "R003"]);
}

#[test]
fn resolve_project_guide_last() {
    let guides = catalog();
    let project = tempdir().unwrap();
    write(&project.path().join("go.mod"), "module x\n");
    write(
        &project.path().join(".guidekit/overrides.md"),
        "Use table-driven tests.\n",
    );
    let json = resolve_json(guides.path(), project.path(), &[]);
    assert_eq!(ids(&json), vec!["core", "go", "project"]);
}

#[test]
fn resolve_malformed_override_is_fatal() {
    let guides = catalog();
    let project = tempdir().unwrap();
    write(
        &project.path().join(".guidekit/overrides.md"),
        "---\nscope: language\nruleKey: x\nruleValue: 1\n---\n",
    );
    guidekit()
        .args(["resolve", "--guides"])
        .arg(guides.path())
        .arg("--project")
        .arg(project.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("guidekit resolve:"))
        .stderr(predicate::str::contains("overrides.md"));
}

#[test]
fn resolve_duplicate_catalog_key_is_fatal() {
    let guides = catalog();
    write(
        &guides.path().join("languages/golang.md"),
        "---\nname: golang\ndescription: d\ncategory: language\nlanguage: go\n---\n",
    );
    let project = tempdir().unwrap();
    guidekit()
        .args(["resolve", "--guides"])
        .arg(guides.path())
        .arg("--project")
        .arg(project.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("duplicate guide"));
}

#[test]
fn resolve_missing_catalog_is_fatal() {
    let dir = tempdir().unwrap();
    guidekit()
        .args(["resolve", "--guides"])
        .arg(dir.path().join("nope"))
        .arg("--project")
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("guide catalog not found"));
}

// ── load ────────────────────────────────────────────────────────────

#[test]
fn load_prints_bodies_in_order() {
    let guides = catalog();
    let project = tempdir().unwrap();
    write(&project.path().join("go.mod"), "module x\n");
    guidekit()
        .args(["load", "--guides"])
        .arg(guides.path())
        .arg("--project")
        .arg(project.path())
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "<!-- guide: core (universal) -->\nKeep functions short.\n\n<!-- guide: go (language) -->\nRun gofmt.\n",
        ))
        .stdout(predicate::str::contains("name: go").not());
}

#[test]
fn load_json_lists_contents() {
    let guides = catalog();
    let project = tempdir().unwrap();
    let output = guidekit()
        .args(["load", "--format", "json", "--guides"])
        .arg(guides.path())
        .arg("--project")
        .arg(project.path())
        .output()
        .unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["guides"][0]["id"], "core");
    assert_eq!(json["guides"][0]["content"], "Keep functions short.\n");
}

#[test]
fn load_missing_external_content_warns() {
    let guides = catalog();
    write(
        &guides.path().join("universal/extra.md"),
        "---\nname: extra\ndescription: d\ncategory: universal\ncontent: bodies/missing.md\n---\n",
    );
    let project = tempdir().unwrap();
    guidekit()
        .args(["load", "--guides"])
        .arg(guides.path())
        .arg("--project")
        .arg(project.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Keep functions short."))
        .stderr(predicate::str::contains("guide 'extra' is unavailable"));
}

// ── signals ─────────────────────────────────────────────────────────

#[test]
fn signals_lists_manifest_dependencies() {
    let guides = catalog();
    let project = tempdir().unwrap();
    write(
        &project.path().join("requirements.txt"),
        "# web\nfastapi>=0.110\nuvicorn[standard]==0.29\n",
    );
    guidekit()
        .args(["signals", "--guides"])
        .arg(guides.path())
        .arg("--project")
        .arg(project.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("manifest-key"))
        .stdout(predicate::str::contains("fastapi"))
        .stdout(predicate::str::contains("uvicorn"));
}

#[test]
fn signals_empty_project() {
    let guides = catalog();
    let project = tempdir().unwrap();
    guidekit()
        .args(["signals", "--guides"])
        .arg(guides.path())
        .arg("--project")
        .arg(project.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("No signals found."));
}

// ── catalog ─────────────────────────────────────────────────────────

#[test]
fn catalog_lists_guides() {
    let guides = catalog();
    guidekit()
        .args(["catalog", "--guides"])
        .arg(guides.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("7 guides"))
        .stdout(predicate::str::contains("nextjs (typescript)"))
        .stdout(predicate::str::contains("v2.1.0"));
}

#[test]
fn catalog_json() {
    let guides = catalog();
    let output = guidekit()
        .args(["catalog", "--format", "json", "--guides"])
        .arg(guides.path())
        .output()
        .unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json.as_array().unwrap().len(), 7);
    assert_eq!(json[0]["id"], "core");
    assert_eq!(json[0]["category"], "universal");
}

// ── validate ────────────────────────────────────────────────────────

#[test]
fn validate_clean_catalog() {
    let guides = catalog();
    guidekit()
        .arg("validate")
        .arg(guides.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("7 guides: 7 ok, 0 errors, 0 warnings only"));
}

#[test]
fn validate_single_file_ok() {
    let guides = catalog();
    guidekit()
        .arg("validate")
        .arg(guides.path().join("languages/go.md"))
        .assert()
        .success()
        .stderr(predicate::str::contains("ok"));
}

#[test]
fn validate_reports_errors_and_fails() {
    let dir = tempdir().unwrap();
    write(
        &dir.path().join("bad.md"),
        "---\nname: Bad--Name\ndescription: d\ncategory: framework\nlanguage: go\n---\n",
    );
    guidekit()
        .arg("validate")
        .arg(dir.path().join("bad.md"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("name contains uppercase characters"))
        .stderr(predicate::str::contains("framework guides require a `framework`"));
}

#[test]
fn validate_warnings_do_not_fail() {
    let dir = tempdir().unwrap();
    write(
        &dir.path().join("go.md"),
        "---\nname: go\ndescription: d\ncategory: language\nlanguage: go\nextensions: .go\nowner: me\n---\n",
    );
    guidekit()
        .arg("validate")
        .arg(dir.path().join("go.md"))
        .assert()
        .success()
        .stderr(predicate::str::contains("warning: extension '.go' has a leading dot"))
        .stderr(predicate::str::contains("warning: unexpected front-matter field: 'owner'"));
}

#[test]
fn validate_duplicate_keys_across_files() {
    let guides = catalog();
    write(
        &guides.path().join("languages/golang.md"),
        "---\nname: golang\ndescription: d\ncategory: language\nlanguage: go\n---\n",
    );
    guidekit()
        .arg("validate")
        .arg(guides.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("duplicate guide"));
}

#[test]
fn validate_json_output() {
    let guides = catalog();
    let output = guidekit()
        .args(["validate", "--format", "json"])
        .arg(guides.path().join("languages/go.md"))
        .output()
        .unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json[0]["diagnostics"].as_array().unwrap().len(), 0);
}

#[test]
fn validate_missing_path_fails() {
    let dir = tempdir().unwrap();
    guidekit()
        .arg("validate")
        .arg(dir.path().join("nope"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("guidekit validate:"));
}

// ── probe ───────────────────────────────────────────────────────────

#[test]
fn probe_ranks_matching_description_first() {
    let guides = catalog();
    guidekit()
        .args(["probe", "--guides"])
        .arg(guides.path())
        .args(["--query", "react components hooks"])
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"(?m)^Query: .*\n\nreact\s+framework\s+STRONG").unwrap())
        .stdout(predicate::str::contains("[selected by mention]"));
}

#[test]
fn probe_json() {
    let guides = catalog();
    let output = guidekit()
        .args(["probe", "--format", "json", "--guides"])
        .arg(guides.path())
        .args(["--query", "golang formatting"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["query"], "golang formatting");
    assert_eq!(json["results"][0]["id"], "go");
    assert_eq!(json["results"][0]["query_match"], "strong");
}
