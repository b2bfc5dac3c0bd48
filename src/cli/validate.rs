use std::path::PathBuf;

use guidekit::diagnostics::{Diagnostic, Severity, E000};
use guidekit::{discover_guides, read_guide, validate_guide, GuideRegistry};

pub(crate) fn run(paths: Vec<PathBuf>, format: super::Format) {
    let mut files = Vec::new();
    for path in &paths {
        if !path.exists() {
            super::fail("validate", format!("{}: no such file or directory", path.display()));
        }
        let (found, warnings) = discover_guides(path);
        for w in &warnings {
            eprintln!("warning: {}: {}", w.path.display(), w.message);
        }
        files.extend(found);
    }
    if files.is_empty() {
        eprintln!("No guide files found under the specified path(s).");
        std::process::exit(1);
    }

    // Per-file front-matter checks, then catalog-wide key uniqueness.
    let mut registry = GuideRegistry::new();
    let mut all_diags: Vec<(PathBuf, Vec<Diagnostic>)> = Vec::new();
    for file in &files {
        let mut diags = validate_guide(file);
        if !diags.iter().any(|d| d.is_error()) {
            let registered = read_guide(file).and_then(|doc| registry.register(doc));
            if let Err(e) = registered {
                diags.push(Diagnostic::new(Severity::Error, E000, e.to_string()));
            }
        }
        all_diags.push((file.clone(), diags));
    }

    let has_errors = all_diags
        .iter()
        .any(|(_, d)| d.iter().any(|d| d.is_error()));

    match format {
        super::Format::Text => {
            let multi = all_diags.len() > 1;
            for (file, diags) in &all_diags {
                if multi && !diags.is_empty() {
                    eprintln!("{}:", file.display());
                }
                for d in diags {
                    if multi {
                        eprintln!("  {d}");
                    } else {
                        eprintln!("{d}");
                    }
                }
            }
            if multi {
                let total = all_diags.len();
                let errors = all_diags
                    .iter()
                    .filter(|(_, d)| d.iter().any(|d| d.is_error()))
                    .count();
                let warnings = all_diags
                    .iter()
                    .filter(|(_, d)| {
                        d.iter().any(|d| d.is_warning()) && !d.iter().any(|d| d.is_error())
                    })
                    .count();
                let ok = total - errors - warnings;
                eprintln!("\n{total} guides: {ok} ok, {errors} errors, {warnings} warnings only");
            } else if all_diags.iter().all(|(_, d)| d.is_empty()) {
                eprintln!("ok");
            }
        }
        super::Format::Json => {
            let entries: Vec<serde_json::Value> = all_diags
                .iter()
                .map(|(file, diags)| {
                    serde_json::json!({
                        "path": file.display().to_string(),
                        "diagnostics": diags,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&entries).unwrap());
        }
    }

    if has_errors {
        std::process::exit(1);
    }
}
