use guidekit::{GuideRegistry, ResolutionResult, RuleOrigin};

use super::{Pass, ProjectArgs};

pub(crate) fn run(args: ProjectArgs, format: super::Format, watch: bool) {
    #[cfg(feature = "watch")]
    if watch {
        super::watch::run_watch_mode(&args, format);
        return;
    }
    #[cfg(not(feature = "watch"))]
    if watch {
        eprintln!(
            "Watch mode requires the 'watch' feature. Rebuild with: cargo build --features watch"
        );
        std::process::exit(1);
    }

    let registry =
        super::load_registry(&args.guides).unwrap_or_else(|e| super::fail("resolve", e));
    let pass =
        super::resolve_pass(&registry, &args).unwrap_or_else(|e| super::fail("resolve", e));
    print_pass(&registry, &pass, format);
}

/// Print one resolution pass (also used by watch mode).
pub(crate) fn print_pass(registry: &GuideRegistry, pass: &Pass, format: super::Format) {
    let result = &pass.result;
    match format {
        super::Format::Text => {
            print!("{}", format_result(result));
            if let Some(source) = &pass.overrides.source {
                println!("\nOverrides: {}", source.display());
            }
            super::print_diagnostics(&pass.extraction.diagnostics);
            super::print_diagnostics(&result.diagnostics);
            tracing::debug!(catalog = registry.len(), "resolution printed");
        }
        super::Format::Json => {
            let rules: Vec<serde_json::Value> = result
                .effective_rules()
                .iter()
                .flat_map(|(scope, rules)| {
                    rules.iter().map(move |(key, rule)| {
                        serde_json::json!({
                            "scope": scope.to_string(),
                            "key": key,
                            "value": rule.value,
                            "origin": rule.origin,
                        })
                    })
                })
                .collect();
            let json = serde_json::json!({
                "guides": result.guides.iter().map(|g| super::guide_json(g)).collect::<Vec<_>>(),
                "signals": pass.extraction.signals,
                "effective_rules": rules,
                "applied_overrides": result.applied_overrides,
                "diagnostics": pass
                    .extraction
                    .diagnostics
                    .iter()
                    .chain(&result.diagnostics)
                    .collect::<Vec<_>>(),
                "catalog_size": registry.len(),
            });
            println!("{}", serde_json::to_string_pretty(&json).unwrap());
        }
    }
}

/// Format a resolution as human-readable text.
fn format_result(result: &ResolutionResult) -> String {
    let mut out = String::new();
    out.push_str("Guides:\n");
    if result.guides.is_empty() {
        out.push_str("  (none)\n");
    }
    for (i, guide) in result.guides.iter().enumerate() {
        out.push_str(&format!(
            "  {:>2}. {:<24} {}\n",
            i + 1,
            guide.id,
            guide.category
        ));
    }

    let rules = result.effective_rules();
    if rules.values().any(|r| !r.is_empty()) {
        out.push_str("\nEffective rules:\n");
        for (scope, entries) in rules {
            for (key, rule) in entries {
                let origin = match &rule.origin {
                    RuleOrigin::Guide(id) => format!("guide {id}"),
                    RuleOrigin::Override(path) => format!("override {}", path.display()),
                };
                out.push_str(&format!(
                    "  {scope} {key} = {}  ({origin})\n",
                    super::rule_value_text(&rule.value)
                ));
            }
        }
    }
    out
}
