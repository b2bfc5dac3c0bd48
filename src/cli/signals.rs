use guidekit::{extract_signals, ExtractRequest};

use super::ProjectArgs;

pub(crate) fn run(args: ProjectArgs, format: super::Format) {
    let registry =
        super::load_registry(&args.guides).unwrap_or_else(|e| super::fail("signals", e));

    let mut request = ExtractRequest::new(&args.project);
    if let Some(file) = &args.file {
        request = request.with_file(file);
    }
    if let Some(text) = &args.query {
        request = request.with_text(text);
    }
    let extraction = extract_signals(&request, &registry);

    match format {
        super::Format::Text => {
            if extraction.signals.is_empty() {
                println!("No signals found.");
            }
            for s in &extraction.signals {
                println!(
                    "{:<17} {:<24} {:<7} {}",
                    s.kind.as_str(),
                    s.value,
                    s.confidence.as_str(),
                    s.source
                );
            }
            super::print_diagnostics(&extraction.diagnostics);
        }
        super::Format::Json => {
            let json = serde_json::json!({
                "signals": extraction.signals,
                "manifests": extraction
                    .manifests
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>(),
                "diagnostics": extraction.diagnostics,
            });
            println!("{}", serde_json::to_string_pretty(&json).unwrap());
        }
    }
}
