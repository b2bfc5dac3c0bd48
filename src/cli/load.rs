use guidekit::{render, GuideLoader};

use super::ProjectArgs;

pub(crate) fn run(args: ProjectArgs, format: super::Format) {
    let registry = super::load_registry(&args.guides).unwrap_or_else(|e| super::fail("load", e));
    let pass = super::resolve_pass(&registry, &args).unwrap_or_else(|e| super::fail("load", e));

    let mut loader = GuideLoader::new();
    let output = loader.load(&pass.result);

    super::print_diagnostics(&pass.extraction.diagnostics);
    super::print_diagnostics(&pass.result.diagnostics);
    match format {
        super::Format::Text => {
            print!("{}", render(&output));
            super::print_diagnostics(&output.diagnostics);
        }
        super::Format::Json => {
            let guides: Vec<serde_json::Value> = output
                .guides
                .iter()
                .map(|g| {
                    serde_json::json!({
                        "id": g.id,
                        "category": g.category,
                        "content": &*g.content,
                    })
                })
                .collect();
            let json = serde_json::json!({
                "guides": guides,
                "diagnostics": output.diagnostics,
            });
            println!("{}", serde_json::to_string_pretty(&json).unwrap());
        }
    }
}
