use std::path::PathBuf;

use guidekit::probe::format_probe_results;

pub(crate) fn run(guides: PathBuf, query: String, format: super::Format) {
    let registry = super::load_registry(&guides).unwrap_or_else(|e| super::fail("probe", e));
    let results = guidekit::probe(&registry, &query);
    match format {
        super::Format::Text => print!("{}", format_probe_results(&query, &results)),
        super::Format::Json => {
            let json = serde_json::json!({
                "query": query,
                "results": results,
            });
            println!("{}", serde_json::to_string_pretty(&json).unwrap());
        }
    }
}
