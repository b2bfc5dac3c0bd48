use std::path::PathBuf;

use guidekit::{GuideDocument, GuideRegistry};

pub(crate) fn run(guides: PathBuf, format: super::Format) {
    let registry = super::load_registry(&guides).unwrap_or_else(|e| super::fail("catalog", e));
    match format {
        super::Format::Text => print!("{}", format_catalog(&registry)),
        super::Format::Json => {
            let entries: Vec<serde_json::Value> =
                registry.iter().map(|g| super::guide_json(g)).collect();
            println!("{}", serde_json::to_string_pretty(&entries).unwrap());
        }
    }
}

fn applies_to(doc: &GuideDocument) -> String {
    match (&doc.framework, &doc.language) {
        (Some(fw), Some(lang)) => format!("{fw} ({lang})"),
        (None, Some(lang)) => lang.clone(),
        _ => "*".to_string(),
    }
}

fn format_catalog(registry: &GuideRegistry) -> String {
    if registry.is_empty() {
        return "No guides found.\n".to_string();
    }
    let mut out = format!("{} guides\n\n", registry.len());
    for doc in registry.iter() {
        out.push_str(&format!(
            "{:<10} {:<24} {:<24} v{}\n",
            doc.category,
            doc.id,
            applies_to(doc),
            doc.version
        ));
    }
    out
}
