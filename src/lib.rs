pub mod diagnostics;
pub mod errors;
pub(crate) mod fs_util;
pub mod loader;
pub mod manifest;
pub mod models;
pub mod overrides;
pub mod parser;
pub mod probe;
pub mod registry;
pub mod resolver;
pub mod signals;
pub mod validator;

// Re-export key types at crate root for convenience.
pub use errors::{GuideError, Result};
pub use models::{
    Category, ContentSource, GuideDocument, GuideKey, GuideProperties, RuleScope, PROJECT_GUIDE_ID,
};
pub use parser::{parse_frontmatter, read_guide};
pub use validator::{validate_guide, validate_metadata};

pub use loader::{render, GuideLoader, LoadOutput, LoadedGuide};
pub use overrides::{
    default_override_path, load_override_file, load_overrides, OverrideRule, OverrideSet,
};
pub use probe::{probe, ProbeResult, QueryMatch};
pub use registry::{discover_guides, DiscoveryWarning, GuideRegistry};
pub use resolver::{
    resolve, resolve_with, EffectiveRule, ResolutionResult, ResolverConfig, RuleOrigin,
    DEFAULT_MAX_FRAMEWORKS,
};
pub use signals::{
    extract_signals, Confidence, ExtractRequest, Extraction, Signal, SignalKind, SignalSet,
};
