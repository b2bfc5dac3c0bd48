use std::fmt::Display;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use guidekit::diagnostics::Diagnostic;
use guidekit::{
    default_override_path, extract_signals, load_override_file, resolve_with, ExtractRequest,
    Extraction, GuideDocument, GuideError, GuideRegistry, OverrideSet, ResolutionResult,
    ResolverConfig, DEFAULT_MAX_FRAMEWORKS,
};

mod catalog;
mod load;
mod probe;
mod resolve;
mod signals;
mod validate;
#[cfg(feature = "watch")]
mod watch;

#[derive(Parser)]
#[command(
    name = "guidekit",
    version,
    about = "Resolve and load coding-assistant guides for a project"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Show project information
    #[arg(long)]
    about: bool,

    /// Enable debug logging
    #[arg(long, short, global = true)]
    pub verbose: bool,
}

/// Output format.
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum Format {
    /// Human-readable text output (default)
    #[default]
    Text,
    /// JSON output
    Json,
}

/// Inputs shared by the commands that resolve a project.
#[derive(Debug, Clone, Args)]
struct ProjectArgs {
    /// Directory holding the guide catalog
    #[arg(long, default_value = "guides")]
    guides: PathBuf,
    /// Project root to scan
    #[arg(long, default_value = ".")]
    project: PathBuf,
    /// File currently being edited (absolute or relative to the project)
    #[arg(long)]
    file: Option<PathBuf>,
    /// Free-text request that may name languages or frameworks
    #[arg(long, short)]
    query: Option<String>,
    /// Override file [default: <project>/.guidekit/overrides.md]
    #[arg(long)]
    overrides: Option<PathBuf>,
    /// Maximum number of framework guides to load
    #[arg(long, default_value_t = DEFAULT_MAX_FRAMEWORKS)]
    max_frameworks: usize,
}

impl ProjectArgs {
    fn override_path(&self) -> PathBuf {
        self.overrides
            .clone()
            .unwrap_or_else(|| default_override_path(&self.project))
    }
}

#[derive(Subcommand)]
#[command(next_display_order = None)]
enum Commands {
    /// Resolve which guides apply to a project
    Resolve {
        #[command(flatten)]
        project: ProjectArgs,
        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
        /// Watch project configuration and re-resolve (requires 'watch' feature)
        #[arg(long)]
        watch: bool,
    },
    /// Resolve and print the content of the selected guides
    Load {
        #[command(flatten)]
        project: ProjectArgs,
        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// Print the signals extracted from a project
    Signals {
        #[command(flatten)]
        project: ProjectArgs,
        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// List the guides in the catalog
    #[command(alias = "ls")]
    Catalog {
        /// Directory holding the guide catalog
        #[arg(long, default_value = "guides")]
        guides: PathBuf,
        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// Check guide front-matter quality
    Validate {
        /// Guide files or catalog directories [default: guides]
        #[arg(default_value = "guides")]
        paths: Vec<PathBuf>,
        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// Score a sample query against guide descriptions
    Probe {
        /// Directory holding the guide catalog
        #[arg(long, default_value = "guides")]
        guides: PathBuf,
        /// Sample user query
        #[arg(long, short)]
        query: String,
        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
}

pub fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("guidekit=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("guidekit=info"))
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

pub fn run(cli: Cli) {
    if cli.about {
        print_about();
        return;
    }

    match cli.command {
        Some(Commands::Resolve {
            project,
            format,
            watch,
        }) => resolve::run(project, format, watch),
        Some(Commands::Load { project, format }) => load::run(project, format),
        Some(Commands::Signals { project, format }) => signals::run(project, format),
        Some(Commands::Catalog { guides, format }) => catalog::run(guides, format),
        Some(Commands::Validate { paths, format }) => validate::run(paths, format),
        Some(Commands::Probe {
            guides,
            query,
            format,
        }) => probe::run(guides, query, format),
        None => {
            eprintln!("Usage: guidekit <command> [args]");
            eprintln!("Run `guidekit --help` for details.");
            std::process::exit(1);
        }
    }
}

fn print_about() {
    println!(
        "guidekit: coding-assistant guide resolver\n\
         ├─ version:    {}\n\
         ├─ author:     {}\n\
         ├─ source:     {}\n\
         └─ licence:    {} https://www.apache.org/licenses/LICENSE-2.0",
        env!("CARGO_PKG_VERSION"),
        env!("CARGO_PKG_AUTHORS"),
        env!("CARGO_PKG_REPOSITORY"),
        env!("CARGO_PKG_LICENSE"),
    );
}

/// Print a fatal error for `command` and exit with status 1.
fn fail(command: &str, error: impl Display) -> ! {
    eprintln!("guidekit {command}: {error}");
    std::process::exit(1);
}

/// Build the catalog, refusing a missing directory.
fn load_registry(guides: &Path) -> guidekit::Result<GuideRegistry> {
    if !guides.exists() {
        return Err(GuideError::InvalidGuide {
            path: guides.to_path_buf(),
            message: "guide catalog not found".into(),
        });
    }
    GuideRegistry::from_dir(guides)
}

/// Everything one resolution pass produces.
struct Pass {
    extraction: Extraction,
    overrides: OverrideSet,
    result: ResolutionResult,
}

/// One resolution pass against an already-built catalog: re-read overrides,
/// extract signals, resolve.
fn resolve_pass(registry: &GuideRegistry, args: &ProjectArgs) -> guidekit::Result<Pass> {
    let overrides = load_override_file(&args.override_path())?;
    let mut request = ExtractRequest::new(&args.project);
    if let Some(file) = &args.file {
        request = request.with_file(file);
    }
    if let Some(text) = &args.query {
        request = request.with_text(text);
    }
    let extraction = extract_signals(&request, registry);
    let config = ResolverConfig {
        max_frameworks: args.max_frameworks,
    };
    let result = resolve_with(registry, &extraction.signals, &overrides, &config);
    Ok(Pass {
        extraction,
        overrides,
        result,
    })
}

/// Print diagnostics to stderr, one per line.
fn print_diagnostics(diags: &[Diagnostic]) {
    for d in diags {
        eprintln!("{d}");
    }
}

/// JSON summary of a guide document.
fn guide_json(doc: &GuideDocument) -> serde_json::Value {
    serde_json::json!({
        "id": doc.id,
        "category": doc.category,
        "language": doc.language,
        "framework": doc.framework,
        "version": doc.version,
        "description": doc.description,
        "source": doc.content.path().map(|p| p.display().to_string()),
    })
}

/// Render a rule value on one line.
fn rule_value_text(value: &serde_yaml_ng::Value) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("{value:?}"))
}
