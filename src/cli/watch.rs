use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use notify::{Config, RecommendedWatcher, RecursiveMode, Watcher};

use super::ProjectArgs;

/// Run watch mode: re-resolve whenever project configuration changes.
///
/// The catalog is built once; overrides, manifests and signals are re-read
/// on every pass. The watched directories are recomputed after each pass so
/// an override directory created later, or a manifest found through the
/// active file, is picked up.
pub(crate) fn run_watch_mode(args: &ProjectArgs, format: super::Format) {
    let registry =
        super::load_registry(&args.guides).unwrap_or_else(|e| super::fail("resolve", e));

    let (tx, rx) = mpsc::channel();
    let mut watcher = RecommendedWatcher::new(tx, Config::default()).unwrap_or_else(|e| {
        eprintln!("guidekit watch: failed to create watcher: {e}");
        std::process::exit(1);
    });
    let mut watched: BTreeSet<PathBuf> = BTreeSet::new();

    let manifests = run_pass(&registry, args, format);
    watch_new(&mut watcher, &mut watched, watch_dirs(args, &manifests));

    eprintln!("Watching for changes... (press Ctrl+C to stop)");

    let debounce = Duration::from_millis(500);
    let mut last_run = Instant::now();

    loop {
        match rx.recv() {
            Ok(_event) => {
                if last_run.elapsed() < debounce {
                    while rx.try_recv().is_ok() {}
                    continue;
                }

                // Clear terminal.
                eprint!("\x1b[2J\x1b[H");
                let manifests = run_pass(&registry, args, format);
                watch_new(&mut watcher, &mut watched, watch_dirs(args, &manifests));
                last_run = Instant::now();

                while rx.try_recv().is_ok() {}
            }
            Err(e) => {
                eprintln!("guidekit watch: watcher error: {e}");
                break;
            }
        }
    }
}

/// Directories whose changes can alter a resolution: the project root, the
/// nearest existing ancestor of the override file, and every directory a
/// manifest was read from.
fn watch_dirs(args: &ProjectArgs, manifests: &[PathBuf]) -> BTreeSet<PathBuf> {
    let mut dirs = BTreeSet::from([args.project.clone()]);
    if let Some(dir) = nearest_existing(&args.override_path()) {
        dirs.insert(dir);
    }
    dirs.extend(
        manifests
            .iter()
            .filter_map(|m| m.parent())
            .map(Path::to_path_buf),
    );
    dirs
}

/// Closest ancestor of `path` that exists on disk.
fn nearest_existing(path: &Path) -> Option<PathBuf> {
    path.ancestors()
        .skip(1)
        .find(|dir| dir.is_dir())
        .map(Path::to_path_buf)
}

fn watch_new(
    watcher: &mut RecommendedWatcher,
    watched: &mut BTreeSet<PathBuf>,
    dirs: BTreeSet<PathBuf>,
) {
    for dir in dirs {
        if watched.contains(&dir) {
            continue;
        }
        match watcher.watch(&dir, RecursiveMode::NonRecursive) {
            Ok(()) => {
                tracing::debug!(dir = %dir.display(), "watching");
                watched.insert(dir);
            }
            Err(e) => eprintln!("guidekit watch: failed to watch {}: {e}", dir.display()),
        }
    }
}

/// One pass; a broken override file is reported and the watch continues.
/// Returns the manifests read during the pass.
fn run_pass(
    registry: &guidekit::GuideRegistry,
    args: &ProjectArgs,
    format: super::Format,
) -> Vec<PathBuf> {
    match super::resolve_pass(registry, args) {
        Ok(pass) => {
            super::resolve::print_pass(registry, &pass, format);
            pass.extraction.manifests
        }
        Err(e) => {
            eprintln!("guidekit resolve: {e}");
            Vec::new()
        }
    }
}
