//! `run --watch`: re-run whenever the root file or any of its imports changes.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;
use colored::Colorize;
use notify::{Event, EventKind, RecursiveMode, Watcher};

use super::run::run_once;
use crate::config::Config;
use crate::core::diagnostics::warn;
use crate::core::pipeline::PreparedProgram;
use crate::core::resolver::{normalize, CachingFsLoader, ResolveWarning};
use crate::debug_log;

const POLL: Duration = Duration::from_millis(200);
const SETTLE: Duration = Duration::from_millis(100);

/// Everything one run depended on, as absolute paths.
///
/// Imports that could not be read are watched through their directory so
/// that creating them triggers a rerun.
#[derive(Debug, Default, PartialEq)]
struct WatchSet {
    files: Vec<PathBuf>,
    missing: Vec<PathBuf>,
}

impl WatchSet {
    fn from_program(program: &PreparedProgram, base: &Path) -> Self {
        let files = program.files().into_iter().map(|p| absolute(p, base)).collect();
        let mut missing = Vec::new();
        for w in &program.warnings {
            if let ResolveWarning::Unreadable { path, .. } = w {
                let path = absolute(path, base);
                if !missing.contains(&path) {
                    missing.push(path);
                }
            }
        }
        Self { files, missing }
    }

    fn from_input(input: &Path, base: &Path) -> Self {
        Self {
            files: vec![absolute(input, base)],
            missing: Vec::new(),
        }
    }

    fn dirs(&self) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = Vec::new();
        for parent in self.missing.iter().filter_map(|p| p.parent()) {
            if !dirs.iter().any(|d| d == parent) {
                dirs.push(parent.to_path_buf());
            }
        }
        dirs
    }

    fn len(&self) -> usize {
        self.files.len() + self.missing.len()
    }

    fn is_relevant(&self, event: &Event, dirs: &[PathBuf]) -> bool {
        if !matches!(
            event.kind,
            EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_)
        ) {
            return false;
        }
        event.paths.iter().any(|p| {
            let p = normalize(p);
            let targeted = self.files.contains(&p) || self.missing.contains(&p);
            // Directory watches report every sibling; file watches only their file.
            let from_dir_watch = p.parent().map_or(false, |parent| dirs.iter().any(|d| d == parent));
            targeted || !from_dir_watch
        })
    }
}

fn absolute(path: &Path, base: &Path) -> PathBuf {
    normalize(&base.join(path))
}

pub fn main(input: &Path, cfg: &Config) -> Result<()> {
    let running = Arc::new(AtomicBool::new(true));
    {
        let running = running.clone();
        ctrlc::set_handler(move || running.store(false, Ordering::SeqCst))
            .context("installing Ctrl-C handler")?;
    }

    let once = std::env::var("SMLPREP_WATCH_ONCE").ok().as_deref() == Some("1");
    let base = std::env::current_dir().context("reading current directory")?;
    let mut loader = CachingFsLoader::new();

    loop {
        let watched = match run_once(input, &mut loader, cfg) {
            Ok(program) => WatchSet::from_program(&program, &base),
            Err(e) => {
                eprintln!("{} {e:#}", "error:".bright_red().bold());
                WatchSet::from_input(input, &base)
            }
        };
        let (hits, misses) = loader.stats();
        debug_log!("[watch] loader cache: {} hit(s), {} miss(es)", hits, misses);

        if once {
            break;
        }
        println!(
            "[watch] {} waiting for changes in {} file(s) (Ctrl-C to stop)",
            Local::now().format("%H:%M:%S"),
            watched.len()
        );
        if !wait_for_change(&watched, &running)? {
            break;
        }
        println!("[watch] detected change, rerunning...");
    }
    Ok(())
}

/// Block until something in `set` changes (`true`) or we are asked to stop (`false`).
fn wait_for_change(set: &WatchSet, running: &AtomicBool) -> Result<bool> {
    let (tx, rx) = mpsc::channel::<notify::Result<Event>>();
    let mut watcher = notify::recommended_watcher(tx).context("starting file watcher")?;
    let dirs = set.dirs();
    for p in set.files.iter().chain(&dirs) {
        if let Err(e) = watcher.watch(p, RecursiveMode::NonRecursive) {
            warn(&format!("cannot watch {}: {e}", p.display()));
        }
    }

    while running.load(Ordering::SeqCst) {
        match rx.recv_timeout(POLL) {
            Ok(Ok(event)) if set.is_relevant(&event, &dirs) => {
                // Editors often emit a burst of events per save.
                std::thread::sleep(SETTLE);
                while rx.try_recv().is_ok() {}
                return Ok(true);
            }
            Ok(Ok(_)) => {}
            Ok(Err(e)) => warn(&format!("watch error: {e}")),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => return Ok(false),
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::pipeline::{prepare, PipelineConfig};
    use crate::core::resolver::MemoryLoader;
    use notify::event::{AccessKind, CreateKind, DataChange, ModifyKind};

    fn program() -> PreparedProgram {
        let mut loader = MemoryLoader::new().with_file("/proj/lib/a.sml", "val a = 1;");
        let root = "(* @using \"lib/a.sml\" *)\n(* @using \"lib/missing.sml\" *)\nval r = a;";
        prepare(Path::new("/proj/main.sml"), root, &mut loader, &PipelineConfig::default())
    }

    fn event(kind: EventKind, path: &str) -> Event {
        Event::new(kind).add_path(PathBuf::from(path))
    }

    #[test]
    fn unreadable_imports_are_watched_through_their_directory() {
        let set = WatchSet::from_program(&program(), Path::new("/"));
        assert_eq!(
            set.files,
            vec![PathBuf::from("/proj/lib/a.sml"), PathBuf::from("/proj/main.sml")]
        );
        assert_eq!(set.missing, vec![PathBuf::from("/proj/lib/missing.sml")]);
        assert_eq!(set.dirs(), vec![PathBuf::from("/proj/lib")]);
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn creating_the_missing_import_is_relevant() {
        let set = WatchSet::from_program(&program(), Path::new("/"));
        let dirs = set.dirs();
        let created = || EventKind::Create(CreateKind::File);
        assert!(set.is_relevant(&event(created(), "/proj/lib/missing.sml"), &dirs));
        assert!(!set.is_relevant(&event(created(), "/proj/lib/unrelated.sml"), &dirs));

        let edited = || EventKind::Modify(ModifyKind::Data(DataChange::Content));
        assert!(set.is_relevant(&event(edited(), "/proj/main.sml"), &dirs));
        assert!(set.is_relevant(&event(edited(), "/proj/lib/a.sml"), &dirs));
        assert!(!set.is_relevant(&event(EventKind::Access(AccessKind::Any), "/proj/main.sml"), &dirs));
    }

    #[test]
    fn relative_input_is_made_absolute() {
        let set = WatchSet::from_input(Path::new("./src/../main.sml"), Path::new("/work"));
        assert_eq!(set.files, vec![PathBuf::from("/work/main.sml")]);
        assert!(set.dirs().is_empty());
    }
}
