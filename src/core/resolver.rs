//! Recursive `@using` import resolution.
//!
//! Starting from a root file, directives are extracted (see
//! [`crate::core::scanner::extract_directives`]), resolved against the
//! directory of the file they appear in, loaded, and walked depth-first.
//! Every discovered unit is tagged with the number of directive hops from
//! the root. The final list is stably sorted deepest-first so that
//! transitive prerequisites are evaluated before their importers.
//!
//! Resolution never fails: unreadable imports and import cycles become
//! [`ResolveWarning`]s and their subtrees are skipped.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

use crate::core::scanner::{extract_directives_with, ScanOptions};

/// A loaded file tagged with its discovery depth (root = 0).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUnit {
    pub path: PathBuf,
    pub content: String,
    pub depth: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveWarning {
    Unreadable { path: PathBuf, importer: PathBuf, reason: String },
    Cycle { path: PathBuf, importer: PathBuf },
}

impl ResolveWarning {
    pub fn path(&self) -> &Path {
        match self {
            ResolveWarning::Unreadable { path, .. } | ResolveWarning::Cycle { path, .. } => path,
        }
    }
}

impl fmt::Display for ResolveWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveWarning::Unreadable { path, importer, reason } => write!(
                f,
                "cannot read '{}' (imported from '{}'): {}",
                path.display(),
                importer.display(),
                reason
            ),
            ResolveWarning::Cycle { path, importer } => write!(
                f,
                "import cycle: '{}' is already being resolved (imported from '{}')",
                path.display(),
                importer.display()
            ),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    /// Imported units (depth >= 1), deepest first.
    pub units: Vec<SourceUnit>,
    pub warnings: Vec<ResolveWarning>,
}

impl Resolution {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolveOptions {
    pub scan: ScanOptions,
    /// Keep only the first (deepest) record of a path reached more than once.
    pub dedupe: bool,
}

/// Where imported source text comes from.
pub trait SourceLoader {
    fn load(&mut self, path: &Path) -> io::Result<String>;
}

impl<L: SourceLoader + ?Sized> SourceLoader for &mut L {
    fn load(&mut self, path: &Path) -> io::Result<String> {
        (**self).load(path)
    }
}

/// Reads straight from disk on every call.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsLoader;

impl SourceLoader for FsLoader {
    fn load(&mut self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }
}

/// In-memory file table, keyed by normalized path.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    files: HashMap<PathBuf, String>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl AsRef<Path>, content: impl Into<String>) -> Self {
        self.insert(path, content);
        self
    }

    pub fn insert(&mut self, path: impl AsRef<Path>, content: impl Into<String>) {
        self.files.insert(normalize(path.as_ref()), content.into());
    }
}

impl SourceLoader for MemoryLoader {
    fn load(&mut self, path: &Path) -> io::Result<String> {
        self.files.get(&normalize(path)).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("no such file: {}", path.display()))
        })
    }
}

/// Filesystem loader that reuses file contents while their modification
/// time is unchanged. Meant to wrap repeated resolutions (watch mode); the
/// resolver itself never caches.
#[derive(Debug, Default)]
pub struct CachingFsLoader {
    entries: HashMap<PathBuf, (SystemTime, String)>,
    hits: usize,
    misses: usize,
}

impl CachingFsLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> (usize, usize) {
        (self.hits, self.misses)
    }
}

impl SourceLoader for CachingFsLoader {
    fn load(&mut self, path: &Path) -> io::Result<String> {
        let mtime = fs::metadata(path)?.modified()?;
        if let Some((seen, text)) = self.entries.get(path) {
            if *seen == mtime {
                self.hits += 1;
                return Ok(text.clone());
            }
        }
        let text = fs::read_to_string(path)?;
        self.misses += 1;
        self.entries.insert(path.to_path_buf(), (mtime, text.clone()));
        Ok(text)
    }
}

/// Lexically collapse `.` and `..` segments. No filesystem access.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                // `/..` is `/`
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Resolve a directive fragment against the file it was found in.
///
/// Returns `None` when the fragment does not name a file.
pub fn resolve_directive(importer: &Path, fragment: &str) -> Option<PathBuf> {
    let base = importer.parent().unwrap_or_else(|| Path::new(""));
    let path = normalize(&base.join(fragment));
    match path.components().next_back() {
        Some(Component::Normal(_)) => Some(path),
        _ => None,
    }
}

struct Walk<'a, L: ?Sized> {
    loader: &'a mut L,
    opts: &'a ResolveOptions,
    /// Paths on the current DFS branch, root included.
    active: Vec<PathBuf>,
    out: Resolution,
}

impl<L: SourceLoader + ?Sized> Walk<'_, L> {
    fn visit(&mut self, importer: &Path, content: &str, depth: usize) {
        let directives = extract_directives_with(content, &self.opts.scan.markers);
        for fragment in directives {
            let Some(path) = resolve_directive(importer, &fragment) else {
                debug_log!("[resolver] ignoring directive '{}' in {}", fragment, importer.display());
                continue;
            };

            if self.active.contains(&path) {
                debug_log!("[resolver] cycle: {} -> {}", importer.display(), path.display());
                self.out.warnings.push(ResolveWarning::Cycle {
                    path,
                    importer: importer.to_path_buf(),
                });
                continue;
            }

            let text = match self.loader.load(&path) {
                Ok(t) => t,
                Err(e) => {
                    debug_log!("[resolver] cannot load {}: {}", path.display(), e);
                    self.out.warnings.push(ResolveWarning::Unreadable {
                        path,
                        importer: importer.to_path_buf(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            debug_log!("[resolver] depth {}: {}", depth + 1, path.display());
            self.out.units.push(SourceUnit {
                path: path.clone(),
                content: text.clone(),
                depth: depth + 1,
            });

            self.active.push(path.clone());
            self.visit(&path, &text, depth + 1);
            self.active.pop();
        }
    }
}

/// Discover every unit imported (transitively) by `root_content`.
///
/// The returned units are ordered deepest-first; units at equal depth keep
/// their discovery order. The root itself is never part of the result.
pub fn resolve<L: SourceLoader + ?Sized>(
    root_path: &Path,
    root_content: &str,
    loader: &mut L,
    opts: &ResolveOptions,
) -> Resolution {
    let root = normalize(root_path);
    let mut walk = Walk {
        loader,
        opts,
        active: vec![root.clone()],
        out: Resolution::default(),
    };
    walk.visit(&root, root_content, 0);

    let mut out = walk.out;
    // `sort_by` is stable.
    out.units.sort_by(|a, b| b.depth.cmp(&a.depth));
    if opts.dedupe {
        let mut seen = HashSet::new();
        out.units.retain(|u| seen.insert(u.path.clone()));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn depths(res: &Resolution) -> Vec<(String, usize)> {
        res.units
            .iter()
            .map(|u| (u.path.display().to_string(), u.depth))
            .collect()
    }

    #[test]
    fn normalize_collapses_dots() {
        assert_eq!(normalize(Path::new("dir/./sub/../a.sml")), PathBuf::from("dir/a.sml"));
        assert_eq!(normalize(Path::new("../x/../../y.sml")), PathBuf::from("../../y.sml"));
        assert_eq!(normalize(Path::new("/../a.sml")), PathBuf::from("/a.sml"));
    }

    #[test]
    fn directive_resolves_against_importer_dir() {
        assert_eq!(
            resolve_directive(Path::new("dir/root.sml"), "sub/a.sml"),
            Some(PathBuf::from("dir/sub/a.sml"))
        );
        assert_eq!(
            resolve_directive(Path::new("dir/root.sml"), "../lib/helpers.sml"),
            Some(PathBuf::from("lib/helpers.sml"))
        );
        assert_eq!(resolve_directive(Path::new("root.sml"), "."), None);
        assert_eq!(resolve_directive(Path::new("dir/root.sml"), ".."), None);
    }

    #[test]
    fn chain_is_deepest_first() {
        let mut loader = MemoryLoader::new()
            .with_file("a.sml", "(* @using \"b.sml\" *)\nval a = b;")
            .with_file("b.sml", "val b = 1;");
        let res = resolve(
            Path::new("root.sml"),
            "(* @using \"a.sml\" *)",
            &mut loader,
            &ResolveOptions::default(),
        );
        assert_eq!(depths(&res), vec![("b.sml".into(), 2), ("a.sml".into(), 1)]);
        assert!(res.is_clean());
    }

    #[test]
    fn siblings_keep_discovery_order() {
        let mut loader = MemoryLoader::new()
            .with_file("a.sml", "val a = 1;")
            .with_file("b.sml", "val b = 2;");
        let root = "(* @using \"a.sml\" *)\n(* @using \"b.sml\" *)";
        let res = resolve(Path::new("root.sml"), root, &mut loader, &ResolveOptions::default());
        assert_eq!(depths(&res), vec![("a.sml".into(), 1), ("b.sml".into(), 1)]);
    }

    #[test]
    fn diamond_reincludes_unless_deduped() {
        let files = MemoryLoader::new()
            .with_file("a.sml", "(* @using \"c.sml\" *)")
            .with_file("b.sml", "(* @using \"c.sml\" *)")
            .with_file("c.sml", "val c = 0;");
        let root = "(* @using \"a.sml\" *)\n(* @using \"b.sml\" *)";

        let res = resolve(Path::new("root.sml"), root, &mut files.clone(), &ResolveOptions::default());
        assert_eq!(
            depths(&res),
            vec![
                ("c.sml".into(), 2),
                ("c.sml".into(), 2),
                ("a.sml".into(), 1),
                ("b.sml".into(), 1)
            ]
        );

        let opts = ResolveOptions { dedupe: true, ..ResolveOptions::default() };
        let res = resolve(Path::new("root.sml"), root, &mut files.clone(), &opts);
        assert_eq!(
            depths(&res),
            vec![("c.sml".into(), 2), ("a.sml".into(), 1), ("b.sml".into(), 1)]
        );
    }

    #[test]
    fn cycles_are_cut_and_reported() {
        let mut loader = MemoryLoader::new()
            .with_file("a.sml", "(* @using \"b.sml\" *)")
            .with_file("b.sml", "(* @using \"a.sml\" *)\n(* @using \"root.sml\" *)");
        let res = resolve(
            Path::new("root.sml"),
            "(* @using \"a.sml\" *)",
            &mut loader,
            &ResolveOptions::default(),
        );
        assert_eq!(depths(&res), vec![("b.sml".into(), 2), ("a.sml".into(), 1)]);
        assert_eq!(res.warnings.len(), 2);
        assert!(res.warnings.iter().all(|w| matches!(w, ResolveWarning::Cycle { .. })));
    }

    #[test]
    fn missing_import_is_a_warning() {
        let mut loader = MemoryLoader::new();
        let res = resolve(
            Path::new("dir/root.sml"),
            "(* @using \"nope.sml\" *)",
            &mut loader,
            &ResolveOptions::default(),
        );
        assert!(res.units.is_empty());
        assert_eq!(res.warnings.len(), 1);
        assert_eq!(res.warnings[0].path(), Path::new("dir/nope.sml"));
    }
}
