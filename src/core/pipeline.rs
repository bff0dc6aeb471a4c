//! Source preparation: imports, comment stripping, statement segmentation.
//!
//! The program handed to the evaluator is
//! `preload` + imported units (deepest first) + root text, joined with
//! newlines, stripped of comments and split into statements.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::core::resolver::{self, ResolveOptions, ResolveWarning, SourceLoader, SourceUnit};
use crate::core::scanner::{scan, Segments, Statements};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineConfig {
    /// Source evaluated before any user code; empty means none.
    pub preload: String,
    pub resolve: ResolveOptions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnbalancedKind {
    Comment,
    String,
}

/// An unterminated comment or string found in one of the program's files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unbalanced {
    pub path: PathBuf,
    pub offset: usize,
    pub kind: UnbalancedKind,
}

#[derive(Debug, Clone)]
pub struct PreparedProgram {
    pub root: PathBuf,
    pub root_content: String,
    pub units: Vec<SourceUnit>,
    pub warnings: Vec<ResolveWarning>,
    /// Concatenated text, comments included.
    pub source: String,
    pub segments: Segments,
}

impl PreparedProgram {
    pub fn statements(&self) -> Statements<'_> {
        self.segments.iter()
    }

    /// The linearised program, one statement per line.
    pub fn bundle_text(&self) -> String {
        let mut out = String::new();
        for stmt in self.statements() {
            out.push_str(&stmt);
            out.push('\n');
        }
        out
    }

    /// Root plus every imported file, each once, in evaluation order.
    pub fn files(&self) -> Vec<&Path> {
        let mut files: Vec<&Path> = Vec::with_capacity(self.units.len() + 1);
        for unit in &self.units {
            if !files.contains(&unit.path.as_path()) {
                files.push(&unit.path);
            }
        }
        files.push(&self.root);
        files
    }

    /// Per-file scan for comments or strings left open at end of file.
    pub fn unbalanced(&self, cfg: &PipelineConfig) -> Vec<Unbalanced> {
        let units = self.units.iter().map(|u| (u.path.as_path(), u.content.as_str()));
        let all = units.chain(std::iter::once((self.root.as_path(), self.root_content.as_str())));

        let mut found = Vec::new();
        for (path, text) in all {
            let summary = scan(text, &cfg.resolve.scan);
            if let Some(offset) = summary.unclosed_comment {
                found.push(Unbalanced { path: path.to_path_buf(), offset, kind: UnbalancedKind::Comment });
            }
            if let Some(offset) = summary.unclosed_string {
                found.push(Unbalanced { path: path.to_path_buf(), offset, kind: UnbalancedKind::String });
            }
        }
        found.dedup();
        found
    }
}

/// Concatenate preload, resolved units (already ordered) and root text.
pub fn assemble(preload: &str, units: &[SourceUnit], root_content: &str) -> String {
    let mut parts: Vec<&str> = Vec::with_capacity(units.len() + 2);
    if !preload.trim().is_empty() {
        parts.push(preload);
    }
    parts.extend(units.iter().map(|u| u.content.as_str()));
    parts.push(root_content);
    parts.join("\n")
}

pub fn prepare<L: SourceLoader + ?Sized>(
    root_path: &Path,
    root_content: &str,
    loader: &mut L,
    cfg: &PipelineConfig,
) -> PreparedProgram {
    let resolution = resolver::resolve(root_path, root_content, loader, &cfg.resolve);
    let source = assemble(&cfg.preload, &resolution.units, root_content);
    let segments = Segments::with_options(&source, &cfg.resolve.scan);

    PreparedProgram {
        root: resolver::normalize(root_path),
        root_content: root_content.to_string(),
        units: resolution.units,
        warnings: resolution.warnings,
        source,
        segments,
    }
}

/// Read the root file from disk and prepare it. Only the root read can fail.
pub fn prepare_file<L: SourceLoader + ?Sized>(
    root_path: &Path,
    loader: &mut L,
    cfg: &PipelineConfig,
) -> Result<PreparedProgram> {
    let root_content = fs::read_to_string(root_path)
        .with_context(|| format!("reading {}", root_path.display()))?;
    Ok(prepare(root_path, &root_content, loader, cfg))
}
