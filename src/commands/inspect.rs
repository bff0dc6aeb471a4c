//! Single-file debug views: no imports, no evaluation.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;

use crate::config::Config;
use crate::core::diagnostics::warn_unbalanced;
use crate::core::pipeline::{Unbalanced, UnbalancedKind};
use crate::core::scanner::{scan, strip_comments_with, Segments};

fn read(input: &Path) -> Result<String> {
    fs::read_to_string(input).with_context(|| format!("reading {}", input.display()))
}

fn warn_open_state(input: &Path, source: &str, cfg: &Config) {
    let summary = scan(source, &cfg.pipeline().resolve.scan);
    let open = [
        summary.unclosed_comment.map(|o| (o, UnbalancedKind::Comment)),
        summary.unclosed_string.map(|o| (o, UnbalancedKind::String)),
    ];
    for (offset, kind) in open.into_iter().flatten() {
        let item = Unbalanced { path: input.to_path_buf(), offset, kind };
        warn_unbalanced(&item, source);
    }
}

pub fn strip(input: &Path, cfg: &Config) -> Result<()> {
    let source = read(input)?;
    warn_open_state(input, &source, cfg);
    print!("{}", strip_comments_with(&source, &cfg.pipeline().resolve.scan));
    Ok(())
}

pub fn statements(input: &Path, cfg: &Config) -> Result<()> {
    let source = read(input)?;
    warn_open_state(input, &source, cfg);
    let segments = Segments::with_options(&source, &cfg.pipeline().resolve.scan);
    for (i, stmt) in segments.iter().enumerate() {
        println!("{} {}", format!("[{}]", i + 1).dimmed(), stmt);
    }
    Ok(())
}
