// src/core/diagnostics.rs
//! Pretty, colored, file+line diagnostics.

use std::path::Path;

use colored::Colorize;

use crate::core::pipeline::{Unbalanced, UnbalancedKind};
use crate::core::resolver::ResolveWarning;

pub struct Span {
    pub line: usize,
    pub col: usize,
    pub len: usize, // underline length (use 1 if unknown)
}

impl Span {
    /// 1-based line/column of a byte offset.
    pub fn at_offset(source: &str, offset: usize, len: usize) -> Self {
        let offset = offset.min(source.len());
        let before = &source.as_bytes()[..offset];
        let line = before.iter().filter(|&&b| b == b'\n').count() + 1;
        let line_start = before.iter().rposition(|&b| b == b'\n').map(|i| i + 1).unwrap_or(0);
        let col = String::from_utf8_lossy(&before[line_start..]).chars().count() + 1;
        Self { line, col, len }
    }
}

pub fn warn(message: &str) {
    eprintln!("{} {}", "warn:".yellow().bold(), message);
}

pub fn warn_resolve(w: &ResolveWarning) {
    warn(&w.to_string());
}

pub fn print_warning(filename: &str, source: &str, title: &str, span: Span) {
    print_diagnostic("warn:".yellow().bold().to_string(), filename, source, title, span);
}

fn print_diagnostic(level: String, filename: &str, source: &str, title: &str, span: Span) {
    eprintln!("{} {}", level, title.bright_white());
    let (ln, col) = (span.line, span.col);
    let line_text = nth_line(source, ln).unwrap_or_default();

    // line number gutter
    let ln_str = format!("{:>4}", ln);
    eprintln!("{} {}", "-->".bright_blue(), format!("{}:{}:{}", filename, ln, col).bright_white());
    eprintln!(" {} {}", ln_str.dimmed(), "|".dimmed());
    eprintln!("{} {} {}", ln_str.dimmed(), "|".dimmed(), line_text);

    // underline with ^^^^^
    let underline = " ".repeat(col.saturating_sub(1)) + &"^".repeat(span.len.max(1));
    eprintln!(
        " {} {} {}",
        " ".repeat(ln_str.len()).dimmed(),
        "|".dimmed(),
        underline.bright_red()
    );
    eprintln!();
}

/// Point at an unterminated comment or string in `source`.
pub fn warn_unbalanced(item: &Unbalanced, source: &str) {
    let (title, len) = match item.kind {
        UnbalancedKind::Comment => ("unterminated comment; the rest of the file is commented out", 2),
        UnbalancedKind::String => ("unterminated string literal", 1),
    };
    print_warning(&display(&item.path), source, title, Span::at_offset(source, item.offset, len));
}

fn display(path: &Path) -> String {
    path.display().to_string()
}

fn nth_line(src: &str, n: usize) -> Option<String> {
    src.lines().nth(n.saturating_sub(1)).map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_maps_to_line_and_column() {
        let src = "val a = 1;\nval b = (* x";
        let span = Span::at_offset(src, 19, 2);
        assert_eq!((span.line, span.col, span.len), (2, 9, 2));
        let span = Span::at_offset(src, 0, 1);
        assert_eq!((span.line, span.col), (1, 1));
    }
}
