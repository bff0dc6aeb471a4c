//! Comment/string-aware scanning of SML source text.
//!
//! One left-to-right pass tracks three things: the comment nesting counter,
//! whether we sit inside a string literal, and where the current outermost
//! comment started. Everything else in this module (stripping, statement
//! segmentation) is derived from the [`ScanSummary`] that pass produces.
//!
//! Directive extraction is deliberately *not* span based; see
//! [`extract_directives`].

use std::ops::Range;

use serde::Deserialize;

/// Configurable source markers/delimiters for SML source text.
#[derive(Debug, Clone, PartialEq)]
pub struct Markers {
    pub comment_open: String,
    pub comment_close: String,
    pub quote: u8,
    pub escape: u8,
    pub terminator: u8,
    pub directive: String,
}

impl Default for Markers {
    fn default() -> Self {
        Self {
            comment_open: "(*".to_string(),
            comment_close: "*)".to_string(),
            quote: b'"',
            escape: b'\\',
            terminator: b';',
            directive: "@using".to_string(),
        }
    }
}

/// How a quote character decides whether it is escaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EscapeMode {
    /// Only the single byte before the quote is inspected.
    Lookback,
    /// Contiguous escape bytes before the quote are counted; odd means escaped.
    #[default]
    RunLength,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanOptions {
    pub markers: Markers,
    pub escape: EscapeMode,
}

/// Byte range `[start, end)` of one complete outermost block comment,
/// delimiters included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommentSpan {
    pub start: usize,
    pub end: usize,
}

/// Result of a single scan over a text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanSummary {
    /// Outermost complete comments, in text order.
    pub spans: Vec<CommentSpan>,
    /// Offsets of terminators seen at nesting 0 outside string literals.
    pub terminators: Vec<usize>,
    /// Start of an outermost comment that never closed.
    pub unclosed_comment: Option<usize>,
    /// Opening quote of a string literal that never closed.
    pub unclosed_string: Option<usize>,
}

impl ScanSummary {
    pub fn is_balanced(&self) -> bool {
        self.unclosed_comment.is_none() && self.unclosed_string.is_none()
    }
}

struct Scanner<'a> {
    bytes: &'a [u8],
    opts: &'a ScanOptions,
    pos: usize,
    depth: usize,
    in_string: bool,
    string_start: usize,
    span_start: usize,
}

impl<'a> Scanner<'a> {
    fn new(text: &'a str, opts: &'a ScanOptions) -> Self {
        Self {
            bytes: text.as_bytes(),
            opts,
            pos: 0,
            depth: 0,
            in_string: false,
            string_start: 0,
            span_start: 0,
        }
    }

    #[inline]
    fn at(&self, marker: &str) -> bool {
        !marker.is_empty() && self.bytes[self.pos..].starts_with(marker.as_bytes())
    }

    fn is_escaped(&self) -> bool {
        let esc = self.opts.markers.escape;
        match self.opts.escape {
            EscapeMode::Lookback => self.pos > 0 && self.bytes[self.pos - 1] == esc,
            EscapeMode::RunLength => {
                let run = self.bytes[..self.pos]
                    .iter()
                    .rev()
                    .take_while(|&&b| b == esc)
                    .count();
                run % 2 == 1
            }
        }
    }

    fn run(mut self) -> ScanSummary {
        let mut summary = ScanSummary::default();
        let opts = self.opts;
        let markers = &opts.markers;

        while self.pos < self.bytes.len() {
            let b = self.bytes[self.pos];

            if b == markers.quote && self.depth == 0 && !self.is_escaped() {
                self.in_string = !self.in_string;
                if self.in_string {
                    self.string_start = self.pos;
                }
                self.pos += 1;
                continue;
            }

            if !self.in_string {
                if self.at(&markers.comment_open) {
                    if self.depth == 0 {
                        self.span_start = self.pos;
                    }
                    self.depth += 1;
                    self.pos += markers.comment_open.len();
                    continue;
                }
                if self.at(&markers.comment_close) {
                    // A stray close at nesting 0 is ignored.
                    if self.depth > 0 {
                        self.depth -= 1;
                        self.pos += markers.comment_close.len();
                        if self.depth == 0 {
                            summary.spans.push(CommentSpan {
                                start: self.span_start,
                                end: self.pos,
                            });
                        }
                        continue;
                    }
                } else if b == markers.terminator && self.depth == 0 {
                    summary.terminators.push(self.pos);
                }
            }

            self.pos += 1;
        }

        if self.depth > 0 {
            debug_log!("[scanner] unterminated comment opened at byte {}", self.span_start);
            summary.unclosed_comment = Some(self.span_start);
        }
        if self.in_string {
            debug_log!("[scanner] unterminated string opened at byte {}", self.string_start);
            summary.unclosed_string = Some(self.string_start);
        }
        summary
    }
}

/// Run the comment/string state machine over `text`.
pub fn scan(text: &str, opts: &ScanOptions) -> ScanSummary {
    Scanner::new(text, opts).run()
}

/// Outermost complete comment spans of `text` with default markers.
pub fn comment_spans(text: &str) -> Vec<CommentSpan> {
    scan(text, &ScanOptions::default()).spans
}

/// Remove every complete outermost block comment from `text`.
pub fn strip_comments(text: &str) -> String {
    strip_comments_with(text, &ScanOptions::default())
}

pub fn strip_comments_with(text: &str, opts: &ScanOptions) -> String {
    let summary = scan(text, opts);
    Stripped::build(text, &summary, &opts.markers).text
}

/// Comment-free text plus the scan's terminator offsets, moved to where
/// they landed after removal.
struct Stripped {
    text: String,
    terminators: Vec<usize>,
}

impl Stripped {
    fn build(text: &str, summary: &ScanSummary, markers: &Markers) -> Self {
        let mut out = Self {
            text: String::with_capacity(text.len()),
            terminators: Vec::with_capacity(summary.terminators.len()),
        };
        let mut next = 0;
        let mut cursor = 0;
        for span in &summary.spans {
            out.copy(text, cursor..span.start, &summary.terminators, &mut next);
            // Removal must not glue a new delimiter or escape together.
            if joins_marker(&out.text, &text[span.end..], markers) {
                out.text.push(' ');
            }
            cursor = span.end;
        }
        out.copy(text, cursor..text.len(), &summary.terminators, &mut next);
        out
    }

    fn copy(&mut self, text: &str, range: Range<usize>, terminators: &[usize], next: &mut usize) {
        let base = self.text.len();
        while let Some(&t) = terminators.get(*next) {
            if t >= range.end {
                break;
            }
            self.terminators.push(base + t - range.start);
            *next += 1;
        }
        self.text.push_str(&text[range]);
    }
}

/// True when `before` followed directly by `after` would spell a comment
/// delimiter, or an escaped quote, across the seam.
fn joins_marker(before: &str, after: &str, markers: &Markers) -> bool {
    let (before, after) = (before.as_bytes(), after.as_bytes());
    let spans_seam = |marker: &[u8]| {
        (1..marker.len()).any(|k| before.ends_with(&marker[..k]) && after.starts_with(&marker[k..]))
    };
    spans_seam(markers.comment_open.as_bytes())
        || spans_seam(markers.comment_close.as_bytes())
        || spans_seam(&[markers.escape, markers.quote])
}

/// Line-oriented `@using` extraction over raw text.
///
/// Any line containing the directive marker counts. The comment delimiters
/// and the marker are removed as plain substrings, the rest is trimmed and
/// unquoted. Directives are assumed never to span lines and never to sit
/// inside string literals.
pub fn extract_directives(text: &str) -> Vec<String> {
    extract_directives_with(text, &Markers::default())
}

pub fn extract_directives_with(text: &str, markers: &Markers) -> Vec<String> {
    text.lines()
        .filter(|line| line.contains(markers.directive.as_str()))
        .filter_map(|line| {
            let rest = line
                .replace(markers.comment_open.as_str(), "")
                .replace(markers.comment_close.as_str(), "")
                .replace(markers.directive.as_str(), "");
            let fragment = unquote(rest.trim(), markers.quote as char).trim();
            if fragment.is_empty() {
                None
            } else {
                Some(fragment.to_string())
            }
        })
        .collect()
}

fn unquote(s: &str, quote: char) -> &str {
    s.strip_prefix(quote)
        .and_then(|inner| inner.strip_suffix(quote))
        .unwrap_or(s)
}

/// Comment-stripped text split into `;`-terminated statements.
///
/// The boundaries are computed once; [`Segments::iter`] can be called any
/// number of times and always yields the same finite sequence.
#[derive(Debug, Clone)]
pub struct Segments {
    text: String,
    bounds: Vec<(usize, usize)>,
    terminator: char,
}

impl Segments {
    pub fn new(text: &str) -> Self {
        Self::with_options(text, &ScanOptions::default())
    }

    pub fn with_options(text: &str, opts: &ScanOptions) -> Self {
        // Terminators come from the scan of the original text, so anything
        // the removal leaves behind can never swallow a statement boundary.
        let summary = scan(text, opts);
        let Stripped { text: stripped, terminators } = Stripped::build(text, &summary, &opts.markers);
        let mut bounds = Vec::with_capacity(terminators.len() + 1);
        let mut start = 0;
        for &t in &terminators {
            bounds.push((start, t));
            start = t + 1;
        }
        bounds.push((start, stripped.len()));
        bounds.retain(|&(s, e)| !stripped[s..e].trim().is_empty());

        Self {
            text: stripped,
            bounds,
            terminator: opts.markers.terminator as char,
        }
    }

    pub fn len(&self) -> usize {
        self.bounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bounds.is_empty()
    }

    pub fn iter(&self) -> Statements<'_> {
        Statements {
            segments: self,
            next: 0,
        }
    }
}

impl<'a> IntoIterator for &'a Segments {
    type Item = String;
    type IntoIter = Statements<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[derive(Debug, Clone)]
pub struct Statements<'a> {
    segments: &'a Segments,
    next: usize,
}

impl Iterator for Statements<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let &(start, end) = self.segments.bounds.get(self.next)?;
        self.next += 1;
        let mut stmt = self.segments.text[start..end].trim().to_string();
        stmt.push(self.segments.terminator);
        Some(stmt)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.segments.bounds.len() - self.next;
        (left, Some(left))
    }
}

impl ExactSizeIterator for Statements<'_> {}

/// Strip comments from `text` and split it into `;`-terminated statements.
pub fn split_statements(text: &str) -> Vec<String> {
    Segments::new(text).iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_comment_is_removed_exactly() {
        assert_eq!(strip_comments("val a = 1; (* note *)val b = 2;"), "val a = 1; val b = 2;");
    }

    #[test]
    fn nested_comment_removed_as_one_span() {
        let src = "a (* outer (* inner *) outer2 *) b";
        assert_eq!(comment_spans(src), vec![CommentSpan { start: 2, end: 32 }]);
        assert_eq!(strip_comments(src), "a  b");
    }

    #[test]
    fn delimiters_inside_strings_are_text() {
        let src = "x := \"(*not a comment*)\"; y";
        assert!(comment_spans(src).is_empty());
        assert_eq!(strip_comments(src), src);
    }

    #[test]
    fn quotes_inside_comments_do_not_open_strings() {
        let src = "(* it's \" odd *) val s = \"ok\";";
        assert_eq!(strip_comments(src), " val s = \"ok\";");
    }

    #[test]
    fn stray_close_is_ignored() {
        let summary = scan("val x = 1 *) ;", &ScanOptions::default());
        assert!(summary.spans.is_empty());
        assert_eq!(summary.terminators, vec![13]);
        assert!(summary.is_balanced());
    }

    #[test]
    fn unterminated_comment_is_reported_not_spanned() {
        let summary = scan("val x = 1; (* never ends; ", &ScanOptions::default());
        assert!(summary.spans.is_empty());
        assert_eq!(summary.unclosed_comment, Some(11));
        assert_eq!(summary.terminators, vec![9]);
    }

    #[test]
    fn open_paren_star_paren_does_not_self_close() {
        let summary = scan("(*) still open *) x", &ScanOptions::default());
        assert_eq!(summary.spans, vec![CommentSpan { start: 0, end: 17 }]);
    }

    #[test]
    fn run_length_escape_counts_backslashes() {
        // `\\"` is an escaped backslash followed by a closing quote.
        let src = r#"val s = "a\\"; (* c *) val t = 1;"#;
        assert_eq!(strip_comments(src), r#"val s = "a\\";  val t = 1;"#);
    }

    #[test]
    fn lookback_escape_treats_double_backslash_as_escape() {
        let src = r#"val s = "a\\"; (* c *) val t = 1;"#;
        let opts = ScanOptions { escape: EscapeMode::Lookback, ..ScanOptions::default() };
        // The closing quote is taken as escaped, so the comment sits in a string.
        assert!(scan(src, &opts).spans.is_empty());
    }

    #[test]
    fn stripping_is_idempotent() {
        let once = strip_comments("a (* x *) b (* (* y *) *) c");
        assert_eq!(strip_comments(&once), once);
    }

    #[test]
    fn removal_never_glues_a_new_comment() {
        let once = strip_comments("a ((* x *)* y *) b");
        assert_eq!(once, "a ( * y *) b");
        assert_eq!(strip_comments(&once), once);
    }

    #[test]
    fn removal_never_escapes_a_quote() {
        let once = strip_comments(r#"val s = \(* x *)"a;" (* y *)"#);
        assert_eq!(once, r#"val s = \ "a;" "#);
        assert_eq!(strip_comments(&once), once);
    }

    #[test]
    fn glued_delimiters_do_not_swallow_statements() {
        let stmts = split_statements("val f = ((* n *)* ; val g = 1; *) val h = 2;");
        assert_eq!(stmts, vec!["val f = ( *;", "val g = 1;", "*) val h = 2;"]);
    }

    #[test]
    fn directive_fragment_is_unquoted_and_trimmed() {
        let dirs = extract_directives("(* @using \"sub/a.sml\" *)\nval x = 1;\n(*@using  lib.sml*)");
        assert_eq!(dirs, vec!["sub/a.sml".to_string(), "lib.sml".to_string()]);
    }

    #[test]
    fn empty_directive_is_dropped() {
        assert!(extract_directives("(* @using *)\n(* @using \"\" *)").is_empty());
    }

    #[test]
    fn segments_skip_semicolons_in_comments_and_strings() {
        let stmts = split_statements("val x = 1; (* comment; with semicolon *) val y = 2;");
        assert_eq!(stmts, vec!["val x = 1;", "val y = 2;"]);

        let stmts = split_statements("val s = \"a;b\"; val t = s;");
        assert_eq!(stmts, vec!["val s = \"a;b\";", "val t = s;"]);
    }

    #[test]
    fn trailing_text_gets_terminated() {
        assert_eq!(split_statements("val a = 1;\nval b = 2"), vec!["val a = 1;", "val b = 2;"]);
    }

    #[test]
    fn segments_are_restartable() {
        let segs = Segments::new("a; b; c;");
        let first: Vec<_> = segs.iter().collect();
        let second: Vec<_> = segs.iter().collect();
        assert_eq!(first, second);
        assert_eq!(segs.iter().len(), 3);
    }
}
