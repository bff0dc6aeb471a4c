//! Turning chunk outputs into something a terminal (or a transcript file)
//! can show.

use std::io::{self, Write};

use colored::{Color, Colorize};

use crate::core::session::ChunkOutput;

pub const PROBLEM_PREFIX: &str = "There was a problem with your code: ";

/// Rotating palette for successful chunks.
const PALETTE: [Color; 5] = [
    Color::BrightCyan,
    Color::BrightGreen,
    Color::Cyan,
    Color::Yellow,
    Color::Magenta,
];

/// Plain text for one chunk, or `None` when there is nothing to show.
pub fn chunk_text(chunk: &ChunkOutput) -> Option<String> {
    match chunk {
        ChunkOutput::Printed(text) if text.trim().is_empty() => None,
        ChunkOutput::Printed(text) => Some(text.trim_end().to_string()),
        ChunkOutput::Failed { message, warnings } => {
            let mut out = format!("{PROBLEM_PREFIX}{message}");
            for w in warnings {
                out.push('\n');
                out.push_str(&w.to_string());
            }
            Some(out)
        }
        ChunkOutput::Suppressed => None,
    }
}

/// All visible chunks, separated by blank lines.
pub fn render_plain(chunks: &[ChunkOutput]) -> String {
    let blocks: Vec<String> = chunks.iter().filter_map(chunk_text).collect();
    let mut out = blocks.join("\n\n");
    if !out.is_empty() {
        out.push('\n');
    }
    out
}

pub fn write_report<W: Write>(out: &mut W, chunks: &[ChunkOutput]) -> io::Result<()> {
    let visible = chunks
        .iter()
        .filter_map(|c| chunk_text(c).map(|text| (c.is_failure(), text)));
    for (index, (failed, text)) in visible.enumerate() {
        if index > 0 {
            writeln!(out)?;
        }
        if failed {
            writeln!(out, "{}", text.bright_red())?;
        } else {
            writeln!(out, "{}", text.color(PALETTE[index % PALETTE.len()]))?;
        }
    }
    Ok(())
}

/// Counts for the closing summary line: (shown, failed, suppressed).
pub fn tally(chunks: &[ChunkOutput]) -> (usize, usize, usize) {
    chunks.iter().fold((0, 0, 0), |(shown, failed, quiet), c| match c {
        ChunkOutput::Failed { .. } => (shown + 1, failed + 1, quiet),
        ChunkOutput::Suppressed => (shown, failed, quiet + 1),
        ChunkOutput::Printed(t) if t.trim().is_empty() => (shown, failed, quiet),
        ChunkOutput::Printed(_) => (shown + 1, failed, quiet),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::evaluator::Warning;

    fn sample() -> Vec<ChunkOutput> {
        vec![
            ChunkOutput::Printed("val a = 1 : int;".into()),
            ChunkOutput::Suppressed,
            ChunkOutput::Printed(String::new()),
            ChunkOutput::Failed {
                message: "Unbound identifier \"c\".".into(),
                warnings: vec![
                    Warning { severity: -1, message: "check spelling".into() },
                    Warning { severity: -3, message: "note".into() },
                ],
            },
        ]
    }

    #[test]
    fn plain_report_matches_legacy_wording() {
        insta::assert_snapshot!(render_plain(&sample()).trim_end(), @r###"
        val a = 1 : int;

        There was a problem with your code: Unbound identifier "c".
        Attention: check spelling
        Message: note
        "###);
    }

    #[test]
    fn tally_counts_each_kind() {
        assert_eq!(tally(&sample()), (2, 1, 1));
    }

    #[test]
    fn uncoloured_report_equals_plain() {
        colored::control::set_override(false);
        let mut buf = Vec::new();
        write_report(&mut buf, &sample()).unwrap();
        colored::control::unset_override();
        assert_eq!(String::from_utf8(buf).unwrap(), render_plain(&sample()));
    }
}
