use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;

use super::report_preparation;
use crate::config::{Config, DisplayLocation};
use crate::core::pipeline::{prepare_file, PreparedProgram};
use crate::core::process::ProcessEvaluator;
use crate::core::report::{render_plain, tally, write_report};
use crate::core::resolver::{FsLoader, SourceLoader};
use crate::core::session::{ChunkOutput, Session};
use crate::debug_log;
use crate::io::atomic::atomic_write;

pub fn main(input: &Path, cfg: &Config) -> Result<()> {
    let mut loader = FsLoader;
    run_once(input, &mut loader, cfg).map(|_| ())
}

/// Prepare `input`, evaluate every statement and show the report.
/// Returns the prepared program so callers can see which files were involved.
pub fn run_once<L: SourceLoader + ?Sized>(
    input: &Path,
    loader: &mut L,
    cfg: &Config,
) -> Result<PreparedProgram> {
    let pipeline = cfg.pipeline();
    let program = prepare_file(input, loader, &pipeline)?;
    report_preparation(&program, &pipeline);
    debug_log!(
        "[run] {} import(s), {} statement(s)",
        program.units.len(),
        program.segments.len()
    );

    let evaluator = ProcessEvaluator::new(cfg.evaluator.program.clone(), cfg.evaluator.args.clone());
    let mut session = Session::new(evaluator, cfg.interpreter.clone())
        .with_context(|| format!("starting evaluator '{}'", cfg.evaluator.program))?;
    let chunks = session.run(program.statements());

    emit(&chunks, cfg)?;
    Ok(program)
}

fn emit(chunks: &[ChunkOutput], cfg: &Config) -> Result<()> {
    match cfg.display.location {
        DisplayLocation::Stdout => write_report(&mut io::stdout().lock(), chunks)?,
        DisplayLocation::Stderr => write_report(&mut io::stderr().lock(), chunks)?,
    }
    io::stdout().flush().ok();

    let (shown, failed, suppressed) = tally(chunks);
    let summary = format!(
        "{} statement(s): {} shown, {} failed, {} incomplete",
        chunks.len(),
        shown,
        failed,
        suppressed
    );
    if failed > 0 {
        eprintln!("{} {}", "done:".yellow().bold(), summary);
    } else {
        eprintln!("{} {}", "done:".green().bold(), summary);
    }

    if let Some(path) = &cfg.display.transcript {
        atomic_write(path, render_plain(chunks))
            .with_context(|| format!("writing transcript {}", path.display()))?;
    }
    Ok(())
}
