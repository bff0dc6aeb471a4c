use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use colored::Colorize;

use super::report_preparation;
use crate::config::Config;
use crate::core::pipeline::prepare_file;
use crate::core::resolver::FsLoader;
use crate::io::atomic::atomic_write;

pub fn main(input: &Path, out: Option<PathBuf>, cfg: &Config) -> Result<()> {
    let pipeline = cfg.pipeline();
    let program = prepare_file(input, &mut FsLoader, &pipeline)?;
    report_preparation(&program, &pipeline);
    let text = program.bundle_text();

    match out {
        Some(path) => {
            atomic_write(&path, &text).with_context(|| format!("writing {}", path.display()))?;
            println!(
                "{} wrote {} statement(s) from {} file(s) to '{}'.",
                "ok:".green().bold(),
                program.segments.len(),
                program.files().len(),
                path.display()
            );
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(text.as_bytes())?;
            stdout.flush()?;
        }
    }
    Ok(())
}
