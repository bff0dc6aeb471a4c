use std::path::Path;

use anyhow::Result;
use colored::Colorize;

use crate::config::Config;
use crate::core::diagnostics::warn_resolve;
use crate::core::pipeline::prepare_file;
use crate::core::resolver::FsLoader;

pub fn main(input: &Path, cfg: &Config) -> Result<()> {
    let program = prepare_file(input, &mut FsLoader, &cfg.pipeline())?;

    println!("{}", "depth  path".bold());
    for unit in &program.units {
        println!("{:>5}  {}", unit.depth, unit.path.display());
    }
    println!("{:>5}  {}", 0, program.root.display());

    for w in &program.warnings {
        warn_resolve(w);
    }
    Ok(())
}
