//! smlprep main: subcommand dispatch over the preparation pipeline.
use clap::Parser; // trait import enables SmlPrepCli::parse()

use smlprep::cli::{Command, SmlPrepCli};
use smlprep::commands;
use smlprep::config::{resolve_config_path, ColorChoice, Config};

fn main() -> anyhow::Result<()> {
    let args = SmlPrepCli::parse();

    let mut cfg = Config::load(&args.config)?;
    if args.no_preload {
        cfg.preload.clear();
    }
    match cfg.display.color {
        ColorChoice::Auto => {}
        ColorChoice::Always => colored::control::set_override(true),
        ColorChoice::Never => colored::control::set_override(false),
    }

    match args.cmd {
        Command::Run { input, watch, evaluator } => {
            if let Some(program) = evaluator {
                cfg.evaluator.program = program;
            }
            if watch {
                commands::watch::main(&input, &cfg)
            } else {
                commands::run::main(&input, &cfg)
            }
        }
        Command::Bundle { input, out } => commands::bundle::main(&input, out, &cfg),
        Command::Imports { input } => commands::imports::main(&input, &cfg),
        Command::Strip { input } => commands::inspect::strip(&input, &cfg),
        Command::Statements { input } => commands::inspect::statements(&input, &cfg),
        Command::Config => {
            match resolve_config_path(&args.config) {
                Some(p) if p.exists() => println!("config: {}", p.display()),
                Some(p) => println!("config: {} (not found, using built-in defaults)", p.display()),
                None => println!("config: built-in defaults (no home directory)"),
            }
            Ok(())
        }
    }
}
