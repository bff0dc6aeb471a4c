use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "smlprep",
    about = "Prepare SML sources (@using imports, comments, statements) and evaluate them",
    version,
    propagate_version = true,
    disable_help_subcommand = true
)]
pub struct SmlPrepCli {
    /// Global: path to config (TOML); default: ~/.smlprep/config.toml
    #[arg(long = "config", value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Global: skip the configured preload source
    #[arg(long = "no-preload", action = ArgAction::SetTrue, global = true)]
    pub no_preload: bool,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Resolve imports, split into statements and evaluate them one by one
    ///
    /// Examples:
    ///   smlprep run main.sml
    ///   smlprep run main.sml --watch
    Run {
        #[arg(value_name = "FILE")]
        input: PathBuf,
        /// Re-run whenever the file or one of its imports changes
        #[arg(long = "watch", action = ArgAction::SetTrue)]
        watch: bool,
        /// Override the evaluator program from the config
        #[arg(long = "evaluator", value_name = "PROGRAM")]
        evaluator: Option<String>,
    },

    /// Write the linearised program (imports first, comments stripped)
    Bundle {
        #[arg(value_name = "FILE")]
        input: PathBuf,
        /// Output file (short: -o). Prints to stdout when omitted.
        #[arg(short = 'o', long = "out", value_name = "FILE")]
        out: Option<PathBuf>,
    },

    /// List resolved imports in evaluation order
    Imports {
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Debug helpers
    Strip {
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },
    Statements {
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Show which config file is in effect
    Config,
}
