//! User configuration: built-in defaults + optional TOML file.
//!
//! - `Config::default()` → built-in settings
//! - `Config::from_toml_file(path)` → load a user file (missing keys keep defaults)
//! - `Config::load(cli_path)` → `--config` > ~/.smlprep/config.toml > built-in

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::core::diagnostics::warn;
use crate::core::evaluator::{default_interpreter_options, InterpreterOptions};
use crate::core::pipeline::PipelineConfig;
use crate::core::resolver::ResolveOptions;
use crate::core::scanner::{EscapeMode, ScanOptions};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Source evaluated before user code.
    pub preload: String,
    pub evaluator: EvaluatorConfig,
    /// Dialect toggles forwarded verbatim; merged over the built-in set.
    pub interpreter: InterpreterOptions,
    pub imports: ImportsConfig,
    pub display: DisplayConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            preload: String::new(),
            evaluator: EvaluatorConfig::default(),
            interpreter: default_interpreter_options(),
            imports: ImportsConfig::default(),
            display: DisplayConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EvaluatorConfig {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            program: "sosml-eval".to_string(),
            args: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ImportsConfig {
    pub dedupe: bool,
    pub escape: EscapeMode,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorChoice {
    #[default]
    Auto,
    Always,
    Never,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayLocation {
    #[default]
    Stdout,
    Stderr,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub color: ColorChoice,
    pub location: DisplayLocation,
    /// Plain-text copy of the last report, written atomically.
    pub transcript: Option<PathBuf>,
}

impl Config {
    /// Load from TOML file.
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let txt = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_toml_str(&txt).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn from_toml_str(txt: &str) -> Result<Self> {
        let mut cfg: Config = toml::from_str(txt)?;
        // User toggles refine the built-in dialect set rather than replace it.
        let mut interpreter = default_interpreter_options();
        interpreter.append(&mut cfg.interpreter);
        cfg.interpreter = interpreter;
        Ok(cfg)
    }

    /// Explicit path must load; the default path is optional.
    pub fn load(cli_path: &Option<PathBuf>) -> Result<Self> {
        Self::load_from(cli_path, default_config_path())
    }

    fn load_from(cli_path: &Option<PathBuf>, default_path: Option<PathBuf>) -> Result<Self> {
        if let Some(p) = cli_path {
            return Self::from_toml_file(p);
        }
        if let Some(p) = default_path {
            if p.exists() {
                match Self::from_toml_file(&p) {
                    Ok(cfg) => return Ok(cfg),
                    Err(e) => warn(&format!("failed loading {}, using defaults: {e:#}", p.display())),
                }
            }
        }
        Ok(Self::default())
    }

    pub fn pipeline(&self) -> PipelineConfig {
        PipelineConfig {
            preload: self.preload.clone(),
            resolve: ResolveOptions {
                scan: ScanOptions {
                    escape: self.imports.escape,
                    ..ScanOptions::default()
                },
                dedupe: self.imports.dedupe,
            },
        }
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    // ~\Users\you\.smlprep\config.toml on Windows; ~/.smlprep/config.toml elsewhere
    dirs_next::home_dir().map(|h| h.join(".smlprep").join("config.toml"))
}

pub fn resolve_config_path(cli_path: &Option<PathBuf>) -> Option<PathBuf> {
    if let Some(p) = cli_path {
        return Some(p.clone());
    }
    default_config_path()
}
