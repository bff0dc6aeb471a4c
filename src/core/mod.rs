//! Core module tree: source preparation and the evaluator boundary.

#[macro_use]
pub mod debug; // gated debug logging (SMLPREP_DEBUG=1) provides debug_log! macro
pub mod diagnostics;
pub mod error;
pub mod evaluator;
pub mod pipeline;
pub mod process;
pub mod report;
pub mod resolver;
pub mod scanner;
pub mod session;

pub use resolver::SourceUnit;
pub use scanner::CommentSpan;
