//! SML source preparation: comment stripping, `@using` import resolution and
//! statement segmentation, plus a thin driver for an external evaluator.
pub mod cli;
pub mod commands;
pub mod config;
pub mod core;
pub mod io;
