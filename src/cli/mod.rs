//! Command-line interface

pub mod commands;
pub mod demo;

pub use commands::{Cli, Commands};
pub use demo::run_demo;
