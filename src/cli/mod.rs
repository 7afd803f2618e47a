//! CLI argument grammar.

mod commands;

pub use commands::{Cli, Commands};
