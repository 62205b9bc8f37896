//! perp-ops CLI library
//!
//! Command implementations and presentation helpers behind the `perp-ops` binary.

#![forbid(unsafe_code)]

pub mod commands;
pub mod config;
pub mod utils;

pub use commands::CommandContext;
pub use config::{resolve_ops_config, CliConfig};
