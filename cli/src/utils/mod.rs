//! Shared helpers for command implementations

pub mod formatting;

pub use formatting::{format_weight, parse_pubkey};
