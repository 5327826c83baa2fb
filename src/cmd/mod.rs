//! CLI command implementations for catsync.
//!
//! Each module corresponds to a subcommand of the `catsync` binary.

pub mod ping;
pub mod push;
pub mod show_config;
pub mod status;
