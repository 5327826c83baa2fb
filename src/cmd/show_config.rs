//! Config command.
//!
//! Prints where the config lives and the values in effect, with the API key
//! redacted.

use console::style;

use crate::{Result, config};

/// Executes the config command.
pub fn execute() -> Result<()> {
   let cfg = config::get().redacted();
   println!("{} {}", style("config:").bold(), config::config_file_path().display());
   println!();
   print!("{}", toml::to_string_pretty(&cfg)?);
   Ok(())
}
