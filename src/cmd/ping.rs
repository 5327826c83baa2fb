//! Connectivity check command.

use std::time::Instant;

use console::style;

use crate::{Result, config, session::SyncSessionController, transport::HttpTransport};

/// Executes the ping command.
pub async fn execute() -> Result<()> {
   let cfg = config::get();
   let transport = HttpTransport::from_config(cfg)?;
   let base_url = transport.base_url().to_string();
   let controller = SyncSessionController::new(transport, cfg.sync_policy());

   let started = Instant::now();
   controller.ping().await?;
   println!(
      "{} {} {}",
      style("●").green(),
      base_url,
      style(format!("(ok, {} ms)", started.elapsed().as_millis())).dim()
   );
   Ok(())
}
