//! Upload status command.
//!
//! Shows the server's progress snapshot for a batch session.

use console::style;

use crate::{Result, config, session::SyncSessionController, transport::HttpTransport};

/// Executes the status command for `upload_id`.
pub async fn execute(upload_id: String, json: bool) -> Result<()> {
   let cfg = config::get();
   let transport = HttpTransport::from_config(cfg)?;
   let controller = SyncSessionController::new(transport, cfg.sync_policy());

   let snapshot = controller.status(&upload_id).await?;

   if json {
      println!("{}", serde_json::to_string_pretty(&snapshot)?);
      return Ok(());
   }

   let marker = if snapshot.success { style("●").green() } else { style("●").yellow() };
   println!("{marker} {}", style(&upload_id).bold());
   if let Some(error) = &snapshot.error {
      println!("  {}", style(error).red());
   }
   for (key, value) in &snapshot.fields {
      println!("  {}: {value}", style(key).dim());
   }
   Ok(())
}
