//! Push command.
//!
//! Reads catalog identifiers and synchronizes them with the server in one
//! batch session.

use std::path::PathBuf;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;

use crate::{
   Error, Result,
   config::{self, IdempotencyMode},
   progress::Cancellable,
   report::ReconciliationReport,
   session::SyncSessionController,
   source::{IdentifierSource, LineSource},
   transport::HttpTransport,
   types::{SessionStatus, SyncMode},
};

/// Options for a push run; `None` fields fall back to config.
#[derive(Debug, Clone, Default)]
pub struct PushOptions {
   pub file:             Option<PathBuf>,
   pub mode:             SyncMode,
   pub chunk_size:       Option<usize>,
   pub per_attempt_keys: bool,
   pub json:             bool,
}

/// Executes the push command.
pub async fn execute(options: PushOptions) -> Result<()> {
   let mut cfg = config::get().clone();
   if let Some(size) = options.chunk_size {
      cfg.chunk_size = size;
   }
   if options.per_attempt_keys {
      cfg.idempotency_mode = IdempotencyMode::PerAttempt;
   }

   let transport = HttpTransport::from_config(&cfg)?;
   let identifiers = LineSource::from_arg(options.file).identifiers()?;
   let controller = SyncSessionController::new(transport, cfg.sync_policy());

   let token = CancellationToken::new();
   let watcher = tokio::spawn({
      let token = token.clone();
      async move {
         if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
         }
      }
   });

   let bar = if options.json {
      ProgressBar::hidden()
   } else {
      let bar = ProgressBar::new(0);
      bar.set_style(
         ProgressStyle::with_template("{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
      );
      bar
   };

   let mut sink = Cancellable::new(bar.clone(), token);
   let report = controller.sync(&identifiers, options.mode, &mut sink).await;
   bar.finish_and_clear();
   watcher.abort();

   if options.json {
      println!("{}", serde_json::to_string_pretty(&report)?);
   } else {
      print_report(&report);
   }

   if report.success {
      return Ok(());
   }
   Err(Error::Reported {
      message:   report
         .error
         .as_ref()
         .map_or_else(|| format!("sync {}", report.status), ToString::to_string),
      exit_code: report.exit_code(),
   })
}

fn print_report(report: &ReconciliationReport) {
   match report.status {
      SessionStatus::Committed if report.upload_id.is_none() => {
         println!("{}", style("Nothing to sync").dim());
         return;
      },
      SessionStatus::Committed => {
         println!(
            "{} {} sync committed {}",
            style("✓").green(),
            report.mode,
            style(format!("(upload {})", report.upload_id.as_deref().unwrap_or("?"))).dim()
         );
      },
      SessionStatus::Cancelled => {
         println!(
            "{} sync cancelled after {}/{} chunks; nothing was committed",
            style("●").yellow(),
            report.chunks_uploaded,
            report.chunks_planned
         );
      },
      _ => {
         println!(
            "{} sync failed after {}/{} chunks; nothing was committed",
            style("✗").red(),
            report.chunks_uploaded,
            report.chunks_planned
         );
         if let Some(err) = &report.error {
            println!("  {}", style(err).red());
            if err.invalidates_credential() {
               println!("  {}", style("The API key was rejected; update it in the config").dim());
            }
         }
      },
   }

   let t = &report.tallies;
   println!(
      "  accepted {} · duplicates {} · invalid {}",
      style(t.accepted).bold(),
      t.duplicates,
      t.invalid
   );
   if report.success {
      let mut line = format!("  processed {}", report.total_processed);
      if report.mode == SyncMode::Replace {
         line.push_str(&format!(" · removed {}", report.removed_count));
      }
      if let Some(count) = report.user_item_count {
         line.push_str(&format!(" · {count} items on server"));
      }
      println!("{}", style(line).dim());
   }
}
