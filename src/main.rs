use std::path::PathBuf;

use catalog_sync::{
   Error, Result,
   cmd::{self, push::PushOptions},
   types::SyncMode,
};
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Command-line arguments for the catsync application
#[derive(Parser)]
#[command(name = "catsync")]
#[command(about = "Synchronize a local catalog with a remote search index")]
#[command(version)]
struct Cli {
   #[command(subcommand)]
   command: Cmd,
}

/// Available subcommands for catsync
#[derive(Subcommand)]
enum Cmd {
   #[command(about = "Upload catalog identifiers in one batch session")]
   Push {
      #[arg(
         short = 'f',
         long,
         help = "File with one identifier per line ('-' or omitted: stdin)"
      )]
      file: Option<PathBuf>,

      #[arg(
         short = 'm',
         long,
         default_value = "merge",
         help = "merge (add/update only) or replace (server keeps exactly this set)"
      )]
      mode: SyncMode,

      #[arg(short = 'c', long, env = "CATSYNC_CHUNK_SIZE", help = "Items per chunk (1-1000)")]
      chunk_size: Option<usize>,

      #[arg(long, help = "Send a fresh idempotency key on every retry (legacy servers)")]
      per_attempt_keys: bool,

      #[arg(long, help = "JSON output")]
      json: bool,
   },

   #[command(about = "Show the server-side status of a batch session")]
   Status {
      #[arg(help = "Upload id returned when the session started")]
      upload_id: String,

      #[arg(long, help = "JSON output")]
      json: bool,
   },

   #[command(about = "Check connectivity and credentials")]
   Ping,

   #[command(about = "Show the effective configuration")]
   Config,
}

#[tokio::main]
async fn main() {
   tracing_subscriber::fmt()
      .with_writer(std::io::stderr)
      .with_env_filter(EnvFilter::from_default_env().add_directive(Level::WARN.into()))
      .init();

   let cli = Cli::parse();
   if let Err(err) = run(cli).await {
      if !matches!(err, Error::Reported { .. }) {
         eprintln!("{err}");
      }
      std::process::exit(err.exit_code());
   }
}

async fn run(cli: Cli) -> Result<()> {
   match cli.command {
      Cmd::Push { file, mode, chunk_size, per_attempt_keys, json } => {
         cmd::push::execute(PushOptions { file, mode, chunk_size, per_attempt_keys, json }).await
      },
      Cmd::Status { upload_id, json } => cmd::status::execute(upload_id, json).await,
      Cmd::Ping => cmd::ping::execute().await,
      Cmd::Config => cmd::show_config::execute(),
   }
}
