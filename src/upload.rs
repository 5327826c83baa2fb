//! Single-chunk upload with idempotency keys and bounded retry.

use std::ops::ControlFlow;

use tokio::time;

use crate::{
   config::{IdempotencyMode, SyncPolicy},
   error::SyncError,
   plan::{Chunk, new_idempotency_key},
   progress::ProgressSink,
   transport::{self, ChunkRequest, Transport},
   types::Tallies,
};

/// What happened to one chunk once the uploader stopped trying.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkOutcome {
   /// Server tallies, `None` if cancelled before any attempt succeeded.
   pub tallies:   Option<Tallies>,
   pub attempts:  u32,
   /// The progress sink asked to stop after the last attempt.
   pub cancelled: bool,
}

/// Uploads chunks of one session, retrying rate limits and timeouts on the
/// same chunk index.
pub struct ChunkUploader<'a, T: Transport> {
   transport: &'a T,
   policy:    &'a SyncPolicy,
}

impl<'a, T: Transport> ChunkUploader<'a, T> {
   pub const fn new(transport: &'a T, policy: &'a SyncPolicy) -> Self {
      Self { transport, policy }
   }

   /// Sends one attempt and validates the body.
   pub async fn upload_once(
      &self,
      upload_id: &str,
      chunk: &Chunk,
      idempotency_key: &str,
   ) -> Result<Tallies, SyncError> {
      let request = ChunkRequest { chunk_index: chunk.index(), items: chunk.items() };
      let response = self
         .transport
         .upload_chunk(upload_id, idempotency_key, &request)
         .await?;

      if !response.success {
         return Err(transport::rejected("chunk", response.error));
      }
      response.results.ok_or_else(|| SyncError::Protocol {
         op:     "chunk",
         reason: "response is missing 'results'".to_string(),
      })
   }

   /// Uploads `chunk`, retrying retryable failures up to the policy's attempt
   /// budget. The sink is notified after every attempt.
   pub async fn upload(
      &self,
      upload_id: &str,
      chunk: &Chunk,
      total_chunks: usize,
      sink: &mut dyn ProgressSink,
   ) -> Result<ChunkOutcome, SyncError> {
      let index = chunk.index();
      let display = index + 1;
      let max_attempts = self.policy.max_attempts.max(1);
      let mut attempts = 0u32;

      loop {
         attempts += 1;
         let key = match self.policy.idempotency_mode {
            IdempotencyMode::PerChunk => chunk.idempotency_key().to_string(),
            IdempotencyMode::PerAttempt => new_idempotency_key(),
         };

         tracing::debug!(chunk = index, attempt = attempts, items = chunk.len(), "uploading chunk");

         match self.upload_once(upload_id, chunk, &key).await {
            Ok(tallies) => {
               let flow = sink.on_progress(
                  index,
                  total_chunks,
                  &format!(
                     "Uploaded chunk {display}/{total_chunks} ({} accepted, {} duplicates, {} \
                      invalid)",
                     tallies.accepted, tallies.duplicates, tallies.invalid
                  ),
               );
               return Ok(ChunkOutcome {
                  tallies: Some(tallies),
                  attempts,
                  cancelled: flow.is_break(),
               });
            },
            Err(err) if err.is_retryable() && attempts < max_attempts => {
               let delay = self.policy.backoff_for(&err);
               tracing::warn!(
                  chunk = index,
                  attempt = attempts,
                  delay_ms = delay.as_millis() as u64,
                  error = %err,
                  "retryable chunk failure"
               );
               let flow = sink.on_progress(
                  index,
                  total_chunks,
                  &format!(
                     "Chunk {display}/{total_chunks} failed ({err}); retrying in {}s",
                     delay.as_secs()
                  ),
               );
               if let ControlFlow::Break(()) = flow {
                  return Ok(ChunkOutcome { tallies: None, attempts, cancelled: true });
               }
               time::sleep(delay).await;
            },
            Err(err) => {
               let _ = sink.on_progress(
                  index,
                  total_chunks,
                  &format!("Chunk {display}/{total_chunks} failed: {err}"),
               );
               if err.is_retryable() {
                  return Err(SyncError::RetriesExhausted {
                     op: "chunk",
                     attempts,
                     last: Box::new(err),
                  });
               }
               return Err(err);
            },
         }
      }
   }
}
