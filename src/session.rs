//! Session state machine: start, upload every chunk in order, commit.

use tokio::time;

use crate::{
   config::SyncPolicy,
   error::SyncError,
   plan::{self, Chunk},
   progress::ProgressSink,
   report::{ReconciliationReport, RunProgress},
   transport::{self, CommitResponse, StartRequest, StatusSnapshot, Transport},
   types::{SessionStatus, SyncMode},
   upload::ChunkUploader,
};

/// One synchronization attempt. Owned by a single controller run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSession {
   session_id:  Option<String>,
   mode:        SyncMode,
   total_count: u64,
   status:      SessionStatus,
}

impl SyncSession {
   pub const fn new(mode: SyncMode, total_count: u64) -> Self {
      Self { session_id: None, mode, total_count, status: SessionStatus::Created }
   }

   pub fn session_id(&self) -> Option<&str> {
      self.session_id.as_deref()
   }

   pub const fn mode(&self) -> SyncMode {
      self.mode
   }

   pub const fn total_count(&self) -> u64 {
      self.total_count
   }

   pub const fn status(&self) -> SessionStatus {
      self.status
   }

   /// Moves to `next`, rejecting anything the lifecycle does not allow.
   pub fn transition(&mut self, next: SessionStatus) -> Result<(), SyncError> {
      if !self.status.can_transition_to(next) {
         return Err(SyncError::Protocol {
            op:     "session",
            reason: format!("illegal session transition {} -> {next}", self.status),
         });
      }
      tracing::debug!(from = %self.status, to = %next, "session transition");
      self.status = next;
      Ok(())
   }

   /// Terminal failure from whatever non-terminal state the session is in.
   fn abort(&mut self, next: SessionStatus) {
      if self.status.can_transition_to(next) {
         self.status = next;
      } else if !self.status.is_terminal() {
         self.status = SessionStatus::Failed;
      }
   }
}

/// Drives a whole sync over an injected transport.
pub struct SyncSessionController<T: Transport> {
   transport: T,
   policy:    SyncPolicy,
}

impl<T: Transport> SyncSessionController<T> {
   pub const fn new(transport: T, policy: SyncPolicy) -> Self {
      Self { transport, policy }
   }

   pub const fn transport(&self) -> &T {
      &self.transport
   }

   pub const fn policy(&self) -> &SyncPolicy {
      &self.policy
   }

   /// Plans `identifiers` with the policy's chunk size and runs the session.
   ///
   /// An empty list short-circuits to a successful report without touching
   /// the server.
   pub async fn sync<S: AsRef<str>>(
      &self,
      identifiers: &[S],
      mode: SyncMode,
      sink: &mut dyn ProgressSink,
   ) -> ReconciliationReport {
      if identifiers.is_empty() {
         tracing::info!(%mode, "nothing to sync; skipping session");
         return ReconciliationReport::vacuous(mode);
      }
      let chunks = plan::plan(identifiers, self.policy.chunk_size);
      self.sync_chunks(&chunks, mode, sink).await
   }

   /// Runs a session over an already planned set of chunks.
   pub async fn sync_chunks(
      &self,
      chunks: &[Chunk],
      mode: SyncMode,
      sink: &mut dyn ProgressSink,
   ) -> ReconciliationReport {
      if chunks.is_empty() {
         return ReconciliationReport::vacuous(mode);
      }

      let total_count = chunks.iter().map(|c| c.len() as u64).sum();
      let mut session = SyncSession::new(mode, total_count);
      let mut progress = RunProgress { chunks_planned: chunks.len(), ..RunProgress::default() };

      match self.drive(&mut session, chunks, sink, &mut progress).await {
         Ok(Some(commit)) => {
            let report = ReconciliationReport::committed(mode, progress, &commit);
            tracing::info!(
               upload_id = report.upload_id.as_deref().unwrap_or_default(),
               accepted = report.tallies.accepted,
               duplicates = report.tallies.duplicates,
               invalid = report.tallies.invalid,
               removed = report.removed_count,
               "session committed"
            );
            report
         },
         Ok(None) => {
            session.abort(SessionStatus::Cancelled);
            tracing::info!(
               uploaded = progress.chunks_uploaded,
               planned = progress.chunks_planned,
               "session cancelled before commit"
            );
            ReconciliationReport::cancelled(mode, progress)
         },
         Err(err) => {
            session.abort(SessionStatus::Failed);
            tracing::error!(
               uploaded = progress.chunks_uploaded,
               planned = progress.chunks_planned,
               error = %err,
               "session failed"
            );
            ReconciliationReport::failed(mode, progress, err)
         },
      }
   }

   /// `Ok(None)` means the sink cancelled the run.
   async fn drive(
      &self,
      session: &mut SyncSession,
      chunks: &[Chunk],
      sink: &mut dyn ProgressSink,
      progress: &mut RunProgress,
   ) -> Result<Option<CommitResponse>, SyncError> {
      let upload_id = self.open(session).await?;
      progress.upload_id = Some(upload_id.clone());
      session.transition(SessionStatus::Uploading)?;

      let uploader = ChunkUploader::new(&self.transport, &self.policy);
      let total_chunks = chunks.len();

      for (position, chunk) in chunks.iter().enumerate() {
         if position > 0 && !self.policy.inter_chunk_delay.is_zero() {
            time::sleep(self.policy.inter_chunk_delay).await;
         }

         let outcome = uploader.upload(&upload_id, chunk, total_chunks, sink).await?;
         if let Some(tallies) = outcome.tallies {
            progress.tallies += tallies;
            progress.chunks_uploaded += 1;
         }
         if outcome.cancelled {
            return Ok(None);
         }
      }

      session.transition(SessionStatus::Committing)?;
      let commit = self.commit(&upload_id).await?;
      session.transition(SessionStatus::Committed)?;
      Ok(Some(commit))
   }

   async fn open(&self, session: &mut SyncSession) -> Result<String, SyncError> {
      let request = StartRequest {
         mode:        session.mode(),
         total_count: session.total_count(),
         source:      self.policy.source.clone(),
      };
      let response = self.transport.start(&request).await?;
      if !response.success {
         return Err(transport::rejected("start", response.error));
      }
      let upload_id = response
         .upload_id
         .filter(|id| !id.is_empty())
         .ok_or_else(|| SyncError::Protocol {
            op:     "start",
            reason: "response is missing 'upload_id'".to_string(),
         })?;

      tracing::info!(
         %upload_id,
         mode = %request.mode,
         total_count = request.total_count,
         "session started"
      );
      session.session_id = Some(upload_id.clone());
      Ok(upload_id)
   }

   async fn commit(&self, upload_id: &str) -> Result<CommitResponse, SyncError> {
      let response = self.transport.commit(upload_id).await?;
      if !response.success {
         return Err(transport::rejected("commit", response.error));
      }
      Ok(response)
   }

   /// Optional progress snapshot of a server-side session.
   pub async fn status(&self, upload_id: &str) -> Result<StatusSnapshot, SyncError> {
      self.transport.status(upload_id).await
   }

   /// Lightweight reachability and credential check.
   pub async fn ping(&self) -> Result<(), SyncError> {
      self.transport.ping().await
   }
}
