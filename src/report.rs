//! Terminal result of a sync run.

use serde::Serialize;

use crate::{
   error::SyncError,
   transport::CommitResponse,
   types::{SessionStatus, SyncMode, Tallies},
};

/// Outcome of one sync run.
///
/// `success` is true only for a committed session (or an empty catalog that
/// never needed one). On failure `tallies` holds whatever the client summed
/// from chunk responses; the server's state may differ.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciliationReport {
   pub success:         bool,
   pub status:          SessionStatus,
   pub mode:            SyncMode,
   pub upload_id:       Option<String>,
   pub tallies:         Tallies,
   pub total_processed: u64,
   pub user_item_count: Option<u64>,
   /// Items the server deleted. Always 0 in merge mode.
   pub removed_count:   u64,
   pub chunks_planned:  usize,
   pub chunks_uploaded: usize,
   pub error:           Option<SyncError>,
}

/// Client-side bookkeeping accumulated while a session runs.
#[derive(Debug, Clone, Default)]
pub struct RunProgress {
   pub upload_id:       Option<String>,
   pub tallies:         Tallies,
   pub chunks_planned:  usize,
   pub chunks_uploaded: usize,
}

impl ReconciliationReport {
   /// Empty catalog: nothing to send, nothing contacted.
   pub fn vacuous(mode: SyncMode) -> Self {
      Self {
         success: true,
         status: SessionStatus::Committed,
         mode,
         upload_id: None,
         tallies: Tallies::default(),
         total_processed: 0,
         user_item_count: None,
         removed_count: 0,
         chunks_planned: 0,
         chunks_uploaded: 0,
         error: None,
      }
   }

   /// Builds the report from the commit response. Server tallies win over the
   /// local sum whenever they are present.
   pub fn committed(mode: SyncMode, progress: RunProgress, commit: &CommitResponse) -> Self {
      let tallies = commit.final_tallies.unwrap_or(progress.tallies);
      let removed_count = match mode {
         SyncMode::Replace => commit.removed_count.unwrap_or(0),
         SyncMode::Merge => 0,
      };
      Self {
         success: true,
         status: SessionStatus::Committed,
         mode,
         upload_id: progress.upload_id,
         tallies,
         total_processed: commit.total_processed.unwrap_or_else(|| tallies.total()),
         user_item_count: commit.user_item_count,
         removed_count,
         chunks_planned: progress.chunks_planned,
         chunks_uploaded: progress.chunks_uploaded,
         error: None,
      }
   }

   pub fn failed(mode: SyncMode, progress: RunProgress, error: SyncError) -> Self {
      Self::unsuccessful(SessionStatus::Failed, mode, progress, Some(error))
   }

   pub fn cancelled(mode: SyncMode, progress: RunProgress) -> Self {
      Self::unsuccessful(SessionStatus::Cancelled, mode, progress, None)
   }

   fn unsuccessful(
      status: SessionStatus,
      mode: SyncMode,
      progress: RunProgress,
      error: Option<SyncError>,
   ) -> Self {
      Self {
         success: false,
         status,
         mode,
         upload_id: progress.upload_id,
         tallies: progress.tallies,
         total_processed: progress.tallies.total(),
         user_item_count: None,
         removed_count: 0,
         chunks_planned: progress.chunks_planned,
         chunks_uploaded: progress.chunks_uploaded,
         error,
      }
   }

   /// Process exit code for the CLI.
   pub fn exit_code(&self) -> i32 {
      match (&self.status, &self.error) {
         (SessionStatus::Committed, _) => 0,
         (SessionStatus::Cancelled, _) => 5,
         (_, Some(err)) => err.exit_code(),
         _ => 1,
      }
   }
}
