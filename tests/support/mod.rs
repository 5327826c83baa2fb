#![allow(dead_code, reason = "each test binary uses a different subset")]

use std::{
   collections::{HashMap, VecDeque},
   sync::Arc,
   time::Duration,
};

use catalog_sync::{
   SyncError,
   config::SyncPolicy,
   transport::{
      ChunkRequest, ChunkResponse, CommitResponse, StartRequest, StartResponse, StatusSnapshot,
      Transport,
   },
   types::{SyncMode, Tallies},
};
use parking_lot::Mutex;

/// Every call the fake received, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
   Start { mode: SyncMode, total_count: u64, source: String },
   Chunk { upload_id: String, index: usize, key: String, identifiers: Vec<String> },
   Commit { upload_id: String },
   Status { upload_id: String },
   Ping,
}

/// In-memory transport that records calls and replays scripted responses.
///
/// Unscripted chunks succeed with every item accepted. Unscripted commits
/// succeed without `final_tallies`.
pub struct FakeTransport {
   calls:  Mutex<Vec<Call>>,
   start:  Mutex<Result<StartResponse, SyncError>>,
   chunks: Mutex<HashMap<usize, VecDeque<Result<ChunkResponse, SyncError>>>>,
   commit: Mutex<Result<CommitResponse, SyncError>>,
}

impl Default for FakeTransport {
   fn default() -> Self {
      Self {
         calls:  Mutex::new(Vec::new()),
         start:  Mutex::new(Ok(StartResponse {
            success:   true,
            upload_id: Some("upload-1".to_string()),
            error:     None,
         })),
         chunks: Mutex::new(HashMap::new()),
         commit: Mutex::new(Ok(CommitResponse { success: true, ..CommitResponse::default() })),
      }
   }
}

impl FakeTransport {
   pub fn new() -> Arc<Self> {
      Arc::new(Self::default())
   }

   pub fn with_start(self: Arc<Self>, result: Result<StartResponse, SyncError>) -> Arc<Self> {
      *self.start.lock() = result;
      self
   }

   pub fn with_commit(self: Arc<Self>, result: Result<CommitResponse, SyncError>) -> Arc<Self> {
      *self.commit.lock() = result;
      self
   }

   /// Queues responses for successive attempts of chunk `index`.
   pub fn script_chunk(
      self: Arc<Self>,
      index: usize,
      results: impl IntoIterator<Item = Result<ChunkResponse, SyncError>>,
   ) -> Arc<Self> {
      self.chunks.lock().entry(index).or_default().extend(results);
      self
   }

   pub fn calls(&self) -> Vec<Call> {
      self.calls.lock().clone()
   }

   pub fn chunk_indices(&self) -> Vec<usize> {
      self
         .calls()
         .into_iter()
         .filter_map(|call| match call {
            Call::Chunk { index, .. } => Some(index),
            _ => None,
         })
         .collect()
   }

   pub fn chunk_keys(&self, chunk_index: usize) -> Vec<String> {
      self
         .calls()
         .into_iter()
         .filter_map(|call| match call {
            Call::Chunk { index, key, .. } if index == chunk_index => Some(key),
            _ => None,
         })
         .collect()
   }

   pub fn uploaded_identifiers(&self) -> Vec<String> {
      self
         .calls()
         .into_iter()
         .filter_map(|call| match call {
            Call::Chunk { identifiers, .. } => Some(identifiers),
            _ => None,
         })
         .flatten()
         .collect()
   }

   pub fn start_count(&self) -> usize {
      self.count(|c| matches!(c, Call::Start { .. }))
   }

   pub fn commit_count(&self) -> usize {
      self.count(|c| matches!(c, Call::Commit { .. }))
   }

   fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
      self.calls.lock().iter().filter(|c| pred(c)).count()
   }
}

#[async_trait::async_trait]
impl Transport for FakeTransport {
   async fn start(&self, request: &StartRequest) -> Result<StartResponse, SyncError> {
      self.calls.lock().push(Call::Start {
         mode:        request.mode,
         total_count: request.total_count,
         source:      request.source.clone(),
      });
      self.start.lock().clone()
   }

   async fn upload_chunk(
      &self,
      upload_id: &str,
      idempotency_key: &str,
      request: &ChunkRequest<'_>,
   ) -> Result<ChunkResponse, SyncError> {
      self.calls.lock().push(Call::Chunk {
         upload_id:   upload_id.to_string(),
         index:       request.chunk_index,
         key:         idempotency_key.to_string(),
         identifiers: request.items.iter().map(|i| i.identifier.clone()).collect(),
      });
      let scripted = self
         .chunks
         .lock()
         .get_mut(&request.chunk_index)
         .and_then(VecDeque::pop_front);
      scripted.unwrap_or_else(|| Ok(accepted(request.items.len() as u64)))
   }

   async fn commit(&self, upload_id: &str) -> Result<CommitResponse, SyncError> {
      self.calls.lock().push(Call::Commit { upload_id: upload_id.to_string() });
      self.commit.lock().clone()
   }

   async fn status(&self, upload_id: &str) -> Result<StatusSnapshot, SyncError> {
      self.calls.lock().push(Call::Status { upload_id: upload_id.to_string() });
      Ok(StatusSnapshot { success: true, ..StatusSnapshot::default() })
   }

   async fn ping(&self) -> Result<(), SyncError> {
      self.calls.lock().push(Call::Ping);
      Ok(())
   }
}

pub fn ids(n: usize) -> Vec<String> {
   (0..n).map(|i| format!("tt{i:07}")).collect()
}

pub fn accepted(n: u64) -> ChunkResponse {
   chunk_ok(Tallies::new(n, 0, 0))
}

pub fn chunk_ok(tallies: Tallies) -> ChunkResponse {
   ChunkResponse { success: true, results: Some(tallies), error: None }
}

pub fn commit_ok(
   final_tallies: Option<Tallies>,
   removed_count: Option<u64>,
   user_item_count: Option<u64>,
) -> CommitResponse {
   CommitResponse {
      success: true,
      final_tallies,
      user_item_count,
      removed_count,
      total_processed: None,
      error: None,
   }
}

pub const fn rate_limited() -> SyncError {
   SyncError::RateLimited { op: "chunk", retry_after: None }
}

/// Policy with no pacing delays; for tests that do not measure time.
pub fn instant_policy(chunk_size: usize) -> SyncPolicy {
   SyncPolicy {
      chunk_size,
      retry_backoff: Duration::ZERO,
      max_retry_backoff: Duration::ZERO,
      inter_chunk_delay: Duration::ZERO,
      ..SyncPolicy::default()
   }
}
