//! Batch endpoint abstraction with a `reqwest` implementation.
//!
//! Transports only move bytes and classify HTTP-level failures. Checking the
//! `success` flag and required fields of a 2xx body is left to the caller so
//! that every transport is judged by the same rules.

pub mod http;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{
   error::SyncError,
   types::{ItemRecord, SyncMode, Tallies},
};

pub use http::{Credentials, HttpTransport, StaticCredentials};

/// Header carrying the per-chunk idempotency token.
pub const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

/// Body of `POST /library/batch/start`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartRequest {
   pub mode:        SyncMode,
   pub total_count: u64,
   pub source:      String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StartResponse {
   #[serde(default)]
   pub success:   bool,
   pub upload_id: Option<String>,
   pub error:     Option<String>,
}

/// Body of `PUT /library/batch/{upload_id}/chunk`.
#[derive(Debug, Clone, Serialize)]
pub struct ChunkRequest<'a> {
   pub chunk_index: usize,
   pub items:       &'a [ItemRecord],
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChunkResponse {
   #[serde(default)]
   pub success: bool,
   pub results: Option<Tallies>,
   pub error:   Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommitResponse {
   #[serde(default)]
   pub success:         bool,
   pub final_tallies:   Option<Tallies>,
   pub user_item_count: Option<u64>,
   pub removed_count:   Option<u64>,
   pub total_processed: Option<u64>,
   pub error:           Option<String>,
}

/// Progress snapshot from `GET /library/batch/{upload_id}/status`. Only the
/// envelope is fixed; everything else is passed through.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusSnapshot {
   #[serde(default)]
   pub success: bool,
   #[serde(default, skip_serializing_if = "Option::is_none")]
   pub error:   Option<String>,
   #[serde(flatten)]
   pub fields:  serde_json::Map<String, serde_json::Value>,
}

/// Error body returned on non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorEnvelope {
   pub error: Option<String>,
}

/// The four calls of the batch protocol plus a connectivity probe.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
   async fn start(&self, request: &StartRequest) -> Result<StartResponse, SyncError>;

   async fn upload_chunk(
      &self,
      upload_id: &str,
      idempotency_key: &str,
      request: &ChunkRequest<'_>,
   ) -> Result<ChunkResponse, SyncError>;

   async fn commit(&self, upload_id: &str) -> Result<CommitResponse, SyncError>;

   async fn status(&self, upload_id: &str) -> Result<StatusSnapshot, SyncError>;

   async fn ping(&self) -> Result<(), SyncError>;
}

#[async_trait::async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
   async fn start(&self, request: &StartRequest) -> Result<StartResponse, SyncError> {
      (**self).start(request).await
   }

   async fn upload_chunk(
      &self,
      upload_id: &str,
      idempotency_key: &str,
      request: &ChunkRequest<'_>,
   ) -> Result<ChunkResponse, SyncError> {
      (**self).upload_chunk(upload_id, idempotency_key, request).await
   }

   async fn commit(&self, upload_id: &str) -> Result<CommitResponse, SyncError> {
      (**self).commit(upload_id).await
   }

   async fn status(&self, upload_id: &str) -> Result<StatusSnapshot, SyncError> {
      (**self).status(upload_id).await
   }

   async fn ping(&self) -> Result<(), SyncError> {
      (**self).ping().await
   }
}

/// Turns a server-declared failure (`success: false`) into a rejection.
pub(crate) fn rejected(op: &'static str, error: Option<String>) -> SyncError {
   SyncError::ServerRejected {
      op,
      status: 200,
      message: error.unwrap_or_else(|| "server reported failure".to_string()),
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn chunk_request_matches_wire_shape() {
      let items = [ItemRecord::new("tt0111161"), ItemRecord::new("tt0068646")];
      let body = serde_json::to_value(ChunkRequest { chunk_index: 4, items: &items }).unwrap();
      assert_eq!(
         body,
         serde_json::json!({
            "chunk_index": 4,
            "items": [{"identifier": "tt0111161"}, {"identifier": "tt0068646"}],
         })
      );
   }

   #[test]
   fn start_request_uses_lowercase_mode() {
      let body = serde_json::to_value(StartRequest {
         mode:        SyncMode::Replace,
         total_count: 12,
         source:      "catsync".into(),
      })
      .unwrap();
      assert_eq!(body["mode"], "replace");
      assert_eq!(body["total_count"], 12);
   }

   #[test]
   fn commit_response_fields_are_optional() {
      let resp: CommitResponse = serde_json::from_str(r#"{"success": true}"#).unwrap();
      assert!(resp.success);
      assert!(resp.final_tallies.is_none());
      assert!(resp.removed_count.is_none());
   }

   #[test]
   fn status_snapshot_keeps_unknown_fields() {
      let snap: StatusSnapshot =
         serde_json::from_str(r#"{"success": true, "chunks_received": 3, "state": "open"}"#)
            .unwrap();
      assert_eq!(snap.fields["chunks_received"], 3);
      assert_eq!(snap.fields["state"], "open");
   }
}
