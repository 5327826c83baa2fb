//! `reqwest` transport for the batch endpoints.

use std::{sync::Arc, time::Duration};

use parking_lot::RwLock;
use reqwest::{
   Client, Method, RequestBuilder, StatusCode,
   header::{AUTHORIZATION, HeaderMap, RETRY_AFTER},
};
use serde::de::DeserializeOwned;

use super::{
   ChunkRequest, ChunkResponse, CommitResponse, ErrorEnvelope, IDEMPOTENCY_HEADER, StartRequest,
   StartResponse, StatusSnapshot, Transport,
};
use crate::{
   config::{AuthScheme, Config},
   error::SyncError,
};

/// Supplies the `Authorization` header value for each call.
pub trait Credentials: Send + Sync {
   /// Full header value, e.g. `ApiKey abc123`. `None` when no credential is
   /// available.
   fn authorization(&self) -> Option<String>;

   /// Called after a 401 so the owner can drop the stored credential.
   fn invalidate(&self) {}
}

/// In-memory credential that forgets itself on 401.
#[derive(Debug)]
pub struct StaticCredentials {
   scheme: AuthScheme,
   key:    RwLock<Option<String>>,
}

impl StaticCredentials {
   pub fn new(scheme: AuthScheme, key: impl Into<String>) -> Self {
      Self { scheme, key: RwLock::new(Some(key.into())) }
   }

   pub fn is_valid(&self) -> bool {
      self.key.read().is_some()
   }
}

impl Credentials for StaticCredentials {
   fn authorization(&self) -> Option<String> {
      self
         .key
         .read()
         .as_deref()
         .map(|key| format!("{} {key}", self.scheme.header_prefix()))
   }

   fn invalidate(&self) {
      *self.key.write() = None;
   }
}

/// Talks to `{base_url}/library/batch/...` over HTTP with JSON bodies.
#[derive(Clone)]
pub struct HttpTransport {
   client:          Client,
   base_url:        String,
   credentials:     Arc<dyn Credentials>,
   request_timeout: Duration,
   status_timeout:  Duration,
}

impl HttpTransport {
   pub fn new(base_url: &str, credentials: Arc<dyn Credentials>) -> Self {
      let defaults = Config::default();
      Self {
         client: Client::new(),
         base_url: base_url.trim_end_matches('/').to_string(),
         credentials,
         request_timeout: defaults.request_timeout(),
         status_timeout: defaults.status_timeout(),
      }
   }

   /// Builds a transport from config, failing before any network call if the
   /// server URL or API key is missing.
   pub fn from_config(cfg: &Config) -> Result<Self, SyncError> {
      let (url, key) = cfg.require_endpoint()?;
      let credentials = Arc::new(StaticCredentials::new(cfg.auth_scheme, key));
      Ok(Self::new(url, credentials).with_timeouts(cfg.request_timeout(), cfg.status_timeout()))
   }

   /// Timeouts for start/chunk/commit and for the lightweight status/ping
   /// calls respectively.
   pub fn with_timeouts(mut self, request: Duration, status: Duration) -> Self {
      self.request_timeout = request;
      self.status_timeout = status;
      self
   }

   pub fn with_client(mut self, client: Client) -> Self {
      self.client = client;
      self
   }

   pub fn base_url(&self) -> &str {
      &self.base_url
   }

   fn url(&self, path: &str) -> String {
      format!("{}/library/batch{path}", self.base_url)
   }

   async fn send<T: DeserializeOwned>(
      &self,
      op: &'static str,
      builder: RequestBuilder,
      timeout: Duration,
   ) -> Result<T, SyncError> {
      let Some(auth) = self.credentials.authorization() else {
         return Err(SyncError::Configuration("no credential available".to_string()));
      };

      let response = builder
         .header(AUTHORIZATION, auth)
         .timeout(timeout)
         .send()
         .await
         .map_err(|e| transport_error(op, &e))?;

      let status = response.status();
      if status.is_success() {
         let body = response.bytes().await.map_err(|e| transport_error(op, &e))?;
         return serde_json::from_slice(&body).map_err(|e| SyncError::Protocol {
            op,
            reason: format!("malformed response body: {e}"),
         });
      }

      let retry_after = parse_retry_after(response.headers());
      let body = response.bytes().await.unwrap_or_default();
      let message = serde_json::from_slice::<ErrorEnvelope>(&body)
         .ok()
         .and_then(|envelope| envelope.error)
         .unwrap_or_else(|| format!("HTTP {} error", status.as_u16()));

      Err(match status {
         StatusCode::UNAUTHORIZED => {
            tracing::warn!(op, "credential rejected; invalidating");
            self.credentials.invalidate();
            SyncError::Auth { op }
         },
         StatusCode::TOO_MANY_REQUESTS => SyncError::RateLimited { op, retry_after },
         _ => SyncError::ServerRejected { op, status: status.as_u16(), message },
      })
   }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
   async fn start(&self, request: &StartRequest) -> Result<StartResponse, SyncError> {
      let builder = self.client.request(Method::POST, self.url("/start")).json(request);
      self.send("start", builder, self.request_timeout).await
   }

   async fn upload_chunk(
      &self,
      upload_id: &str,
      idempotency_key: &str,
      request: &ChunkRequest<'_>,
   ) -> Result<ChunkResponse, SyncError> {
      let builder = self
         .client
         .request(Method::PUT, self.url(&format!("/{upload_id}/chunk")))
         .header(IDEMPOTENCY_HEADER, idempotency_key)
         .json(request);
      self.send("chunk", builder, self.request_timeout).await
   }

   async fn commit(&self, upload_id: &str) -> Result<CommitResponse, SyncError> {
      let builder = self
         .client
         .request(Method::POST, self.url(&format!("/{upload_id}/commit")))
         .json(&serde_json::json!({}));
      self.send("commit", builder, self.request_timeout).await
   }

   async fn status(&self, upload_id: &str) -> Result<StatusSnapshot, SyncError> {
      let builder = self
         .client
         .request(Method::GET, self.url(&format!("/{upload_id}/status")));
      self.send("status", builder, self.status_timeout).await
   }

   async fn ping(&self) -> Result<(), SyncError> {
      let builder = self.client.request(Method::GET, self.url("/ping"));
      self
         .send::<serde_json::Value>("ping", builder, self.status_timeout)
         .await
         .map(|_| ())
   }
}

fn transport_error(op: &'static str, err: &reqwest::Error) -> SyncError {
   SyncError::Transport { op, message: err.to_string(), timed_out: err.is_timeout() }
}

/// Parses a `Retry-After` header given in whole seconds. HTTP-date values are
/// ignored.
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
   headers
      .get(RETRY_AFTER)?
      .to_str()
      .ok()?
      .trim()
      .parse::<u64>()
      .ok()
      .map(Duration::from_secs)
}
