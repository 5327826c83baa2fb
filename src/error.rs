use std::{io, time::Duration};

use serde::{Serialize, ser::SerializeStruct};
use thiserror::Error;

/// Main error type for the catsync application.
///
/// Protocol failures that belong in a [`ReconciliationReport`] are carried as
/// [`SyncError`]; everything else (local I/O, config parsing, output
/// formatting) lands here.
///
/// [`ReconciliationReport`]: crate::report::ReconciliationReport
#[derive(Debug, Error)]
pub enum Error {
   /// I/O error occurred while reading identifiers or config.
   #[error("io error: {0}")]
   Io(#[from] io::Error),

   /// Batch protocol error.
   #[error("sync error: {0}")]
   Sync(#[from] SyncError),

   /// Configuration-related error occurred.
   #[error("config error: {0}")]
   Config(#[from] ConfigError),

   /// JSON serialization or deserialization error occurred.
   #[error("json error: {0}")]
   Json(#[from] serde_json::Error),

   /// TOML serialization error occurred.
   #[error("toml error: {0}")]
   Toml(#[from] toml::ser::Error),

   /// Error already reported to the user (e.g., JSON output emitted).
   #[error("{message}")]
   Reported { message: String, exit_code: i32 },
}

impl Error {
   pub fn exit_code(&self) -> i32 {
      match self {
         Self::Reported { exit_code, .. } => *exit_code,
         Self::Sync(err) => err.exit_code(),
         Self::Config(_) => 2,
         _ => 1,
      }
   }
}

/// Whether a failed call may be attempted again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
   Retryable,
   Fatal,
}

/// Classified failure of one batch protocol call.
///
/// Only [`SyncError::RateLimited`] and timed-out transport errors are
/// retryable. Everything else aborts the session.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SyncError {
   /// No server URL or credential; raised before any network call.
   #[error("configuration error: {0}")]
   Configuration(String),

   /// DNS, connect or timeout failure.
   #[error("transport error during {op}: {message}")]
   Transport {
      op:        &'static str,
      message:   String,
      timed_out: bool,
   },

   /// HTTP 401. The stored credential has been invalidated.
   #[error("authentication rejected during {op}")]
   Auth { op: &'static str },

   /// HTTP 429.
   #[error("rate limited during {op}")]
   RateLimited {
      op:          &'static str,
      retry_after: Option<Duration>,
   },

   /// Any other non-2xx status, or a 2xx body with `success: false`.
   #[error("server rejected {op} (HTTP {status}): {message}")]
   ServerRejected {
      op:      &'static str,
      status:  u16,
      message: String,
   },

   /// Malformed body or missing expected field in a successful response.
   #[error("protocol error during {op}: {reason}")]
   Protocol { op: &'static str, reason: String },

   /// A retryable error kept recurring until the attempt budget ran out.
   #[error("giving up on {op} after {attempts} attempts: {last}")]
   RetriesExhausted {
      op:       &'static str,
      attempts: u32,
      last:     Box<SyncError>,
   },
}

impl SyncError {
   pub const fn class(&self) -> ErrorClass {
      match self {
         Self::RateLimited { .. } | Self::Transport { timed_out: true, .. } => ErrorClass::Retryable,
         _ => ErrorClass::Fatal,
      }
   }

   pub const fn is_retryable(&self) -> bool {
      matches!(self.class(), ErrorClass::Retryable)
   }

   /// True when the caller's stored credential should be discarded.
   pub fn invalidates_credential(&self) -> bool {
      match self {
         Self::Auth { .. } => true,
         Self::RetriesExhausted { last, .. } => last.invalidates_credential(),
         _ => false,
      }
   }

   /// Stable machine-readable name used in JSON reports.
   pub fn kind(&self) -> &'static str {
      match self {
         Self::Configuration(_) => "configuration",
         Self::Transport { .. } => "transport",
         Self::Auth { .. } => "auth",
         Self::RateLimited { .. } => "rate_limited",
         Self::ServerRejected { .. } => "server_rejected",
         Self::Protocol { .. } => "protocol",
         Self::RetriesExhausted { last, .. } => last.kind(),
      }
   }

   /// HTTP status associated with the failure, if any.
   pub fn http_status(&self) -> Option<u16> {
      match self {
         Self::Auth { .. } => Some(401),
         Self::RateLimited { .. } => Some(429),
         Self::ServerRejected { status, .. } => Some(*status),
         Self::RetriesExhausted { last, .. } => last.http_status(),
         _ => None,
      }
   }

   pub fn exit_code(&self) -> i32 {
      match self {
         Self::Configuration(_) => 2,
         Self::Auth { .. } => 3,
         Self::RateLimited { .. } => 4,
         Self::RetriesExhausted { last, .. } => last.exit_code(),
         _ => 1,
      }
   }
}

impl Serialize for SyncError {
   fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
      let mut state = serializer.serialize_struct("SyncError", 4)?;
      state.serialize_field("kind", self.kind())?;
      state.serialize_field("message", &self.to_string())?;
      state.serialize_field("status", &self.http_status())?;
      state.serialize_field("retryable", &self.is_retryable())?;
      state.end()
   }
}

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
   /// The layered config could not be extracted.
   #[error("failed to parse config: {0}")]
   Extract(#[source] Box<figment::Error>),

   /// Failed to create the config directory.
   #[error("failed to create config directory: {0}")]
   CreateDir(#[source] io::Error),
}

impl From<figment::Error> for ConfigError {
   fn from(e: figment::Error) -> Self {
      Self::Extract(Box::new(e))
   }
}

/// Standard result type using [`enum@Error`] as the default error type
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn rate_limit_and_timeout_are_retryable() {
      let limited = SyncError::RateLimited { op: "chunk", retry_after: None };
      let timeout =
         SyncError::Transport { op: "chunk", message: "timed out".into(), timed_out: true };
      assert!(limited.is_retryable());
      assert!(timeout.is_retryable());
   }

   #[test]
   fn connect_failures_and_rejections_are_fatal() {
      let connect =
         SyncError::Transport { op: "start", message: "refused".into(), timed_out: false };
      let rejected =
         SyncError::ServerRejected { op: "chunk", status: 422, message: "bad".into() };
      let auth = SyncError::Auth { op: "commit" };
      assert_eq!(connect.class(), ErrorClass::Fatal);
      assert_eq!(rejected.class(), ErrorClass::Fatal);
      assert_eq!(auth.class(), ErrorClass::Fatal);
   }

   #[test]
   fn exhausted_retries_are_fatal_but_keep_inner_kind() {
      let err = SyncError::RetriesExhausted {
         op:       "chunk",
         attempts: 3,
         last:     Box::new(SyncError::RateLimited { op: "chunk", retry_after: None }),
      };
      assert!(!err.is_retryable());
      assert_eq!(err.kind(), "rate_limited");
      assert_eq!(err.http_status(), Some(429));
      assert_eq!(err.exit_code(), 4);
   }

   #[test]
   fn only_auth_invalidates_credential() {
      assert!(SyncError::Auth { op: "start" }.invalidates_credential());
      assert!(!SyncError::RateLimited { op: "start", retry_after: None }.invalidates_credential());
   }

   #[test]
   fn serializes_as_summary() {
      let err = SyncError::ServerRejected { op: "commit", status: 409, message: "stale".into() };
      let value = serde_json::to_value(&err).unwrap();
      assert_eq!(value["kind"], "server_rejected");
      assert_eq!(value["status"], 409);
      assert_eq!(value["retryable"], false);
   }
}
