//! Chunked, idempotent batch synchronization of a local catalog into a remote
//! search index.
//!
//! A sync plans the catalog into ordered chunks, opens a server session,
//! uploads every chunk in sequence with bounded retry, and commits. Nothing
//! takes effect server-side until the commit succeeds.

pub mod cmd;
pub mod config;
pub mod error;
pub mod plan;
pub mod progress;
pub mod report;
pub mod session;
pub mod source;
pub mod transport;
pub mod types;
pub mod upload;

pub use error::{Error, Result, SyncError};
