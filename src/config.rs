//! Configuration for the server endpoint, credentials, and sync pacing.

use std::{
   fs,
   path::{Path, PathBuf},
   sync::OnceLock,
   time::Duration,
};

use directories::BaseDirs;
use figment::{
   Figment,
   providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::{
   error::{ConfigError, Result, SyncError},
   plan::MAX_CHUNK_SIZE,
};

static CONFIG: OnceLock<Config> = OnceLock::new();

pub const MAX_ATTEMPTS_CAP: u32 = 10;
pub const MAX_REQUEST_TIMEOUT_MS_CAP: u64 = 300_000;

/// How idempotency keys are assigned to chunk upload attempts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IdempotencyMode {
   /// One key per chunk, replayed on every retry of that chunk.
   #[default]
   PerChunk,
   /// A fresh key for every attempt. Matches legacy clients; a retried chunk
   /// is indistinguishable from a new delivery on the server.
   PerAttempt,
}

/// Scheme used in the `Authorization` header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthScheme {
   #[default]
   ApiKey,
   Bearer,
}

impl AuthScheme {
   pub const fn header_prefix(self) -> &'static str {
      match self {
         Self::ApiKey => "ApiKey",
         Self::Bearer => "Bearer",
      }
   }
}

/// Application configuration loaded from config file and environment variables
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
   #[serde(skip_serializing_if = "Option::is_none")]
   pub server_url:  Option<String>,
   #[serde(skip_serializing_if = "Option::is_none")]
   pub api_key:     Option<String>,
   pub auth_scheme: AuthScheme,
   pub source:      String,

   pub chunk_size:           usize,
   pub request_timeout_ms:   u64,
   pub status_timeout_ms:    u64,
   pub inter_chunk_delay_ms: u64,
   pub retry_backoff_ms:     u64,
   pub max_retry_backoff_ms: u64,
   pub max_attempts:         u32,
   pub idempotency_mode:     IdempotencyMode,
}

impl Default for Config {
   fn default() -> Self {
      Self {
         server_url:           None,
         api_key:              None,
         auth_scheme:          AuthScheme::ApiKey,
         source:               "catsync".to_string(),
         chunk_size:           500,
         request_timeout_ms:   30_000,
         status_timeout_ms:    10_000,
         inter_chunk_delay_ms: 1_000,
         retry_backoff_ms:     30_000,
         max_retry_backoff_ms: 120_000,
         max_attempts:         3,
         idempotency_mode:     IdempotencyMode::PerChunk,
      }
   }
}

impl Config {
   /// Loads `~/.catsync/config.toml` layered over defaults, then `CATSYNC_*`
   /// environment variables. Falls back to defaults on parse failure.
   pub fn load() -> Self {
      let config_path = ensure_global_config();
      Self::load_from(config_path)
         .inspect_err(|e| tracing::warn!("failed to parse config: {e}"))
         .unwrap_or_default()
   }

   /// Loads an explicit config file layered the same way as [`Config::load`].
   pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
      let config = Figment::from(Serialized::defaults(Self::default()))
         .merge(Toml::file(path))
         .merge(Env::prefixed("CATSYNC_").lowercase(true))
         .extract()?;
      Ok(config)
   }

   fn create_default_config(path: &Path) -> Result<(), ConfigError> {
      if let Some(parent) = path.parent() {
         fs::create_dir_all(parent).map_err(ConfigError::CreateDir)?;
      }
      let default_config = Self::default();
      if let Ok(toml) = toml::to_string_pretty(&default_config) {
         let _ = fs::write(path, toml);
      }
      Ok(())
   }

   pub fn effective_chunk_size(&self) -> usize {
      self.chunk_size.clamp(1, MAX_CHUNK_SIZE)
   }

   pub fn effective_max_attempts(&self) -> u32 {
      self.max_attempts.clamp(1, MAX_ATTEMPTS_CAP)
   }

   pub fn request_timeout(&self) -> Duration {
      Duration::from_millis(self.request_timeout_ms.clamp(1, MAX_REQUEST_TIMEOUT_MS_CAP))
   }

   pub fn status_timeout(&self) -> Duration {
      Duration::from_millis(self.status_timeout_ms.clamp(1, MAX_REQUEST_TIMEOUT_MS_CAP))
   }

   /// Base URL without a trailing slash, if one is configured.
   pub fn base_url(&self) -> Option<&str> {
      self
         .server_url
         .as_deref()
         .map(|url| url.trim().trim_end_matches('/'))
         .filter(|url| !url.is_empty())
   }

   /// The API key, if one is configured and non-blank.
   pub fn credential(&self) -> Option<&str> {
      self.api_key.as_deref().map(str::trim).filter(|key| !key.is_empty())
   }

   /// Checks that a sync can be attempted at all. Runs before any network
   /// call.
   pub fn require_endpoint(&self) -> Result<(&str, &str), SyncError> {
      let Some(url) = self.base_url() else {
         return Err(SyncError::Configuration("no server URL configured".to_string()));
      };
      if !url.starts_with("http://") && !url.starts_with("https://") {
         return Err(SyncError::Configuration(format!(
            "server URL must start with http:// or https://: {url}"
         )));
      }
      let Some(key) = self.credential() else {
         return Err(SyncError::Configuration("no API key configured".to_string()));
      };
      Ok((url, key))
   }

   /// Pacing and retry policy derived from this config.
   pub fn sync_policy(&self) -> SyncPolicy {
      SyncPolicy {
         chunk_size:        self.effective_chunk_size(),
         max_attempts:      self.effective_max_attempts(),
         retry_backoff:     Duration::from_millis(self.retry_backoff_ms),
         max_retry_backoff: Duration::from_millis(
            self.max_retry_backoff_ms.max(self.retry_backoff_ms),
         ),
         inter_chunk_delay: Duration::from_millis(self.inter_chunk_delay_ms),
         idempotency_mode:  self.idempotency_mode,
         source:            self.source.clone(),
      }
   }

   /// Copy safe to print: the API key is replaced with a marker.
   pub fn redacted(&self) -> Self {
      let mut copy = self.clone();
      if copy.api_key.is_some() {
         copy.api_key = Some("<redacted>".to_string());
      }
      copy
   }
}

/// Pacing and retry knobs consumed by the uploader and session controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncPolicy {
   pub chunk_size:        usize,
   /// Total attempts per chunk, including the first.
   pub max_attempts:      u32,
   pub retry_backoff:     Duration,
   pub max_retry_backoff: Duration,
   pub inter_chunk_delay: Duration,
   pub idempotency_mode:  IdempotencyMode,
   pub source:            String,
}

impl Default for SyncPolicy {
   fn default() -> Self {
      Config::default().sync_policy()
   }
}

impl SyncPolicy {
   /// Wait before retrying after `err`. A server `Retry-After` hint can only
   /// lengthen the wait, never beyond `max_retry_backoff`.
   pub fn backoff_for(&self, err: &SyncError) -> Duration {
      let hinted = match err {
         SyncError::RateLimited { retry_after: Some(hint), .. } => *hint,
         _ => Duration::ZERO,
      };
      self.retry_backoff.max(hinted).min(self.max_retry_backoff)
   }
}

/// Returns the global configuration instance
pub fn get() -> &'static Config {
   CONFIG.get_or_init(Config::load)
}

/// Returns the base directory for catsync configuration
pub fn base_dir() -> &'static PathBuf {
   static ONCE: OnceLock<PathBuf> = OnceLock::new();
   ONCE.get_or_init(|| resolve_base_dir(".catsync"))
}

pub fn config_file_path() -> &'static PathBuf {
   static ONCE: OnceLock<PathBuf> = OnceLock::new();
   ONCE.get_or_init(|| base_dir().join("config.toml"))
}

fn ensure_global_config() -> &'static Path {
   let config_path = config_file_path();
   if !config_path.exists()
      && let Err(e) = Config::create_default_config(config_path)
   {
      tracing::warn!("failed to write default config: {e}");
   }
   config_path
}

fn resolve_base_dir(dir_name: &str) -> PathBuf {
   BaseDirs::new()
      .map(|d| d.home_dir().join(dir_name))
      .or_else(|| {
         std::env::var("HOME")
            .ok()
            .map(|h| PathBuf::from(h).join(dir_name))
      })
      .unwrap_or_else(|| {
         std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(dir_name)
      })
}
