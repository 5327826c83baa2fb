use std::{fs, time::Duration};

use catalog_sync::{
   config::{AuthScheme, Config, IdempotencyMode, MAX_ATTEMPTS_CAP},
   plan::MAX_CHUNK_SIZE,
};
use tempfile::TempDir;

fn write_config(body: &str) -> (TempDir, std::path::PathBuf) {
   let dir = TempDir::new().expect("tempdir");
   let path = dir.path().join("config.toml");
   fs::write(&path, body).expect("write config");
   (dir, path)
}

#[test]
fn missing_file_yields_defaults() {
   let dir = TempDir::new().expect("tempdir");
   let cfg = Config::load_from(&dir.path().join("absent.toml")).expect("load");

   assert_eq!(cfg.chunk_size, 500);
   assert_eq!(cfg.max_attempts, 3);
   assert_eq!(cfg.auth_scheme, AuthScheme::ApiKey);
   assert_eq!(cfg.idempotency_mode, IdempotencyMode::PerChunk);
}

#[test]
fn file_values_override_defaults() {
   let (_dir, path) = write_config(
      r#"
server_url = "https://index.example.com/"
api_key = "k-1"
auth_scheme = "bearer"
chunk_size = 250
inter_chunk_delay_ms = 0
idempotency_mode = "per-attempt"
"#,
   );

   let cfg = Config::load_from(&path).expect("load");

   assert_eq!(cfg.base_url(), Some("https://index.example.com"));
   assert_eq!(cfg.credential(), Some("k-1"));
   assert_eq!(cfg.auth_scheme, AuthScheme::Bearer);
   assert_eq!(cfg.idempotency_mode, IdempotencyMode::PerAttempt);
   assert_eq!(cfg.retry_backoff_ms, 30_000);

   let policy = cfg.sync_policy();
   assert_eq!(policy.chunk_size, 250);
   assert_eq!(policy.inter_chunk_delay, Duration::ZERO);
   assert_eq!(policy.idempotency_mode, IdempotencyMode::PerAttempt);
}

#[test]
fn invalid_toml_is_an_error() {
   let (_dir, path) = write_config("chunk_size = \"lots\"");
   assert!(Config::load_from(&path).is_err());
}

#[test]
fn out_of_range_values_are_clamped() {
   let cfg = Config {
      chunk_size: 0,
      max_attempts: 0,
      request_timeout_ms: 0,
      ..Config::default()
   };
   assert_eq!(cfg.effective_chunk_size(), 1);
   assert_eq!(cfg.effective_max_attempts(), 1);
   assert_eq!(cfg.request_timeout(), Duration::from_millis(1));

   let cfg = Config { chunk_size: 9_999, max_attempts: 99, ..Config::default() };
   assert_eq!(cfg.effective_chunk_size(), MAX_CHUNK_SIZE);
   assert_eq!(cfg.effective_max_attempts(), MAX_ATTEMPTS_CAP);
}

#[test]
fn retry_cap_never_undercuts_base_backoff() {
   let cfg = Config { retry_backoff_ms: 90_000, max_retry_backoff_ms: 10_000, ..Config::default() };
   let policy = cfg.sync_policy();
   assert_eq!(policy.retry_backoff, Duration::from_secs(90));
   assert_eq!(policy.max_retry_backoff, Duration::from_secs(90));
}

#[test]
fn redacted_config_serializes_without_secret() {
   let cfg = Config {
      server_url: Some("https://index.example.com".into()),
      api_key: Some("super-secret".into()),
      ..Config::default()
   };

   let rendered = toml::to_string_pretty(&cfg.redacted()).expect("toml");

   assert!(!rendered.contains("super-secret"));
   assert!(rendered.contains("<redacted>"));
   assert!(rendered.contains("chunk_size = 500"));
}
