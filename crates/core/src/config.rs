//! Configuration for the fibflow services.
//!
//! Values come from an optional TOML file (path in FIBFLOW_CONFIG, default
//! ./fibflow.toml), then environment variables override whatever the file
//! provided. The env var names match the ones the deployment already uses
//! (PGHOST, PGPORT, REDIS_HOST, ...).

use serde::{Deserialize, Serialize};
use std::path::Path;

/// HTTP listener settings for the api binary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
  /// Address to bind (default: 0.0.0.0)
  pub host: String,

  /// Port to bind (default: 8080)
  pub port: u16,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      host: "0.0.0.0".to_string(),
      port: 8080,
    }
  }
}

/// Durable store (Postgres) connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostgresConfig {
  pub host: String,
  pub port: u16,
  pub user: String,
  pub password: String,
  pub dbname: String,
}

impl Default for PostgresConfig {
  fn default() -> Self {
    Self {
      host: "localhost".to_string(),
      port: 5432,
      user: "postgres".to_string(),
      password: "postgres".to_string(),
      dbname: "postgres".to_string(),
    }
  }
}

/// Fast-path cache / notification channel (Redis) connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
  pub host: String,
  pub port: u16,
}

impl Default for RedisConfig {
  fn default() -> Self {
    Self {
      host: "redis".to_string(),
      port: 6379,
    }
  }
}

/// Bounded-retry settings for startup readiness checks.
///
/// Exhausting the retries is fatal: the process aborts instead of serving
/// with a missing backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StartupConfig {
  /// Connection attempts against Postgres (default: 5)
  pub store_retries: u32,

  /// Delay between Postgres attempts in milliseconds (default: 2000)
  pub store_retry_delay_ms: u64,

  /// Connection attempts against Redis (default: 5)
  pub cache_retries: u32,

  /// Delay between Redis attempts in milliseconds (default: 1000)
  pub cache_retry_delay_ms: u64,
}

impl Default for StartupConfig {
  fn default() -> Self {
    Self {
      store_retries: 5,
      store_retry_delay_ms: 2000,
      cache_retries: 5,
      cache_retry_delay_ms: 1000,
    }
  }
}

/// fibflow configuration, shared by the api and worker binaries
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
  #[serde(default)]
  pub api: ApiConfig,

  #[serde(default)]
  pub postgres: PostgresConfig,

  #[serde(default)]
  pub redis: RedisConfig,

  #[serde(default)]
  pub startup: StartupConfig,
}

impl Config {
  /// Load config from file (if present), then apply env overrides
  pub fn load() -> Self {
    let path = std::env::var("FIBFLOW_CONFIG").unwrap_or_else(|_| "fibflow.toml".to_string());
    let mut config = Self::load_file(Path::new(&path));
    config.apply_env();
    config
  }

  /// Load config from a specific file, falling back to defaults
  pub fn load_file(path: &Path) -> Self {
    if path.exists()
      && let Ok(content) = std::fs::read_to_string(path)
      && let Ok(config) = toml::from_str(&content)
    {
      return config;
    }

    Self::default()
  }

  /// Apply environment variable overrides on top of the loaded values
  pub fn apply_env(&mut self) {
    if let Ok(port) = std::env::var("PORT")
      && let Ok(port) = port.parse()
    {
      self.api.port = port;
    }

    if let Ok(host) = std::env::var("PGHOST") {
      self.postgres.host = host;
    }
    if let Ok(port) = std::env::var("PGPORT")
      && let Ok(port) = port.parse()
    {
      self.postgres.port = port;
    }
    if let Ok(user) = std::env::var("PGUSER") {
      self.postgres.user = user;
    }
    if let Ok(password) = std::env::var("PGPASSWORD") {
      self.postgres.password = password;
    }
    if let Ok(dbname) = std::env::var("PGDATABASE") {
      self.postgres.dbname = dbname;
    }

    if let Ok(host) = std::env::var("REDIS_HOST") {
      self.redis.host = host;
    }
    if let Ok(port) = std::env::var("REDIS_PORT")
      && let Ok(port) = port.parse()
    {
      self.redis.port = port;
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::Mutex;
  use tempfile::TempDir;

  // Mutex to serialize tests that modify environment variables
  static ENV_MUTEX: Mutex<()> = Mutex::new(());

  #[test]
  fn test_defaults() {
    let config = Config::default();
    assert_eq!(config.api.port, 8080);
    assert_eq!(config.postgres.port, 5432);
    assert_eq!(config.redis.host, "redis");
    assert_eq!(config.startup.store_retries, 5);
    assert_eq!(config.startup.store_retry_delay_ms, 2000);
    assert_eq!(config.startup.cache_retries, 5);
    assert_eq!(config.startup.cache_retry_delay_ms, 1000);
  }

  #[test]
  fn test_load_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("fibflow.toml");

    let content = r#"
[api]
port = 9000

[postgres]
host = "db.internal"

[startup]
cache_retries = 3
"#;
    std::fs::write(&path, content).unwrap();

    let config = Config::load_file(&path);
    assert_eq!(config.api.port, 9000);
    assert_eq!(config.postgres.host, "db.internal");
    assert_eq!(config.startup.cache_retries, 3);
    // Unspecified sections keep their defaults
    assert_eq!(config.redis.port, 6379);
  }

  #[test]
  fn test_load_defaults_when_no_file() {
    let temp = TempDir::new().unwrap();
    let config = Config::load_file(&temp.path().join("missing.toml"));
    assert_eq!(config, Config::default());
  }

  #[test]
  fn test_env_overrides() {
    let _guard = ENV_MUTEX.lock().unwrap();
    let original = std::env::var("PGHOST").ok();

    unsafe {
      std::env::set_var("PGHOST", "pg.example");
    }
    let mut config = Config::default();
    config.apply_env();
    assert_eq!(config.postgres.host, "pg.example");

    if let Some(orig) = original {
      unsafe {
        std::env::set_var("PGHOST", orig);
      }
    } else {
      unsafe {
        std::env::remove_var("PGHOST");
      }
    }
  }

  #[test]
  fn test_env_ignores_unparseable_port() {
    let _guard = ENV_MUTEX.lock().unwrap();
    let original = std::env::var("REDIS_PORT").ok();

    unsafe {
      std::env::set_var("REDIS_PORT", "not-a-port");
    }
    let mut config = Config::default();
    config.apply_env();
    assert_eq!(config.redis.port, 6379);

    if let Some(orig) = original {
      unsafe {
        std::env::set_var("REDIS_PORT", orig);
      }
    } else {
      unsafe {
        std::env::remove_var("REDIS_PORT");
      }
    }
  }

  #[test]
  fn test_toml_roundtrip() {
    let config = Config {
      api: ApiConfig {
        port: 8081,
        ..Default::default()
      },
      ..Default::default()
    };

    let toml_str = toml::to_string_pretty(&config).unwrap();
    let parsed: Config = toml::from_str(&toml_str).unwrap();
    assert_eq!(parsed, config);
  }
}
