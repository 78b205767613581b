// FILE: src/config.rs
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite file backing the index.
    pub db_path: PathBuf,
    /// `tracing_subscriber` filter directive.
    pub log_filter: String,
    /// How often the watcher purges records whose file is gone.
    pub resync_interval: Duration,
    /// Default result cap for the CLI `search` command.
    pub query_limit: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            log_filter: "info".to_string(),
            resync_interval: Duration::from_secs(300),
            query_limit: 50,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let db_path = env::var_os("WOXEL_DB_PATH")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.db_path);

        let log_filter = env::var("WOXEL_LOG")
            .or_else(|_| env::var("RUST_LOG"))
            .unwrap_or(defaults.log_filter);

        let resync_interval = match env::var("WOXEL_RESYNC_SECS") {
            Ok(v) => parse_resync_secs(&v)?,
            Err(_) => defaults.resync_interval,
        };

        let query_limit = match env::var("WOXEL_QUERY_LIMIT") {
            Ok(v) => v.trim().parse::<i64>().context("WOXEL_QUERY_LIMIT must be integer")?,
            Err(_) => defaults.query_limit,
        };

        Ok(Self { db_path, log_filter, resync_interval, query_limit })
    }
}

/// The watcher polls every 50 ms, so a zero interval would purge on every poll.
fn parse_resync_secs(value: &str) -> Result<Duration> {
    let secs = value.trim().parse::<u64>().context("WOXEL_RESYNC_SECS must be integer")?;
    if secs == 0 {
        bail!("WOXEL_RESYNC_SECS must be at least 1");
    }
    Ok(Duration::from_secs(secs))
}

fn default_db_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|p| p.join("woxel"))
        .unwrap_or_else(|| PathBuf::from("/tmp").join(".woxel"))
        .join("index.db")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert!(cfg.db_path.ends_with("index.db"));
        assert_eq!(cfg.log_filter, "info");
        assert_eq!(cfg.resync_interval, Duration::from_secs(300));
        assert_eq!(cfg.query_limit, 50);
    }

    #[test]
    fn test_resync_secs_parsing() {
        assert_eq!(parse_resync_secs(" 30 ").unwrap(), Duration::from_secs(30));
        assert!(parse_resync_secs("abc").is_err());
        assert!(parse_resync_secs("-5").is_err());
        assert!(parse_resync_secs("0").is_err());
    }

    // The only test in the crate that touches WOXEL_RESYNC_SECS.
    #[test]
    fn test_from_env_rejects_bad_resync_secs() {
        env::set_var("WOXEL_RESYNC_SECS", "abc");
        let err = Config::from_env().unwrap_err();
        assert!(err.to_string().contains("WOXEL_RESYNC_SECS"));

        env::set_var("WOXEL_RESYNC_SECS", "0");
        assert!(Config::from_env().is_err());

        env::set_var("WOXEL_RESYNC_SECS", "42");
        let cfg = Config::from_env().unwrap();
        assert_eq!(cfg.resync_interval, Duration::from_secs(42));
        env::remove_var("WOXEL_RESYNC_SECS");
    }
}
