//! Operator configuration: durable JSON file with defaults, merge, and
//! mtime-based hot reload.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{info, warn};

use crate::error::Result;

/// Default location of the persisted configuration, next to the daemon.
pub const DEFAULT_CONFIG_FILE: &str = "monitor_config.json";

/// Fixed timeout for a single TCP reachability probe.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Watchdog configuration snapshot
///
/// Every field has a default, so a partially-specified file merges over the
/// defaults and the snapshot is always fully populated. Unknown keys in the
/// file are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Master switch: when false the supervisor pauses entirely
    pub active: bool,
    /// Host probed for reachability
    pub server_host: String,
    /// Port probed for reachability
    pub server_port: u16,
    /// Seconds between supervisory cycles
    pub check_interval_secs: u64,
    /// Consecutive probe failures tolerated before kill + restart
    pub failure_limit: u32,
    /// Grace period after a (re)start before probing resumes, in seconds
    pub startup_delay_secs: u64,
    /// Opaque shell command that starts the server
    pub start_command: String,
    /// Opaque shell command that restarts the server
    pub restart_command: String,
    /// OS process names used for liveness and kill matching
    pub server_process_names: Vec<String>,
    /// Webhook endpoint for event notifications (None disables delivery)
    pub webhook_url: Option<String>,
    /// Avatar icon attached to webhook messages
    pub icon_url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            active: true,
            server_host: "127.0.0.1".to_string(),
            server_port: 27015,
            check_interval_secs: 60,
            failure_limit: 10,
            startup_delay_secs: 240,
            start_command: "./gmodserver start".to_string(),
            restart_command: "./gmodserver restart".to_string(),
            server_process_names: vec!["srcds_run".to_string(), "srcds_linux".to_string()],
            webhook_url: None,
            icon_url: None,
        }
    }
}

impl Config {
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    pub fn startup_delay(&self) -> Duration {
        Duration::from_secs(self.startup_delay_secs)
    }

    /// Validate configuration values
    ///
    /// Violations are reported for logging only; the daemon keeps running on
    /// whatever snapshot it has.
    pub fn validate(&self) -> std::result::Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.check_interval_secs == 0 {
            errors.push("check_interval_secs should be positive".to_string());
        }

        if self.failure_limit == 0 {
            errors.push("failure_limit of 0 restarts on every failed probe".to_string());
        }

        if self.server_process_names.is_empty() {
            errors.push(
                "server_process_names is empty; liveness and kill matching will never match"
                    .to_string(),
            );
        }

        if self.server_host.trim().is_empty() {
            errors.push("server_host is empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Loads, persists, and hot-reloads the configuration file.
///
/// Reload is driven by the file's modification timestamp: an unchanged file
/// costs one `stat` per cycle. A malformed file keeps the previous valid
/// snapshot in effect.
pub struct ConfigStore {
    path: PathBuf,
    snapshot: Config,
    last_mtime: Option<SystemTime>,
}

impl ConfigStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            snapshot: Config::default(),
            last_mtime: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Latest snapshot without touching the filesystem.
    pub fn snapshot(&self) -> &Config {
        &self.snapshot
    }

    /// Write the default configuration if no file exists yet.
    ///
    /// Failure is logged, never fatal: the daemon continues on in-memory
    /// defaults.
    pub fn ensure_exists(&self) {
        if self.path.exists() {
            return;
        }
        match serde_json::to_string_pretty(&Config::default()) {
            Ok(body) => match fs::write(&self.path, body) {
                Ok(()) => info!(path = %self.path.display(), "created default configuration"),
                Err(e) => warn!("failed to write default configuration: {e}"),
            },
            Err(e) => warn!("failed to serialize default configuration: {e}"),
        }
    }

    /// Re-read the file if its modification timestamp changed.
    ///
    /// Returns the current snapshot either way. A missing file is recreated
    /// with defaults and re-read once; a malformed file leaves the previous
    /// snapshot in effect.
    pub fn reload(&mut self) -> &Config {
        self.reload_inner(true);
        &self.snapshot
    }

    fn reload_inner(&mut self, recreate_missing: bool) {
        let mtime = match fs::metadata(&self.path).and_then(|m| m.modified()) {
            Ok(mtime) => mtime,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                if recreate_missing {
                    warn!("configuration file missing; recreating with defaults");
                    self.ensure_exists();
                    self.reload_inner(false);
                }
                return;
            }
            Err(e) => {
                warn!("failed to stat configuration: {e}; keeping previous snapshot");
                return;
            }
        };

        if self.last_mtime == Some(mtime) {
            return;
        }
        // Record the mtime first so a broken file is reported once, not every
        // cycle; the next edit bumps the mtime and triggers a fresh parse.
        self.last_mtime = Some(mtime);

        match self.read_file() {
            Ok(config) => {
                let prev_active = self.snapshot.active;
                self.snapshot = config;
                info!(active = self.snapshot.active, "configuration reloaded");
                if prev_active != self.snapshot.active {
                    if self.snapshot.active {
                        info!("monitoring RESUMED (active: true)");
                    } else {
                        info!("monitoring PAUSED (active: false)");
                    }
                }
            }
            Err(e) => {
                warn!("invalid configuration ({e}); keeping previous snapshot");
            }
        }
    }

    fn read_file(&self) -> Result<Config> {
        let raw = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use tempfile::TempDir;

    // Filesystems with coarse mtime granularity would otherwise miss
    // back-to-back writes in these tests.
    fn write_config(path: &Path, body: &str) {
        sleep(Duration::from_millis(20));
        fs::write(path, body).unwrap();
    }

    fn store_in(dir: &TempDir) -> ConfigStore {
        ConfigStore::new(dir.path().join(DEFAULT_CONFIG_FILE))
    }

    #[test]
    fn defaults_are_fully_populated() {
        let config = Config::default();
        assert!(config.active);
        assert_eq!(config.server_port, 27015);
        assert_eq!(config.check_interval_secs, 60);
        assert_eq!(config.failure_limit, 10);
        assert_eq!(config.startup_delay_secs, 240);
        assert_eq!(config.server_process_names.len(), 2);
        assert!(config.webhook_url.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn ensure_exists_creates_default_file() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        store.ensure_exists();
        assert!(store.path().exists());
        assert_eq!(store.reload(), &Config::default());
    }

    #[test]
    fn partial_file_merges_over_defaults() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        write_config(
            store.path(),
            r#"{"server_port": 28015, "failure_limit": 5}"#,
        );

        let config = store.reload().clone();
        assert_eq!(config.server_port, 28015);
        assert_eq!(config.failure_limit, 5);
        // Everything absent from the file keeps its default.
        assert_eq!(config.server_host, "127.0.0.1");
        assert_eq!(config.check_interval_secs, 60);
        assert_eq!(config.start_command, "./gmodserver start");
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        write_config(
            store.path(),
            r#"{"active": false, "some_future_knob": 42, "nested": {"x": 1}}"#,
        );

        let config = store.reload();
        assert!(!config.active);
        assert_eq!(config.server_port, 27015);
    }

    #[test]
    fn reload_without_change_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        write_config(store.path(), r#"{"failure_limit": 7}"#);

        let first = store.reload().clone();
        let second = store.reload().clone();
        assert_eq!(first, second);
        assert_eq!(second.failure_limit, 7);
    }

    #[test]
    fn malformed_file_keeps_previous_snapshot() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        write_config(store.path(), r#"{"failure_limit": 7}"#);
        assert_eq!(store.reload().failure_limit, 7);

        write_config(store.path(), r#"{"failure_limit": "#);
        let config = store.reload();
        assert_eq!(config.failure_limit, 7);

        // A later valid edit is picked up again.
        write_config(store.path(), r#"{"failure_limit": 9}"#);
        assert_eq!(store.reload().failure_limit, 9);
    }

    #[test]
    fn missing_file_is_recreated_with_defaults() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        write_config(store.path(), r#"{"failure_limit": 7}"#);
        assert_eq!(store.reload().failure_limit, 7);

        fs::remove_file(store.path()).unwrap();
        let config = store.reload().clone();
        assert!(store.path().exists());
        assert_eq!(config, Config::default());
    }

    #[test]
    fn validate_flags_degenerate_values() {
        let config = Config {
            check_interval_secs: 0,
            server_process_names: Vec::new(),
            ..Config::default()
        };
        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 2);
    }
}
