// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Dispatch configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::Result;
use crate::types::DEFAULT_SEGMENT_LIMIT;

/// File name of the persisted configuration inside the data directory.
pub const CONFIG_FILE: &str = "dispatch.json";

/// Environment variable overriding [`DispatchConfig::ack_timeout_secs`].
pub const ACK_TIMEOUT_ENV: &str = "SENDWERK_ACK_TIMEOUT_SECS";

/// Sub-directory of the user data directory owned by Sendwerk.
const APP_DIR: &str = "sendwerk";

/// Persistent dispatcher settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// How long to wait for the "sent" acknowledgment (default 10).
    pub ack_timeout_secs: u64,
    /// Maximum UTF-16 code units per SMS segment (default 160).
    pub segment_limit: usize,
    /// Attach a delivery-report token to each submission. Never awaited.
    pub request_delivery_report: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            ack_timeout_secs: 10,
            segment_limit: DEFAULT_SEGMENT_LIMIT,
            request_delivery_report: true,
        }
    }
}

impl DispatchConfig {
    pub fn ack_timeout(&self) -> Duration {
        Duration::from_secs(self.ack_timeout_secs)
    }

    /// Where `dispatch.json` lives unless the host says otherwise:
    /// `$XDG_DATA_HOME/sendwerk`, else `$HOME/.local/share/sendwerk`, else
    /// the system temp dir. Android hosts export `XDG_DATA_HOME` as their
    /// files dir before loading the library.
    pub fn default_dir() -> PathBuf {
        let base = std::env::var_os("XDG_DATA_HOME")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .or_else(|| {
                std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".local/share"))
            })
            .unwrap_or_else(std::env::temp_dir);
        base.join(APP_DIR)
    }

    /// Load `dispatch.json` from `data_dir`, falling back to defaults when
    /// the file is missing or malformed, then apply environment overrides.
    pub fn load(data_dir: &Path) -> Self {
        let path = data_dir.join(CONFIG_FILE);
        let mut config = match std::fs::read_to_string(&path) {
            Ok(data) => serde_json::from_str(&data).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "malformed config — using defaults");
                Self::default()
            }),
            Err(_) => Self::default(),
        };
        config.apply_env_overrides();
        config
    }

    /// Write the configuration as pretty JSON into `data_dir`.
    pub fn persist(&self, data_dir: &Path) -> Result<()> {
        let path = data_dir.join(CONFIG_FILE);
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json)?;
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(raw) = std::env::var(ACK_TIMEOUT_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => self.ack_timeout_secs = secs,
                _ => warn!(value = %raw, "ignoring invalid {ACK_TIMEOUT_ENV}"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex, MutexGuard, PoisonError};

    // Environment variables are process-global; every test that reads or
    // writes them holds this lock.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn env_lock() -> MutexGuard<'static, ()> {
        ENV_LOCK.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_env(key: &str, value: &str) {
        // SAFETY: callers hold ENV_LOCK, so no other test thread touches the
        // environment concurrently.
        unsafe { std::env::set_var(key, value) }
    }

    fn remove_env(key: &str) {
        // SAFETY: as for `set_env`.
        unsafe { std::env::remove_var(key) }
    }

    fn load_with_timeout_env(dir: &Path, value: &str) -> DispatchConfig {
        set_env(ACK_TIMEOUT_ENV, value);
        let loaded = DispatchConfig::load(dir);
        remove_env(ACK_TIMEOUT_ENV);
        loaded
    }

    #[test]
    fn defaults_match_platform_limits() {
        let config = DispatchConfig::default();
        assert_eq!(config.ack_timeout(), Duration::from_secs(10));
        assert_eq!(config.segment_limit, 160);
        assert!(config.request_delivery_report);
    }

    #[test]
    fn persist_then_load() {
        let _env = env_lock();
        let dir = tempfile::tempdir().expect("tempdir");
        let config = DispatchConfig {
            ack_timeout_secs: 25,
            segment_limit: 70,
            request_delivery_report: false,
        };
        config.persist(dir.path()).expect("persist");

        let loaded = DispatchConfig::load(dir.path());
        assert_eq!(loaded.ack_timeout_secs, 25);
        assert_eq!(loaded.ack_timeout(), Duration::from_secs(25));
        assert_eq!(loaded.segment_limit, 70);
        assert!(!loaded.request_delivery_report);
        assert_eq!(loaded, config);
    }

    #[test]
    fn missing_file_uses_defaults() {
        let _env = env_lock();
        let dir = tempfile::tempdir().expect("tempdir");
        let loaded = DispatchConfig::load(dir.path());
        assert_eq!(loaded.segment_limit, DEFAULT_SEGMENT_LIMIT);
    }

    #[test]
    fn malformed_file_uses_defaults() {
        let _env = env_lock();
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join(CONFIG_FILE), "{ not json").expect("write");
        let loaded = DispatchConfig::load(dir.path());
        assert_eq!(loaded.segment_limit, DEFAULT_SEGMENT_LIMIT);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let _env = env_lock();
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join(CONFIG_FILE), r#"{ "segment_limit": 153 }"#)
            .expect("write");
        let loaded = DispatchConfig::load(dir.path());
        assert_eq!(loaded.segment_limit, 153);
        assert!(loaded.request_delivery_report);
    }

    #[test]
    fn env_overrides_ack_timeout() {
        let _env = env_lock();
        let dir = tempfile::tempdir().expect("tempdir");
        DispatchConfig {
            ack_timeout_secs: 25,
            ..DispatchConfig::default()
        }
        .persist(dir.path())
        .expect("persist");

        let loaded = load_with_timeout_env(dir.path(), "3");
        assert_eq!(loaded.ack_timeout(), Duration::from_secs(3));
        // Other fields still come from the file.
        assert_eq!(loaded.segment_limit, DEFAULT_SEGMENT_LIMIT);
    }

    #[test]
    fn invalid_env_timeout_is_ignored() {
        let _env = env_lock();
        let dir = tempfile::tempdir().expect("tempdir");
        DispatchConfig {
            ack_timeout_secs: 25,
            ..DispatchConfig::default()
        }
        .persist(dir.path())
        .expect("persist");

        for value in ["soon", "-5", "", "0"] {
            let loaded = load_with_timeout_env(dir.path(), value);
            assert_eq!(loaded.ack_timeout_secs, 25, "value {value:?}");
        }
    }

    #[test]
    fn env_timeout_applies_without_config_file() {
        let _env = env_lock();
        let dir = tempfile::tempdir().expect("tempdir");
        let loaded = load_with_timeout_env(dir.path(), " 42 ");
        assert_eq!(loaded.ack_timeout_secs, 42);
    }

    #[test]
    fn default_dir_prefers_xdg_data_home() {
        let _env = env_lock();
        let saved = std::env::var_os("XDG_DATA_HOME");

        set_env("XDG_DATA_HOME", "/data/user/0/app/files");
        assert_eq!(
            DispatchConfig::default_dir(),
            PathBuf::from("/data/user/0/app/files/sendwerk")
        );

        set_env("XDG_DATA_HOME", "");
        assert!(DispatchConfig::default_dir().ends_with("sendwerk"));
        assert_ne!(DispatchConfig::default_dir(), PathBuf::from("sendwerk"));

        match saved {
            // SAFETY: ENV_LOCK is held.
            Some(value) => unsafe { std::env::set_var("XDG_DATA_HOME", value) },
            None => remove_env("XDG_DATA_HOME"),
        }
    }
}
