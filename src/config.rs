//! Runtime configuration.
//!
//! Settings come from environment variables; anything missing or invalid
//! falls back to its default.
//!
//! Supported:
//! - `NEUROTRIAGE_DB_PATH`
//! - `NEUROTRIAGE_USER`
//! - `NEUROTRIAGE_RECENT_LIMIT`
//! - `NEUROTRIAGE_LOG_MODE` (`file`, `stderr` or `auto`)
//! - `NEUROTRIAGE_LOG_FILE`

use std::path::PathBuf;

use crate::application::DEFAULT_RECENT_LIMIT;
use crate::domain::Identity;

/// Where log output goes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogMode {
    File,
    /// Stdout carries command output, so logs go to stderr.
    #[default]
    Stderr,
}

impl LogMode {
    fn from_key(key: &str) -> Self {
        match key.trim() {
            "file" => Self::File,
            _ => Self::Stderr,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriageConfig {
    pub db_path: PathBuf,
    /// Signed-in user id; `None` means the guest partition
    pub user: Option<String>,
    pub recent_limit: usize,
    pub log_mode: LogMode,
    pub log_file: PathBuf,
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("neurotriage.db"),
            user: None,
            recent_limit: DEFAULT_RECENT_LIMIT,
            log_mode: LogMode::default(),
            log_file: PathBuf::from("neurotriage.log"),
        }
    }
}

impl TriageConfig {
    /// Load from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load using an arbitrary variable lookup.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        let non_empty = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(v) = non_empty("NEUROTRIAGE_DB_PATH") {
            cfg.db_path = PathBuf::from(v);
        }

        cfg.user = non_empty("NEUROTRIAGE_USER");

        if let Some(v) = non_empty("NEUROTRIAGE_RECENT_LIMIT") {
            if let Ok(n) = v.parse::<usize>() {
                if n > 0 {
                    cfg.recent_limit = n;
                }
            }
        }

        if let Some(v) = non_empty("NEUROTRIAGE_LOG_MODE") {
            cfg.log_mode = LogMode::from_key(&v);
        }

        if let Some(v) = non_empty("NEUROTRIAGE_LOG_FILE") {
            cfg.log_file = PathBuf::from(v);
        }

        cfg
    }

    #[must_use]
    pub fn identity(&self) -> Identity {
        Identity::from_user_id(self.user.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let cfg = TriageConfig::from_lookup(lookup(&[]));
        assert_eq!(cfg, TriageConfig::default());
        assert_eq!(cfg.identity(), Identity::Guest);
    }

    #[test]
    fn test_overrides() {
        let cfg = TriageConfig::from_lookup(lookup(&[
            ("NEUROTRIAGE_DB_PATH", "/tmp/triage.db"),
            ("NEUROTRIAGE_USER", "doctor-3"),
            ("NEUROTRIAGE_RECENT_LIMIT", "10"),
            ("NEUROTRIAGE_LOG_MODE", "file"),
        ]));
        assert_eq!(cfg.db_path, PathBuf::from("/tmp/triage.db"));
        assert_eq!(cfg.identity(), Identity::User("doctor-3".to_string()));
        assert_eq!(cfg.recent_limit, 10);
        assert_eq!(cfg.log_mode, LogMode::File);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let cfg = TriageConfig::from_lookup(lookup(&[
            ("NEUROTRIAGE_RECENT_LIMIT", "zero"),
            ("NEUROTRIAGE_LOG_MODE", "syslog"),
            ("NEUROTRIAGE_USER", "   "),
        ]));
        assert_eq!(cfg.recent_limit, DEFAULT_RECENT_LIMIT);
        assert_eq!(cfg.log_mode, LogMode::Stderr);
        assert!(cfg.user.is_none());
    }
}
