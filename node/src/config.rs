// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use crate::errors::ConfigError;
use eventsync::config::{DEFAULT_BATCH_SIZE, DEFAULT_LEDGER_CAPACITY, DEFAULT_MAX_CIPHERTEXT_BYTES};
use std::path::PathBuf;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Clone, Debug)]
pub struct JournalConfig {
    /// Shared container directory. Journals live under
    /// `<root_dir>/AccountData/<account_id>/events/`.
    pub root_dir: PathBuf,
    pub account_id: Uuid,
    pub batch_size: usize,
    pub ledger_capacity: usize,
    /// fsync every journal frame before acknowledging.
    pub sync_writes: bool,
    /// Journal size above which a delete triggers compaction.
    pub compaction_threshold_bytes: u64,
    pub max_ciphertext_bytes: usize,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("eventsync-data"),
            account_id: Uuid::nil(),
            batch_size: DEFAULT_BATCH_SIZE,
            ledger_capacity: DEFAULT_LEDGER_CAPACITY,
            sync_writes: true,
            compaction_threshold_bytes: 4 * 1024 * 1024,
            max_ciphertext_bytes: DEFAULT_MAX_CIPHERTEXT_BYTES,
        }
    }
}

impl JournalConfig {
    pub fn for_account(root_dir: impl Into<PathBuf>, account_id: Uuid) -> Self {
        Self {
            root_dir: root_dir.into(),
            account_id,
            ..Self::default()
        }
    }

    /// Defaults overridden by `EVENTSYNC_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut cfg = Self::default();

        if let Some(root) = lookup("EVENTSYNC_ROOT") {
            cfg.root_dir = PathBuf::from(root);
        }
        if let Some(account) = lookup("EVENTSYNC_ACCOUNT") {
            cfg.account_id = parse_value("EVENTSYNC_ACCOUNT", account)?;
        }
        if let Some(size) = lookup("EVENTSYNC_BATCH_SIZE") {
            cfg.batch_size = parse_value("EVENTSYNC_BATCH_SIZE", size)?;
        }
        if let Some(capacity) = lookup("EVENTSYNC_LEDGER_CAPACITY") {
            cfg.ledger_capacity = parse_value("EVENTSYNC_LEDGER_CAPACITY", capacity)?;
        }
        if let Some(sync) = lookup("EVENTSYNC_SYNC_WRITES") {
            cfg.sync_writes = parse_value("EVENTSYNC_SYNC_WRITES", sync)?;
        }
        if let Some(bytes) = lookup("EVENTSYNC_COMPACTION_BYTES") {
            cfg.compaction_threshold_bytes = parse_value("EVENTSYNC_COMPACTION_BYTES", bytes)?;
        }

        if cfg.batch_size == 0 {
            return Err(ConfigError::InvalidValue { key: "EVENTSYNC_BATCH_SIZE", value: "0".into() });
        }
        if cfg.ledger_capacity == 0 {
            return Err(ConfigError::InvalidValue { key: "EVENTSYNC_LEDGER_CAPACITY", value: "0".into() });
        }
        Ok(cfg)
    }
}

fn parse_value<T: FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue { key, value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_env() {
        let cfg = JournalConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg.batch_size, 500);
        assert_eq!(cfg.ledger_capacity, 10_000);
        assert!(cfg.sync_writes);
    }

    #[test]
    fn test_env_overrides() {
        let account = Uuid::new_v4();
        let account_str = account.to_string();
        let cfg = JournalConfig::from_lookup(lookup(&[
            ("EVENTSYNC_ROOT", "/tmp/evs"),
            ("EVENTSYNC_ACCOUNT", account_str.as_str()),
            ("EVENTSYNC_BATCH_SIZE", "25"),
            ("EVENTSYNC_SYNC_WRITES", "false"),
        ]))
        .unwrap();

        assert_eq!(cfg.root_dir, PathBuf::from("/tmp/evs"));
        assert_eq!(cfg.account_id, account);
        assert_eq!(cfg.batch_size, 25);
        assert!(!cfg.sync_writes);
    }

    #[test]
    fn test_invalid_values_are_reported() {
        let err = JournalConfig::from_lookup(lookup(&[("EVENTSYNC_BATCH_SIZE", "lots")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "EVENTSYNC_BATCH_SIZE", .. }));

        assert!(JournalConfig::from_lookup(lookup(&[("EVENTSYNC_BATCH_SIZE", "0")])).is_err());
        assert!(JournalConfig::from_lookup(lookup(&[("EVENTSYNC_ACCOUNT", "nope")])).is_err());
    }
}
