// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use anyhow::{bail, Context};
use clap::Args;
use eventsync::config::{DEFAULT_LEDGER_CAPACITY, DEFAULT_STREAM};
use eventsync::StreamName;
use eventsync_node::paths::journal_path;
use std::path::PathBuf;
use uuid::Uuid;

/// Which journal a command works on: either an explicit file, or the
/// account/stream layout under a root directory.
#[derive(Args, Clone, Debug)]
pub struct JournalLocation {
    /// Path to a journal file (overrides --root/--account/--stream)
    #[arg(long, short)]
    pub file: Option<PathBuf>,

    /// Shared container directory holding AccountData/
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Account UUID
    #[arg(long)]
    pub account: Option<Uuid>,

    /// Stream name
    #[arg(long, default_value = DEFAULT_STREAM)]
    pub stream: String,

    /// Deduplication ledger capacity the journal's owner runs with. Replay
    /// keeps only this many identifiers, and `compact` writes only those.
    #[arg(long, default_value_t = DEFAULT_LEDGER_CAPACITY)]
    pub ledger_capacity: usize,
}

impl Default for JournalLocation {
    fn default() -> Self {
        Self {
            file: None,
            root: None,
            account: None,
            stream: DEFAULT_STREAM.to_string(),
            ledger_capacity: DEFAULT_LEDGER_CAPACITY,
        }
    }
}

impl JournalLocation {
    pub fn for_file(file: impl Into<PathBuf>) -> Self {
        Self {
            file: Some(file.into()),
            ..Self::default()
        }
    }

    pub fn stream_name(&self) -> anyhow::Result<StreamName> {
        StreamName::new(self.stream.clone()).with_context(|| format!("invalid stream name {:?}", self.stream))
    }

    pub fn resolve(&self) -> anyhow::Result<PathBuf> {
        if let Some(file) = &self.file {
            return Ok(file.clone());
        }
        let (Some(root), Some(account)) = (&self.root, self.account) else {
            bail!("either --file or both --root and --account are required");
        };
        Ok(journal_path(root, account, &self.stream_name()?))
    }
}
