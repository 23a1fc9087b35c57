// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Account-scoped journal locations.
//!
//! ```text
//! <root>/AccountData/<account>/events/<stream>.journal
//! ```
//!
//! Older installs kept the journal directly in the shared container or in a
//! per-account directory without the `AccountData` level. Those files are
//! moved into place the first time the account's journal is opened.

use eventsync::StreamName;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const ACCOUNT_DATA_DIR: &str = "AccountData";
pub const EVENTS_DIR: &str = "events";

pub fn journal_path(root: &Path, account: Uuid, stream: &StreamName) -> PathBuf {
    root.join(ACCOUNT_DATA_DIR)
        .join(account.hyphenated().to_string())
        .join(EVENTS_DIR)
        .join(stream.file_name())
}

/// Previous locations, most preferred first.
pub fn legacy_journal_paths(root: &Path, account: Uuid, stream: &StreamName) -> Vec<PathBuf> {
    vec![
        root.join(stream.file_name()),
        root.join(account.hyphenated().to_string()).join(stream.file_name()),
    ]
}

/// Returns the journal path for `account`/`stream`, creating its directory
/// and relocating a legacy journal into it if there is no journal yet.
pub fn prepare_journal_path(root: &Path, account: Uuid, stream: &StreamName) -> io::Result<PathBuf> {
    let path = journal_path(root, account, stream);
    if path.exists() {
        return Ok(path);
    }

    if let Some(dir) = path.parent() {
        create_private_dir(dir)?;
    }

    if let Some(legacy) = legacy_journal_paths(root, account, stream).into_iter().find(|p| p.exists()) {
        tracing::info!("Relocating journal {:?} -> {:?}", legacy, path);
        move_file(&legacy, &path)?;
    }

    Ok(path)
}

fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) => {
            // Different filesystem: fall back to copy + remove.
            tracing::debug!("rename failed ({}), copying instead", e);
            fs::copy(from, to)?;
            fs::remove_file(from)
        }
    }
}

#[cfg(unix)]
fn create_private_dir(dir: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::create_dir_all(dir)?;
    fs::set_permissions(dir, fs::Permissions::from_mode(0o700))
}

#[cfg(not(unix))]
fn create_private_dir(dir: &Path) -> io::Result<()> {
    fs::create_dir_all(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_journal_path_is_account_scoped() {
        let root = Path::new("/data");
        let account = Uuid::new_v4();
        let path = journal_path(root, account, &StreamName::default());
        assert_eq!(
            path,
            root.join("AccountData").join(account.to_string()).join("events").join("events.journal")
        );

        let other = journal_path(root, Uuid::new_v4(), &StreamName::default());
        assert_ne!(path, other);
    }

    #[test]
    fn test_prepare_creates_directory() {
        let dir = tempdir().unwrap();
        let account = Uuid::new_v4();
        let path = prepare_journal_path(dir.path(), account, &StreamName::default()).unwrap();
        assert!(!path.exists());
        assert!(path.parent().unwrap().is_dir());
    }

    #[test]
    fn test_prepare_relocates_legacy_journal() {
        let dir = tempdir().unwrap();
        let account = Uuid::new_v4();
        let stream = StreamName::default();

        let legacy = dir.path().join(account.to_string()).join(stream.file_name());
        fs::create_dir_all(legacy.parent().unwrap()).unwrap();
        fs::write(&legacy, b"legacy").unwrap();

        let path = prepare_journal_path(dir.path(), account, &stream).unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"legacy");
        assert!(!legacy.exists());
    }

    #[test]
    fn test_prepare_keeps_existing_journal() {
        let dir = tempdir().unwrap();
        let account = Uuid::new_v4();
        let stream = StreamName::default();

        let current = journal_path(dir.path(), account, &stream);
        fs::create_dir_all(current.parent().unwrap()).unwrap();
        fs::write(&current, b"current").unwrap();
        let legacy = dir.path().join(stream.file_name());
        fs::write(&legacy, b"legacy").unwrap();

        let path = prepare_journal_path(dir.path(), account, &stream).unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"current");
        assert!(legacy.exists());
    }
}
