// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use thiserror::Error;
use std::io;

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Invalid magic bytes in header")]
    InvalidMagic,
    #[error("Unsupported file version {0}")]
    UnsupportedVersion(u32),
    #[error("Checksum mismatch at offset {offset}: expected {expected}, found {found}")]
    ChecksumMismatch {
        offset: u64,
        expected: u64,
        found: u64,
    },
    #[error("Damaged frame header at offset {offset}")]
    HeaderMismatch { offset: u64 },
    #[error("Frame sequence gap at offset {offset}: expected {expected}, found {found}")]
    SequenceGap {
        offset: u64,
        expected: u64,
        found: u64,
    },
    #[error("Frame of {0} bytes exceeds the frame size limit")]
    FrameTooLarge(usize),
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, PersistenceError>;
