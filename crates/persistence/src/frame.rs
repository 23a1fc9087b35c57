// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use crate::error::{PersistenceError, Result};
use crate::header::FileHeader;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use crc64fast::Digest;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// Upper bound on a single frame payload.
pub const MAX_FRAME_LEN: usize = 64 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameHeader {
    pub seq: u64,
    pub payload_len: u32,
    /// Guards `seq` and `payload_len` on their own, so a damaged length is
    /// caught before it is used to find the end of the frame.
    pub header_check: u32,
    pub checksum: u64,
}

impl FrameHeader {
    pub const SIZE: usize = 8 + 4 + 4 + 8; // 24 bytes

    pub fn for_payload(seq: u64, payload: &[u8]) -> Self {
        let payload_len = payload.len() as u32;
        Self {
            seq,
            payload_len,
            header_check: header_check(seq, payload_len),
            checksum: checksum(seq, payload),
        }
    }

    /// Whether `seq` and `payload_len` are as they were written.
    pub fn is_intact(&self) -> bool {
        self.header_check == header_check(self.seq, self.payload_len)
    }

    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        writer.write_u64::<LittleEndian>(self.seq)?;
        writer.write_u32::<LittleEndian>(self.payload_len)?;
        writer.write_u32::<LittleEndian>(self.header_check)?;
        writer.write_u64::<LittleEndian>(self.checksum)?;
        Ok(())
    }

    pub fn read_from<R: Read>(mut reader: R) -> Result<Self> {
        let seq = reader.read_u64::<LittleEndian>()?;
        let payload_len = reader.read_u32::<LittleEndian>()?;
        let header_check = reader.read_u32::<LittleEndian>()?;
        let checksum = reader.read_u64::<LittleEndian>()?;
        Ok(Self { seq, payload_len, header_check, checksum })
    }
}

fn header_check(seq: u64, payload_len: u32) -> u32 {
    let mut digest = Digest::new();
    digest.write(&seq.to_le_bytes());
    digest.write(&payload_len.to_le_bytes());
    digest.sum64() as u32
}

/// Checksum covers the sequence number and length as well as the payload.
fn checksum(seq: u64, payload: &[u8]) -> u64 {
    let mut digest = Digest::new();
    digest.write(&seq.to_le_bytes());
    digest.write(&(payload.len() as u32).to_le_bytes());
    digest.write(payload);
    digest.sum64()
}

#[derive(Debug, Clone)]
pub struct Frame {
    pub header: FrameHeader,
    /// Byte offset of the frame header in the file.
    pub offset: u64,
    pub payload: Vec<u8>,
}

/// Result of scanning a framed file.
#[derive(Debug, Default)]
pub struct FrameScan {
    pub frames: Vec<Frame>,
    /// Length of the intact prefix. Anything past it is a torn tail.
    pub valid_len: u64,
    pub torn_tail: bool,
}

impl FrameScan {
    pub fn next_seq(&self) -> u64 {
        self.frames.last().map(|f| f.header.seq + 1).unwrap_or(1)
    }
}

/// Reads every intact frame of `path`.
///
/// Only the remains of an interrupted append are dropped: a partial frame
/// header, a zero-filled tail, an intact header whose payload runs past the
/// end of the file, or a payload checksum failure on the last frame.
/// A damaged frame header, a checksum failure followed by more data, or a
/// break in the sequence numbers is corruption.
pub fn read_frames(path: impl AsRef<Path>) -> Result<FrameScan> {
    let bytes = fs::read(path.as_ref())?;

    if bytes.len() < FileHeader::SIZE {
        // Crash while the header itself was being written.
        let mut expected = Vec::with_capacity(FileHeader::SIZE);
        FileHeader::new().write_to(&mut expected)?;
        if expected.starts_with(&bytes) {
            return Ok(FrameScan { frames: Vec::new(), valid_len: 0, torn_tail: true });
        }
        return Err(PersistenceError::InvalidMagic);
    }
    FileHeader::read_from(&bytes[..FileHeader::SIZE])?;

    let mut scan = FrameScan::default();
    let mut offset = FileHeader::SIZE;
    let mut expected_seq = 1u64;

    while offset < bytes.len() {
        if bytes.len() - offset < FrameHeader::SIZE {
            scan.torn_tail = true;
            break;
        }
        let header = FrameHeader::read_from(&bytes[offset..offset + FrameHeader::SIZE])?;
        if !header.is_intact() {
            // Space allocated by the file system but never written.
            if bytes[offset..].iter().all(|&b| b == 0) {
                scan.torn_tail = true;
                break;
            }
            return Err(PersistenceError::HeaderMismatch { offset: offset as u64 });
        }
        if header.payload_len as usize > MAX_FRAME_LEN {
            return Err(PersistenceError::FrameTooLarge(header.payload_len as usize));
        }

        let start = offset + FrameHeader::SIZE;
        let end = start + header.payload_len as usize;
        if end > bytes.len() {
            scan.torn_tail = true;
            break;
        }

        let payload = &bytes[start..end];
        let found = checksum(header.seq, payload);
        if found != header.checksum {
            if end == bytes.len() {
                scan.torn_tail = true;
                break;
            }
            return Err(PersistenceError::ChecksumMismatch {
                offset: offset as u64,
                expected: header.checksum,
                found,
            });
        }
        if header.seq != expected_seq {
            return Err(PersistenceError::SequenceGap {
                offset: offset as u64,
                expected: expected_seq,
                found: header.seq,
            });
        }

        scan.frames.push(Frame {
            header,
            offset: offset as u64,
            payload: payload.to_vec(),
        });
        expected_seq += 1;
        offset = end;
    }

    scan.valid_len = offset as u64;
    Ok(scan)
}

/// Appends frames to a journal file.
///
/// # Safety Guarantees
/// - Each frame goes out in a single write
/// - With `sync` set, `append` returns only after `sync_data`
/// - A failed write is cut back off the file before the error is returned
pub struct FrameWriter {
    path: PathBuf,
    file: File,
    next_seq: u64,
    len: u64,
    sync: bool,
}

impl FrameWriter {
    /// Creates `path` with a fresh header, discarding any previous content.
    pub fn create(path: impl AsRef<Path>, sync: bool) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)?;

        FileHeader::new().write_to(&mut file)?;
        if sync {
            file.sync_all()?;
        }
        drop(file);

        let file = OpenOptions::new().append(true).open(&path)?;
        Ok(Self {
            path,
            file,
            next_seq: 1,
            len: FileHeader::SIZE as u64,
            sync,
        })
    }

    /// Reopens a scanned file for appending. A torn tail is truncated away
    /// first so new frames never follow garbage.
    pub fn resume(path: impl AsRef<Path>, scan: &FrameScan, sync: bool) -> Result<Self> {
        if scan.valid_len < FileHeader::SIZE as u64 {
            return Self::create(path, sync);
        }

        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().append(true).open(&path)?;
        if file.metadata()?.len() != scan.valid_len {
            file.set_len(scan.valid_len)?;
            file.sync_all()?;
        }

        Ok(Self {
            path,
            file,
            next_seq: scan.next_seq(),
            len: scan.valid_len,
            sync,
        })
    }

    /// Atomically replaces `path` with a file holding exactly `payloads`.
    ///
    /// The new content is written to a temporary file next to `path` and
    /// renamed over it, so a crash leaves either the old or the new file.
    /// If writing the temporary file fails, `path` is untouched.
    pub fn rewrite(path: impl AsRef<Path>, payloads: &[Vec<u8>], sync: bool) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let tmp_path = path.with_extension("tmp");

        let (next_seq, len) = match Self::write_all_frames(&tmp_path, payloads, sync) {
            Ok(written) => written,
            Err(e) => {
                let _ = fs::remove_file(&tmp_path);
                return Err(e);
            }
        };

        fs::rename(&tmp_path, &path)?;
        if sync {
            sync_parent_dir(&path)?;
        }

        let file = OpenOptions::new().append(true).open(&path)?;
        Ok(Self { path, file, next_seq, len, sync })
    }

    /// Writes a fresh file holding `payloads`, synced once at the end.
    fn write_all_frames(path: &Path, payloads: &[Vec<u8>], sync: bool) -> Result<(u64, u64)> {
        let mut writer = Self::create(path, false)?;
        for payload in payloads {
            writer.append(payload)?;
        }
        if sync {
            writer.sync()?;
        }
        Ok((writer.next_seq, writer.len))
    }

    /// Appends one frame. Returns its sequence number.
    pub fn append(&mut self, payload: &[u8]) -> Result<u64> {
        if payload.len() > MAX_FRAME_LEN {
            return Err(PersistenceError::FrameTooLarge(payload.len()));
        }

        let header = FrameHeader::for_payload(self.next_seq, payload);
        let mut buf = Vec::with_capacity(FrameHeader::SIZE + payload.len());
        header.write_to(&mut buf)?;
        buf.extend_from_slice(payload);

        if let Err(e) = self.write_durably(&buf) {
            // Best effort: leave no partial frame behind.
            let _ = self.file.set_len(self.len);
            return Err(e);
        }

        self.len += buf.len() as u64;
        self.next_seq += 1;
        Ok(header.seq)
    }

    fn write_durably(&mut self, buf: &[u8]) -> Result<()> {
        self.file.write_all(buf)?;
        if self.sync {
            self.file.sync_data()?;
        }
        Ok(())
    }

    /// Flushes everything to disk regardless of the `sync` setting.
    pub fn sync(&mut self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }

    /// Current file length in bytes.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.next_seq == 1
    }

    pub fn next_seq(&self) -> u64 {
        self.next_seq
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(unix)]
fn sync_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        File::open(parent)?.sync_all()?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) -> Result<()> {
    Ok(())
}
