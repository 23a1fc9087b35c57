// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Crash-safe framed file format used by the event journal.
//!
//! ```text
//! [FileHeader: 16 bytes][Frame][Frame]...
//! Frame = [seq: u64][len: u32][header check: u32][crc64: u64][payload: len bytes]
//! ```
//!
//! A frame is the unit of atomicity: it is written with one `write_all` and
//! made durable before `append` returns. On read, a frame cut short by a
//! crash at the very end of the file is dropped; damage anywhere else,
//! including a damaged frame length, is reported as corruption.

pub mod error;
pub mod frame;
pub mod header;

pub use error::{PersistenceError, Result};
pub use frame::{read_frames, Frame, FrameHeader, FrameScan, FrameWriter, MAX_FRAME_LEN};
pub use header::FileHeader;
