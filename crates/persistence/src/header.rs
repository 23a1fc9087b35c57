// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use crate::error::{PersistenceError, Result};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

/// Leading 16 bytes of every journal file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHeader {
    pub magic: [u8; 4],
    pub version: u32,
    pub reserved: u64,
}

impl FileHeader {
    pub const SIZE: usize = 4 + 4 + 8;
    pub const MAGIC: [u8; 4] = *b"EVSJ";
    pub const VERSION: u32 = 2;

    pub fn new() -> Self {
        Self {
            magic: Self::MAGIC,
            version: Self::VERSION,
            reserved: 0,
        }
    }

    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        writer.write_all(&self.magic)?;
        writer.write_u32::<LittleEndian>(self.version)?;
        writer.write_u64::<LittleEndian>(self.reserved)?;
        Ok(())
    }

    pub fn read_from<R: Read>(mut reader: R) -> Result<Self> {
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if magic != Self::MAGIC {
            return Err(PersistenceError::InvalidMagic);
        }

        let version = reader.read_u32::<LittleEndian>()?;
        if version != Self::VERSION {
            return Err(PersistenceError::UnsupportedVersion(version));
        }
        let reserved = reader.read_u64::<LittleEndian>()?;

        Ok(Self { magic, version, reserved })
    }
}

impl Default for FileHeader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_rejects_foreign_file() {
        let mut bytes = Vec::new();
        FileHeader::new().write_to(&mut bytes).unwrap();
        assert_eq!(bytes.len(), FileHeader::SIZE);
        assert_eq!(FileHeader::read_from(&bytes[..]).unwrap(), FileHeader::new());

        bytes[0] = b'X';
        assert!(matches!(FileHeader::read_from(&bytes[..]), Err(PersistenceError::InvalidMagic)));
    }

    #[test]
    fn test_header_rejects_future_version() {
        let mut bytes = Vec::new();
        FileHeader { version: 3, ..FileHeader::new() }.write_to(&mut bytes).unwrap();
        assert!(matches!(
            FileHeader::read_from(&bytes[..]),
            Err(PersistenceError::UnsupportedVersion(3))
        ));
    }
}
