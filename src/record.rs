//! Fixed-size metadata record describing one packed file.
//!
//! # Layout (264 bytes, big-endian)
//!
//! | Offset | Size | Field                                          |
//! |--------|------|------------------------------------------------|
//! | 0      | 8    | size      u64 BE, byte length of the payload    |
//! | 8      | 248  | name     up to 247 bytes, sentinel-terminated  |
//! | 256    | 8    | extension up to 7 bytes, sentinel-terminated   |
//!
//! The offsets are fixed constants.  They never depend on the in-memory
//! layout of [`FileRecord`], so a container written on one host decodes on
//! any other.
//!
//! The size field holds the *size* of the file, not its position.  Payload
//! offsets are recovered by summing the sizes of all preceding records
//! (see [`crate::footer::Footer::entries`]).

use byteorder::{BigEndian, ByteOrder, WriteBytesExt};
use std::io::{self, Write};

use crate::error::{GlueError, Result};

pub const RECORD_SIZE:   usize = 264;
pub const SIZE_OFFSET:   usize = 0;
pub const NAME_OFFSET:   usize = 8;
pub const EXT_OFFSET:    usize = 256;
/// Usable name bytes; the field itself is one byte longer for the sentinel.
pub const NAME_CAPACITY: usize = 247;
/// Usable extension bytes, leading `.` included.
pub const EXT_CAPACITY:  usize = 7;
/// Terminator of the name and extension fields.
pub const SENTINEL:      u8    = 0;

/// One packed file: payload size, base name and extension.
///
/// The name and extension are stored already truncated to their capacities
/// and never contain [`SENTINEL`], so `decode(encode(r)) == r` holds for
/// every record built through [`FileRecord::new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub size:  u64,
    name:      Vec<u8>,
    extension: Vec<u8>,
}

impl FileRecord {
    /// Build a record, truncating `name` to 247 bytes and `extension` to 7.
    ///
    /// Truncation is silent.  A sentinel byte inside either input is an
    /// [`GlueError::InvalidArgument`]: it would otherwise cut the field short
    /// on decode.
    pub fn new(size: u64, name: &[u8], extension: &[u8]) -> Result<Self> {
        check_field("name", name)?;
        check_field("extension", extension)?;
        Ok(Self {
            size,
            name:      name[..name.len().min(NAME_CAPACITY)].to_vec(),
            extension: extension[..extension.len().min(EXT_CAPACITY)].to_vec(),
        })
    }

    /// Build a record from a full file name such as `report.final.txt`.
    pub fn from_file_name(size: u64, file_name: &[u8]) -> Result<Self> {
        let (name, extension) = split_extension(file_name);
        Self::new(size, name, extension)
    }

    pub fn name(&self) -> &[u8] { &self.name }

    pub fn extension(&self) -> &[u8] { &self.extension }

    /// `name` followed by `extension`: the name the file is restored under.
    pub fn file_name(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.name.len() + self.extension.len());
        out.extend_from_slice(&self.name);
        out.extend_from_slice(&self.extension);
        out
    }

    pub fn to_bytes(&self) -> [u8; RECORD_SIZE] {
        let mut buf = [0u8; RECORD_SIZE];
        BigEndian::write_u64(&mut buf[SIZE_OFFSET..NAME_OFFSET], self.size);
        buf[NAME_OFFSET..NAME_OFFSET + self.name.len()].copy_from_slice(&self.name);
        buf[EXT_OFFSET..EXT_OFFSET + self.extension.len()].copy_from_slice(&self.extension);
        // Remaining bytes are already zero, which is the sentinel.
        buf
    }

    /// Decode exactly [`RECORD_SIZE`] bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != RECORD_SIZE {
            return Err(GlueError::InvalidContainer(format!(
                "record is {} bytes, expected {RECORD_SIZE}", bytes.len()
            )));
        }
        let size      = BigEndian::read_u64(&bytes[SIZE_OFFSET..NAME_OFFSET]);
        let name      = read_field("name", &bytes[NAME_OFFSET..EXT_OFFSET])?;
        let extension = read_field("extension", &bytes[EXT_OFFSET..RECORD_SIZE])?;
        Ok(Self { size, name: name.to_vec(), extension: extension.to_vec() })
    }

    pub fn write<W: Write>(&self, mut writer: W) -> io::Result<()> {
        let bytes = self.to_bytes();
        writer.write_u64::<BigEndian>(self.size)?;
        writer.write_all(&bytes[NAME_OFFSET..])?;
        Ok(())
    }
}

/// Encode one record: size, then name and extension truncated to capacity.
pub fn encode(size: u64, name: &[u8], extension: &[u8]) -> Result<[u8; RECORD_SIZE]> {
    Ok(FileRecord::new(size, name, extension)?.to_bytes())
}

/// Decode one record from a 264-byte slice.
pub fn decode(bytes: &[u8]) -> Result<FileRecord> {
    FileRecord::from_bytes(bytes)
}

/// Split a base file name at its last `.`.
///
/// The extension keeps the dot; a name without a dot has an empty
/// extension.  `".profile"` yields an empty name and extension `".profile"`.
pub fn split_extension(file_name: &[u8]) -> (&[u8], &[u8]) {
    match file_name.iter().rposition(|&b| b == b'.') {
        Some(dot) => file_name.split_at(dot),
        None      => file_name.split_at(file_name.len()),
    }
}

/// Whether `file_name` can be restored as a single plain path component:
/// non-empty, not `.` or `..`, and free of `/` and `\\`.
pub fn is_plain_file_name(file_name: &[u8]) -> bool {
    !file_name.is_empty()
        && file_name != b"."
        && file_name != b".."
        && !file_name.iter().any(|&b| b == b'/' || b == b'\\')
}

fn check_field(what: &str, value: &[u8]) -> Result<()> {
    if value.contains(&SENTINEL) {
        return Err(GlueError::InvalidArgument(format!(
            "{what} {:?} contains a NUL byte", String::from_utf8_lossy(value)
        )));
    }
    Ok(())
}

fn read_field<'a>(what: &str, field: &'a [u8]) -> Result<&'a [u8]> {
    field.iter()
        .position(|&b| b == SENTINEL)
        .map(|end| &field[..end])
        .ok_or_else(|| GlueError::InvalidContainer(format!(
            "{what} field is not terminated within {} bytes", field.len() - 1
        )))
}
