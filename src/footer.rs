//! Container footer: the record section plus the trailing record count.
//!
//! ```text
//! [ payload ... ][ record 0 | record 1 | ... | record N-1 ][ N: u64 BE ]
//!                ^ records_start                           ^ count_pos
//! ```
//!
//! The footer is found from the end of the stream, so the payload region
//! needs no header.  [`Footer::read`] validates everything it can before
//! returning; callers may create output only once it has succeeded.

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::borrow::Cow;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::{GlueError, Result};
use crate::record::{is_plain_file_name, FileRecord, RECORD_SIZE};

/// Width of the trailing record count.
pub const COUNT_SIZE: u64 = 8;

/// A decoded record placed at its payload offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub index:     usize,
    /// `name + extension`, exactly as stored.
    pub file_name: Vec<u8>,
    /// Start of the payload, relative to the beginning of the container.
    pub offset:    u64,
    pub size:      u64,
}

impl Entry {
    pub fn display_name(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.file_name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Footer {
    pub records: Vec<FileRecord>,
}

impl Footer {
    pub fn new(records: Vec<FileRecord>) -> Self {
        Self { records }
    }

    /// Bytes the footer occupies on disk.
    pub fn encoded_len(&self) -> u64 {
        self.records.len() as u64 * RECORD_SIZE as u64 + COUNT_SIZE
    }

    /// Sum of all payload sizes, `None` on u64 overflow.
    pub fn payload_len(&self) -> Option<u64> {
        self.records.iter().try_fold(0u64, |acc, r| acc.checked_add(r.size))
    }

    /// Records in order with their cumulative payload offsets.
    pub fn entries(&self) -> Vec<Entry> {
        let mut offset = 0u64;
        self.records.iter().enumerate().map(|(index, r)| {
            let entry = Entry { index, file_name: r.file_name(), offset, size: r.size };
            offset = offset.saturating_add(r.size);
            entry
        }).collect()
    }

    pub fn write<W: Write>(&self, mut writer: W) -> io::Result<()> {
        for record in &self.records {
            record.write(&mut writer)?;
        }
        writer.write_u64::<BigEndian>(self.records.len() as u64)?;
        Ok(())
    }

    /// Locate, decode and validate the footer at the end of `reader`.
    ///
    /// Returns the footer and the offset at which the record section
    /// starts, which is also the length of the payload region.  `path` is
    /// only used to label I/O errors.
    pub fn read<R: Read + Seek>(reader: &mut R, path: &Path) -> Result<(Self, u64)> {
        let len = reader.seek(SeekFrom::End(0))
            .map_err(|e| GlueError::InvalidContainer(format!("cannot seek to the end: {e}")))?;
        if len < COUNT_SIZE {
            return Err(GlueError::InvalidContainer(format!(
                "{len} bytes is too small to hold a record count"
            )));
        }

        let count_pos = len - COUNT_SIZE;
        seek_to(reader, count_pos)?;
        let count = reader.read_u64::<BigEndian>().map_err(|e| read_error(path, e))?;
        if count == 0 {
            return Err(GlueError::InvalidContainer("record count is zero".into()));
        }

        let section = count.checked_mul(RECORD_SIZE as u64)
            .filter(|&s| s <= count_pos)
            .ok_or_else(|| GlueError::InvalidContainer(format!(
                "{count} records do not fit in {count_pos} bytes"
            )))?;
        let section_len = usize::try_from(section)
            .map_err(|_| GlueError::InvalidContainer(format!("record section of {section} bytes")))?;

        let records_start = count_pos - section;
        seek_to(reader, records_start)?;
        let mut buf = vec![0u8; section_len];
        reader.read_exact(&mut buf).map_err(|e| read_error(path, e))?;

        let records = buf.chunks_exact(RECORD_SIZE)
            .map(FileRecord::from_bytes)
            .collect::<Result<Vec<_>>>()?;
        let footer = Self { records };
        footer.validate(records_start)?;
        Ok((footer, records_start))
    }

    /// Cross-check payload sizes against the payload region and make sure
    /// every restored name is a single plain path component.
    fn validate(&self, records_start: u64) -> Result<()> {
        match self.payload_len() {
            Some(total) if total <= records_start => {}
            Some(total) => return Err(GlueError::InvalidContainer(format!(
                "payload sizes total {total} bytes but only {records_start} precede the records"
            ))),
            None => return Err(GlueError::InvalidContainer("payload sizes overflow".into())),
        }

        for entry in self.entries() {
            if !is_plain_file_name(&entry.file_name) {
                return Err(GlueError::InvalidContainer(format!(
                    "record {} has unusable file name {:?}", entry.index, entry.display_name()
                )));
            }
        }
        Ok(())
    }
}

fn seek_to<R: Seek>(reader: &mut R, pos: u64) -> Result<()> {
    reader.seek(SeekFrom::Start(pos))
        .map(|_| ())
        .map_err(|e| GlueError::InvalidContainer(format!("cannot seek to {pos}: {e}")))
}

fn read_error(path: &Path, err: io::Error) -> GlueError {
    match err.kind() {
        io::ErrorKind::UnexpectedEof => GlueError::InvalidContainer("footer is truncated".into()),
        _ => GlueError::unreadable(path, err),
    }
}
