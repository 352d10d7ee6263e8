//! Container stream engine: writer and reader.
//!
//! # Writer
//! [`ContainerWriter`] accepts entries one at a time and copies each
//! payload verbatim into the underlying stream through a bounded buffer,
//! so no payload has to fit in memory.  The records accumulate in memory
//! and are written, followed by the record count, on [`ContainerWriter::finish`].
//!
//! # Reader
//! [`ContainerReader`] locates and validates the footer when it is opened.
//! Nothing is handed out before validation succeeds; afterwards any entry
//! can be copied out by index.
//!
//! Both work on any `Write` / `Read + Seek` stream; [`crate::merge`] and
//! [`crate::split`] drive them over files.

use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{GlueError, Result};
use crate::footer::{Entry, Footer};
use crate::record::{is_plain_file_name, FileRecord};

/// Default copy buffer: 64 KiB.
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

// ── Copy ─────────────────────────────────────────────────────────────────────

/// Which side of a copy failed.
#[derive(Debug)]
pub(crate) enum CopyFault {
    Read(io::Error),
    Write(io::Error),
}

/// Copy exactly `len` bytes from `src` to `dst`.  A source that ends early
/// is a read fault of kind `UnexpectedEof`.
pub(crate) fn copy_exact<R: Read + ?Sized, W: Write + ?Sized>(
    src: &mut R,
    dst: &mut W,
    len: u64,
    buf: &mut [u8],
) -> std::result::Result<(), CopyFault> {
    let mut remaining = len;
    while remaining > 0 {
        let want = remaining.min(buf.len() as u64) as usize;
        let n = match src.read(&mut buf[..want]) {
            Ok(0) => return Err(CopyFault::Read(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("source ended {remaining} bytes early"),
            ))),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(CopyFault::Read(e)),
        };
        dst.write_all(&buf[..n]).map_err(CopyFault::Write)?;
        remaining -= n as u64;
    }
    Ok(())
}

// ── Writer ───────────────────────────────────────────────────────────────────

pub struct ContainerWriter<W: Write> {
    writer:   W,
    path:     PathBuf,
    footer:   Footer,
    buffer:   Vec<u8>,
    /// Set once a payload copy fails part way; the stream then holds bytes
    /// no record accounts for.
    poisoned: bool,
}

impl<W: Write> ContainerWriter<W> {
    /// `path` names the destination in error messages only.
    pub fn new(writer: W, path: impl Into<PathBuf>) -> Self {
        Self::with_buffer_size(writer, path, DEFAULT_BUFFER_SIZE)
    }

    pub fn with_buffer_size(writer: W, path: impl Into<PathBuf>, buffer_size: usize) -> Self {
        Self {
            writer,
            path:     path.into(),
            footer:   Footer::default(),
            buffer:   vec![0u8; buffer_size.max(1)],
            poisoned: false,
        }
    }

    /// Append the next payload: exactly `record.size` bytes from `source`.
    ///
    /// A source shorter than `record.size` fails with
    /// [`GlueError::SourceUnreadable`] labelled with `source_path`.  Any
    /// failed copy leaves the writer unusable: later calls, `finish`
    /// included, fail instead of producing a container with shifted
    /// payloads.
    ///
    /// A record whose `name + extension` could not be restored as a plain
    /// file name is refused with [`GlueError::InvalidArgument`] before
    /// anything is written.
    pub fn add_entry<R: Read>(
        &mut self,
        record:      FileRecord,
        mut source:  R,
        source_path: &Path,
    ) -> Result<()> {
        self.check_usable()?;
        if !is_plain_file_name(&record.file_name()) {
            return Err(GlueError::InvalidArgument(format!(
                "{:?} is not a plain file name",
                String::from_utf8_lossy(&record.file_name())
            )));
        }

        if let Err(fault) = copy_exact(&mut source, &mut self.writer, record.size, &mut self.buffer) {
            self.poisoned = true;
            return Err(match fault {
                CopyFault::Read(e)  => GlueError::unreadable(source_path, e),
                CopyFault::Write(e) => GlueError::unwritable(&self.path, e),
            });
        }
        debug!(
            source = %source_path.display(),
            size = record.size,
            index = self.footer.records.len(),
            "payload appended"
        );
        self.footer.records.push(record);
        Ok(())
    }

    /// Append an in-memory payload under `file_name` (`name.ext`).
    pub fn add_bytes(&mut self, file_name: &str, data: &[u8]) -> Result<()> {
        let record = FileRecord::from_file_name(data.len() as u64, file_name.as_bytes())?;
        self.add_entry(record, data, Path::new(file_name))
    }

    pub fn records(&self) -> &[FileRecord] {
        &self.footer.records
    }

    /// Sum of the payload sizes written so far, `None` on u64 overflow.
    pub fn payload_len(&self) -> Option<u64> {
        self.footer.payload_len()
    }

    fn check_usable(&self) -> Result<()> {
        if self.poisoned {
            return Err(GlueError::InvalidArgument(format!(
                "an earlier entry failed; {} is incomplete", self.path.display()
            )));
        }
        Ok(())
    }

    /// Write the records and the record count, flush, and hand back the
    /// underlying stream.  A container needs at least one entry.
    pub fn finish(mut self) -> Result<W> {
        self.check_usable()?;
        if self.footer.records.is_empty() {
            return Err(GlueError::InvalidArgument("a container needs at least one file".into()));
        }
        self.footer.write(&mut self.writer)
            .and_then(|()| self.writer.flush())
            .map_err(|e| GlueError::unwritable(&self.path, e))?;
        debug!(
            target_path = %self.path.display(),
            records = self.footer.records.len(),
            footer_bytes = self.footer.encoded_len(),
            "footer written"
        );
        Ok(self.writer)
    }
}

// ── Reader ───────────────────────────────────────────────────────────────────

pub struct ContainerReader<R: Read + Seek> {
    reader:      R,
    path:        PathBuf,
    footer:      Footer,
    entries:     Vec<Entry>,
    payload_len: u64,
    buffer:      Vec<u8>,
}

impl<R: Read + Seek> ContainerReader<R> {
    /// Open a container.  Fails with [`GlueError::InvalidContainer`] on any
    /// structural problem; no partial opening.
    pub fn open(reader: R, path: impl Into<PathBuf>) -> Result<Self> {
        Self::with_buffer_size(reader, path, DEFAULT_BUFFER_SIZE)
    }

    pub fn with_buffer_size(mut reader: R, path: impl Into<PathBuf>, buffer_size: usize) -> Result<Self> {
        let path = path.into();
        let (footer, payload_len) = Footer::read(&mut reader, &path)?;
        let entries = footer.entries();
        debug!(
            container = %path.display(),
            records = entries.len(),
            payload_len,
            "footer validated"
        );
        Ok(Self {
            reader,
            path,
            footer,
            entries,
            payload_len,
            buffer: vec![0u8; buffer_size.max(1)],
        })
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn footer(&self) -> &Footer {
        &self.footer
    }

    /// Length of the payload region, i.e. where the record section starts.
    pub fn payload_len(&self) -> u64 {
        self.payload_len
    }

    /// Copy the payload of entry `index` into `dst`.  Returns bytes copied.
    ///
    /// `dst_path` labels write failures as [`GlueError::DestinationWrite`].
    pub fn copy_entry<W: Write>(&mut self, index: usize, mut dst: W, dst_path: &Path) -> Result<u64> {
        let (offset, size) = match self.entries.get(index) {
            Some(e) => (e.offset, e.size),
            None    => return Err(GlueError::InvalidArgument(format!(
                "entry {index} out of range ({} entries)", self.entries.len()
            ))),
        };

        self.reader.seek(SeekFrom::Start(offset))
            .map_err(|e| GlueError::unreadable(&self.path, e))?;
        copy_exact(&mut self.reader, &mut dst, size, &mut self.buffer)
            .map_err(|fault| match fault {
                CopyFault::Read(e) if e.kind() == io::ErrorKind::UnexpectedEof =>
                    GlueError::InvalidContainer(format!("payload of entry {index} is truncated")),
                CopyFault::Read(e)  => GlueError::unreadable(&self.path, e),
                CopyFault::Write(e) => GlueError::unwritable(dst_path, e),
            })?;
        Ok(size)
    }

    /// Read the payload of entry `index` into memory.
    pub fn read_entry(&mut self, index: usize) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.copy_entry(index, &mut out, Path::new("<memory>"))?;
        Ok(out)
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}
