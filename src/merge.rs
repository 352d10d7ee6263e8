//! Merge: pack an ordered list of files into one container.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::info;

use crate::error::{GlueError, MergeError};
use crate::fsutil::{name_bytes, open_regular, retry_after_creating_dir};
use crate::io_stream::{ContainerWriter, DEFAULT_BUFFER_SIZE};
use crate::record::FileRecord;

/// Configuration for [`merge_with_options`].
#[derive(Debug, Clone)]
pub struct MergeOptions {
    /// Size of the buffer payloads are streamed through.
    pub buffer_size: usize,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self { buffer_size: DEFAULT_BUFFER_SIZE }
    }
}

/// An opened, measured source file.
struct Source {
    path:   PathBuf,
    file:   File,
    record: FileRecord,
}

impl Source {
    fn open(path: &Path) -> Result<Self, MergeError> {
        let file_name = path.file_name().ok_or_else(|| GlueError::InvalidArgument(format!(
            "{} does not name a file", path.display()
        )))?;
        let (file, len) = open_regular(path)?;
        let record = FileRecord::from_file_name(len, &name_bytes(file_name))?;
        Ok(Self { path: path.to_owned(), file, record })
    }
}

/// Merge `sources`, in order, into a new container at `target`.
pub fn merge<P: AsRef<Path>>(sources: &[P], target: impl AsRef<Path>) -> Result<(), MergeError> {
    merge_with_options(sources, target, &MergeOptions::default())
}

/// Merge with explicit options.
///
/// Every source is opened and checked before the target is touched, so a
/// missing or unusable source leaves no output.  The container is staged
/// in a temporary file next to `target` and renamed over it only once the
/// footer is written; a failed merge leaves no partial container behind.
/// A missing parent directory of `target` is created once.
pub fn merge_with_options<P: AsRef<Path>>(
    sources: &[P],
    target:  impl AsRef<Path>,
    opts:    &MergeOptions,
) -> Result<(), MergeError> {
    let target = target.as_ref();
    if sources.is_empty() {
        return Err(GlueError::InvalidArgument("at least one source file is required".into()));
    }

    let sources = sources.iter()
        .map(|p| Source::open(p.as_ref()))
        .collect::<Result<Vec<_>, _>>()?;

    let staging = create_staging(target)?;
    let mut writer = ContainerWriter::with_buffer_size(BufWriter::new(staging), target, opts.buffer_size);
    for source in sources {
        writer.add_entry(source.record, source.file, &source.path)?;
    }
    let records = writer.records().len();
    let payload_len = writer.payload_len();

    let staging = writer.finish()?
        .into_inner()
        .map_err(|e| GlueError::unwritable(target, e.into_error()))?;
    staging.persist(target)
        .map_err(|e| GlueError::unwritable(target, e.error))?;

    info!(target_path = %target.display(), records, payload_len = ?payload_len, "merged");
    Ok(())
}

fn create_staging(target: &Path) -> Result<NamedTempFile, MergeError> {
    let dir = match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    retry_after_creating_dir(dir, || {
        tempfile::Builder::new().prefix(".fileglue-").suffix(".tmp").tempfile_in(dir)
    })
    .map_err(|e| GlueError::unwritable(target, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn empty_source_list_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out.bin");
        let none: &[PathBuf] = &[];
        assert!(matches!(merge(none, &target), Err(GlueError::InvalidArgument(_))));
        assert!(!target.exists());
    }

    #[test]
    fn missing_source_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("a.txt");
        fs::write(&present, b"foo").unwrap();
        let target = dir.path().join("out.bin");

        let err = merge(&[present, dir.path().join("gone.txt")], &target).unwrap_err();
        assert!(matches!(err, GlueError::SourceNotFound(_)));
        assert!(!target.exists());
        // No staging file left behind either.
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn record_takes_name_and_extension_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("archive.tar.gz");
        fs::write(&path, b"12345").unwrap();
        let source = Source::open(&path).unwrap();
        assert_eq!(source.record.size, 5);
        assert_eq!(source.record.name(), b"archive.tar");
        assert_eq!(source.record.extension(), b".gz");
    }

    #[test]
    fn tiny_buffer_still_merges() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.txt");
        fs::write(&a, b"hello world").unwrap();
        let target = dir.path().join("out.bin");
        merge_with_options(&[&a], &target, &MergeOptions { buffer_size: 1 }).unwrap();
        assert_eq!(fs::metadata(&target).unwrap().len(), 11 + 264 + 8);
    }
}
