//! Split: restore the files packed in a container.

use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{GlueError, Result, SplitError};
use crate::footer::Entry;
use crate::fsutil::{open_regular, os_file_name};
use crate::io_stream::{ContainerReader, DEFAULT_BUFFER_SIZE};

/// Configuration for [`split_with_options`].
#[derive(Debug, Clone)]
pub struct SplitOptions {
    pub buffer_size: usize,
    /// Replace files that already exist in the target directory.  When
    /// false an existing file fails the split with
    /// [`GlueError::DestinationWrite`].
    ///
    /// This also applies between entries: a container may hold two files
    /// with the same name (merged from different directories).  With
    /// overwrite on, the later entry replaces the earlier one and a warning
    /// is logged; with it off, the later entry fails the split.
    pub overwrite:   bool,
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self { buffer_size: DEFAULT_BUFFER_SIZE, overwrite: true }
    }
}

/// Split the container at `container` into `target_dir`.
pub fn split(container: impl AsRef<Path>, target_dir: impl AsRef<Path>) -> Result<(), SplitError> {
    split_with_options(container, target_dir, &SplitOptions::default())
}

/// Split with explicit options.
///
/// The whole footer is validated before anything is created; a corrupt
/// container leaves the file system untouched.  A failure while writing
/// the files themselves leaves the ones already written in place.
pub fn split_with_options(
    container:  impl AsRef<Path>,
    target_dir: impl AsRef<Path>,
    opts:       &SplitOptions,
) -> Result<(), SplitError> {
    let container  = container.as_ref();
    let target_dir = target_dir.as_ref();
    let mut reader = open_container(container, opts.buffer_size)?;

    fs::create_dir_all(target_dir).map_err(|e| GlueError::unwritable(target_dir, e))?;

    let outputs: Vec<PathBuf> = reader.entries().iter()
        .map(|e| target_dir.join(os_file_name(&e.file_name)))
        .collect();
    let mut seen = HashSet::new();
    for (index, out_path) in outputs.iter().enumerate() {
        if !seen.insert(out_path) {
            warn!(path = %out_path.display(), index, "duplicate name, earlier entry is replaced");
        }
        let file = create_output(out_path, opts.overwrite)?;
        let mut out = BufWriter::new(file);
        let size = reader.copy_entry(index, &mut out, out_path)?;
        out.flush().map_err(|e| GlueError::unwritable(out_path, e))?;
        debug!(path = %out_path.display(), size, "restored");
    }

    info!(
        container = %container.display(),
        target_dir = %target_dir.display(),
        records = outputs.len(),
        "split"
    );
    Ok(())
}

/// Validate `container` and return its entries without extracting.
pub fn list(container: impl AsRef<Path>) -> Result<Vec<Entry>> {
    let reader = open_container(container.as_ref(), DEFAULT_BUFFER_SIZE)?;
    Ok(reader.entries().to_vec())
}

fn open_container(path: &Path, buffer_size: usize) -> Result<ContainerReader<BufReader<File>>> {
    let (file, _) = open_regular(path)?;
    ContainerReader::with_buffer_size(BufReader::new(file), path, buffer_size)
}

fn create_output(path: &Path, overwrite: bool) -> Result<File> {
    let mut opts = OpenOptions::new();
    opts.write(true);
    if overwrite {
        opts.create(true).truncate(true);
    } else {
        opts.create_new(true);
    }
    opts.open(path).map_err(|e| GlueError::unwritable(path, e))
}
