//! File-system helpers shared by merge and split.

use std::borrow::Cow;
use std::ffi::{OsStr, OsString};
use std::fs::{self, File};
use std::io;
use std::path::Path;

use tracing::debug;

use crate::error::{GlueError, Result};

/// Open `path` for reading, insisting on a regular file.  Returns the
/// handle and its length.
pub(crate) fn open_regular(path: &Path) -> Result<(File, u64)> {
    let meta = fs::metadata(path).map_err(|e| GlueError::open_source(path, e))?;
    if meta.is_dir() {
        return Err(GlueError::InvalidArgument(format!("{} is a directory", path.display())));
    }
    let file = File::open(path).map_err(|e| GlueError::open_source(path, e))?;
    // Measure the opened handle, not the path we stat'ed.
    let len = file.metadata().map_err(|e| GlueError::unreadable(path, e))?.len();
    Ok((file, len))
}

/// Run `op`; if it fails because `dir` does not exist, create `dir` with
/// all its ancestors and run `op` exactly once more.
pub(crate) fn retry_after_creating_dir<T>(
    dir:    &Path,
    mut op: impl FnMut() -> io::Result<T>,
) -> io::Result<T> {
    match op() {
        Err(e) if e.kind() == io::ErrorKind::NotFound && !dir.exists() => {
            debug!(dir = %dir.display(), "creating missing directory");
            fs::create_dir_all(dir)?;
            op()
        }
        other => other,
    }
}

/// Raw bytes of a file name as stored in a record.
#[cfg(unix)]
pub(crate) fn name_bytes(name: &OsStr) -> Cow<'_, [u8]> {
    use std::os::unix::ffi::OsStrExt;
    Cow::Borrowed(name.as_bytes())
}

#[cfg(not(unix))]
pub(crate) fn name_bytes(name: &OsStr) -> Cow<'_, [u8]> {
    match name.to_string_lossy() {
        Cow::Borrowed(s) => Cow::Borrowed(s.as_bytes()),
        Cow::Owned(s)    => Cow::Owned(s.into_bytes()),
    }
}

/// File name for the bytes stored in a record.
#[cfg(unix)]
pub(crate) fn os_file_name(bytes: &[u8]) -> OsString {
    use std::os::unix::ffi::OsStrExt;
    OsStr::from_bytes(bytes).to_owned()
}

#[cfg(not(unix))]
pub(crate) fn os_file_name(bytes: &[u8]) -> OsString {
    OsString::from(String::from_utf8_lossy(bytes).into_owned())
}
