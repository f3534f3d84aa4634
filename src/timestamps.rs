//! File timestamp carry-over.
//!
//! Access and modification times are copied from source to destination
//! on every platform. Creation time has no portable setter; it is
//! copied on Windows, where the standard library exposes one, and
//! silently skipped elsewhere.

use std::fs::{File, FileTimes, OpenOptions};
use std::path::Path;

use crate::error::ConvertError;

/// Copy the source file's timestamps onto the (already written)
/// destination.
pub fn copy_timestamps(source: &Path, dest: &Path) -> Result<(), ConvertError> {
    let meta = std::fs::metadata(source)?;

    let mut times = FileTimes::new();
    if let Ok(accessed) = meta.accessed() {
        times = times.set_accessed(accessed);
    }
    if let Ok(modified) = meta.modified() {
        times = times.set_modified(modified);
    }
    times = set_created(times, &meta);

    let dest_file: File = OpenOptions::new().write(true).open(dest)?;
    dest_file.set_times(times)?;
    Ok(())
}

#[cfg(windows)]
fn set_created(times: FileTimes, meta: &std::fs::Metadata) -> FileTimes {
    use std::os::windows::fs::FileTimesExt;
    match meta.created() {
        Ok(created) => times.set_created(created),
        Err(_) => times,
    }
}

#[cfg(not(windows))]
fn set_created(times: FileTimes, _meta: &std::fs::Metadata) -> FileTimes {
    times
}
