//! Writing converted archives to the output directory.

use crate::error::Result;

use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Write `contents` to `directory/filename` so that the final path only ever
/// holds a complete file.
///
/// Data goes to a hidden sibling first and is renamed into place; the
/// temporary file is removed if anything fails.
pub(crate) async fn write_atomically(
    directory: &Path,
    filename: &str,
    contents: &[u8],
) -> Result<PathBuf> {
    if Path::new(filename).file_name() != Some(OsStr::new(filename)) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("output name {:?} is not a plain file name", filename),
        )
        .into());
    }
    fs::create_dir_all(directory).await?;

    let output = directory.join(filename);
    let temp = directory.join(format!(
        ".{}.{}.{}.part",
        filename,
        std::process::id(),
        TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));

    let written = match fs::write(&temp, contents).await {
        Ok(()) => fs::rename(&temp, &output).await,
        Err(e) => Err(e),
    };
    if let Err(e) = written {
        let _ = fs::remove_file(&temp).await;
        return Err(e.into());
    }
    Ok(output)
}
