//! Disk I/O and file lifecycle.
//!
//! Streams a response body into a `.part` temp file next to the target and
//! atomically commits it with a rename. A writer dropped without `commit`
//! removes its temp file, so failed or cancelled fetches never leave
//! partial state at or beside the target path.

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Temporary file suffix used before atomic rename.
pub const TEMP_SUFFIX: &str = ".part";

/// Path for the temp file: appends `.part` to the final path
/// (e.g. `index.json` -> `index.json.part`).
pub fn temp_path(final_path: &Path) -> PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(TEMP_SUFFIX);
    PathBuf::from(o)
}

/// Sequential writer for one streamed download.
///
/// Created per attempt; an attempt that fails mid-stream drops the writer
/// and with it the temp file, leaving any previously committed target
/// untouched.
pub struct StreamWriter {
    file: Option<File>,
    temp_path: PathBuf,
    final_path: PathBuf,
    bytes_written: u64,
}

impl StreamWriter {
    /// Create the temp file for `final_path`, truncating any stale leftover.
    pub fn create(final_path: &Path) -> io::Result<Self> {
        let temp = temp_path(final_path);
        let file = File::options()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp)?;
        Ok(Self {
            file: Some(file),
            temp_path: temp,
            final_path: final_path.to_path_buf(),
            bytes_written: 0,
        })
    }

    /// Append one chunk of the body.
    pub fn write_chunk(&mut self, data: &[u8]) -> io::Result<()> {
        match self.file.as_mut() {
            Some(f) => {
                f.write_all(data)?;
                self.bytes_written += data.len() as u64;
                Ok(())
            }
            None => Err(io::Error::new(io::ErrorKind::Other, "writer already closed")),
        }
    }

    /// Total bytes appended so far.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Path of the in-progress temp file.
    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    /// Flush, sync, and atomically rename the temp file onto the target.
    /// Consumes the writer; after this the target holds the full content.
    pub fn commit(mut self) -> io::Result<()> {
        let file = match self.file.take() {
            Some(f) => f,
            None => return Err(io::Error::new(io::ErrorKind::Other, "writer already closed")),
        };
        file.sync_all()?;
        // File must be closed before rename on some platforms.
        drop(file);
        std::fs::rename(&self.temp_path, &self.final_path)
    }
}

impl Drop for StreamWriter {
    fn drop(&mut self) {
        if self.file.take().is_some() {
            if let Err(e) = std::fs::remove_file(&self.temp_path) {
                if e.kind() != io::ErrorKind::NotFound {
                    tracing::warn!(
                        path = %self.temp_path.display(),
                        error = %e,
                        "failed to remove temp file"
                    );
                }
            }
        }
    }
}
