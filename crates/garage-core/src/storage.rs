//! Download file lifecycle.
//!
//! Bodies are written to `<destination>.part` and renamed onto the final
//! name only after the transfer succeeded. A [`PartFile`] that is dropped
//! without being finalized removes its temp file, so failed transfers
//! never leave half-written data under the final name.

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Temporary file suffix used before atomic rename.
pub const TEMP_SUFFIX: &str = ".part";

/// Path for the temp file: appends `.part` to the final path (e.g. `file.iso` → `file.iso.part`).
pub fn temp_path(final_path: &Path) -> PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(TEMP_SUFFIX);
    PathBuf::from(o)
}

/// Temp download file that is removed on drop unless finalized.
pub struct PartFile {
    file: Option<File>,
    temp_path: PathBuf,
    final_path: PathBuf,
    finalized: bool,
}

impl PartFile {
    /// Create `<final_path>.part`, creating parent directories as needed.
    /// Truncates a leftover temp file from an earlier interrupted run.
    pub fn create(final_path: &Path) -> io::Result<Self> {
        if let Some(parent) = final_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let temp_path = temp_path(final_path);
        let file = File::options()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)?;
        Ok(Self {
            file: Some(file),
            temp_path,
            final_path: final_path.to_path_buf(),
            finalized: false,
        })
    }

    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    /// Sync to disk and atomically rename onto the final path.
    pub fn finalize(mut self) -> io::Result<PathBuf> {
        if let Some(file) = self.file.take() {
            file.sync_all()?;
        }
        std::fs::rename(&self.temp_path, &self.final_path)?;
        self.finalized = true;
        Ok(self.final_path.clone())
    }
}

impl Write for PartFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.file.as_mut() {
            Some(f) => f.write(buf),
            None => Err(io::Error::other("part file already finalized")),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.file.as_mut() {
            Some(f) => f.flush(),
            None => Ok(()),
        }
    }
}

impl Drop for PartFile {
    fn drop(&mut self) {
        drop(self.file.take());
        if self.finalized {
            return;
        }
        if let Err(e) = std::fs::remove_file(&self.temp_path) {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::warn!(path = %self.temp_path.display(), "could not remove temp file: {}", e);
            }
        }
    }
}
