//! Post-download processors.
//!
//! A processor turns a freshly downloaded file into derived artifacts
//! (extracted archive members, a decompressed copy) kept next to it in the
//! store. It does its work when the file was just downloaded or updated;
//! on a cache hit it only reports the outputs it produced earlier.

mod decompress;
mod extract;
mod tar;
mod zip;

pub use self::decompress::{Decompress, Method};
pub use self::extract::{ExtractStrategy, ExtractorProcessor, UNTAR_SUFFIX, UNZIP_SUFFIX};
pub use self::tar::{TarCompression, TarStrategy};
pub use self::zip::ZipStrategy;

use crate::error::Result;
use crate::notice::NoticeSink;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

/// Why the processor is being called.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// The file was absent and has just been downloaded.
    Download,
    /// The file was stale and has just been downloaded again.
    Update,
    /// The cached file was valid; nothing was downloaded.
    Fetch,
}

impl Action {
    /// Whether this call follows a download.
    pub fn is_fresh(self) -> bool {
        matches!(self, Action::Download | Action::Update)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::Download => "download",
            Action::Update => "update",
            Action::Fetch => "fetch",
        })
    }
}

/// Everything a processor gets to see about the fetch it runs in.
pub struct ProcessContext<'a> {
    /// Absolute path of the verified file in the store.
    pub input: &'a Path,
    pub action: Action,
    /// Root of the local store.
    pub store: &'a Path,
    pub notices: &'a dyn NoticeSink,
}

/// Post-download hook producing derived files.
pub trait Processor {
    /// Return the derived files for `ctx.input`, producing them if needed.
    fn process(&self, ctx: &ProcessContext<'_>) -> Result<Vec<PathBuf>>;
}

impl<P: Processor + ?Sized> Processor for &P {
    fn process(&self, ctx: &ProcessContext<'_>) -> Result<Vec<PathBuf>> {
        (**self).process(ctx)
    }
}

impl<P: Processor + ?Sized> Processor for Box<P> {
    fn process(&self, ctx: &ProcessContext<'_>) -> Result<Vec<PathBuf>> {
        (**self).process(ctx)
    }
}

/// `path` with `suffix` appended to its last component (`a.zip` → `a.zip.unzip`).
pub(crate) fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut s = OsString::from(path.as_os_str());
    s.push(suffix);
    PathBuf::from(s)
}
