//! User-visible notices emitted while fetching.
//!
//! A fetch that downloads emits exactly one [`Notice::Downloading`] or
//! [`Notice::Updating`]; each extraction or decompression emits one more.
//! Cache hits emit nothing. The `Display` wording is stable and callers
//! may match on it.

use std::fmt;
use std::path::PathBuf;
use std::sync::Mutex;

/// One user-visible event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// The file was absent from the store.
    Downloading {
        name: String,
        url: String,
        store: PathBuf,
    },
    /// The file was present but its hash did not match the registry.
    Updating {
        name: String,
        url: String,
        store: PathBuf,
    },
    /// Selected archive members are being extracted.
    ExtractingMembers {
        members: Vec<String>,
        archive: PathBuf,
        destination: PathBuf,
    },
    /// The whole archive is being extracted. `verb` is e.g. "Unzipping".
    ExtractingAll {
        verb: &'static str,
        archive: PathBuf,
        destination: PathBuf,
        members: usize,
    },
    Decompressing {
        source: PathBuf,
        destination: PathBuf,
        method: &'static str,
    },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::Downloading { name, url, store } => write!(
                f,
                "Downloading file '{}' from '{}' to '{}'.",
                name,
                url,
                store.display()
            ),
            Notice::Updating { name, url, store } => write!(
                f,
                "Updating file '{}' from '{}' in '{}'.",
                name,
                url,
                store.display()
            ),
            Notice::ExtractingMembers {
                members,
                archive,
                destination,
            } => {
                let quoted: Vec<String> = members.iter().map(|m| format!("'{}'", m)).collect();
                write!(
                    f,
                    "Extracting {} from '{}' to '{}'.",
                    quoted.join(", "),
                    archive.display(),
                    destination.display()
                )
            }
            Notice::ExtractingAll {
                verb,
                archive,
                destination,
                members,
            } => write!(
                f,
                "{} contents of '{}' to '{}' ({} members).",
                verb,
                archive.display(),
                destination.display(),
                members
            ),
            Notice::Decompressing {
                source,
                destination,
                method,
            } => write!(
                f,
                "Decompressing '{}' to '{}' using method '{}'.",
                source.display(),
                destination.display(),
                method
            ),
        }
    }
}

/// Receiver for notices. Implementations must be cheap; they are called
/// while the per-file lock is held.
pub trait NoticeSink: Send + Sync {
    fn notice(&self, notice: &Notice);
}

/// Logs notices through `tracing` at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl NoticeSink for TracingSink {
    fn notice(&self, notice: &Notice) {
        tracing::info!(target: "garage::notice", "{}", notice);
    }
}

/// Discards every notice.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl NoticeSink for NullSink {
    fn notice(&self, _notice: &Notice) {}
}

/// Keeps every notice in memory, in emission order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return everything recorded so far.
    pub fn take(&self) -> Vec<Notice> {
        std::mem::take(&mut *self.lock())
    }

    /// Rendered messages recorded so far.
    pub fn messages(&self) -> Vec<String> {
        self.lock().iter().map(ToString::to_string).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Notice>> {
        self.notices.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl NoticeSink for RecordingSink {
    fn notice(&self, notice: &Notice) {
        self.lock().push(notice.clone());
    }
}
