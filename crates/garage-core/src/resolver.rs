//! Cache resolution: decide whether a registered file must be downloaded.
//!
//! For a requested name the resolver classifies the local copy as
//! [`CacheState::LocalValid`], [`CacheState::LocalMissing`] or
//! [`CacheState::LocalStale`], downloads when needed, re-verifies the new
//! bytes and hands the result to an optional [`Processor`].

use crate::checksum::{self, Algorithm, ExpectedHash};
use crate::config::MismatchPolicy;
use crate::downloader::Downloader;
use crate::error::{Error, Result};
use crate::notice::{Notice, NoticeSink};
use crate::processor::{Action, ProcessContext, Processor};
use crate::registry::{self, Registry};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// State of the local copy of a registered file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    /// Present and hashing to the registry value.
    LocalValid,
    /// Not present in the store.
    LocalMissing,
    /// Present but hashing to something else.
    LocalStale,
}

impl CacheState {
    /// Processor action that follows a fetch starting from this state.
    pub fn action(self) -> Action {
        match self {
            CacheState::LocalValid => Action::Fetch,
            CacheState::LocalMissing => Action::Download,
            CacheState::LocalStale => Action::Update,
        }
    }
}

impl fmt::Display for CacheState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CacheState::LocalValid => "valid",
            CacheState::LocalMissing => "missing",
            CacheState::LocalStale => "stale",
        })
    }
}

/// Outcome of [`CacheResolver::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    /// Absolute path of the verified file.
    pub path: PathBuf,
    /// State the local copy was in before this fetch.
    pub state: CacheState,
}

/// Everything needed to resolve one name, borrowed from the owner.
pub struct CacheResolver<'a> {
    pub registry: &'a Registry,
    pub store: &'a Path,
    /// Normalized base URL, ending in `/` unless empty.
    pub base_url: &'a str,
    pub urls: &'a BTreeMap<String, String>,
    pub algorithm: Algorithm,
    pub on_mismatch: MismatchPolicy,
    pub downloader: &'a dyn Downloader,
    pub notices: &'a dyn NoticeSink,
}

impl CacheResolver<'_> {
    /// Path the file with this name occupies in the store. Names that
    /// would leave the store are rejected.
    pub fn local_path(&self, name: &str) -> Result<PathBuf> {
        registry::validate_name(name)?;
        Ok(name
            .split('/')
            .fold(self.store.to_path_buf(), |path, part| path.join(part)))
    }

    /// Remote URL of a registered file: its override, else base URL + name.
    pub fn url_for(&self, name: &str) -> Result<String> {
        self.registry.lookup(name)?;
        Ok(match self.urls.get(name) {
            Some(url) => url.clone(),
            None => format!("{}{}", self.base_url, name),
        })
    }

    /// Classify the local copy without downloading anything.
    pub fn inspect(&self, name: &str) -> Result<CacheState> {
        let expected = self.registry.lookup(name)?;
        self.state_of(&self.local_path(name)?, expected)
    }

    /// Make sure a valid copy of `name` is in the store and return its path.
    pub fn resolve(&self, name: &str) -> Result<Resolved> {
        let expected = self.registry.lookup(name)?;
        let path = self.local_path(name)?;
        let state = self.state_of(&path, expected)?;
        tracing::debug!(name, %state, path = %path.display(), "resolved cache state");

        if state == CacheState::LocalValid {
            return Ok(Resolved { path, state });
        }

        let url = self.url_for(name)?;
        let notice = match state {
            CacheState::LocalStale => Notice::Updating {
                name: name.to_string(),
                url: url.clone(),
                store: self.store.to_path_buf(),
            },
            _ => Notice::Downloading {
                name: name.to_string(),
                url: url.clone(),
                store: self.store.to_path_buf(),
            },
        };
        self.notices.notice(&notice);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        self.downloader
            .download(&url, &path)
            .map_err(|source| Error::Download {
                url: url.clone(),
                source,
            })?;

        self.check_download(name, &path, expected)?;
        Ok(Resolved { path, state })
    }

    /// [`resolve`](Self::resolve), then run `processor` on the result.
    pub fn resolve_with(&self, name: &str, processor: &dyn Processor) -> Result<Vec<PathBuf>> {
        let resolved = self.resolve(name)?;
        let ctx = ProcessContext {
            input: &resolved.path,
            action: resolved.state.action(),
            store: self.store,
            notices: self.notices,
        };
        processor.process(&ctx)
    }

    fn state_of(&self, path: &Path, expected: &str) -> Result<CacheState> {
        if !path.is_file() {
            return Ok(CacheState::LocalMissing);
        }
        if checksum::verify(path, expected, self.algorithm)? {
            Ok(CacheState::LocalValid)
        } else {
            Ok(CacheState::LocalStale)
        }
    }

    fn check_download(&self, name: &str, path: &Path, expected: &str) -> Result<()> {
        let expected = ExpectedHash::parse(expected, self.algorithm)?;
        let actual = checksum::hash_of(path, expected.algorithm)?;
        if actual == expected.hex {
            return Ok(());
        }
        tracing::warn!(
            name,
            expected = %expected.hex,
            actual = %actual,
            policy = ?self.on_mismatch,
            "downloaded file failed verification"
        );
        if self.on_mismatch == MismatchPolicy::Delete {
            fs::remove_file(path)?;
        }
        Err(Error::HashMismatch {
            name: name.to_string(),
            expected: expected.hex,
            actual,
            path: path.to_path_buf(),
        })
    }
}
