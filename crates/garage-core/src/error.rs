//! Error taxonomy for fetch, registry and processor operations.
//!
//! Every failure of a fetch call is surfaced synchronously through
//! [`Error`]; nothing here is retried by the cache itself. Transport
//! failures carry their own [`DownloadError`] so callers can tell a
//! network problem from a verification problem.

use std::io;
use std::path::PathBuf;

/// Errors returned by the cache, the registry loader and the processors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested name has no registry entry.
    #[error("file '{name}' is not in the registry")]
    UnknownFile { name: String },

    /// A name that would resolve outside the store (`..`, `.`, empty or
    /// absolute parts).
    #[error("file name '{name}' must be a relative path inside the store")]
    InvalidName { name: String },

    /// A registry line did not have exactly two tokens.
    #[error("malformed registry {path}: line {line} has {tokens} token(s), expected 2")]
    MalformedRegistry {
        path: PathBuf,
        line: usize,
        tokens: usize,
    },

    /// The freshly downloaded file does not hash to the registry value.
    #[error(
        "hash of downloaded file '{name}' ({actual}) does not match the registry ({expected}); \
         the file at {path} may be corrupted or the registry may be outdated"
    )]
    HashMismatch {
        name: String,
        expected: String,
        actual: String,
        path: PathBuf,
    },

    /// A processor was used without a required attribute.
    #[error("processor is missing the '{attribute}' attribute")]
    NotConfigured { attribute: &'static str },

    /// A processor has its configuration but no extraction strategy.
    #[error("processor '{processor}' has no extraction strategy")]
    NotImplemented { processor: String },

    /// A member filter named something the archive does not contain.
    #[error("member '{member}' not found in archive {archive}")]
    MemberNotFound { member: String, archive: PathBuf },

    #[error("unsupported hash algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("unsupported compression method: {0}")]
    UnsupportedCompression(String),

    /// The downloader could not retrieve the file.
    #[error("failed to download {url}")]
    Download {
        url: String,
        #[source]
        source: DownloadError,
    },

    #[error("archive error: {0}")]
    Archive(String),

    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Result alias for garage operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Transport failure reported by a [`Downloader`](crate::downloader::Downloader).
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// libcurl reported an error (timeout, connection, etc.).
    #[error("{0}")]
    Curl(#[from] curl::Error),

    /// HTTP response had a non-2xx status.
    #[error("HTTP {0}")]
    Http(u32),

    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Writing the body to disk failed. Not retried.
    #[error("storage: {0}")]
    Storage(#[from] io::Error),
}
