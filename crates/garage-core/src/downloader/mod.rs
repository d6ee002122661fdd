//! Transport used to fetch missing or stale files.
//!
//! The cache only depends on the [`Downloader`] trait. [`CurlDownloader`]
//! is the default implementation: a blocking libcurl GET with retry and
//! backoff, written through a `.part` file.

mod http;

pub use self::http::CurlDownloader;

use crate::error::DownloadError;
use std::path::Path;
use std::time::Duration;

/// Retrieves the bytes at `url` into `destination`.
///
/// Implementations own timeouts and retries; the cache treats any error
/// as fatal for the fetch. On success `destination` holds the complete
/// body; on failure it must not hold a partial one.
pub trait Downloader: Send + Sync {
    fn download(&self, url: &str, destination: &Path) -> Result<(), DownloadError>;
}

impl<D: Downloader + ?Sized> Downloader for std::sync::Arc<D> {
    fn download(&self, url: &str, destination: &Path) -> Result<(), DownloadError> {
        (**self).download(url, destination)
    }
}

/// libcurl tuning for [`CurlDownloader`].
#[derive(Debug, Clone, Copy)]
pub struct CurlOptions {
    pub connect_timeout: Duration,
    /// Abort when throughput stays below `low_speed_limit` bytes/s for `low_speed_time`.
    pub low_speed_limit: u32,
    pub low_speed_time: Duration,
    /// Hard wall-clock limit for one attempt.
    pub timeout: Duration,
    pub max_redirections: u32,
}

impl Default for CurlOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            low_speed_limit: 1024,
            low_speed_time: Duration::from_secs(60),
            timeout: Duration::from_secs(3600),
            max_redirections: 10,
        }
    }
}
