//! Single-stream HTTP GET through a libcurl easy handle.

use super::{CurlOptions, Downloader};
use crate::error::DownloadError;
use crate::retry::{run_with_retry, RetryPolicy};
use crate::storage::PartFile;
use std::io::{self, Write};
use std::path::Path;

/// Blocking downloader backed by libcurl.
///
/// Each attempt writes to `<destination>.part`; the temp file is renamed
/// onto `destination` only after a 2xx response. Transient failures are
/// retried according to the configured [`RetryPolicy`].
#[derive(Debug, Clone, Default)]
pub struct CurlDownloader {
    options: CurlOptions,
    retry: RetryPolicy,
}

impl CurlDownloader {
    pub fn new(options: CurlOptions, retry: RetryPolicy) -> Self {
        Self { options, retry }
    }

    pub fn options(&self) -> &CurlOptions {
        &self.options
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    fn download_once(&self, url: &str, destination: &Path) -> Result<u64, DownloadError> {
        let mut part = PartFile::create(destination)?;
        let mut written = 0u64;
        let mut write_error: Option<io::Error> = None;

        let mut easy = curl::easy::Easy::new();
        easy.url(url)?;
        easy.follow_location(true)?;
        easy.max_redirections(self.options.max_redirections)?;
        easy.fail_on_error(false)?;
        easy.useragent(concat!("garage/", env!("CARGO_PKG_VERSION")))?;
        easy.connect_timeout(self.options.connect_timeout)?;
        easy.low_speed_limit(self.options.low_speed_limit)?;
        easy.low_speed_time(self.options.low_speed_time)?;
        easy.timeout(self.options.timeout)?;

        let performed = {
            let mut transfer = easy.transfer();
            transfer.write_function(|data| match part.write_all(data) {
                Ok(()) => {
                    written += data.len() as u64;
                    Ok(data.len())
                }
                Err(e) => {
                    // Returning a short count makes libcurl abort the transfer.
                    write_error = Some(e);
                    Ok(0)
                }
            })?;
            transfer.perform()
        };

        if let Some(e) = write_error {
            return Err(DownloadError::Storage(e));
        }
        performed?;

        // file:// and similar schemes report 0.
        let code = easy.response_code()?;
        if code != 0 && !(200..300).contains(&code) {
            return Err(DownloadError::Http(code));
        }

        part.finalize()?;
        Ok(written)
    }
}

impl Downloader for CurlDownloader {
    fn download(&self, url: &str, destination: &Path) -> Result<(), DownloadError> {
        url::Url::parse(url).map_err(|e| DownloadError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        let bytes = run_with_retry(&self.retry, || self.download_once(url, destination))?;
        tracing::debug!(url, dest = %destination.display(), bytes, "download complete");
        Ok(())
    }
}
