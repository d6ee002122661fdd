//! Classify HTTP status and curl errors into retry policy error kinds.

use crate::error::DownloadError;
use crate::retry::policy::ErrorKind;

/// Classify an HTTP status code for retry decisions.
pub fn classify_http_status(code: u32) -> ErrorKind {
    match code {
        429 | 503 => ErrorKind::Throttled,
        500..=599 => ErrorKind::Http5xx(code as u16),
        _ => ErrorKind::Other,
    }
}

/// Classify a curl error for retry decisions.
pub fn classify_curl_error(e: &curl::Error) -> ErrorKind {
    if e.is_operation_timedout() {
        return ErrorKind::Timeout;
    }
    if e.is_couldnt_connect()
        || e.is_couldnt_resolve_host()
        || e.is_couldnt_resolve_proxy()
        || e.is_read_error()
        || e.is_recv_error()
        || e.is_send_error()
        || e.is_got_nothing()
        || e.is_partial_file()
    {
        return ErrorKind::Connection;
    }
    ErrorKind::Other
}

/// Classify a transfer error. Local storage and URL errors are never retried.
pub fn classify(e: &DownloadError) -> ErrorKind {
    match e {
        DownloadError::Curl(ce) => classify_curl_error(ce),
        DownloadError::Http(code) => classify_http_status(*code),
        DownloadError::InvalidUrl { .. } | DownloadError::Storage(_) => ErrorKind::Other,
    }
}
