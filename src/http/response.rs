//! Response handling.
//!
//! # Responsibilities
//! - Hold the status, rate-limit metadata and raw body of one outbound call
//! - Parse rate-limit headers (`x-ratelimit-remaining`, `x-ratelimit-reset`, `retry-after`)
//! - Convert non-success responses into classified `FetchError`s
//!
//! # Design Decisions
//! - Bodies are buffered; payloads here are small documents, not streams
//! - Reset timestamps are absolute wall-clock (epoch seconds), so waits are
//!   computed against `SystemTime`, not the monotonic clock

use reqwest::header::HeaderMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::error::FetchError;

pub const X_RATELIMIT_REMAINING: &str = "x-ratelimit-remaining";
pub const X_RATELIMIT_RESET: &str = "x-ratelimit-reset";
pub const RETRY_AFTER: &str = "retry-after";

/// Rate-limit metadata advertised by the remote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateLimitInfo {
    /// Calls left in the current window.
    pub remaining: Option<u64>,
    /// Window reset, seconds since the Unix epoch.
    pub reset_at: Option<u64>,
    /// Explicit wait requested via `Retry-After` (delta-seconds form).
    pub retry_after: Option<Duration>,
}

impl RateLimitInfo {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let number = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
        };

        Self {
            remaining: number(X_RATELIMIT_REMAINING),
            reset_at: number(X_RATELIMIT_RESET),
            retry_after: number(RETRY_AFTER).map(Duration::from_secs),
        }
    }

    /// How long the remote asks us to wait, measured from `now`.
    ///
    /// `Retry-After` wins over the reset timestamp. A reset already in the past
    /// yields a zero wait.
    pub fn wait_hint(&self, now: SystemTime) -> Option<Duration> {
        if let Some(after) = self.retry_after {
            return Some(after);
        }
        let reset = UNIX_EPOCH + Duration::from_secs(self.reset_at?);
        Some(reset.duration_since(now).unwrap_or(Duration::ZERO))
    }
}

/// A fully buffered response from an external service.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub rate_limit: RateLimitInfo,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            rate_limit: RateLimitInfo::default(),
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body as UTF-8 text.
    pub fn text(&self) -> Result<String, std::string::FromUtf8Error> {
        String::from_utf8(self.body.clone())
    }

    /// Turn a non-success response into a classified error.
    pub fn into_error(self) -> FetchError {
        let mut message = String::from_utf8_lossy(&self.body).into_owned();
        if message.len() > 200 {
            let mut cut = 200;
            while !message.is_char_boundary(cut) {
                cut -= 1;
            }
            message.truncate(cut);
        }
        FetchError::Status {
            status: self.status,
            message,
            rate_limit: self.rate_limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_parse_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from_static("0"));
        headers.insert(X_RATELIMIT_RESET, HeaderValue::from_static("1700000060"));
        headers.insert("retry-after", HeaderValue::from_static("not-a-number"));

        let info = RateLimitInfo::from_headers(&headers);
        assert_eq!(info.remaining, Some(0));
        assert_eq!(info.reset_at, Some(1_700_000_060));
        assert_eq!(info.retry_after, None);
    }

    #[test]
    fn test_wait_hint() {
        let now = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let info = RateLimitInfo {
            remaining: Some(0),
            reset_at: Some(1_700_000_060),
            retry_after: None,
        };
        assert_eq!(info.wait_hint(now), Some(Duration::from_secs(60)));

        let past = RateLimitInfo {
            reset_at: Some(1_600_000_000),
            ..RateLimitInfo::default()
        };
        assert_eq!(past.wait_hint(now), Some(Duration::ZERO));

        let explicit = RateLimitInfo {
            reset_at: Some(1_700_000_060),
            retry_after: Some(Duration::from_secs(2)),
            ..RateLimitInfo::default()
        };
        assert_eq!(explicit.wait_hint(now), Some(Duration::from_secs(2)));

        assert_eq!(RateLimitInfo::default().wait_hint(now), None);
    }

    #[test]
    fn test_into_error_truncates() {
        let resp = ApiResponse::new(503, "é".repeat(300));
        match resp.into_error() {
            FetchError::Status { status, message, .. } => {
                assert_eq!(status, 503);
                assert!(message.len() <= 200);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
