//! Session configuration.

use chrono::{FixedOffset, Local, Offset, Utc};
use std::time::Duration;

/// Default gateway host.
pub const DEFAULT_HOST: &str = "localhost";

/// Default gateway port.
pub const DEFAULT_PORT: u16 = 8194;

/// Reference data service name.
pub const REFDATA_SERVICE: &str = "//blp/refdata";

/// Connection and conversion settings for one request/response cycle.
///
/// Built once at startup and passed to every fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Gateway host name or IP address.
    pub host: String,
    /// Gateway port.
    pub port: u16,
    /// Service opened before sending requests.
    pub service: String,
    /// Offset of local wall-clock time from UTC.
    pub utc_offset: FixedOffset,
    /// Bounded wait per event poll.
    pub poll_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            service: REFDATA_SERVICE.to_string(),
            utc_offset: Utc.fix(),
            poll_timeout: Duration::from_millis(500),
        }
    }
}

impl SessionConfig {
    /// Creates a configuration for the given endpoint, capturing the local
    /// clock's UTC offset.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            utc_offset: Local::now().offset().fix(),
            ..Default::default()
        }
    }

    /// Sets the local UTC offset.
    #[must_use]
    pub const fn with_utc_offset(mut self, offset: FixedOffset) -> Self {
        self.utc_offset = offset;
        self
    }

    /// Sets the poll timeout.
    #[must_use]
    pub const fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    /// Returns the endpoint as `host:port`.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Parses a `±HH:MM` UTC offset.
///
/// # Errors
///
/// Returns a description of the problem if the string is malformed or out of
/// range.
pub fn parse_utc_offset(s: &str) -> Result<FixedOffset, String> {
    let (sign, rest) = match s.as_bytes().first() {
        Some(b'+') => (1, &s[1..]),
        Some(b'-') => (-1, &s[1..]),
        _ => (1, s),
    };
    let number = |part: &str| -> Result<u8, String> {
        part.bytes()
            .all(|b| b.is_ascii_digit())
            .then(|| part.parse().ok())
            .flatten()
            .ok_or_else(|| format!("invalid UTC offset '{s}', expected ±HH:MM"))
    };
    let (hours, minutes) = rest.split_once(':').unwrap_or((rest, "0"));
    let (hours, minutes) = (number(hours)?, number(minutes)?);
    if hours > 23 || minutes > 59 {
        return Err(format!("UTC offset '{s}' out of range"));
    }
    FixedOffset::east_opt(sign * (i32::from(hours) * 3600 + i32::from(minutes) * 60))
        .ok_or_else(|| format!("UTC offset '{s}' out of range"))
}
