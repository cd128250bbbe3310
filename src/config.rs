//! Session configuration.

use std::time::Duration;

/// Timeouts and retry settings for a device session.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SessionConfig {
    /// How long tunnel negotiation waits for the unlock to be acknowledged.
    pub auth_timeout: Duration,
    /// How long tunnel negotiation waits for `GET_LIMITS`.
    pub negotiation_timeout: Duration,
    /// Bound on blocking tunnel reads. `None` waits indefinitely.
    pub reply_timeout: Option<Duration>,
    /// How long to scan for a device.
    pub scan_timeout: Duration,
    /// Connection attempts per device.
    pub max_connect_attempts: u32,
    /// Pause between connection attempts.
    pub reconnect_delay: Duration,
    /// Pause between per-profile fetches on legacy firmware.
    pub profile_fetch_delay: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            auth_timeout: Duration::from_secs(1),
            negotiation_timeout: Duration::from_secs(1),
            reply_timeout: None,
            scan_timeout: Duration::from_millis(2500),
            max_connect_attempts: 3,
            reconnect_delay: Duration::from_secs(1),
            profile_fetch_delay: Duration::from_millis(100),
        }
    }
}

impl SessionConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the auth warm-up timeout.
    pub fn with_auth_timeout(mut self, timeout: Duration) -> Self {
        self.auth_timeout = timeout;
        self
    }

    /// Set the limits negotiation timeout.
    pub fn with_negotiation_timeout(mut self, timeout: Duration) -> Self {
        self.negotiation_timeout = timeout;
        self
    }

    /// Bound blocking tunnel reads.
    pub fn with_reply_timeout(mut self, timeout: Duration) -> Self {
        self.reply_timeout = Some(timeout);
        self
    }

    /// Set the scan window.
    pub fn with_scan_timeout(mut self, timeout: Duration) -> Self {
        self.scan_timeout = timeout;
        self
    }

    /// Set the connection retry policy.
    pub fn with_connect_retries(mut self, attempts: u32, delay: Duration) -> Self {
        self.max_connect_attempts = attempts.max(1);
        self.reconnect_delay = delay;
        self
    }

    /// Set the pause between legacy per-profile fetches.
    pub fn with_profile_fetch_delay(mut self, delay: Duration) -> Self {
        self.profile_fetch_delay = delay;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.auth_timeout, Duration::from_secs(1));
        assert_eq!(config.scan_timeout, Duration::from_millis(2500));
        assert_eq!(config.reply_timeout, None);
        assert_eq!(config.max_connect_attempts, 3);
    }

    #[test]
    fn test_builders() {
        let config = SessionConfig::new()
            .with_reply_timeout(Duration::from_millis(300))
            .with_connect_retries(0, Duration::ZERO)
            .with_profile_fetch_delay(Duration::ZERO);
        assert_eq!(config.reply_timeout, Some(Duration::from_millis(300)));
        assert_eq!(config.max_connect_attempts, 1);
        assert_eq!(config.profile_fetch_delay, Duration::ZERO);
    }
}
