// SPDX-License-Identifier: Apache-2.0
//! Client configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::ffi;
use crate::poller::PollPolicy;

/// Environment variable overriding the device path.
pub const ENV_DEVICE: &str = "QOS_DEVICE";

/// Environment variable overriding the default wait budget, in seconds.
pub const ENV_TIMEOUT: &str = "QOS_TIMEOUT";

/// Where to find the scheduler and how to poll it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub device_path: PathBuf,
    pub poll: PollPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            device_path: PathBuf::from(ffi::QUANTUM_DEV_PATH),
            poll: PollPolicy::default(),
        }
    }
}

impl ClientConfig {
    /// Defaults with environment overrides applied.
    ///
    /// `QOS_DEVICE` replaces the device path. `QOS_TIMEOUT` replaces the
    /// budget used for zero timeouts; unparsable values are ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`ClientConfig::from_env`], reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = ClientConfig::default();

        if let Some(path) = lookup(ENV_DEVICE).filter(|p| !p.is_empty()) {
            config.device_path = PathBuf::from(path);
        }
        if let Some(secs) = lookup(ENV_TIMEOUT) {
            match secs.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => config.poll.default_timeout = Duration::from_secs(secs),
                _ => tracing::warn!("ignoring {}={:?}", ENV_TIMEOUT, secs),
            }
        }

        config
    }

    pub fn with_device_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.device_path = path.into();
        self
    }

    pub fn with_poll_policy(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.poll.default_timeout = timeout;
        self
    }
}
