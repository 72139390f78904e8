//! Engine configuration.

use autoclave_codec::DEFAULT_MAX_FRAME_SIZE;
use std::time::Duration;

/// Configuration for [`crate::ArchiveEngine`] and the readers it creates.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Largest compressed frame the streaming decoder will buffer.
    pub max_frame_size: usize,

    /// Longest wait for a single read from the archive store.
    ///
    /// Applies to opening the range and to every network read while
    /// streaming a report.
    pub read_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE, // 64 MiB
            read_timeout: Duration::from_secs(30),
        }
    }
}

impl EngineConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the frame size limit.
    #[must_use]
    pub const fn max_frame_size(mut self, bytes: usize) -> Self {
        self.max_frame_size = bytes;
        self
    }

    /// Sets the per-read timeout.
    #[must_use]
    pub const fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.max_frame_size, 64 * 1024 * 1024);
        assert_eq!(config.read_timeout, Duration::from_secs(30));
    }

    #[test]
    fn builder() {
        let config = EngineConfig::new()
            .max_frame_size(1024)
            .read_timeout(Duration::from_millis(50));
        assert_eq!(config.max_frame_size, 1024);
        assert_eq!(config.read_timeout, Duration::from_millis(50));
    }
}
