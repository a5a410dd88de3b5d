use std::time::Duration;

/// Engine-wide settings, built once and passed by reference. There is no
/// ambient global configuration anywhere in the crate.
#[derive(Debug, Clone)]
pub struct TransferConfig {
    pub user_agent: String,
    /// Deadline for capability probes (HEAD / one-byte range).
    pub probe_timeout: Duration,
    /// Deadline for a whole streaming attempt; generous for large media.
    pub stream_timeout: Duration,
    /// Base inter-attempt delay, scaled linearly by attempt number.
    pub retry_backoff: Duration,
    /// Minimum interval between progress renders.
    pub progress_interval: Duration,
    pub buffer_size: usize,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            user_agent: "vidpull/0.1".to_string(),
            probe_timeout: Duration::from_secs(20),
            stream_timeout: Duration::from_secs(15 * 60),
            retry_backoff: Duration::from_secs(3),
            progress_interval: Duration::from_millis(500),
            buffer_size: 64 * 1024,
        }
    }
}
