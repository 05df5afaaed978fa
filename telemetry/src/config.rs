use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_REPORT_ENDPOINT: &str = "/api/system/report-error";
pub const DEFAULT_BATCH_SIZE: usize = 50;
pub const DEFAULT_HOLD_MS: u64 = 10 * 60 * 1000;
pub const DEFAULT_MAX_STACK_FRAMES: usize = 50;

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Report endpoint. A relative path is resolved against the current page
    /// URL at flush time.
    pub endpoint: String,
    /// Maximum number of records per batch. A buffer longer than this is
    /// flushed immediately.
    pub batch_size: usize,
    /// How long a non-empty buffer may sit idle before the debounce timer
    /// flushes it.
    pub hold_ms: u64,
    /// Frame cap for the frame-walk stack capture.
    pub max_stack_frames: usize,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_REPORT_ENDPOINT.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            hold_ms: DEFAULT_HOLD_MS,
            max_stack_frames: DEFAULT_MAX_STACK_FRAMES,
        }
    }
}

impl TelemetryConfig {
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn hold_duration(&self) -> Duration {
        Duration::from_millis(self.hold_ms)
    }

    pub(crate) fn effective_batch_size(&self) -> usize {
        self.batch_size.max(1)
    }
}
