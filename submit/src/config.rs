use http::Method;
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_MAX_PARALLELISM: usize = 10;
pub const DEFAULT_INTER_DISPATCH_DELAY_MS: u64 = 10;

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SubmitConfig {
    /// Upper bound on simultaneous row requests.
    pub max_parallelism: usize,
    /// Pause between two row dispatches. The first dispatch never waits.
    pub inter_dispatch_delay_ms: u64,
    /// Surface per-row progress as notifications.
    pub use_toast: bool,
    pub use_busy_indicator: bool,
    /// Submit multi-row payloads row by row. When off, every payload goes
    /// out as one request.
    pub single_submit: bool,
    pub method: String,
    /// Per-request timeout. Unset leaves it to the transport.
    pub request_timeout_ms: Option<u64>,
}

impl Default for SubmitConfig {
    fn default() -> Self {
        Self {
            max_parallelism: DEFAULT_MAX_PARALLELISM,
            inter_dispatch_delay_ms: DEFAULT_INTER_DISPATCH_DELAY_MS,
            use_toast: false,
            use_busy_indicator: true,
            single_submit: true,
            method: "POST".to_string(),
            request_timeout_ms: None,
        }
    }
}

impl SubmitConfig {
    pub fn inter_dispatch_delay(&self) -> Duration {
        Duration::from_millis(self.inter_dispatch_delay_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }

    pub(crate) fn effective_parallelism(&self) -> usize {
        self.max_parallelism.max(1)
    }

    /// Unknown method names fall back to POST.
    pub fn http_method(&self) -> Method {
        Method::from_bytes(self.method.to_ascii_uppercase().as_bytes()).unwrap_or(Method::POST)
    }
}
