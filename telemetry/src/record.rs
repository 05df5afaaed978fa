use serde::Deserialize;
use serde::Serialize;

/// One captured fault or informational log entry, in the shape the report
/// endpoint expects.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ErrorRecord {
    /// Capture time in epoch milliseconds.
    pub timestamp: Option<i64>,
    pub url: Option<String>,
    pub authenticated: bool,
    /// `source:line:col` of the fault, when known.
    pub location: Option<String>,
    pub stacktrace: Option<String>,
    /// `true` for unhandled faults, `false` for informational reports.
    pub errored: bool,
    pub message: Option<String>,
}

impl ErrorRecord {
    /// Fills in capture defaults. Values that are already present are kept.
    pub(crate) fn normalize(
        &mut self,
        now_millis: impl FnOnce() -> i64,
        current_url: impl FnOnce() -> String,
        authenticated: bool,
    ) {
        self.timestamp.get_or_insert_with(now_millis);
        if non_empty(self.url.as_deref()).is_none() {
            self.url = Some(current_url());
        }
        self.authenticated = self.authenticated || authenticated;
    }

    /// Query string for the per-record GET fallback, or `None` when the
    /// record carries nothing worth sending.
    pub fn fallback_query(&self) -> Option<String> {
        let mut params = Vec::new();
        if let Some(url) = non_empty(self.url.as_deref()) {
            params.push(format!("u={}", urlencoding::encode(url)));
        }
        if self.errored {
            params.push("e=1".to_string());
        }
        if let Some(location) = non_empty(self.location.as_deref()) {
            params.push(format!("l={}", urlencoding::encode(location)));
        }
        if let Some(timestamp) = self.timestamp.filter(|timestamp| *timestamp != 0) {
            params.push(format!("t={timestamp}"));
        }
        if let Some(message) = non_empty(self.message.as_deref()) {
            params.push(format!("m={}", urlencoding::encode(message)));
        }

        if params.is_empty() {
            None
        } else {
            Some(params.join("&"))
        }
    }

    pub fn fallback_url(&self, endpoint: &str) -> Option<String> {
        let query = self.fallback_query()?;
        let separator = if endpoint.contains('?') { '&' } else { '?' };
        Some(format!("{endpoint}{separator}{query}"))
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.is_empty())
}
