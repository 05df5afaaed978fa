use crate::record::ErrorRecord;
use crate::stack::StackCapture;
use crate::stack::suppress;
use serde::Serialize;
use serde_json::Value;
use tokio::task::JoinError;

/// Anything that can be turned into an [`ErrorRecord`] at capture time.
///
/// The stack strategy is handed in so sources without a trace of their own
/// can take one synchronously, at the point of capture.
pub trait CaptureSource {
    fn into_record(self, stack: &dyn StackCapture) -> ErrorRecord;
}

impl CaptureSource for ErrorRecord {
    fn into_record(self, _stack: &dyn StackCapture) -> ErrorRecord {
        self
    }
}

/// A fault nobody handled, e.g. a panic.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UncaughtFault {
    pub message: String,
    pub source: String,
    pub line: u32,
    pub column: u32,
    /// Trace carried by the fault itself, if it had one.
    pub stacktrace: Option<String>,
}

impl CaptureSource for UncaughtFault {
    fn into_record(self, stack: &dyn StackCapture) -> ErrorRecord {
        let stacktrace = match self.stacktrace {
            Some(trace) if !trace.is_empty() => trace,
            _ => stack.capture(),
        };
        ErrorRecord {
            location: Some(format!("{}:{}:{}", self.source, self.line, self.column)),
            stacktrace: Some(stacktrace),
            errored: true,
            message: Some(self.message),
            ..ErrorRecord::default()
        }
    }
}

/// An asynchronous operation that failed without anyone awaiting the error.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UnhandledRejection {
    pub reason: Option<Value>,
}

impl UnhandledRejection {
    /// Serialization failures leave the reason empty.
    pub fn from_reason<T: Serialize + ?Sized>(reason: &T) -> Self {
        let reason = suppress(|| serde_json::to_value(reason).ok()).filter(|v| !v.is_null());
        Self { reason }
    }

    pub fn from_join_error(err: &JoinError) -> Self {
        Self {
            reason: Some(Value::String(err.to_string())),
        }
    }
}

impl CaptureSource for UnhandledRejection {
    fn into_record(self, stack: &dyn StackCapture) -> ErrorRecord {
        let message = self
            .reason
            .and_then(|reason| suppress(|| serde_json::to_string(&reason).ok()));
        ErrorRecord {
            stacktrace: Some(stack.capture()),
            errored: true,
            message,
            ..ErrorRecord::default()
        }
    }
}

/// A report made on purpose by application code.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExplicitReport {
    pub url: Option<String>,
    pub timestamp: Option<i64>,
    pub errored: bool,
    pub location: Option<String>,
    pub message: Option<String>,
    pub stacktrace: Option<String>,
}

impl ExplicitReport {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_stacktrace(mut self, stacktrace: impl Into<String>) -> Self {
        self.stacktrace = Some(stacktrace.into());
        self
    }

    pub fn errored(mut self, errored: bool) -> Self {
        self.errored = errored;
        self
    }
}

impl CaptureSource for ExplicitReport {
    fn into_record(self, stack: &dyn StackCapture) -> ErrorRecord {
        let stacktrace = self.stacktrace.unwrap_or_else(|| stack.capture());
        ErrorRecord {
            timestamp: self.timestamp,
            url: self.url,
            authenticated: false,
            location: self.location,
            stacktrace: Some(stacktrace),
            errored: self.errored,
            message: self.message,
        }
    }
}
