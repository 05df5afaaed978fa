use crate::outcome::RowId;
use clientkit_telemetry::ExplicitReport;
use clientkit_telemetry::TelemetryPipeline;
use clientkit_telemetry::with_handled_panics;
use serde_json::Value;
use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::panic::catch_unwind;

pub type ArgsCallback = Box<dyn FnOnce(Vec<Value>) + Send>;
pub type Callback = Box<dyn FnOnce() + Send>;
pub type RowCallback = Box<dyn FnMut(&RowId) + Send>;

/// How failed requests are handled.
#[derive(Default)]
pub enum ErrorHandler {
    /// Each failure is reported to the user as it arrives.
    #[default]
    Default,
    /// Called once with the merged failure arguments. Per-row reporting is
    /// left to the callback.
    Custom(ArgsCallback),
}

impl fmt::Debug for ErrorHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorHandler::Default => f.write_str("Default"),
            ErrorHandler::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Terminal and per-row callbacks for one submission.
#[derive(Default)]
pub struct SubmitHandlers {
    pub(crate) on_success: Option<ArgsCallback>,
    pub(crate) on_error: ErrorHandler,
    pub(crate) on_always: Option<Callback>,
    pub(crate) on_refresh: Option<Callback>,
    pub(crate) on_row_success: Option<RowCallback>,
}

impl SubmitHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs only when nothing failed.
    pub fn on_success(mut self, f: impl FnOnce(Vec<Value>) + Send + 'static) -> Self {
        self.on_success = Some(Box::new(f));
        self
    }

    pub fn on_error(mut self, f: impl FnOnce(Vec<Value>) + Send + 'static) -> Self {
        self.on_error = ErrorHandler::Custom(Box::new(f));
        self
    }

    pub fn on_always(mut self, f: impl FnOnce() + Send + 'static) -> Self {
        self.on_always = Some(Box::new(f));
        self
    }

    /// Runs when some rows went through and others did not.
    pub fn on_refresh(mut self, f: impl FnOnce() + Send + 'static) -> Self {
        self.on_refresh = Some(Box::new(f));
        self
    }

    pub fn on_row_success(mut self, f: impl FnMut(&RowId) + Send + 'static) -> Self {
        self.on_row_success = Some(Box::new(f));
        self
    }

    pub(crate) fn uses_default_errors(&self) -> bool {
        matches!(self.on_error, ErrorHandler::Default)
    }
}

/// Runs a caller-supplied callback, reporting a panic instead of unwinding
/// through the submitter. The panic is reported here only, never as an
/// uncaught fault.
pub(crate) fn run_guarded(
    telemetry: Option<&TelemetryPipeline>,
    location: &str,
    callback: &str,
    f: impl FnOnce(),
) {
    let Err(payload) = catch_unwind(AssertUnwindSafe(|| with_handled_panics(f))) else {
        return;
    };
    let message = format!(
        "{callback} callback panicked: {}",
        panic_message(payload.as_ref())
    );
    tracing::warn!(location, callback, "{message}");
    if let Some(telemetry) = telemetry {
        telemetry.report_error(
            ExplicitReport::message(message)
                .with_location(location)
                .errored(true),
        );
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}
