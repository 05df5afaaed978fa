use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    /// Per-row progress for a row that went through.
    Ok,
    /// Per-row progress for a row that was rejected.
    Fail,
    Error,
    Info,
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NotificationKind::Ok => "ok",
            NotificationKind::Fail => "fail",
            NotificationKind::Error => "error",
            NotificationKind::Info => "info",
        };
        f.write_str(name)
    }
}

/// Presentation surface the submitter reports progress to.
pub trait Ui: Send + Sync {
    fn notify(&self, message: &str, kind: NotificationKind);

    /// Returns whether an indicator is now showing. Hosts without one keep the
    /// default, which also keeps the long-running watchdogs off.
    fn show_busy_indicator(&self) -> bool {
        false
    }

    fn hide_busy_indicator(&self) {}
}

/// Sends every notification to the log.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogUi;

impl Ui for LogUi {
    fn notify(&self, message: &str, kind: NotificationKind) {
        match kind {
            NotificationKind::Error | NotificationKind::Fail => {
                tracing::warn!(%kind, "{message}");
            }
            NotificationKind::Ok | NotificationKind::Info => {
                tracing::info!(%kind, "{message}");
            }
        }
    }
}

pub(crate) fn row_progress(row_number: usize, rows_left: usize, succeeded: bool) -> String {
    if succeeded {
        format!("Submitted Row #{row_number} of {rows_left} Row(s) left.")
    } else {
        format!("Failed to submit Row #{row_number} of {rows_left} Row(s) left.")
    }
}
