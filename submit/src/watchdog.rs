use clientkit_telemetry::ExplicitReport;
use clientkit_telemetry::TelemetryPipeline;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Minutes after which a still-busy submission is reported.
pub const WATCHDOG_MINUTES: [u64; 3] = [1, 3, 5];

/// Informational reports for submissions that keep the busy indicator up
/// for too long. Dropping the value cancels every pending report.
#[derive(Debug, Default)]
pub(crate) struct Watchdogs {
    timers: Vec<JoinHandle<()>>,
}

impl Watchdogs {
    pub(crate) fn arm(telemetry: Option<&TelemetryPipeline>, url: &str, location: &str) -> Self {
        let Some(telemetry) = telemetry else {
            return Self::default();
        };
        let timers = WATCHDOG_MINUTES
            .iter()
            .map(|&minutes| {
                let telemetry = telemetry.clone();
                let report = ExplicitReport::message(long_running_message(minutes))
                    .with_url(url)
                    .with_location(location);
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_secs(minutes * 60)).await;
                    tracing::info!(minutes, "Submission still running");
                    telemetry.report_error(report);
                })
            })
            .collect();
        Self { timers }
    }
}

impl Drop for Watchdogs {
    fn drop(&mut self) {
        for timer in &self.timers {
            timer.abort();
        }
    }
}

pub(crate) fn long_running_message(minutes: u64) -> String {
    let unit = if minutes == 1 { "minute" } else { "minutes" };
    format!("Long running request detected {minutes} {unit}")
}
