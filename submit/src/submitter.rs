use crate::batch::BatchState;
use crate::config::SubmitConfig;
use crate::handlers::ErrorHandler;
use crate::handlers::SubmitHandlers;
use crate::handlers::run_guarded;
use crate::outcome::Outcome;
use crate::outcome::RowId;
use crate::outcome::default_error_response;
use crate::ui::NotificationKind;
use crate::ui::Ui;
use crate::ui::row_progress;
use crate::watchdog::Watchdogs;
use clientkit_telemetry::TelemetryPipeline;
use clientkit_telemetry::with_handled_panics;
use clientkit_transport::HttpTransport;
use clientkit_transport::Request;
use clientkit_transport::Response;
use clientkit_transport::TransportError;
use futures::FutureExt;
use futures::future::poll_fn;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::pin::pin;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio::time::Instant;

const BATCH_LOCATION: &str = "submit_batch";
const DATA_LOCATION: &str = "submit_data";

/// One row of a batch submission.
#[derive(Clone, Debug, PartialEq)]
pub struct SubmissionJob {
    pub row_id: RowId,
    pub payload: Value,
}

impl SubmissionJob {
    pub fn new(row_id: impl Into<RowId>, payload: Value) -> Self {
        Self {
            row_id: row_id.into(),
            payload,
        }
    }
}

/// Counters reported once a submission has finished.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitSummary {
    pub total: usize,
    pub completed: usize,
    pub errored: usize,
    pub peak_in_flight: usize,
}

impl SubmitSummary {
    pub fn succeeded(&self) -> usize {
        self.completed - self.errored
    }
}

/// Sends form payloads, either as one request or row by row with bounded
/// parallelism.
#[derive(Clone)]
pub struct Submitter {
    transport: Arc<dyn HttpTransport>,
    ui: Arc<dyn Ui>,
    telemetry: Option<TelemetryPipeline>,
    config: SubmitConfig,
}

impl Submitter {
    pub fn new(transport: Arc<dyn HttpTransport>, ui: Arc<dyn Ui>, config: SubmitConfig) -> Self {
        Self {
            transport,
            ui,
            telemetry: None,
            config,
        }
    }

    /// Callback failures and long-running watchdogs report here.
    pub fn with_telemetry(mut self, telemetry: TelemetryPipeline) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    pub fn config(&self) -> &SubmitConfig {
        &self.config
    }

    /// Submits `rows` to `url`.
    ///
    /// Rows go out one request each when row submission is enabled, there is
    /// more than one row and every row has an id. Otherwise the whole array
    /// is sent as a single request.
    pub async fn submit(
        &self,
        url: &str,
        rows: Vec<Value>,
        row_ids: Option<Vec<RowId>>,
        handlers: SubmitHandlers,
    ) -> SubmitSummary {
        match row_ids {
            Some(ids) if self.config.single_submit && rows.len() > 1 && ids.len() == rows.len() => {
                let jobs = ids
                    .into_iter()
                    .zip(rows)
                    .map(|(row_id, payload)| SubmissionJob { row_id, payload })
                    .collect();
                self.submit_batch(url, jobs, handlers).await
            }
            _ => self.submit_data(url, Value::Array(rows), handlers).await,
        }
    }

    /// Sends `payload` as one request.
    pub async fn submit_data(
        &self,
        url: &str,
        payload: Value,
        handlers: SubmitHandlers,
    ) -> SubmitSummary {
        let busy = self.show_busy();
        let watchdogs = self.watchdogs(busy, url, DATA_LOCATION);

        let request = self.request(url, &payload);
        let outcome = Outcome::classify(None, self.transport.execute(request).await);
        drop(watchdogs);

        let SubmitHandlers {
            on_success,
            on_error,
            on_always,
            ..
        } = handlers;
        let telemetry = self.telemetry.as_ref();
        let errored = match outcome {
            Outcome::Succeeded(args) => {
                if let Some(on_success) = on_success {
                    run_guarded(telemetry, DATA_LOCATION, "success", || on_success(args));
                }
                0
            }
            Outcome::Failed { args, failure } => {
                match on_error {
                    ErrorHandler::Default => default_error_response(self.ui.as_ref(), &failure),
                    ErrorHandler::Custom(on_error) => {
                        run_guarded(telemetry, DATA_LOCATION, "error", || on_error(args));
                    }
                }
                1
            }
        };
        if let Some(on_always) = on_always {
            run_guarded(telemetry, DATA_LOCATION, "always", on_always);
        }
        if busy {
            self.ui.hide_busy_indicator();
        }

        SubmitSummary {
            total: 1,
            completed: 1,
            errored,
            peak_in_flight: 1,
        }
    }

    /// Sends one request per job, at most `max_parallelism` at a time.
    ///
    /// Terminal callbacks run once every job has completed, in this order:
    /// always, then success (nothing failed) or error (something failed),
    /// then refresh (some but not all rows failed).
    pub async fn submit_batch(
        &self,
        url: &str,
        jobs: Vec<SubmissionJob>,
        mut handlers: SubmitHandlers,
    ) -> SubmitSummary {
        let total = jobs.len();
        if total == 0 {
            return self.finish_batch(BatchState::new(0), handlers, false);
        }

        let busy = self.show_busy();
        // Both submission paths report long-running requests as `submit_data`.
        let watchdogs = self.watchdogs(busy, url, DATA_LOCATION);
        let max_in_flight = self.config.effective_parallelism();
        let delay = self.config.inter_dispatch_delay();
        let default_errors = handlers.uses_default_errors();

        tracing::debug!(total, max_in_flight, url, "Starting batch submission");

        let row_ids: Vec<RowId> = jobs.iter().map(|job| job.row_id.clone()).collect();
        let mut waiting: VecDeque<(usize, SubmissionJob)> = jobs.into_iter().enumerate().collect();
        let mut batch = BatchState::new(total);
        let mut tasks: JoinSet<(usize, Result<Response, TransportError>)> = JoinSet::new();
        let mut next_dispatch = Instant::now();

        while !batch.is_finished() {
            let can_dispatch = !waiting.is_empty() && !batch.is_paused();
            tokio::select! {
                biased;

                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    let (slot, result) = match joined {
                        Ok(done) => done,
                        Err(err) => {
                            tracing::error!("Row request task did not complete: {err}");
                            continue;
                        }
                    };
                    let row_id = row_ids.get(slot).cloned();
                    let outcome = Outcome::classify(row_id.clone(), result);
                    let succeeded = outcome.is_success();
                    if default_errors && let Outcome::Failed { failure, .. } = &outcome {
                        default_error_response(self.ui.as_ref(), failure);
                    }
                    if batch.complete(slot, outcome) {
                        next_dispatch = Instant::now() + delay;
                    }
                    tracing::trace!(
                        slot,
                        succeeded,
                        in_flight = batch.in_flight(),
                        "Row request completed"
                    );

                    if self.config.use_toast {
                        let kind = if succeeded {
                            NotificationKind::Ok
                        } else {
                            NotificationKind::Fail
                        };
                        self.ui
                            .notify(&row_progress(slot + 1, batch.rows_left(), succeeded), kind);
                    }
                    if succeeded
                        && let Some(row_id) = row_id.as_ref()
                        && let Some(on_row_success) = handlers.on_row_success.as_mut()
                    {
                        run_guarded(
                            self.telemetry.as_ref(),
                            BATCH_LOCATION,
                            "row success",
                            || on_row_success(row_id),
                        );
                    }
                }
                () = tokio::time::sleep_until(next_dispatch), if can_dispatch => {
                    let Some((slot, job)) = waiting.pop_front() else {
                        continue;
                    };
                    let request = self.request(url, &[job.payload]);
                    let transport = Arc::clone(&self.transport);
                    tasks.spawn(async move {
                        let mut execute =
                            pin!(AssertUnwindSafe(transport.execute(request)).catch_unwind());
                        let result =
                            poll_fn(|cx| with_handled_panics(|| execute.as_mut().poll(cx)))
                                .await
                                .unwrap_or_else(|_| {
                                    Err(TransportError::Network("transport panicked".to_string()))
                                });
                        (slot, result)
                    });
                    batch.dispatched(max_in_flight, !waiting.is_empty());
                    next_dispatch = Instant::now() + delay;
                }
                else => break,
            }
        }

        drop(watchdogs);
        self.finish_batch(batch, handlers, busy)
    }

    fn finish_batch(
        &self,
        batch: BatchState,
        handlers: SubmitHandlers,
        busy: bool,
    ) -> SubmitSummary {
        let telemetry = self.telemetry.as_ref();
        let merged = batch.merged();
        let SubmitHandlers {
            on_success,
            on_error,
            on_always,
            on_refresh,
            ..
        } = handlers;

        if let Some(on_always) = on_always {
            run_guarded(telemetry, BATCH_LOCATION, "always", on_always);
        }
        if batch.errored() == 0 {
            if let Some(on_success) = on_success {
                run_guarded(telemetry, BATCH_LOCATION, "success", || {
                    on_success(merged.success)
                });
            }
        } else if let ErrorHandler::Custom(on_error) = on_error {
            run_guarded(telemetry, BATCH_LOCATION, "error", || on_error(merged.error));
        }
        if batch.is_mixed()
            && let Some(on_refresh) = on_refresh
        {
            run_guarded(telemetry, BATCH_LOCATION, "refresh", on_refresh);
        }
        if busy {
            self.ui.hide_busy_indicator();
        }

        let summary = SubmitSummary {
            total: batch.total(),
            completed: batch.completed(),
            errored: batch.errored(),
            peak_in_flight: batch.peak_in_flight(),
        };
        tracing::debug!(?summary, "Batch submission finished");
        summary
    }

    fn request<T: Serialize>(&self, url: &str, body: &T) -> Request {
        let request = Request::new(self.config.http_method(), url.to_string()).with_json(body);
        match self.config.request_timeout() {
            Some(timeout) => request.with_timeout(timeout),
            None => request,
        }
    }

    fn show_busy(&self) -> bool {
        self.config.use_busy_indicator && self.ui.show_busy_indicator()
    }

    fn watchdogs(&self, busy: bool, url: &str, location: &str) -> Watchdogs {
        if busy {
            Watchdogs::arm(self.telemetry.as_ref(), url, location)
        } else {
            Watchdogs::default()
        }
    }
}
