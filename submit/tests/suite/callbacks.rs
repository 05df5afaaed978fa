use crate::harness::Callbacks;
use crate::harness::Event;
use crate::harness::RecordingUi;
use crate::harness::ReportSink;
use crate::harness::RowServer;
use crate::harness::SUBMIT_URL;
use crate::harness::row;
use async_trait::async_trait;
use clientkit_submit::NotificationKind;
use clientkit_submit::SubmitConfig;
use clientkit_submit::SubmitHandlers;
use clientkit_submit::Submitter;
use clientkit_telemetry::install_panic_hook;
use clientkit_transport::HttpTransport;
use clientkit_transport::Request;
use clientkit_transport::Response;
use clientkit_transport::TransportError;
use pretty_assertions::assert_eq;
use serde_json::Value;
use serde_json::json;
use std::sync::Arc;

fn submitter(server: &RowServer, ui: &RecordingUi) -> Submitter {
    Submitter::new(
        Arc::new(server.clone()),
        Arc::new(ui.clone()),
        SubmitConfig::default(),
    )
}

fn failed_row_ids(events: &[Event]) -> Vec<Value> {
    events
        .iter()
        .find_map(|event| match event {
            Event::Error(args) => args.get(1).cloned(),
            _ => None,
        })
        .and_then(|ids| ids.as_array().cloned())
        .unwrap_or_default()
}

#[tokio::test(start_paused = true)]
async fn two_failures_reach_the_custom_error_handler_once() {
    let server = RowServer::default();
    let ui = RecordingUi::default();
    let callbacks = Callbacks::default();

    let jobs = (0..5).map(|i| row(i, i == 1 || i == 3, 20)).collect();
    let summary = submitter(&server, &ui)
        .submit_batch(SUBMIT_URL, jobs, callbacks.handlers())
        .await;

    assert_eq!(summary.errored, 2);
    assert_eq!(summary.succeeded(), 3);

    let terminal = callbacks.terminal();
    let kinds: Vec<&str> = terminal
        .iter()
        .map(|event| match event {
            Event::Always => "always",
            Event::Success(_) => "success",
            Event::Error(_) => "error",
            Event::Refresh => "refresh",
            Event::Row(_) => "row",
        })
        .collect();
    assert_eq!(kinds, vec!["always", "error", "refresh"]);
    assert_eq!(failed_row_ids(&terminal), vec![json!("r1"), json!("r3")]);

    let Some(Event::Error(args)) = terminal.get(1) else {
        panic!("missing error event: {terminal:?}");
    };
    let failures = args[0].as_array().cloned().unwrap_or_default();
    assert_eq!(failures.len(), 2);
    assert_eq!(failures[0]["RowId"], json!("r1"));
    assert_eq!(failures[0]["Status"], json!(500));
    assert_eq!(failures[1]["Message"], json!("row 3 failed"));

    // The custom handler owns error reporting.
    assert_eq!(ui.notes(), Vec::new());
}

#[tokio::test(start_paused = true)]
async fn row_success_fires_for_each_successful_row() {
    let server = RowServer::default();
    let ui = RecordingUi::default();
    let callbacks = Callbacks::default();

    let jobs = (0..4).map(|i| row(i, i == 2, 0)).collect();
    submitter(&server, &ui)
        .submit_batch(SUBMIT_URL, jobs, callbacks.handlers())
        .await;

    let mut rows: Vec<String> = callbacks
        .events()
        .into_iter()
        .filter_map(|event| match event {
            Event::Row(row_id) => Some(row_id.0),
            _ => None,
        })
        .collect();
    rows.sort();
    assert_eq!(rows, vec!["r0", "r1", "r3"]);
}

#[tokio::test(start_paused = true)]
async fn default_error_handler_reports_every_failed_row() {
    let server = RowServer::default();
    let ui = RecordingUi::default();
    let callbacks = Callbacks::default();

    let jobs = (0..5).map(|i| row(i, i == 1 || i == 3, 0)).collect();
    submitter(&server, &ui)
        .submit_batch(SUBMIT_URL, jobs, callbacks.default_error_handlers())
        .await;

    let mut notes = ui.notes();
    notes.sort_by(|a, b| a.0.cmp(&b.0));
    assert_eq!(
        notes,
        vec![
            ("row 1 failed".to_string(), NotificationKind::Error),
            ("row 3 failed".to_string(), NotificationKind::Error),
        ]
    );
    assert_eq!(callbacks.terminal(), vec![Event::Always, Event::Refresh]);
}

#[tokio::test(start_paused = true)]
async fn all_rows_failing_skips_refresh() {
    let server = RowServer::default();
    let ui = RecordingUi::default();
    let callbacks = Callbacks::default();

    let jobs = (0..3).map(|i| row(i, true, 0)).collect();
    submitter(&server, &ui)
        .submit_batch(SUBMIT_URL, jobs, callbacks.handlers())
        .await;

    let terminal = callbacks.terminal();
    assert_eq!(terminal.len(), 2);
    assert_eq!(terminal[0], Event::Always);
    assert!(matches!(terminal[1], Event::Error(_)));
}

#[tokio::test(start_paused = true)]
async fn panicking_callback_is_reported_and_later_callbacks_still_run() {
    let server = RowServer::default();
    let ui = RecordingUi::with_indicator();
    let sink = ReportSink::default();
    let telemetry = sink.pipeline();
    let callbacks = Callbacks::default();

    let refresh = callbacks.clone();
    let handlers = SubmitHandlers::new()
        .on_error(|_| panic!("error handler broke"))
        .on_refresh(move || refresh.push(Event::Refresh));
    let jobs = (0..2).map(|i| row(i, i == 0, 0)).collect();
    submitter(&server, &ui)
        .with_telemetry(telemetry.clone())
        .submit_batch(SUBMIT_URL, jobs, handlers)
        .await;
    telemetry.shutdown().await;

    assert_eq!(callbacks.terminal(), vec![Event::Refresh]);
    assert_eq!(ui.indicator_counts(), (1, 1));

    let records = sink.records();
    let Some(record) = records.iter().find(|record| record.errored) else {
        panic!("callback panic was not reported: {records:?}");
    };
    assert_eq!(
        record.message.as_deref(),
        Some("error callback panicked: error handler broke")
    );
    assert_eq!(record.location.as_deref(), Some("submit_batch"));
}

struct PanickingTransport;

#[async_trait]
impl HttpTransport for PanickingTransport {
    async fn execute(&self, _req: Request) -> Result<Response, TransportError> {
        panic!("transport broke")
    }
}

// The only test in this binary that installs the process-wide hook.
#[tokio::test(start_paused = true)]
async fn caught_panics_are_reported_once_with_the_hook_installed() {
    let server = RowServer::default();
    let ui = RecordingUi::default();
    let sink = ReportSink::default();
    let telemetry = sink.pipeline();
    install_panic_hook(&telemetry);

    let handlers = SubmitHandlers::new().on_success(|_| panic!("success handler broke"));
    let jobs = (0..2).map(|i| row(i, false, 0)).collect();
    submitter(&server, &ui)
        .with_telemetry(telemetry.clone())
        .submit_batch(SUBMIT_URL, jobs, handlers)
        .await;

    let summary = Submitter::new(
        Arc::new(PanickingTransport),
        Arc::new(ui.clone()),
        SubmitConfig::default(),
    )
    .with_telemetry(telemetry.clone())
    .submit_batch(
        SUBMIT_URL,
        (0..2).map(|i| row(i, false, 0)).collect(),
        SubmitHandlers::new(),
    )
    .await;
    drop(std::panic::take_hook());
    telemetry.shutdown().await;

    assert_eq!(summary.errored, 2);
    let messages: Vec<Option<String>> = sink
        .records()
        .into_iter()
        .map(|record| record.message)
        .collect();
    assert_eq!(
        messages,
        vec![Some(
            "success callback panicked: success handler broke".to_string()
        )]
    );
}
