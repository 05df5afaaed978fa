use crate::harness::PostBehavior;
use crate::harness::REPORT_ENDPOINT;
use crate::harness::RecordingTransport;
use crate::harness::pipeline;
use crate::harness::pipeline_with;
use clientkit_telemetry::ErrorRecord;
use clientkit_telemetry::ExplicitReport;
use clientkit_telemetry::StaticPageContext;
use pretty_assertions::assert_eq;
use std::sync::Arc;

#[tokio::test(start_paused = true)]
async fn failed_batch_falls_back_to_one_get_per_record() {
    let transport = RecordingTransport::with_posts(PostBehavior::Fail);
    let pipeline = pipeline(&transport);

    pipeline.report_error(
        ExplicitReport::message("first failure")
            .with_location("grid.js:10:2")
            .errored(true),
    );
    pipeline.report_error(ExplicitReport::message("second"));
    pipeline.shutdown().await;

    assert_eq!(
        transport.fallback_urls(),
        vec![
            format!(
                "{REPORT_ENDPOINT}?u=https%3A%2F%2Fapp.example.com%2Fgrid&e=1&l=grid.js%3A10%3A2&t=1700000000000&m=first%20failure"
            ),
            format!(
                "{REPORT_ENDPOINT}?u=https%3A%2F%2Fapp.example.com%2Fgrid&t=1700000000000&m=second"
            ),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn malformed_batch_response_counts_as_failure() {
    let transport = RecordingTransport::with_posts(PostBehavior::Malformed);
    let pipeline = pipeline(&transport);

    pipeline.report_error(ExplicitReport::message("needs fallback"));
    pipeline.shutdown().await;

    assert_eq!(transport.batch_sizes(), vec![1]);
    assert_eq!(transport.fallback_urls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn record_without_reportable_fields_is_not_sent() {
    let transport = RecordingTransport::with_posts(PostBehavior::Fail);
    // No page URL and a zero clock leave the bare record with nothing to put
    // in a query string.
    let pipeline = pipeline_with(&transport, Arc::new(StaticPageContext::new("")), 0);

    pipeline.enqueue(ErrorRecord::default());
    pipeline.enqueue(ErrorRecord {
        message: Some("reportable".to_string()),
        ..ErrorRecord::default()
    });
    pipeline.shutdown().await;

    assert_eq!(
        transport.fallback_urls(),
        vec![format!("{REPORT_ENDPOINT}?m=reportable")]
    );
}

#[tokio::test(start_paused = true)]
async fn fallback_failures_are_dropped_without_retry() {
    let transport = RecordingTransport::with_posts(PostBehavior::Fail);
    transport.fail_gets();
    let pipeline = pipeline(&transport);

    for i in 0..3 {
        pipeline.report_error(ExplicitReport::message(format!("lost {i}")));
    }
    pipeline.shutdown().await;

    assert_eq!(transport.batch_sizes(), vec![3]);
    assert_eq!(transport.fallback_urls().len(), 3);
    assert_eq!(transport.requests().len(), 4);
    assert_eq!(pipeline.pending(), 0);
}

#[tokio::test(start_paused = true)]
async fn successful_batch_sends_no_fallback() {
    let transport = RecordingTransport::default();
    let pipeline = pipeline(&transport);

    pipeline.report_error(ExplicitReport::message("delivered"));
    pipeline.shutdown().await;

    assert!(transport.fallback_urls().is_empty());
}
