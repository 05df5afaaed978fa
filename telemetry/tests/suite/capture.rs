use crate::harness::RecordingTransport;
use crate::harness::pipeline;
use clientkit_telemetry::FrameWalkStackCapture;
use clientkit_telemetry::StaticPageContext;
use clientkit_telemetry::TelemetryPipeline;
use clientkit_telemetry::UncaughtFault;
use clientkit_telemetry::UnhandledRejection;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;

#[tokio::test(start_paused = true)]
async fn capture_sources_share_one_buffer() {
    let transport = RecordingTransport::default();
    let pipeline = pipeline(&transport);

    pipeline.capture(UncaughtFault {
        message: "TypeError: row is undefined".to_string(),
        source: "grid.js".to_string(),
        line: 88,
        column: 13,
        stacktrace: None,
    });
    pipeline.capture(UnhandledRejection::from_reason(&json!({"status": 500})));
    pipeline.shutdown().await;

    let batch = &transport.batches()[0];
    assert_eq!(batch.len(), 2);

    assert!(batch[0].errored);
    assert_eq!(batch[0].location.as_deref(), Some("grid.js:88:13"));
    assert_eq!(batch[0].stacktrace.as_deref(), Some("at test"));

    assert!(batch[1].errored);
    assert_eq!(batch[1].message.as_deref(), Some(r#"{"status":500}"#));
    assert_eq!(batch[1].location, None);
    assert_eq!(batch[1].url.as_deref(), Some("https://app.example.com/grid"));
}

#[tokio::test]
async fn forced_frame_walk_never_exceeds_frame_cap() {
    let transport = RecordingTransport::default();
    let pipeline = TelemetryPipeline::builder(
        Arc::new(transport.clone()),
        Arc::new(StaticPageContext::new("https://app.example.com/")),
    )
    .stack_capture(Arc::new(FrameWalkStackCapture::new(4)))
    .build()
    .unwrap_or_else(|err| panic!("{err}"));

    pipeline.capture(UnhandledRejection::default());
    pipeline.shutdown().await;

    let record = &transport.batches()[0][0];
    let trace = record.stacktrace.clone().unwrap_or_default();
    assert!(trace.lines().count() <= 4, "trace too long: {trace}");
    assert_eq!(record.message, None);
}

#[test]
fn building_outside_a_runtime_is_an_error() {
    let result = TelemetryPipeline::builder(
        Arc::new(RecordingTransport::default()),
        Arc::new(StaticPageContext::new("https://app.example.com/")),
    )
    .build();
    assert!(result.is_err());
}
