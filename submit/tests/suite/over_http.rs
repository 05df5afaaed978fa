use crate::harness::Callbacks;
use crate::harness::Event;
use crate::harness::RecordingUi;
use clientkit_submit::NotificationKind;
use clientkit_submit::SubmissionJob;
use clientkit_submit::SubmitConfig;
use clientkit_submit::Submitter;
use clientkit_transport::ReqwestTransport;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use wiremock::Mock;
use wiremock::MockServer;
use wiremock::ResponseTemplate;
use wiremock::matchers::body_json;
use wiremock::matchers::method;
use wiremock::matchers::path;

#[tokio::test]
async fn rejected_row_is_reported_with_the_server_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/plants/create"))
        .and(body_json(json!([{"Tag": "B"}])))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"Message": "Duplicate tag B"})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/plants/create"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"Ids": [1]})))
        .expect(2)
        .mount(&server)
        .await;

    let ui = RecordingUi::default();
    let callbacks = Callbacks::default();
    let jobs = ["A", "B", "C"]
        .iter()
        .map(|tag| SubmissionJob::new(*tag, json!({"Tag": tag})))
        .collect();
    let summary = Submitter::new(
        Arc::new(ReqwestTransport::default()),
        Arc::new(ui.clone()),
        SubmitConfig::default(),
    )
    .submit_batch(
        &format!("{}/api/plants/create", server.uri()),
        jobs,
        callbacks.default_error_handlers(),
    )
    .await;

    assert_eq!(summary.completed, 3);
    assert_eq!(summary.errored, 1);
    assert_eq!(
        ui.notes(),
        vec![("Duplicate tag B".to_string(), NotificationKind::Error)]
    );
    assert_eq!(callbacks.terminal(), vec![Event::Always, Event::Refresh]);
}
