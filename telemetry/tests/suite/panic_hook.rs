use crate::harness::RecordingTransport;
use crate::harness::pipeline;
use clientkit_telemetry::install_panic_hook;
use clientkit_telemetry::with_handled_panics;
use pretty_assertions::assert_eq;

// The hook is process-wide, so everything that installs it lives in this one
// test.
#[tokio::test]
async fn panics_are_reported_as_uncaught_faults() {
    let transport = RecordingTransport::default();
    let pipeline = pipeline(&transport);

    install_panic_hook(&pipeline);
    let outcome = std::thread::spawn(|| panic!("grid row exploded")).join();
    assert!(outcome.is_err());
    let handled = std::thread::spawn(|| {
        std::panic::catch_unwind(|| with_handled_panics(|| panic!("caught by the caller")))
    })
    .join();
    assert!(matches!(handled, Ok(Err(_))));

    let dropped = RecordingTransport::default();
    let short_lived = crate::harness::pipeline(&dropped);
    install_panic_hook(&short_lived);
    drop(short_lived);
    // The hook no longer reaches the dropped pipeline but still chains on.
    let after_drop = std::thread::spawn(|| panic!("after drop")).join();
    assert!(after_drop.is_err());

    // Put the default hook back so later panics in this binary stay local.
    drop(std::panic::take_hook());

    pipeline.shutdown().await;

    let records = transport.batches().concat();
    let Some(record) = records
        .iter()
        .find(|record| record.message.as_deref() == Some("grid row exploded"))
    else {
        panic!("panic was not reported: {records:?}");
    };
    assert!(record.errored);
    let location = record.location.clone().unwrap_or_default();
    assert!(location.contains("panic_hook.rs"), "location: {location}");
    assert_eq!(record.stacktrace.as_deref(), Some("at test"));

    assert!(
        records
            .iter()
            .all(|record| record.message.as_deref() != Some("caught by the caller")),
        "handled panic was reported: {records:?}"
    );
    // Chained through the second hook into the first one.
    assert!(
        records
            .iter()
            .any(|record| record.message.as_deref() == Some("after drop")),
        "{records:?}"
    );
    assert!(dropped.batches().is_empty());
}
