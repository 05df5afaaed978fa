use crate::capture::UncaughtFault;
use crate::pipeline::TelemetryPipeline;
use crate::stack::suppress;
use std::cell::Cell;

thread_local! {
    static HANDLED_DEPTH: Cell<usize> = const { Cell::new(0) };
}

struct HandledScope;

impl HandledScope {
    fn enter() -> Self {
        HANDLED_DEPTH.with(|depth| depth.set(depth.get() + 1));
        HandledScope
    }
}

impl Drop for HandledScope {
    fn drop(&mut self) {
        HANDLED_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// Runs `f` as code whose panics the caller catches and reports itself.
///
/// Panics raised on this thread while `f` runs are not reported by the hook
/// from [`install_panic_hook`]; the previous hook still sees them.
pub fn with_handled_panics<R>(f: impl FnOnce() -> R) -> R {
    let _scope = HandledScope::enter();
    f()
}

fn panic_is_handled() -> bool {
    HANDLED_DEPTH.with(|depth| depth.get() > 0)
}

/// Reports every uncaught panic of this process through `pipeline` as an
/// uncaught fault, then hands the panic to whichever hook was installed
/// before.
///
/// The hook does not keep the pipeline alive. Once every other handle is
/// dropped, panics go straight to the previous hook.
pub fn install_panic_hook(pipeline: &TelemetryPipeline) {
    let pipeline = pipeline.downgrade();
    let previous = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |info| {
        if !panic_is_handled()
            && let Some(pipeline) = pipeline.upgrade()
        {
            let payload = info.payload();
            let message = if let Some(s) = payload.downcast_ref::<&str>() {
                (*s).to_string()
            } else if let Some(s) = payload.downcast_ref::<String>() {
                s.clone()
            } else {
                "unknown panic payload".to_string()
            };

            let (source, line, column) = info
                .location()
                .map(|loc| (loc.file().to_string(), loc.line(), loc.column()))
                .unwrap_or_default();

            suppress(|| {
                pipeline.capture(UncaughtFault {
                    message,
                    source,
                    line,
                    column,
                    stacktrace: None,
                });
            });
        }

        previous(info);
    }));
}
