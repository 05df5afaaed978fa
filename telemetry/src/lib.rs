//! Client error telemetry.
//!
//! Faults are captured into [`ErrorRecord`]s, buffered by a
//! [`TelemetryPipeline`] and posted to the report endpoint in batches of at
//! most [`TelemetryConfig::batch_size`] records, oldest first. A batch is sent
//! when the buffer overflows, when the buffer has been idle for
//! [`TelemetryConfig::hold_ms`], or at [`TelemetryPipeline::shutdown`]. If the
//! batch request fails, every record is retried once on its own as a GET with
//! its fields in the query string; nothing is retried after that.

mod capture;
mod config;
mod context;
mod error;
mod panic_hook;
mod pipeline;
mod record;
mod stack;

pub use capture::CaptureSource;
pub use capture::ExplicitReport;
pub use capture::UncaughtFault;
pub use capture::UnhandledRejection;
pub use config::DEFAULT_BATCH_SIZE;
pub use config::DEFAULT_HOLD_MS;
pub use config::DEFAULT_MAX_STACK_FRAMES;
pub use config::DEFAULT_REPORT_ENDPOINT;
pub use config::TelemetryConfig;
pub use context::Clock;
pub use context::PageContext;
pub use context::StaticPageContext;
pub use context::SystemClock;
pub use error::Result;
pub use error::TelemetryError;
pub use panic_hook::install_panic_hook;
pub use panic_hook::with_handled_panics;
pub use pipeline::TelemetryPipeline;
pub use pipeline::TelemetryPipelineBuilder;
pub use record::ErrorRecord;
pub use stack::FrameWalkStackCapture;
pub use stack::NativeStackCapture;
pub use stack::StackCapture;
pub use stack::probe_stack_capture;
