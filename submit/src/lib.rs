//! Form submission with per-row, bounded-parallelism dispatch.
//!
//! A [`Submitter`] sends either one request for a whole payload or one
//! request per row. Per-row results are merged into a single aggregate
//! before the terminal callbacks in [`SubmitHandlers`] run.

mod batch;
mod config;
mod handlers;
mod merge;
mod outcome;
mod submitter;
mod ui;
mod watchdog;

pub use config::DEFAULT_INTER_DISPATCH_DELAY_MS;
pub use config::DEFAULT_MAX_PARALLELISM;
pub use config::SubmitConfig;
pub use handlers::ErrorHandler;
pub use handlers::SubmitHandlers;
pub use merge::MAX_MERGE_DEPTH;
pub use merge::Shape;
pub use merge::is_truthy;
pub use merge::merge_arguments;
pub use merge::merge_value;
pub use outcome::Outcome;
pub use outcome::RowFailure;
pub use outcome::RowId;
pub use outcome::SESSION_EXPIRED_MESSAGE;
pub use outcome::default_error_response;
pub use submitter::SubmissionJob;
pub use submitter::SubmitSummary;
pub use submitter::Submitter;
pub use ui::LogUi;
pub use ui::NotificationKind;
pub use ui::Ui;
pub use watchdog::WATCHDOG_MINUTES;
