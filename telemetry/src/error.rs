use thiserror::Error;

#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Timers and deliveries are spawned onto the ambient tokio runtime.
    #[error("telemetry pipeline must be built inside a tokio runtime")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),
}

pub type Result<T> = std::result::Result<T, TelemetryError>;
