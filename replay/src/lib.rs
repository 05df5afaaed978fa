//! Library half of the `clientkit-replay` binary.
#![deny(clippy::print_stdout)]

mod cli;
mod config;
mod rows;

pub use cli::Cli;
pub use config::ClientkitConfig;
pub use config::ConfigError;
pub use rows::ReplayRows;

use clientkit_submit::LogUi;
use clientkit_submit::SubmitHandlers;
use clientkit_submit::SubmitSummary;
use clientkit_submit::Submitter;
use clientkit_telemetry::StaticPageContext;
use clientkit_telemetry::TelemetryError;
use clientkit_telemetry::TelemetryPipeline;
use clientkit_telemetry::install_panic_hook;
use clientkit_transport::HttpTransport;
use clientkit_transport::ReqwestTransport;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

const DEFAULT_LOG_LEVEL: &str = "error";

pub async fn run_main(cli: Cli) -> anyhow::Result<()> {
    init_tracing();

    let mut config = ClientkitConfig::load(&cli.config)?;
    if let Some(url) = cli.url {
        config.url = url;
    }
    if cli.whole {
        config.submit.single_submit = false;
    }
    config.validate()?;
    let rows = ReplayRows::load(&cli.rows, config.id_field())?;

    let transport: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::default());
    let telemetry = telemetry_pipeline(&config, Arc::clone(&transport))?;
    install_panic_hook(&telemetry);

    let summary = replay(&config, rows, transport, telemetry).await;
    let line = serde_json::to_string(&summary)?;
    #[allow(clippy::print_stdout)]
    {
        println!("{line}");
    }
    Ok(())
}

/// Builds the error pipeline that reports on behalf of the configured page.
pub fn telemetry_pipeline(
    config: &ClientkitConfig,
    transport: Arc<dyn HttpTransport>,
) -> Result<TelemetryPipeline, TelemetryError> {
    let page = Arc::new(StaticPageContext::new(config.page_url()));
    page.set_authenticated(config.authenticated);
    TelemetryPipeline::builder(transport, page)
        .config(config.telemetry.clone())
        .build()
}

/// Submits `rows` and shuts `telemetry` down once every callback has run.
pub async fn replay(
    config: &ClientkitConfig,
    rows: ReplayRows,
    transport: Arc<dyn HttpTransport>,
    telemetry: TelemetryPipeline,
) -> SubmitSummary {
    let submitter = Submitter::new(transport, Arc::new(LogUi), config.submit.clone())
        .with_telemetry(telemetry.clone());
    let handlers = SubmitHandlers::new()
        .on_row_success(|row_id| tracing::info!(%row_id, "Row submitted"))
        .on_refresh(|| tracing::info!("Some rows failed; data sources need a refresh"));

    tracing::debug!(rows = rows.rows.len(), url = %config.url, "Replaying rows");
    let summary = submitter
        .submit(&config.url, rows.rows, rows.row_ids, handlers)
        .await;
    telemetry.shutdown().await;
    summary
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_LOG_LEVEL))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(env_filter);
    let _ = tracing_subscriber::registry().with(fmt_layer).try_init();
}
