use clientkit_submit::SubmitConfig;
use clientkit_telemetry::TelemetryConfig;
use serde::Deserialize;
use std::path::Path;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to parse rows in {path}: {source}")]
    Rows {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{path} must contain a JSON array of rows")]
    NotAnArray { path: PathBuf },
    #[error("no submission url configured")]
    MissingUrl,
}

/// Everything one replay run needs, as read from `clientkit.toml`.
///
/// ```toml
/// url = "https://app.example.com/api/plants/create"
/// page_url = "https://app.example.com/plants"
///
/// [telemetry]
/// batch_size = 50
///
/// [submit]
/// max_parallelism = 4
/// use_toast = true
/// ```
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ClientkitConfig {
    /// Endpoint rows are submitted to.
    pub url: String,
    /// Page the submission is attributed to. Relative report endpoints
    /// resolve against it. Defaults to `url`.
    pub page_url: Option<String>,
    pub authenticated: bool,
    /// Field of each row used as its row id.
    pub id_field: Option<String>,
    pub telemetry: TelemetryConfig,
    pub submit: SubmitConfig,
}

impl ClientkitConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn page_url(&self) -> &str {
        self.page_url.as_deref().unwrap_or(&self.url)
    }

    pub fn id_field(&self) -> &str {
        self.id_field.as_deref().unwrap_or("Id")
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.url.trim().is_empty() {
            return Err(ConfigError::MissingUrl);
        }
        Ok(())
    }
}
