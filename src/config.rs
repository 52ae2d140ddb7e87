//! Configuration types for course-dl

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{path::Path, path::PathBuf, time::Duration};

/// Course API endpoint and client identity
///
/// Passed explicitly to [`ApiClient`](crate::api::ApiClient) at construction;
/// nothing about the remote endpoint is global state.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the course platform (default: "https://www.designgurus.io")
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request timeout (default: 30 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,

    /// Build ID segment of the statically generated course list path
    ///
    /// The course list lives at `/_next/data/{build_id}/en/courses.json` and
    /// the build ID changes whenever the site is redeployed.
    #[serde(default = "default_build_id")]
    pub build_id: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: default_user_agent(),
            request_timeout: default_request_timeout(),
            build_id: default_build_id(),
        }
    }
}

/// Fetch pipeline behavior
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Number of concurrent fetch workers (default: 3)
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Hand already-fetched items to the sink even if the fetch phase failed (default: false)
    ///
    /// By default a single fetch failure discards every item fetched so far,
    /// so the sink only ever sees a complete set. Enabling this keeps the
    /// partial work; the run still reports the fetch failure.
    #[serde(default)]
    pub persist_partial: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            persist_partial: false,
        }
    }
}

/// Output location
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Root directory for saved JSON files (default: "resources")
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

/// Main configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote endpoint settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Worker pool settings
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Output settings
    #[serde(default)]
    pub output: OutputConfig,
}

impl Config {
    /// Load a configuration from a JSON file; missing fields take their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("failed to read {}: {}", path.display(), e),
            key: None,
        })?;
        let config: Config = serde_json::from_str(&content).map_err(|e| Error::Config {
            message: format!("failed to parse {}: {}", path.display(), e),
            key: None,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check invariants that serde defaults cannot express
    pub fn validate(&self) -> Result<()> {
        if self.pipeline.workers == 0 {
            return Err(Error::config("must be at least 1", "pipeline.workers"));
        }

        let base = url::Url::parse(&self.api.base_url).map_err(|e| {
            Error::config(format!("invalid base URL: {}", e), "api.base_url")
        })?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(Error::config(
                format!("unsupported scheme '{}'", base.scheme()),
                "api.base_url",
            ));
        }

        if self.api.build_id.trim().is_empty() {
            return Err(Error::config("must not be empty", "api.build_id"));
        }

        Ok(())
    }
}

// Default value functions
fn default_base_url() -> String {
    "https://www.designgurus.io".into()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:129.0) Gecko/20100101 Firefox/129.0".into()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_build_id() -> String {
    "N96LXRk0ealEXbchXFTgO".into()
}

fn default_workers() -> usize {
    3
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("resources")
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
