//! Explicit configuration for the orchestrator and its adapters.
//!
//! Configuration is passed into constructors; nothing is read from ambient
//! global state. Every section has serde defaults, so a JSON file only needs
//! to list the values it overrides.

use crate::task::{ports::ResourceLimits, services::ChangeRequestTemplates};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default approval window: ten minutes.
pub const DEFAULT_APPROVAL_TIMEOUT_MS: u64 = 10 * 60 * 1000;

/// Default change request title.
pub const DEFAULT_TITLE_TEMPLATE: &str = "Ghost Coder Automated Fix";

/// Default change request body.
pub const DEFAULT_BODY_TEMPLATE: &str = "Generated via Ghost Coder.\nTask: {{ instruction }}";

/// Default link a reviewer opens to inspect the pushed branch.
pub const DEFAULT_REVIEW_URL_TEMPLATE: &str =
    "https://stackblitz.com/github/{{ owner }}/{{ name }}/tree/{{ branch }}";

/// Top-level orchestrator configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OrchestratorConfig {
    /// Approval window in milliseconds.
    pub approval_timeout_ms: u64,
    /// Worker provisioning settings.
    pub worker: WorkerConfig,
    /// Change request rendering settings.
    pub change_request: ChangeRequestConfig,
    /// Source-host API settings.
    pub github: GitHubConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            approval_timeout_ms: DEFAULT_APPROVAL_TIMEOUT_MS,
            worker: WorkerConfig::default(),
            change_request: ChangeRequestConfig::default(),
            github: GitHubConfig::default(),
        }
    }
}

impl OrchestratorConfig {
    /// Loads configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read, does not parse,
    /// or fails validation.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        let raw = std::fs::read_to_string(path_ref).map_err(|source| ConfigError::Read {
            path: path_ref.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    /// Parses configuration from a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the document does not parse or fails
    /// validation.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Returns the approval window.
    #[must_use]
    pub const fn approval_timeout(&self) -> Duration {
        Duration::from_millis(self.approval_timeout_ms)
    }

    /// Sets the approval window, saturating at `u64::MAX` milliseconds.
    #[must_use]
    pub fn with_approval_timeout(mut self, timeout: Duration) -> Self {
        self.approval_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Checks invariants serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for out-of-range values and
    /// [`ConfigError::Template`] for templates that do not compile.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.approval_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "approval_timeout_ms must be positive".to_owned(),
            ));
        }
        self.worker.validate()?;
        if self.change_request.base_branch.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "change_request.base_branch must not be empty".to_owned(),
            ));
        }
        ChangeRequestTemplates::from_config(&self.change_request)?;
        if self.github.user_agent.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "github.user_agent must not be empty".to_owned(),
            ));
        }
        url::Url::parse(&self.github.api_base).map_err(|err| {
            ConfigError::Invalid(format!("github.api_base is not a URL: {err}"))
        })?;
        Ok(())
    }
}

/// Worker provisioning settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkerConfig {
    /// Container image that runs the editing pipeline.
    pub image: String,
    /// Container runtime CLI.
    pub docker_binary: String,
    /// Hard memory limit in bytes.
    pub memory_limit_bytes: u64,
    /// Optional CPU quota, in cores.
    pub cpus: Option<f64>,
    /// Additional non-secret environment entries for the worker.
    pub extra_env: BTreeMap<String, String>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        let limits = ResourceLimits::default();
        Self {
            image: "ghost-coder-worker:latest".to_owned(),
            docker_binary: "docker".to_owned(),
            memory_limit_bytes: limits.memory_bytes,
            cpus: limits.cpus,
            extra_env: BTreeMap::new(),
        }
    }
}

impl WorkerConfig {
    /// Returns the resource caps for each execution unit.
    #[must_use]
    pub const fn limits(&self) -> ResourceLimits {
        ResourceLimits {
            memory_bytes: self.memory_limit_bytes,
            cpus: self.cpus,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.image.trim().is_empty() {
            return Err(ConfigError::Invalid("worker.image must not be empty".to_owned()));
        }
        if self.memory_limit_bytes == 0 {
            return Err(ConfigError::Invalid(
                "worker.memory_limit_bytes must be positive".to_owned(),
            ));
        }
        if self.cpus.is_some_and(|cpus| !cpus.is_finite() || cpus <= 0.0) {
            return Err(ConfigError::Invalid(
                "worker.cpus must be a positive number".to_owned(),
            ));
        }
        Ok(())
    }
}

/// Change request rendering settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChangeRequestConfig {
    /// Branch change requests merge into.
    pub base_branch: String,
    /// Title template (`minijinja` syntax).
    pub title_template: String,
    /// Body template (`minijinja` syntax).
    pub body_template: String,
    /// Template for the branch preview link shown with the approval prompt.
    pub review_url_template: String,
}

impl Default for ChangeRequestConfig {
    fn default() -> Self {
        Self {
            base_branch: "main".to_owned(),
            title_template: DEFAULT_TITLE_TEMPLATE.to_owned(),
            body_template: DEFAULT_BODY_TEMPLATE.to_owned(),
            review_url_template: DEFAULT_REVIEW_URL_TEMPLATE.to_owned(),
        }
    }
}

/// Source-host API settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GitHubConfig {
    /// REST API base URL.
    pub api_base: String,
    /// `User-Agent` sent with every request.
    pub user_agent: String,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.github.com".to_owned(),
            user_agent: concat!("ghost-coder/", env!("CARGO_PKG_VERSION")).to_owned(),
        }
    }
}

/// Errors returned while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration from {path}: {source}")]
    Read {
        /// File path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration document is malformed.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    /// A value is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),

    /// A change request template does not compile.
    #[error("invalid change request template: {0}")]
    Template(#[from] minijinja::Error),
}
