//! Server configuration
//!
//! Layered as defaults, then the YAML file, then `EMOSERVE_*` environment
//! variables (`__` separates nested keys), then CLI overrides.

use emoserve_classifiers::{ModelConfig, ModelSource};
use emoserve_core::{Error, InputLimits, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name the model is registered under when none is configured
pub const DEFAULT_MODEL_NAME: &str = "bert-emotion-model";

/// Prefix of environment variable overrides
pub const ENV_PREFIX: &str = "EMOSERVE";

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Name used in `/v1/models/{name}` paths
    pub model_name: String,

    /// HTTP listener settings
    pub server: ServerConfig,

    /// Model source and inference settings
    pub model: ModelConfig,

    /// Request input limits
    pub limits: InputLimits,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model_name: DEFAULT_MODEL_NAME.to_string(),
            server: ServerConfig::default(),
            model: ModelConfig::default(),
            limits: InputLimits::default(),
        }
    }
}

/// HTTP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Listen port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Predictions allowed to run at once
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            port: default_port(),
            workers: default_workers(),
        }
    }
}

/// Values given on the command line, applied last
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub model_name: Option<String>,
    pub listen: Option<String>,
    pub port: Option<u16>,
    pub workers: Option<usize>,
    pub model_repo: Option<String>,
    pub model_path: Option<PathBuf>,
    pub device: Option<String>,
}

impl AppConfig {
    /// Load configuration from an optional YAML file and the environment
    pub fn load(config_path: impl AsRef<Path>) -> Result<Self> {
        Self::load_with_env(config_path.as_ref(), environment())
    }

    fn load_with_env(config_path: &Path, env: config::Environment) -> Result<Self> {
        if config_path.exists() {
            tracing::info!("Reading configuration from {}", config_path.display());
        } else {
            tracing::debug!(
                "Configuration file {} not found, using defaults",
                config_path.display()
            );
        }

        config::Config::builder()
            .add_source(config::File::from(config_path).required(false))
            .add_source(env)
            .build()
            .and_then(|settings| settings.try_deserialize())
            .map_err(|e| Error::config(e.to_string()))
    }

    /// Apply CLI overrides
    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(name) = overrides.model_name {
            self.model_name = name;
        }
        if let Some(listen) = overrides.listen {
            self.server.listen = listen;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if let Some(workers) = overrides.workers {
            self.server.workers = workers;
        }
        if let Some(repo) = overrides.model_repo {
            self.model.source = ModelSource::HuggingFace {
                repo,
                revision: "main".to_string(),
            };
        }
        // A local path wins over a hub repository
        if let Some(path) = overrides.model_path {
            self.model.source = ModelSource::Local { path };
        }
        if let Some(device) = overrides.device {
            self.model.device = device;
        }
    }

    /// Reject configurations the server cannot run with
    pub fn validate(&self) -> Result<()> {
        let name = self.model_name.trim();
        if name.is_empty() {
            return Err(Error::config("model_name must not be empty"));
        }
        if name.contains(['/', ':']) {
            return Err(Error::config(format!(
                "model_name '{}' must not contain '/' or ':'",
                name
            )));
        }

        if self.server.port == 0 {
            return Err(Error::config("server.port must be greater than 0"));
        }
        if self.server.workers == 0 {
            return Err(Error::config("server.workers must be greater than 0"));
        }

        if self.limits.max_batch_size == 0
            || self.limits.max_input_chars == 0
            || self.limits.max_body_bytes == 0
        {
            return Err(Error::config("limits must all be greater than 0"));
        }

        self.model.validate()
    }

    /// `listen:port` for binding
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.listen, self.server.port)
    }
}

/// `EMOSERVE_MODEL_NAME`, `EMOSERVE_SERVER__PORT`, ...
fn environment() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

fn default_listen() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_workers() -> usize {
    1
}
