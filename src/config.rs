use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub instances: Vec<InstanceDef>,
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
}

/// One remote management server as written in the config file.
///
/// Every field defaults to empty so a missing key and an empty string are
/// rejected the same way by [`crate::registry::InstanceRegistry::load`].
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceDef {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub api_key: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("reading config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("writing config template {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("instance #{index}: {field} is not defined")]
    EmptyField { index: usize, field: &'static str },

    #[error("pollIntervalSecs must be greater than zero")]
    ZeroPollInterval,
}

fn default_listen_port() -> u16 {
    9090
}

fn default_poll_interval_secs() -> u64 {
    5
}

impl Default for Config {
    fn default() -> Self {
        Self {
            instances: Vec::new(),
            listen_port: default_listen_port(),
            poll_interval_secs: default_poll_interval_secs(),
            request_timeout_secs: None,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&data).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    pub fn parse(data: &str) -> Result<Self, ConfigError> {
        let cfg: Config = serde_json::from_str(data).map_err(|source| ConfigError::Parse {
            path: PathBuf::new(),
            source,
        })?;

        if cfg.poll_interval_secs == 0 {
            return Err(ConfigError::ZeroPollInterval);
        }

        Ok(cfg)
    }

    /// Writes a starter config with a single example instance. The API key is
    /// left blank, so the result does not load until the user fills it in.
    pub fn write_template(path: &Path) -> Result<(), ConfigError> {
        let template = Config {
            instances: vec![InstanceDef {
                name: "Example".to_string(),
                url: "http://localhost:9000".to_string(),
                api_key: String::new(),
            }],
            ..Default::default()
        };

        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(write_err)?;
        }
        let body = serde_json::to_string_pretty(&template)
            .map_err(|e| write_err(std::io::Error::other(e)))?;
        std::fs::write(path, body + "\n").map_err(write_err)
    }

    /// `~/.config/stack-console/config.json` on Linux, the platform
    /// equivalent elsewhere.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("stack-console")
            .join("config.json")
    }

    pub fn listen_addr(&self) -> String {
        format!("127.0.0.1:{}", self.listen_port)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}
