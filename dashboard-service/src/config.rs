use serde::Deserialize;
use std::{fs, path::PathBuf};

pub const DEFAULT_HEADING: &str = "Manhattan Energy Usage and Green Gas Emission";

fn default_heading() -> String {
    DEFAULT_HEADING.to_string()
}

fn default_max_page_size() -> usize {
    500
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatasetConfig {
    /// CSV file with one row per building per reporting year.
    pub path: PathBuf,
    /// Leading text of table titles.
    #[serde(default = "default_heading")]
    pub heading: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub bind_addr: String,
    #[serde(default = "default_max_page_size")]
    pub max_page_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub dataset: DatasetConfig,
    pub server: ServerConfig,
    pub metrics: Option<MetricsConfig>,
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        use std::env;

        let path =
            env::var("DASHBOARD_CONFIG").unwrap_or_else(|_| "dashboard-config.toml".to_string());
        let contents = fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("failed to read config '{path}': {e}"))?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> anyhow::Result<Self> {
        let cfg: AppConfig = toml::from_str(contents)?;
        if cfg.server.max_page_size == 0 {
            anyhow::bail!("server.max_page_size must be positive");
        }
        Ok(cfg)
    }
}
