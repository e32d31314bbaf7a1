use std::fs;
use std::path::PathBuf;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::pool::{NARROW_POOL, WIDE_POOL};

pub const CONFIG_FILE: &str = "range-etl.json";
pub const DEFAULT_BASE_URL: &str = "http://charcoal.cnre.vt.edu";
pub const INDEX_PATH: &str = "climate/species/speciesDist";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub data_dir: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub wide_workers: Option<usize>,
    #[serde(default)]
    pub narrow_workers: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub data_dir: Utf8PathBuf,
    pub base_url: String,
    pub index_url: String,
    pub database: Utf8PathBuf,
    pub wide_workers: usize,
    pub narrow_workers: usize,
}

pub struct ConfigLoader;

impl ConfigLoader {
    // an explicit path must exist, the default file may be absent
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, PipelineError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(CONFIG_FILE),
        };

        let config = if path.is_none() && !config_path.exists() {
            Config::default()
        } else {
            let content = fs::read_to_string(&config_path)
                .map_err(|_| PipelineError::ConfigRead(config_path.clone()))?;
            serde_json::from_str(&content)
                .map_err(|err| PipelineError::ConfigParse(err.to_string()))?
        };

        Ok(Self::resolve_config(config))
    }

    pub fn resolve_config(config: Config) -> ResolvedConfig {
        let base_url = config
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let index_url = format!("{base_url}/{INDEX_PATH}");
        ResolvedConfig {
            data_dir: Utf8PathBuf::from(config.data_dir.unwrap_or_else(|| "data".to_string())),
            database: Utf8PathBuf::from(
                config
                    .database
                    .unwrap_or_else(|| "speciesdata.sqlite".to_string()),
            ),
            base_url,
            index_url,
            wide_workers: config.wide_workers.unwrap_or(WIDE_POOL),
            narrow_workers: config.narrow_workers.unwrap_or(NARROW_POOL),
        }
    }
}
