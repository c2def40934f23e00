use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Backend (can override CLI)
    pub api_url: Option<String>,
    pub ws_url: Option<String>,
    pub auth_token: Option<String>,
    pub user_id: Option<i64>,
    pub request_timeout_sec: Option<u64>,

    pub fetch: Option<FetchConfig>,
}

/// `[fetch]` section: page sizes of the two fetching surfaces.
#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct FetchConfig {
    pub bell_limit: Option<usize>,
    pub page_limit: Option<usize>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
