mod file_config;

pub use file_config::{FetchConfig, FileConfig};

use anyhow::{anyhow, bail, Result};
use reqwest::Url;

use crate::session::SessionSettings;

/// Largest page either surface may request.
pub const MAX_FETCH_LIMIT: usize = 100;

pub const DEFAULT_BELL_FETCH_LIMIT: usize = 10;
pub const DEFAULT_PAGE_FETCH_LIMIT: usize = 20;
pub const DEFAULT_REQUEST_TIMEOUT_SEC: u64 = 30;

/// Path of the push endpoint when no explicit WebSocket URL is given.
const DEFAULT_WS_PATH: &str = "/ws/notifications/";

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub api_url: Option<String>,
    pub ws_url: Option<String>,
    pub auth_token: Option<String>,
    pub user_id: Option<i64>,
    pub bell_fetch_limit: Option<usize>,
    pub page_fetch_limit: Option<usize>,
    pub request_timeout_sec: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_url: String,
    pub ws_url: String,
    pub auth_token: String,
    pub user_id: i64,
    pub bell_fetch_limit: usize,
    pub page_fetch_limit: usize,
    pub request_timeout_sec: u64,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let api_url = file
            .api_url
            .or_else(|| cli.api_url.clone())
            .ok_or_else(|| anyhow!("api_url must be specified via --api-url or in config file"))?;
        let api_url = validate_http_url(&api_url)?;

        let ws_url = match file.ws_url.or_else(|| cli.ws_url.clone()) {
            Some(url) => validate_ws_url(&url)?,
            None => derive_ws_url(&api_url)?,
        };

        let auth_token = file
            .auth_token
            .or_else(|| cli.auth_token.clone())
            .ok_or_else(|| anyhow!("auth_token must be specified via --token or in config file"))?;
        if auth_token.trim().is_empty() {
            bail!("auth_token must not be empty");
        }

        let user_id = file
            .user_id
            .or(cli.user_id)
            .ok_or_else(|| anyhow!("user_id must be specified via --user-id or in config file"))?;
        if user_id <= 0 {
            bail!("user_id must be positive, got {}", user_id);
        }

        let fetch = file.fetch.unwrap_or_default();
        let bell_fetch_limit = fetch
            .bell_limit
            .or(cli.bell_fetch_limit)
            .unwrap_or(DEFAULT_BELL_FETCH_LIMIT);
        validate_limit("bell_fetch_limit", bell_fetch_limit)?;
        let page_fetch_limit = fetch
            .page_limit
            .or(cli.page_fetch_limit)
            .unwrap_or(DEFAULT_PAGE_FETCH_LIMIT);
        validate_limit("page_fetch_limit", page_fetch_limit)?;

        let request_timeout_sec = file
            .request_timeout_sec
            .or(cli.request_timeout_sec)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SEC);
        if request_timeout_sec == 0 {
            bail!("request_timeout_sec must be greater than 0");
        }

        Ok(Self {
            api_url,
            ws_url,
            auth_token,
            user_id,
            bell_fetch_limit,
            page_fetch_limit,
            request_timeout_sec,
        })
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            bell_fetch_limit: self.bell_fetch_limit,
            page_fetch_limit: self.page_fetch_limit,
        }
    }
}

fn validate_limit(name: &str, value: usize) -> Result<()> {
    if value == 0 || value > MAX_FETCH_LIMIT {
        bail!("{} must be between 1 and {}, got {}", name, MAX_FETCH_LIMIT, value);
    }
    Ok(())
}

fn validate_http_url(raw: &str) -> Result<String> {
    let url = Url::parse(raw).map_err(|e| anyhow!("Invalid api_url {:?}: {}", raw, e))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        bail!("api_url must use http or https, got {:?}", url.scheme());
    }
    Ok(raw.trim_end_matches('/').to_string())
}

fn validate_ws_url(raw: &str) -> Result<String> {
    let url = Url::parse(raw).map_err(|e| anyhow!("Invalid ws_url {:?}: {}", raw, e))?;
    if url.scheme() != "ws" && url.scheme() != "wss" {
        bail!("ws_url must use ws or wss, got {:?}", url.scheme());
    }
    Ok(raw.to_string())
}

/// `http://host:8000/base` -> `ws://host:8000/base/ws/notifications/`
fn derive_ws_url(api_url: &str) -> Result<String> {
    let rest = if let Some(rest) = api_url.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = api_url.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else {
        bail!("Cannot derive ws_url from {:?}", api_url);
    };
    Ok(format!("{}{}", rest.trim_end_matches('/'), DEFAULT_WS_PATH))
}
