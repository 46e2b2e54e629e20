use std::{io::ErrorKind, path::PathBuf};

use anyhow::Context;

use homedash_common::RuntimeConfig;

pub const CONFIG_PATH_VAR: &str = "HOMEDASH_CONFIG";
pub const API_URL_VAR: &str = "HOMEDASH_API_URL";
pub const POLL_MS_VAR: &str = "HOMEDASH_POLL_MS";
pub const TIMEZONE_VAR: &str = "HOMEDASH_TIMEZONE";

#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn from_env() -> Self {
        let path = std::env::var(CONFIG_PATH_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./.homedash/config.json"));
        Self::new(path)
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// A missing file yields the defaults.
    pub async fn load(&self) -> anyhow::Result<RuntimeConfig> {
        match tokio::fs::read(&self.path).await {
            Ok(raw) => serde_json::from_slice::<RuntimeConfig>(&raw)
                .with_context(|| format!("invalid config file {}", self.path.display())),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(RuntimeConfig::default()),
            Err(err) => Err(err).with_context(|| format!("failed to read {}", self.path.display())),
        }
    }
}

pub fn apply_env_overrides<F>(config: &mut RuntimeConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup(API_URL_VAR) {
        config.api.base_url = url;
    }
    if let Some(poll_ms) = lookup(POLL_MS_VAR).and_then(|value| value.parse::<u64>().ok()) {
        config.sync.poll_interval_ms = poll_ms;
    }
    if let Some(timezone) = lookup(TIMEZONE_VAR) {
        config.display.timezone = timezone;
    }
}
