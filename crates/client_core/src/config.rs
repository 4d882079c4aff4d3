use std::{fs, num::NonZeroUsize, path::Path, time::Duration};

use anyhow::{bail, Context};
use serde::Deserialize;
use url::Url;

use crate::{hub::ReconnectPolicy, loader::RetryPolicy, reconciler::BannerTtls};

pub const DEFAULT_CONFIG_PATH: &str = "dashboard.toml";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DashboardSettings {
    pub api_base_url: String,
    pub hub_url: String,
    pub stream_info_url: Option<String>,
    pub load_retry_attempts: u32,
    pub load_retry_delay_ms: u64,
    pub reconnect_delays_ms: Vec<u64>,
    pub reconnect_forever: bool,
    pub disco_banner_ttl_secs: u64,
    pub robot_banner_ttl_secs: u64,
    pub stream_page_size: usize,
    pub hot_threshold_celsius: f64,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:5000/api/".into(),
            hub_url: "http://127.0.0.1:5000/monitoringhub".into(),
            stream_info_url: None,
            load_retry_attempts: 3,
            load_retry_delay_ms: 2000,
            reconnect_delays_ms: vec![0, 2000, 5000, 10000],
            reconnect_forever: false,
            disco_banner_ttl_secs: 30,
            robot_banner_ttl_secs: 10,
            stream_page_size: 2,
            hot_threshold_celsius: 24.0,
        }
    }
}

impl DashboardSettings {
    pub fn snapshot_retry(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.load_retry_attempts,
            delay: Duration::from_millis(self.load_retry_delay_ms),
        }
    }

    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy {
            delays: self
                .reconnect_delays_ms
                .iter()
                .copied()
                .map(Duration::from_millis)
                .collect(),
            retry_forever: self.reconnect_forever,
        }
    }

    pub fn banner_ttls(&self) -> BannerTtls {
        BannerTtls {
            disco: Duration::from_secs(self.disco_banner_ttl_secs),
            robot_speech: Duration::from_secs(self.robot_banner_ttl_secs),
        }
    }

    pub fn stream_page_size(&self) -> anyhow::Result<NonZeroUsize> {
        NonZeroUsize::new(self.stream_page_size).context("stream_page_size must be greater than zero")
    }

    /// Applies `MONITOR_*` overrides; `lookup` is usually `std::env::var`.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<()> {
        if let Some(v) = lookup("MONITOR_API_URL") {
            self.api_base_url = v;
        }
        if let Some(v) = lookup("MONITOR_HUB_URL") {
            self.hub_url = v;
        }
        if let Some(v) = lookup("MONITOR_STREAM_INFO_URL") {
            self.stream_info_url = Some(v);
        }
        if let Some(v) = lookup("MONITOR_LOAD_RETRY_ATTEMPTS") {
            self.load_retry_attempts = v
                .trim()
                .parse()
                .with_context(|| format!("invalid MONITOR_LOAD_RETRY_ATTEMPTS '{v}'"))?;
        }
        if let Some(v) = lookup("MONITOR_LOAD_RETRY_DELAY_MS") {
            self.load_retry_delay_ms = v
                .trim()
                .parse()
                .with_context(|| format!("invalid MONITOR_LOAD_RETRY_DELAY_MS '{v}'"))?;
        }
        if let Some(v) = lookup("MONITOR_RECONNECT_DELAYS_MS") {
            self.reconnect_delays_ms = parse_delay_list(&v)
                .with_context(|| format!("invalid MONITOR_RECONNECT_DELAYS_MS '{v}'"))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.load_retry_attempts == 0 {
            bail!("load_retry_attempts must be at least 1");
        }
        self.stream_page_size()?;
        check_url("api_base_url", &self.api_base_url, &["http", "https"])?;
        check_url("hub_url", &self.hub_url, &["http", "https", "ws", "wss"])?;
        if let Some(stream_info_url) = &self.stream_info_url {
            check_url("stream_info_url", stream_info_url, &["http", "https"])?;
        }
        Ok(())
    }
}

/// Reads `path` (or `dashboard.toml` when present), then environment overrides.
pub fn load_settings(path: Option<&Path>) -> anyhow::Result<DashboardSettings> {
    let mut settings = match path {
        Some(path) => read_settings_file(path)?,
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
            read_settings_file(Path::new(DEFAULT_CONFIG_PATH))?
        }
        None => DashboardSettings::default(),
    };
    settings.apply_overrides(|key| std::env::var(key).ok())?;
    Ok(settings)
}

fn read_settings_file(path: &Path) -> anyhow::Result<DashboardSettings> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read settings file '{}'", path.display()))?;
    toml::from_str(&raw)
        .with_context(|| format!("failed to parse settings file '{}'", path.display()))
}

fn parse_delay_list(raw: &str) -> anyhow::Result<Vec<u64>> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| part.parse::<u64>().map_err(anyhow::Error::from))
        .collect()
}

fn check_url(name: &str, raw: &str, schemes: &[&str]) -> anyhow::Result<()> {
    let url = Url::parse(raw).with_context(|| format!("{name} is not a valid url: '{raw}'"))?;
    if !schemes.contains(&url.scheme()) {
        bail!("{name} must use one of {schemes:?}, got '{}'", url.scheme());
    }
    Ok(())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
