//! One-shot REST snapshot with bounded, fixed-delay retry.
//!
//! Exhausting the retries is not an error: the dashboard falls back to an
//! explicitly empty snapshot and keeps going.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use shared::{
    domain::{ChannelStatus, SatelliteStatus, TemperatureReading},
    error::PayloadError,
    normalize,
    protocol::{SnapshotResponse, SNAPSHOT_PATH},
};
use tracing::{error, info, warn};
use url::Url;

use crate::error::LoadError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_millis(2000),
        }
    }
}

#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch_snapshot(&self) -> Result<SnapshotResponse, LoadError>;
}

pub struct HttpSnapshotSource {
    http: Client,
    url: Url,
}

impl HttpSnapshotSource {
    pub fn new(http: Client, api_base_url: &str) -> Result<Self, LoadError> {
        let mut base = api_base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let url = Url::parse(&base)?.join(SNAPSHOT_PATH)?;
        Ok(Self { http, url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl SnapshotSource for HttpSnapshotSource {
    async fn fetch_snapshot(&self) -> Result<SnapshotResponse, LoadError> {
        let response = self
            .http
            .get(self.url.clone())
            .send()
            .await?
            .error_for_status()?
            .json::<SnapshotResponse>()
            .await?;
        Ok(response)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotOrigin {
    Fetched { attempts: u32 },
    Exhausted { attempts: u32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardSnapshot {
    pub channels: Vec<ChannelStatus>,
    pub satellites: Vec<SatelliteStatus>,
    pub temperature: Option<TemperatureReading>,
    pub origin: SnapshotOrigin,
}

impl DashboardSnapshot {
    pub fn empty(attempts: u32) -> Self {
        Self {
            channels: Vec::new(),
            satellites: Vec::new(),
            temperature: None,
            origin: SnapshotOrigin::Exhausted { attempts },
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self.origin, SnapshotOrigin::Exhausted { .. })
    }

    pub fn from_response(response: &SnapshotResponse, attempts: u32) -> Result<Self, PayloadError> {
        let channels = lenient_list("ChanellInfo", &response.chanell_info, normalize::channel_statuses)?;
        let satellites =
            lenient_list("SatelliteView", &response.satellite_view, normalize::satellites)?;
        let temperature = normalize::temperature(&response.temperature_info)?;
        Ok(Self {
            channels,
            satellites,
            temperature,
            origin: SnapshotOrigin::Fetched { attempts },
        })
    }
}

/// A missing or non-array collection reads as empty; bad elements still fail.
fn lenient_list<T>(
    field: &'static str,
    value: &Value,
    parse: fn(&Value) -> Result<Vec<T>, PayloadError>,
) -> Result<Vec<T>, PayloadError> {
    match value {
        Value::Array(_) => parse(value),
        Value::Null => Ok(Vec::new()),
        other => {
            warn!(field, payload = %other, "snapshot collection is not an array, using empty");
            Ok(Vec::new())
        }
    }
}

pub struct SnapshotLoader {
    source: Arc<dyn SnapshotSource>,
    policy: RetryPolicy,
}

impl SnapshotLoader {
    pub fn new(source: Arc<dyn SnapshotSource>, policy: RetryPolicy) -> Self {
        Self { source, policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub async fn load(&self) -> Result<DashboardSnapshot, LoadError> {
        let RetryPolicy { attempts, delay } = self.policy;
        if attempts == 0 {
            return Err(LoadError::NoAttempts);
        }

        for attempt in 1..=attempts {
            match self.load_once(attempt).await {
                Ok(snapshot) => {
                    info!(
                        attempt,
                        channels = snapshot.channels.len(),
                        satellites = snapshot.satellites.len(),
                        "snapshot loaded"
                    );
                    return Ok(snapshot);
                }
                Err(err) => {
                    warn!(attempt, attempts, error = %err, "snapshot load failed");
                    if attempt < attempts {
                        info!(delay_ms = delay.as_millis() as u64, "retrying snapshot load");
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        error!(attempts, "snapshot load exhausted its retries, showing empty state");
        Ok(DashboardSnapshot::empty(attempts))
    }

    async fn load_once(&self, attempt: u32) -> Result<DashboardSnapshot, LoadError> {
        let response = self.source.fetch_snapshot().await?;
        Ok(DashboardSnapshot::from_response(&response, attempt)?)
    }
}

#[cfg(test)]
#[path = "tests/loader_tests.rs"]
mod tests;
