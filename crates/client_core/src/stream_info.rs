use std::num::NonZeroUsize;

use reqwest::Client;
use shared::diagnostics::SystemStreamInfo;
use tracing::{error, info};

use crate::{error::StreamInfoError, pager::Pager};

pub const LOAD_FAILED_MESSAGE: &str = "Failed to load stream info";

pub struct StreamInfoClient {
    http: Client,
    url: String,
}

impl StreamInfoClient {
    pub fn new(http: Client, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }

    pub async fn fetch(&self) -> Result<Vec<SystemStreamInfo>, StreamInfoError> {
        let streams = self
            .http
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<SystemStreamInfo>>()
            .await?;
        Ok(streams)
    }
}

/// Stream diagnostics fetched once and paged locally.
pub struct StreamInfoView {
    pager: Pager<SystemStreamInfo>,
    error: Option<String>,
}

impl StreamInfoView {
    pub async fn load(client: &StreamInfoClient, page_size: NonZeroUsize) -> Self {
        match client.fetch().await {
            Ok(streams) => {
                info!(streams = streams.len(), "stream info loaded");
                Self {
                    pager: Pager::new(streams, page_size),
                    error: None,
                }
            }
            Err(err) => {
                error!(url = %client.url, error = %err, "stream info load failed");
                Self {
                    pager: Pager::new(Vec::new(), page_size),
                    error: Some(LOAD_FAILED_MESSAGE.to_string()),
                }
            }
        }
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn pager(&self) -> &Pager<SystemStreamInfo> {
        &self.pager
    }

    pub fn pager_mut(&mut self) -> &mut Pager<SystemStreamInfo> {
        &mut self.pager
    }
}

#[cfg(test)]
#[path = "tests/stream_info_tests.rs"]
mod tests;
