use std::time::Duration;

use shared::error::PayloadError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HubError {
    #[error("hub url must start with http://, https://, ws:// or wss://: {0}")]
    UnsupportedScheme(String),
    #[error("failed to connect hub websocket {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: tokio_tungstenite::tungstenite::Error,
    },
    #[error("hub handshake rejected: {0}")]
    Handshake(String),
    #[error("hub handshake not completed within {0:?}")]
    HandshakeTimeout(Duration),
    #[error("hub connection closed during handshake")]
    ClosedDuringHandshake,
    #[error("invalid hub frame: {0}")]
    Frame(#[from] serde_json::Error),
    #[error("hub websocket failed: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("snapshot retry policy needs at least one attempt")]
    NoAttempts,
    #[error("snapshot request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid snapshot url: {0}")]
    Url(#[from] url::ParseError),
    #[error("invalid snapshot payload: {0}")]
    Payload(#[from] PayloadError),
}

#[derive(Debug, Error)]
pub enum StreamInfoError {
    #[error("stream info url is not configured")]
    NotConfigured,
    #[error("stream info request failed: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Hub(#[from] HubError),
}
