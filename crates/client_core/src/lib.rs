use std::sync::Arc;

use reqwest::Client;
use tokio::{
    sync::{broadcast, watch},
    task::JoinHandle,
};
use tracing::{info, warn};

mod banner;
pub mod config;
pub mod error;
pub mod hub;
pub mod loader;
pub mod pager;
pub mod reconciler;
pub mod stream_info;
pub mod view_state;

pub use banner::BannerState;
pub use config::{load_settings, DashboardSettings};
pub use error::{DashboardError, HubError, LoadError, StreamInfoError};
pub use hub::{ConnectionState, HubConnection, HubInvocation, ReconnectPolicy};
pub use loader::{
    DashboardSnapshot, HttpSnapshotSource, RetryPolicy, SnapshotLoader, SnapshotOrigin,
    SnapshotSource,
};
pub use pager::Pager;
pub use reconciler::{BannerTtls, DashboardEvent, Reconciler, ViewSection};
pub use stream_info::{StreamInfoClient, StreamInfoView};
pub use view_state::{Applied, ViewState};

/// Wires the snapshot loader, the hub connection and the reconciler together.
///
/// The intended order is [`Dashboard::load_snapshot`] followed by
/// [`Dashboard::connect_live`], which is what [`Dashboard::start`] does.
pub struct Dashboard {
    settings: DashboardSettings,
    http: Client,
    reconciler: Arc<Reconciler>,
    hub: Option<HubConnection>,
    consumer: Option<JoinHandle<()>>,
}

impl Dashboard {
    pub fn new(settings: DashboardSettings) -> Self {
        let reconciler = Reconciler::new(settings.banner_ttls());
        Self {
            settings,
            http: Client::new(),
            reconciler,
            hub: None,
            consumer: None,
        }
    }

    pub fn settings(&self) -> &DashboardSettings {
        &self.settings
    }

    pub fn reconciler(&self) -> &Arc<Reconciler> {
        &self.reconciler
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DashboardEvent> {
        self.reconciler.subscribe()
    }

    pub async fn view(&self) -> ViewState {
        self.reconciler.view().await
    }

    /// Fetches the REST snapshot and seeds the view with it. Exhausted retries
    /// still seed an empty view.
    pub async fn load_snapshot(&self) -> Result<SnapshotOrigin, LoadError> {
        let source = HttpSnapshotSource::new(self.http.clone(), &self.settings.api_base_url)?;
        let loader = SnapshotLoader::new(Arc::new(source), self.settings.snapshot_retry());
        let snapshot = loader.load().await?;
        let origin = snapshot.origin;
        self.reconciler.seed(snapshot).await;
        Ok(origin)
    }

    /// Opens the hub connection and registers the update handlers. Calling it
    /// again while a connection exists is a no-op.
    pub async fn connect_live(&mut self) -> Result<(), HubError> {
        if self.hub.is_some() {
            return Ok(());
        }
        let (hub, invocations) =
            HubConnection::start(&self.settings.hub_url, self.settings.reconnect_policy()).await?;
        self.consumer = Some(self.reconciler.spawn_consumer(invocations));
        self.hub = Some(hub);
        Ok(())
    }

    pub async fn start(&mut self) -> Result<(), DashboardError> {
        let origin = self.load_snapshot().await?;
        if let SnapshotOrigin::Exhausted { attempts } = origin {
            warn!(attempts, "starting live updates on an empty view");
        }
        self.connect_live().await?;
        info!(hub_url = %self.settings.hub_url, "dashboard started");
        Ok(())
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.hub
            .as_ref()
            .map_or(ConnectionState::Disconnected, HubConnection::state)
    }

    pub fn watch_connection(&self) -> Option<watch::Receiver<ConnectionState>> {
        self.hub.as_ref().map(HubConnection::watch_state)
    }

    pub fn stream_info_client(&self) -> Result<StreamInfoClient, StreamInfoError> {
        let url = self
            .settings
            .stream_info_url
            .as_deref()
            .ok_or(StreamInfoError::NotConfigured)?;
        Ok(StreamInfoClient::new(self.http.clone(), url))
    }

    /// Stops the hub, drains the handler task and cancels banner timers.
    pub async fn shutdown(&mut self) {
        if let Some(mut hub) = self.hub.take() {
            hub.stop().await;
        }
        if let Some(consumer) = self.consumer.take() {
            let _ = consumer.await;
        }
        self.reconciler.shutdown().await;
        info!("dashboard stopped");
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
