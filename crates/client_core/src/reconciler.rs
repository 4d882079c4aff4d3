//! Folds hub invocations into the owned [`ViewState`].

use std::{
    sync::{Arc, Weak},
    time::Duration,
};

use chrono::Utc;
use serde_json::Value;
use shared::{
    domain::BannerKind,
    error::PayloadError,
    normalize,
    protocol::HubTarget,
};
use tokio::{
    sync::{broadcast, mpsc, Mutex, RwLock},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::{
    banner::BannerTimers,
    hub::HubInvocation,
    loader::DashboardSnapshot,
    view_state::{Applied, ViewState},
};

const EVENT_BUFFER: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BannerTtls {
    pub disco: Duration,
    pub robot_speech: Duration,
}

impl Default for BannerTtls {
    fn default() -> Self {
        Self {
            disco: Duration::from_secs(30),
            robot_speech: Duration::from_secs(10),
        }
    }
}

impl BannerTtls {
    pub fn for_kind(&self, kind: BannerKind) -> Duration {
        match kind {
            BannerKind::Disco => self.disco,
            BannerKind::RobotSpeech => self.robot_speech,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewSection {
    Channels,
    ChannelStatus,
    Satellites,
    RegionRelays,
    Temperature,
    EmrTemperature,
    OpticProblems,
    Cards,
    Banner(BannerKind),
}

#[derive(Debug, Clone, PartialEq)]
pub enum DashboardEvent {
    Seeded,
    Updated {
        section: ViewSection,
        applied: Applied,
    },
    BannerExpired(BannerKind),
    PayloadRejected {
        target: String,
        reason: String,
    },
}

type Outcome = Result<(ViewSection, Applied), PayloadError>;

pub struct Reconciler {
    state: RwLock<ViewState>,
    timers: Mutex<BannerTimers>,
    ttls: BannerTtls,
    events: broadcast::Sender<DashboardEvent>,
}

impl Reconciler {
    pub fn new(ttls: BannerTtls) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Arc::new(Self {
            state: RwLock::new(ViewState::default()),
            timers: Mutex::new(BannerTimers::default()),
            ttls,
            events,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DashboardEvent> {
        self.events.subscribe()
    }

    pub async fn seed(&self, snapshot: DashboardSnapshot) {
        self.state.write().await.seed(snapshot);
        let _ = self.events.send(DashboardEvent::Seeded);
    }

    pub async fn view(&self) -> ViewState {
        self.state.read().await.clone()
    }

    pub async fn read<R>(&self, f: impl FnOnce(&ViewState) -> R) -> R {
        f(&*self.state.read().await)
    }

    /// Registers the live-update handlers: every invocation received on
    /// `invocations` is applied until the hub side goes away.
    pub fn spawn_consumer(
        self: &Arc<Self>,
        mut invocations: mpsc::Receiver<HubInvocation>,
    ) -> JoinHandle<()> {
        let reconciler = Arc::clone(self);
        tokio::spawn(async move {
            info!("live update handlers registered");
            while let Some(invocation) = invocations.recv().await {
                reconciler.apply(&invocation).await;
            }
            debug!("hub invocation stream ended");
        })
    }

    pub async fn apply(self: &Arc<Self>, invocation: &HubInvocation) {
        let Some(target) = HubTarget::from_name(&invocation.target) else {
            debug!(hub_target = %invocation.target, "ignoring unknown hub target");
            return;
        };

        match self.apply_target(target, invocation.payload()).await {
            Ok((section, applied)) => {
                if applied == Applied::Kept {
                    warn!(hub_target = target.as_str(), "empty or null update, keeping current state");
                } else {
                    debug!(hub_target = target.as_str(), ?applied, "view updated");
                }
                let _ = self
                    .events
                    .send(DashboardEvent::Updated { section, applied });
            }
            Err(err) => {
                warn!(hub_target = target.as_str(), error = %err, "rejected hub payload");
                let _ = self.events.send(DashboardEvent::PayloadRejected {
                    target: invocation.target.clone(),
                    reason: err.to_string(),
                });
            }
        }
    }

    async fn apply_target(self: &Arc<Self>, target: HubTarget, payload: &Value) -> Outcome {
        match target {
            HubTarget::ChanellInfoUpdate => {
                self.update(
                    ViewSection::Channels,
                    normalize::channel_statuses(payload),
                    ViewState::apply_channels,
                )
                .await
            }
            HubTarget::ChannelStatusUpdate => {
                self.update(
                    ViewSection::ChannelStatus,
                    normalize::channel_status_map(payload),
                    ViewState::apply_channel_status,
                )
                .await
            }
            HubTarget::SatelliteMonitoringUpdate => {
                self.update(
                    ViewSection::Satellites,
                    normalize::satellites(payload),
                    ViewState::apply_satellites,
                )
                .await
            }
            HubTarget::RegionBitrateUpdate => {
                self.update(
                    ViewSection::RegionRelays,
                    normalize::region_relays(payload),
                    ViewState::apply_region_relays,
                )
                .await
            }
            HubTarget::TemperatureUpdate => {
                self.update(
                    ViewSection::Temperature,
                    normalize::temperature(payload),
                    ViewState::apply_temperature,
                )
                .await
            }
            HubTarget::EmrTemperatureUpdate => {
                self.update(
                    ViewSection::EmrTemperature,
                    normalize::temperature(payload),
                    ViewState::apply_emr_temperature,
                )
                .await
            }
            HubTarget::OpticChannelHealthUpdate => {
                self.update(
                    ViewSection::OpticProblems,
                    normalize::optic_problems(payload),
                    ViewState::apply_optic_problems,
                )
                .await
            }
            HubTarget::CardsWhichNeedToBeActivate => {
                self.update(
                    ViewSection::Cards,
                    normalize::card_updates(payload),
                    ViewState::apply_card_updates,
                )
                .await
            }
            HubTarget::StartAnimate => {
                let message = normalize::disco_message(payload)?;
                Ok(self.show_banner(BannerKind::Disco, message).await)
            }
            HubTarget::RobotSay => {
                let message = normalize::robot_speech(payload)?;
                Ok(self.show_banner(BannerKind::RobotSpeech, message).await)
            }
        }
    }

    async fn update<T>(
        &self,
        section: ViewSection,
        parsed: Result<T, PayloadError>,
        apply: fn(&mut ViewState, T) -> Applied,
    ) -> Outcome {
        let update = parsed?;
        let applied = apply(&mut *self.state.write().await, update);
        Ok((section, applied))
    }

    /// Shows the banner and restarts its expiry countdown.
    async fn show_banner(self: &Arc<Self>, kind: BannerKind, message: String) -> (ViewSection, Applied) {
        let mut timers = self.timers.lock().await;
        let generation = self
            .state
            .write()
            .await
            .show_banner(kind, message, Utc::now());

        let ttl = self.ttls.for_kind(kind);
        let reconciler: Weak<Self> = Arc::downgrade(self);
        timers.rearm(
            kind,
            tokio::spawn(async move {
                tokio::time::sleep(ttl).await;
                if let Some(reconciler) = reconciler.upgrade() {
                    reconciler.expire_banner(kind, generation).await;
                }
            }),
        );
        (ViewSection::Banner(kind), Applied::Replaced)
    }

    async fn expire_banner(&self, kind: BannerKind, generation: u64) {
        if self.state.write().await.expire_banner(kind, generation) {
            info!(?kind, "banner expired");
            let _ = self.events.send(DashboardEvent::BannerExpired(kind));
        }
    }

    pub async fn banner_timer_pending(&self, kind: BannerKind) -> bool {
        self.timers.lock().await.is_armed(kind)
    }

    /// Cancels pending banner timers. The view keeps its last state.
    pub async fn shutdown(&self) {
        self.timers.lock().await.cancel_all();
        debug!("banner timers cancelled");
    }
}

#[cfg(test)]
#[path = "tests/reconciler_tests.rs"]
mod tests;
