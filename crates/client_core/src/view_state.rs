use chrono::{DateTime, Utc};
use shared::domain::{
    BannerKind, CardActivationInfo, ChannelStatus, ChannelStatusEntry, DiscoAnimation,
    OpticChannelProblem, RegionRelay, SatelliteStatus, TemperatureReading,
};

use crate::{banner::BannerState, loader::DashboardSnapshot};

/// What an update did to its region of the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Replaced,
    Merged,
    Cleared,
    /// The update was empty and the previous state was kept.
    Kept,
}

/// Everything the dashboard renders. Each hub target owns a disjoint field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState {
    pub channels: Vec<ChannelStatus>,
    pub channel_status: Vec<ChannelStatusEntry>,
    pub satellites: Vec<SatelliteStatus>,
    pub region_relays: Vec<RegionRelay>,
    pub temperature: Option<TemperatureReading>,
    pub emr_temperature: Option<TemperatureReading>,
    pub optic_problems: Vec<OpticChannelProblem>,
    pub cards: Vec<CardActivationInfo>,
    pub disco: BannerState,
    pub robot_speech: BannerState,
}

fn replace_if_nonempty<T>(slot: &mut Vec<T>, update: Vec<T>) -> Applied {
    if update.is_empty() {
        return Applied::Kept;
    }
    *slot = update;
    Applied::Replaced
}

impl ViewState {
    pub fn from_snapshot(snapshot: DashboardSnapshot) -> Self {
        let mut state = Self::default();
        state.seed(snapshot);
        state
    }

    /// Installs the REST snapshot. Fields the snapshot does not carry are left alone.
    pub fn seed(&mut self, snapshot: DashboardSnapshot) {
        self.channels = snapshot.channels;
        self.satellites = snapshot.satellites;
        if snapshot.temperature.is_some() {
            self.temperature = snapshot.temperature;
        }
    }

    pub fn apply_channels(&mut self, update: Vec<ChannelStatus>) -> Applied {
        replace_if_nonempty(&mut self.channels, update)
    }

    pub fn apply_channel_status(&mut self, update: Vec<ChannelStatusEntry>) -> Applied {
        replace_if_nonempty(&mut self.channel_status, update)
    }

    pub fn apply_satellites(&mut self, update: Vec<SatelliteStatus>) -> Applied {
        replace_if_nonempty(&mut self.satellites, update)
    }

    pub fn apply_region_relays(&mut self, update: Vec<RegionRelay>) -> Applied {
        replace_if_nonempty(&mut self.region_relays, update)
    }

    pub fn apply_temperature(&mut self, update: Option<TemperatureReading>) -> Applied {
        match update {
            Some(reading) => {
                self.temperature = Some(reading);
                Applied::Replaced
            }
            None => Applied::Kept,
        }
    }

    pub fn apply_emr_temperature(&mut self, update: Option<TemperatureReading>) -> Applied {
        match update {
            Some(reading) => {
                self.emr_temperature = Some(reading);
                Applied::Replaced
            }
            None => Applied::Kept,
        }
    }

    /// Unlike the replace-if-nonempty streams, an empty problem list means "all clear".
    pub fn apply_optic_problems(&mut self, update: Vec<OpticChannelProblem>) -> Applied {
        if update.is_empty() {
            self.optic_problems.clear();
            return Applied::Cleared;
        }
        self.optic_problems = update;
        Applied::Replaced
    }

    /// Upserts by `(card, port, emr)`; an empty update clears the whole list.
    pub fn apply_card_updates(&mut self, updates: Vec<CardActivationInfo>) -> Applied {
        if updates.is_empty() {
            self.cards.clear();
            return Applied::Cleared;
        }
        for update in updates {
            let key = update.key();
            match self.cards.iter_mut().find(|card| card.key() == key) {
                Some(existing) => existing.merge_from(&update),
                None => self.cards.push(update),
            }
        }
        Applied::Merged
    }

    pub fn banner(&self, kind: BannerKind) -> &BannerState {
        match kind {
            BannerKind::Disco => &self.disco,
            BannerKind::RobotSpeech => &self.robot_speech,
        }
    }

    fn banner_mut(&mut self, kind: BannerKind) -> &mut BannerState {
        match kind {
            BannerKind::Disco => &mut self.disco,
            BannerKind::RobotSpeech => &mut self.robot_speech,
        }
    }

    pub(crate) fn show_banner(
        &mut self,
        kind: BannerKind,
        message: String,
        received_at: DateTime<Utc>,
    ) -> u64 {
        self.banner_mut(kind).show(message, received_at)
    }

    pub(crate) fn expire_banner(&mut self, kind: BannerKind, generation: u64) -> bool {
        self.banner_mut(kind).expire(generation)
    }

    pub fn disco_animation(&self) -> Option<DiscoAnimation> {
        self.disco.message().map(DiscoAnimation::from_message)
    }

    pub fn is_hot(&self, threshold_celsius: f64) -> bool {
        self.temperature
            .as_ref()
            .is_some_and(|reading| reading.is_hot(threshold_celsius))
    }
}

#[cfg(test)]
#[path = "tests/view_state_tests.rs"]
mod tests;
