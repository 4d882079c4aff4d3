use chrono::{DateTime, Utc};
use shared::domain::{BannerKind, TransientBanner};
use tokio::task::JoinHandle;

/// A banner slot in the view. Every `show` bumps the generation so an expiry
/// scheduled for an older message cannot clear a newer one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BannerState {
    current: Option<TransientBanner>,
    generation: u64,
}

impl BannerState {
    pub fn current(&self) -> Option<&TransientBanner> {
        self.current.as_ref()
    }

    pub fn message(&self) -> Option<&str> {
        self.current.as_ref().map(|banner| banner.message.as_str())
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn show(&mut self, message: String, received_at: DateTime<Utc>) -> u64 {
        self.generation += 1;
        self.current = Some(TransientBanner {
            message,
            received_at,
        });
        self.generation
    }

    /// Clears the banner if it is still the one shown at `generation`.
    pub(crate) fn expire(&mut self, generation: u64) -> bool {
        if self.generation != generation || self.current.is_none() {
            return false;
        }
        self.current = None;
        true
    }
}

/// Pending expiry tasks, one slot per banner kind.
#[derive(Default)]
pub(crate) struct BannerTimers {
    disco: Option<JoinHandle<()>>,
    robot_speech: Option<JoinHandle<()>>,
}

impl BannerTimers {
    fn slot(&mut self, kind: BannerKind) -> &mut Option<JoinHandle<()>> {
        match kind {
            BannerKind::Disco => &mut self.disco,
            BannerKind::RobotSpeech => &mut self.robot_speech,
        }
    }

    /// Replaces the pending expiry for `kind`, aborting the previous one.
    pub(crate) fn rearm(&mut self, kind: BannerKind, task: JoinHandle<()>) {
        if let Some(previous) = self.slot(kind).replace(task) {
            previous.abort();
        }
    }

    pub(crate) fn is_armed(&self, kind: BannerKind) -> bool {
        let slot = match kind {
            BannerKind::Disco => &self.disco,
            BannerKind::RobotSpeech => &self.robot_speech,
        };
        slot.as_ref().is_some_and(|task| !task.is_finished())
    }

    pub(crate) fn cancel_all(&mut self) {
        for task in [self.disco.take(), self.robot_speech.take()].into_iter().flatten() {
            task.abort();
        }
    }
}

impl Drop for BannerTimers {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
