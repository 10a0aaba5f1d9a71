//! Debounced per-channel alert state
//!
//! An alert turns on as soon as a frame carries a qualifying detection and
//! turns off only after detections have been absent for a full debounce
//! window. Clearing is driven by a monotonic deadline stored in the record,
//! checked whenever the record is observed or read, so there is no timer that
//! could fire after a fresh detection.

use crate::channel::Channel;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Delay before an alert may clear once detections stop.
pub const DEBOUNCE_WINDOW: Duration = Duration::from_secs(3);

/// Observable lifecycle of an alert record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertState {
    Inactive,
    Active,
    ActivePendingClear,
}

/// Flag changes caused by one observation.
///
/// Both can be set when an expired alert is cleared and the same frame
/// raises it again.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlertTransitions {
    pub cleared: bool,
    pub raised: bool,
}

/// Alert flag plus at most one pending-clear deadline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlertRecord {
    active: bool,
    pending_clear: Option<Instant>,
}

impl AlertRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one per-frame observation and return the resulting flag.
    pub fn observe(&mut self, detection_present: bool, now: Instant, window: Duration) -> bool {
        self.settle(now);

        if detection_present {
            self.active = true;
            self.pending_clear = None;
        } else if self.active && self.pending_clear.is_none() {
            self.pending_clear = Some(now.checked_add(window).unwrap_or(now));
        }

        self.active
    }

    /// Like [`AlertRecord::observe`], also reporting how the stored flag changed.
    pub fn observe_transitions(
        &mut self,
        detection_present: bool,
        now: Instant,
        window: Duration,
    ) -> (bool, AlertTransitions) {
        let stored = self.active;
        self.settle(now);
        let settled = self.active;
        let active = self.observe(detection_present, now, window);

        let transitions = AlertTransitions {
            cleared: stored && !settled,
            raised: active && !settled,
        };
        (active, transitions)
    }

    /// Clear the alert if its deadline has been reached.
    pub fn settle(&mut self, now: Instant) {
        if let Some(deadline) = self.pending_clear {
            if now >= deadline {
                self.active = false;
                self.pending_clear = None;
            }
        }
    }

    /// Flag as seen at `now`, without mutating the record.
    pub fn is_active_at(&self, now: Instant) -> bool {
        match self.pending_clear {
            Some(deadline) => self.active && now < deadline,
            None => self.active,
        }
    }

    pub fn state_at(&self, now: Instant) -> AlertState {
        match (self.is_active_at(now), self.pending_clear) {
            (false, _) => AlertState::Inactive,
            (true, None) => AlertState::Active,
            (true, Some(_)) => AlertState::ActivePendingClear,
        }
    }

    pub fn pending_clear(&self) -> Option<Instant> {
        self.pending_clear
    }
}

/// Process-wide owner of every channel's alert record.
///
/// The set of channels is fixed at construction. Writes go through
/// [`AlertBoard::observe`]; the HTTP layer only reads snapshots.
#[derive(Debug)]
pub struct AlertBoard {
    window: Duration,
    records: BTreeMap<Channel, Mutex<AlertRecord>>,
}

impl AlertBoard {
    pub fn new(channels: impl IntoIterator<Item = Channel>, window: Duration) -> Self {
        let records = channels
            .into_iter()
            .map(|channel| (channel, Mutex::new(AlertRecord::new())))
            .collect();
        Self { window, records }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn channels(&self) -> impl Iterator<Item = Channel> + '_ {
        self.records.keys().copied()
    }

    pub fn contains(&self, channel: Channel) -> bool {
        self.records.contains_key(&channel)
    }

    pub fn observe(&self, channel: Channel, detection_present: bool) -> bool {
        self.observe_at(channel, detection_present, Instant::now())
    }

    /// Feed one observation for `channel`. Unknown channels are ignored.
    pub fn observe_at(&self, channel: Channel, detection_present: bool, now: Instant) -> bool {
        let Some(record) = self.records.get(&channel) else {
            debug!("Ignoring observation for unregistered channel {}", channel);
            return false;
        };

        let (active, transitions) = record.lock().observe_transitions(detection_present, now, self.window);

        if transitions.cleared {
            info!("Alert cleared on channel {}", channel);
        }
        if transitions.raised {
            info!("Alert raised on channel {}", channel);
        }

        active
    }

    pub fn is_active(&self, channel: Channel) -> bool {
        self.is_active_at(channel, Instant::now())
    }

    pub fn is_active_at(&self, channel: Channel, now: Instant) -> bool {
        self.records
            .get(&channel)
            .map(|record| record.lock().is_active_at(now))
            .unwrap_or(false)
    }

    pub fn state_at(&self, channel: Channel, now: Instant) -> Option<AlertState> {
        self.records.get(&channel).map(|record| record.lock().state_at(now))
    }

    pub fn snapshot(&self) -> BTreeMap<Channel, bool> {
        self.snapshot_at(Instant::now())
    }

    /// Flag of every registered channel as seen at `now`.
    pub fn snapshot_at(&self, now: Instant) -> BTreeMap<Channel, bool> {
        self.records
            .iter()
            .map(|(channel, record)| (*channel, record.lock().is_active_at(now)))
            .collect()
    }
}

impl Default for AlertBoard {
    fn default() -> Self {
        Self::new(Channel::ALL, DEBOUNCE_WINDOW)
    }
}
