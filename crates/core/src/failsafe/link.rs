//! Link loss detection for RC and the ground-station data link
//!
//! A link is tracked from the timestamp of its most recent message. It is
//! `NeverConnected` until the first message, `Active` while messages keep
//! arriving within the timeout, and `Lost` once the timeout is exceeded.

/// Link connection status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkStatus {
    #[default]
    NeverConnected,
    Active,
    Lost,
}

/// Edge reported by [`LinkMonitor::update`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    None,
    Connected,
    Lost,
    Regained,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LinkMonitor {
    status: LinkStatus,
    last_seen_us: u64,
}

impl LinkMonitor {
    pub const fn new() -> Self {
        Self {
            status: LinkStatus::NeverConnected,
            last_seen_us: 0,
        }
    }

    pub fn status(&self) -> LinkStatus {
        self.status
    }

    pub fn is_lost(&self) -> bool {
        self.status == LinkStatus::Lost
    }

    pub fn found_once(&self) -> bool {
        self.status != LinkStatus::NeverConnected
    }

    pub fn last_seen_us(&self) -> u64 {
        self.last_seen_us
    }

    /// Track the link.
    ///
    /// `last_seen_us` is the timestamp of the newest message (0 if none has
    /// ever arrived). A message older than `timeout_us` counts as lost.
    pub fn update(&mut self, last_seen_us: u64, now_us: u64, timeout_us: u64) -> LinkEvent {
        if last_seen_us > self.last_seen_us {
            self.last_seen_us = last_seen_us;
        }

        let fresh = self.last_seen_us > 0 && now_us.saturating_sub(self.last_seen_us) <= timeout_us;

        match (self.status, fresh) {
            (LinkStatus::NeverConnected, true) => {
                self.status = LinkStatus::Active;
                LinkEvent::Connected
            }
            (LinkStatus::Active, false) => {
                self.status = LinkStatus::Lost;
                LinkEvent::Lost
            }
            (LinkStatus::Lost, true) => {
                self.status = LinkStatus::Active;
                LinkEvent::Regained
            }
            _ => LinkEvent::None,
        }
    }
}
