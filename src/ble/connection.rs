//! Connection State Tracker
//!
//! Single-connection lifecycle state. Written only from connection callbacks
//! (SoftDevice context), read by the control loop.
//!
//! The state lives in one atomic word that is incremented on every
//! transition: bit 0 is the connected flag and the whole word doubles as a
//! transition count, so a reader that polls slower than the link cycles can
//! still tell that a disconnect happened in between.

use core::sync::atomic::{AtomicU32, AtomicU8, Ordering};

/// HCI status: Remote User Terminated Connection
pub const HCI_REMOTE_USER_TERMINATED: u8 = 0x13;

/// HCI status: Advertising Timeout
pub const HCI_ADVERTISING_TIMEOUT: u8 = 0x3C;

const CONNECTED_BIT: u32 = 0x1;

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConnectionState {
    Disconnected,
    Connected,
}

/// A state change reported by a callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Transition {
    Connected,
    Disconnected { reason: u8 },
}

/// Point-in-time view of the tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Snapshot(u32);

impl Snapshot {
    /// Initial snapshot: disconnected, no transitions yet
    pub const INITIAL: Snapshot = Snapshot(0);

    pub fn is_connected(&self) -> bool {
        self.0 & CONNECTED_BIT != 0
    }

    pub fn state(&self) -> ConnectionState {
        if self.is_connected() {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        }
    }

    /// Number of transitions between `earlier` and `self`
    pub fn transitions_since(&self, earlier: Snapshot) -> u32 {
        self.0.wrapping_sub(earlier.0)
    }
}

/// Connection state tracker
pub struct ConnectionTracker {
    word: AtomicU32,
    last_reason: AtomicU8,
}

impl ConnectionTracker {
    /// Starts out disconnected
    pub const fn new() -> Self {
        Self {
            word: AtomicU32::new(0),
            last_reason: AtomicU8::new(0),
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot(self.word.load(Ordering::Acquire))
    }

    pub fn state(&self) -> ConnectionState {
        self.snapshot().state()
    }

    pub fn is_connected(&self) -> bool {
        self.snapshot().is_connected()
    }

    /// Reason code of the most recent disconnect
    pub fn last_disconnect_reason(&self) -> u8 {
        self.last_reason.load(Ordering::Acquire)
    }

    /// Connect callback. `err == 0` means the link is up.
    ///
    /// Returns the transition if the state changed; a failed connect leaves
    /// the state untouched.
    pub fn on_connected(&self, err: u8) -> Option<Transition> {
        if err != 0 {
            warn!("Connection failed (err {:#04x})", err);
            return None;
        }

        if self.advance_if(false) {
            info!("Connected");
            Some(Transition::Connected)
        } else {
            debug!("Connect callback while already connected");
            None
        }
    }

    /// Disconnect callback, any reason
    pub fn on_disconnected(&self, reason: u8) -> Option<Transition> {
        self.last_reason.store(reason, Ordering::Release);
        if self.advance_if(true) {
            info!("Disconnected (reason {:#04x})", reason);
            Some(Transition::Disconnected { reason })
        } else {
            debug!("Disconnect callback while not connected (reason {:#04x})", reason);
            None
        }
    }

    /// Flip the connected bit (by incrementing the word) if it currently equals `connected`
    fn advance_if(&self, connected: bool) -> bool {
        self.word
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |word| {
                ((word & CONNECTED_BIT != 0) == connected).then(|| word.wrapping_add(1))
            })
            .is_ok()
    }
}

impl Default for ConnectionTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let tracker = ConnectionTracker::new();
        assert_eq!(tracker.state(), ConnectionState::Disconnected);
        assert!(!tracker.is_connected());
        assert_eq!(tracker.snapshot(), Snapshot::INITIAL);
    }

    #[test]
    fn test_connect_disconnect_cycle() {
        let tracker = ConnectionTracker::new();

        assert_eq!(tracker.on_connected(0), Some(Transition::Connected));
        assert_eq!(tracker.state(), ConnectionState::Connected);

        assert_eq!(
            tracker.on_disconnected(HCI_REMOTE_USER_TERMINATED),
            Some(Transition::Disconnected { reason: 0x13 })
        );
        assert_eq!(tracker.state(), ConnectionState::Disconnected);
        assert_eq!(tracker.last_disconnect_reason(), 0x13);

        // No terminal state
        assert_eq!(tracker.on_connected(0), Some(Transition::Connected));
    }

    #[test]
    fn test_failed_connect_stays_disconnected() {
        let tracker = ConnectionTracker::new();
        assert_eq!(tracker.on_connected(HCI_ADVERTISING_TIMEOUT), None);
        assert_eq!(tracker.state(), ConnectionState::Disconnected);
        assert_eq!(tracker.snapshot(), Snapshot::INITIAL);
    }

    #[test]
    fn test_duplicate_callbacks_report_once() {
        let tracker = ConnectionTracker::new();
        assert!(tracker.on_connected(0).is_some());
        assert!(tracker.on_connected(0).is_none());
        assert!(tracker.on_disconnected(0x08).is_some());
        assert!(tracker.on_disconnected(0x08).is_none());
        assert_eq!(tracker.snapshot().transitions_since(Snapshot::INITIAL), 2);
    }

    #[test]
    fn test_snapshot_counts_missed_cycles() {
        let tracker = ConnectionTracker::new();
        let before = tracker.snapshot();

        tracker.on_connected(0);
        tracker.on_disconnected(HCI_REMOTE_USER_TERMINATED);

        let after = tracker.snapshot();
        assert_eq!(after.state(), before.state());
        assert_eq!(after.transitions_since(before), 2);
    }
}
