//! Control Loop
//!
//! One-time startup sequencing followed by a low-rate tick that drains the
//! byte channel, reacts to connection transitions exactly once, steps the
//! LED feedback and republishes the press counter.

use embassy_sync::blocking_mutex::raw::RawMutex;

use crate::app::peripherals::{Buttons, Led, Leds};
use crate::app::SharedState;
use crate::ble::advertising::{AdvertisingManager, AdvertisingStatus};
use crate::ble::connection::Snapshot;
use crate::ble::stack::{AdvertisingStack, Radio};
use crate::config::{Config, ReconnectPolicy};
use crate::core::error::{Error, StackError};

/// Status LED feedback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Feedback {
    Idle,
    /// Disconnect flash sequence; one LED toggle per tick
    Flashing { remaining: u8 },
}

/// What a single tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TickReport {
    /// Bytes drained from the channel
    pub drained: usize,
    /// A connect was observed since the previous tick
    pub connected: bool,
    /// A disconnect was observed since the previous tick
    pub disconnected: bool,
    /// Counter value published to the advertising data this tick
    pub published: Option<u16>,
}

/// Application control loop
pub struct ControlLoop<'a, M: RawMutex, const N: usize, S: AdvertisingStack, L: Leds> {
    shared: &'a SharedState<M, N>,
    advertising: AdvertisingManager<S>,
    leds: L,
    reconnect: ReconnectPolicy,
    disconnect_blinks: u8,
    status: AdvertisingStatus,
    last_seen: Snapshot,
    published: u16,
    feedback: Feedback,
    status_led: bool,
}

impl<'a, M: RawMutex, const N: usize, S: AdvertisingStack, L: Leds> ControlLoop<'a, M, N, S, L> {
    /// Bring up buttons, LEDs, radio and advertising, in that order.
    ///
    /// Any failure aborts startup.
    pub fn startup<B: Buttons, R: Radio>(
        shared: &'a SharedState<M, N>,
        config: &Config,
        buttons: &mut B,
        mut leds: L,
        radio: &mut R,
        stack: S,
    ) -> Result<Self, Error> {
        buttons.init().map_err(|e| {
            error!("Failed to initialize buttons: {}", e);
            e
        })?;

        leds.init().map_err(|e| {
            error!("Failed to initialize LEDs: {}", e);
            e
        })?;

        radio.enable().map_err(|e| {
            error!("Bluetooth init failed: {}", e);
            e
        })?;
        info!("Bluetooth initialized");

        let mut advertising = AdvertisingManager::new(stack, config);
        let published = shared.presses.get();
        advertising.set_counter(published);
        let status = advertising.initialize()?;

        Ok(Self {
            shared,
            advertising,
            leds,
            reconnect: config.reconnect,
            disconnect_blinks: config.disconnect_blinks,
            status,
            last_seen: Snapshot::INITIAL,
            published,
            feedback: Feedback::Idle,
            status_led: false,
        })
    }

    /// One loop iteration. Never fails; errors are logged and skipped.
    pub fn tick(&mut self) -> TickReport {
        let mut report = TickReport {
            drained: self.drain_channel(),
            ..Default::default()
        };

        let (connected, disconnected) = self.observe_connection();
        report.connected = connected;
        report.disconnected = disconnected;

        self.step_feedback();
        report.published = self.publish_counter();
        report
    }

    fn drain_channel(&mut self) -> usize {
        let leds = &mut self.leds;
        self.shared.channel.drain(|byte| {
            trace!("Data byte {:#04x}", byte);
            leds.show_byte(byte);
        })
    }

    /// React to transitions since the last tick, once each
    fn observe_connection(&mut self) -> (bool, bool) {
        let now = self.shared.connection.snapshot();
        let delta = now.transitions_since(self.last_seen);
        if delta == 0 {
            return (false, false);
        }

        let disconnected = delta >= 2 || self.last_seen.is_connected();
        let connected = now.is_connected();
        self.last_seen = now;

        if disconnected {
            self.on_disconnect();
        }
        if connected {
            self.on_connect();
        }
        (connected, disconnected)
    }

    fn on_connect(&mut self) {
        debug!("Control loop observed connect");
        self.feedback = Feedback::Idle;
        self.set_status_led(true);
    }

    fn on_disconnect(&mut self) {
        let reason = self.shared.connection.last_disconnect_reason();
        debug!("Control loop observed disconnect (reason {:#04x})", reason);

        self.set_status_led(false);
        self.feedback = match self.disconnect_blinks {
            0 => Feedback::Idle,
            n => Feedback::Flashing {
                remaining: n.saturating_mul(2),
            },
        };

        match self.reconnect {
            ReconnectPolicy::Readvertise => match self.advertising.restart() {
                Ok(()) => {
                    info!("Advertising restarted");
                    self.status = AdvertisingStatus::Advertising;
                }
                Err(e) => warn!("Failed to restart advertising: {}", e),
            },
            ReconnectPolicy::SingleShot => {
                info!("Single connection per boot, not advertising again")
            }
        }
    }

    fn step_feedback(&mut self) {
        if let Feedback::Flashing { remaining } = self.feedback {
            let on = !self.status_led;
            self.set_status_led(on);
            self.feedback = match remaining - 1 {
                0 => Feedback::Idle,
                left => Feedback::Flashing { remaining: left },
            };
            if self.feedback == Feedback::Idle && self.status_led {
                self.set_status_led(false);
            }
        }
    }

    /// Push a changed counter into the advertising data; retried next tick on failure
    fn publish_counter(&mut self) -> Option<u16> {
        let count = self.shared.presses.get();
        if count == self.published {
            return None;
        }

        self.advertising.set_counter(count);
        match self.advertising.refresh() {
            Ok(()) => {
                debug!("Advertising data updated, count {}", count);
                self.published = count;
                Some(count)
            }
            Err(e) => {
                warn!("Failed to update advertising data: {}", e);
                None
            }
        }
    }

    fn set_status_led(&mut self, on: bool) {
        self.status_led = on;
        self.leds.set(Led::Status, on);
    }

    /// Re-arm advertising on demand, independent of the reconnect policy
    pub fn readvertise(&mut self) -> Result<(), StackError> {
        self.advertising.restart()?;
        self.status = AdvertisingStatus::Advertising;
        Ok(())
    }

    pub fn advertising_status(&self) -> AdvertisingStatus {
        self.status
    }

    pub fn advertising(&self) -> &AdvertisingManager<S> {
        &self.advertising
    }

    pub fn leds(&self) -> &L {
        &self.leds
    }

    pub fn feedback(&self) -> Feedback {
        self.feedback
    }

    /// Counter value currently carried by the advertising data
    pub fn published_count(&self) -> u16 {
        self.published
    }
}
