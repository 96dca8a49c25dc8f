//! Compile-time application configuration

use embassy_time::Duration;

/// Bluetooth company identifier advertised in the manufacturer data (Nordic Semiconductor)
pub const VENDOR_ID: u16 = 0x0059;

/// 16-bit short code of the primary data service
pub const DATA_SERVICE_UUID16: u16 = 0xDEAD;

/// 16-bit short code of the data characteristic
pub const DATA_CHAR_UUID16: u16 = 0xBEEF;

/// Button line that drives the press counter (DK button 1)
pub const BUTTON_1_MASK: u32 = 1 << 0;

/// What to do when advertising start fails during startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StartFailurePolicy {
    /// Log the error and keep booting; advertising reports `Deferred`
    Tolerate,
    /// Treat the failure as a fatal startup error
    Abort,
}

/// What to do with advertising once a central disconnects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReconnectPolicy {
    /// The device accepts a single connection per boot
    SingleShot,
    /// Restart advertising on every disconnect
    Readvertise,
}

/// Which button transition counts as a press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Edge {
    /// Line goes from released to pressed
    Press,
    /// Line goes from pressed to released
    Release,
}

/// Application configuration
#[derive(Debug, Clone, Copy)]
pub struct Config {
    /// GAP device name, advertised when `AdvParams::use_name` is set
    pub device_name: &'static str,
    pub vendor_id: u16,
    pub service_uuid16: u16,
    pub char_uuid16: u16,
    /// Advertising interval minimum (0.625ms units)
    pub adv_interval_min: u16,
    /// Advertising interval maximum (0.625ms units)
    pub adv_interval_max: u16,
    /// Control loop period
    pub tick_period: Duration,
    pub button_mask: u32,
    pub press_edge: Edge,
    /// Number of on/off blinks signalled after a disconnect
    pub disconnect_blinks: u8,
    pub start_failure: StartFailurePolicy,
    pub reconnect: ReconnectPolicy,
}

impl Config {
    pub const DEFAULT: Config = Config {
        device_name: "BLE_Lab",
        vendor_id: VENDOR_ID,
        service_uuid16: DATA_SERVICE_UUID16,
        char_uuid16: DATA_CHAR_UUID16,
        adv_interval_min: 160, // 100ms (fast interval 2)
        adv_interval_max: 240, // 150ms
        tick_period: Duration::from_millis(100),
        button_mask: BUTTON_1_MASK,
        press_edge: Edge::Press,
        disconnect_blinks: 3,
        start_failure: StartFailurePolicy::Tolerate,
        reconnect: ReconnectPolicy::SingleShot,
    };
}

impl Default for Config {
    fn default() -> Self {
        Self::DEFAULT
    }
}
