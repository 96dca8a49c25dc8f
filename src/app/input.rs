//! Button input and press counter
//!
//! The button driver reports `(state, changed)` bitmasks from its own
//! context. Qualifying edges on the configured line bump an atomic counter
//! that the control loop republishes and the characteristic read path serves.

use core::sync::atomic::{AtomicU16, Ordering};

use crate::config::{Config, Edge};

/// Monotonic 16-bit press counter (wraps at `u16::MAX`)
pub struct PressCounter {
    count: AtomicU16,
}

impl PressCounter {
    pub const fn new() -> Self {
        Self {
            count: AtomicU16::new(0),
        }
    }

    pub fn get(&self) -> u16 {
        self.count.load(Ordering::Acquire)
    }

    /// Increment and return the new value
    pub fn increment(&self) -> u16 {
        self.count.fetch_add(1, Ordering::AcqRel).wrapping_add(1)
    }
}

impl Default for PressCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// Edge detector for one button line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PressDetector {
    mask: u32,
    edge: Edge,
}

impl PressDetector {
    pub const fn new(mask: u32, edge: Edge) -> Self {
        Self { mask, edge }
    }

    pub const fn from_config(config: &Config) -> Self {
        Self::new(config.button_mask, config.press_edge)
    }

    /// Whether a `(state, changed)` report contains a qualifying edge
    pub fn is_press(&self, button_state: u32, has_changed: u32) -> bool {
        if has_changed & self.mask == 0 {
            return false;
        }
        let pressed = button_state & self.mask != 0;
        match self.edge {
            Edge::Press => pressed,
            Edge::Release => !pressed,
        }
    }

    /// Button callback body: count qualifying edges, ignore everything else
    pub fn on_buttons(
        &self,
        counter: &PressCounter,
        button_state: u32,
        has_changed: u32,
    ) -> Option<u16> {
        if self.is_press(button_state, has_changed) {
            let count = counter.increment();
            debug!("Button press #{}", count);
            Some(count)
        } else {
            None
        }
    }
}
