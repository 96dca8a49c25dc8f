//! Development kit buttons and LEDs
//!
//! Pin assignment follows the nRF52833 DK running in nRF52820 emulation:
//! Button 1/2 on P0.11/P0.12, LED 1/2 on P0.13/P0.14, all active low.

use embassy_futures::select::select;
use embassy_nrf::gpio::{Input, Level, Output, OutputDrive, Pull};
use embassy_nrf::peripherals::{P0_11, P0_12, P0_13, P0_14};
use embassy_nrf::Peri;
use embassy_time::Timer;

use crate::app::input::PressDetector;
use crate::app::peripherals::{Buttons, Led, Leds};
use crate::app::AppState;
use crate::core::error::PeripheralInitError;

/// Contact bounce settle time before sampling the lines
const DEBOUNCE_MS: u64 = 20;

/// Buttons 1 and 2, reported as bits 0 and 1
pub struct DkButtons {
    button1: Input<'static>,
    button2: Input<'static>,
    last_state: u32,
}

impl DkButtons {
    pub fn new(button1: Peri<'static, P0_11>, button2: Peri<'static, P0_12>) -> Self {
        Self {
            button1: Input::new(button1, Pull::Up),
            button2: Input::new(button2, Pull::Up),
            last_state: 0,
        }
    }

    /// Bitmask of currently pressed buttons
    fn state(&self) -> u32 {
        (self.button1.is_low() as u32) | ((self.button2.is_low() as u32) << 1)
    }
}

impl Buttons for DkButtons {
    fn init(&mut self) -> Result<(), PeripheralInitError> {
        // Buttons held during boot do not count as presses
        self.last_state = self.state();
        info!("Buttons initialized (state {:#04x})", self.last_state);
        Ok(())
    }
}

/// Button task: turns GPIOTE edges into `(state, changed)` reports
#[embassy_executor::task]
pub async fn button_task(
    mut buttons: DkButtons,
    state: &'static AppState,
    detector: PressDetector,
) {
    info!("Starting button task...");

    loop {
        select(
            buttons.button1.wait_for_any_edge(),
            buttons.button2.wait_for_any_edge(),
        )
        .await;
        Timer::after_millis(DEBOUNCE_MS).await;

        let now = buttons.state();
        let changed = now ^ buttons.last_state;
        buttons.last_state = now;

        if changed != 0 {
            debug!("Buttons: state {:#04x}, changed {:#04x}", now, changed);
            detector.on_buttons(&state.presses, now, changed);
        }
    }
}

/// LED 1 (status) and LED 2 (data)
pub struct DkLeds {
    status: Output<'static>,
    data: Output<'static>,
}

impl DkLeds {
    pub fn new(led1: Peri<'static, P0_13>, led2: Peri<'static, P0_14>) -> Self {
        Self {
            status: Output::new(led1, Level::High, OutputDrive::Standard),
            data: Output::new(led2, Level::High, OutputDrive::Standard),
        }
    }
}

impl Leds for DkLeds {
    fn init(&mut self) -> Result<(), PeripheralInitError> {
        self.status.set_high();
        self.data.set_high();
        info!("LEDs initialized");
        Ok(())
    }

    fn set(&mut self, led: Led, on: bool) {
        let level = if on { Level::Low } else { Level::High };
        match led {
            Led::Status => self.status.set_level(level),
            Led::Data => self.data.set_level(level),
        }
    }
}
