#![no_std]
#![no_main]

use defmt::*;
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_nrf::interrupt;
use embassy_time::Timer;
use panic_probe as _;

use nrf52820_s140_peripheral::app::control::ControlLoop;
use nrf52820_s140_peripheral::app::input::PressDetector;
use nrf52820_s140_peripheral::app::AppState;
use nrf52820_s140_peripheral::board::dk::{button_task, DkButtons, DkLeds};
use nrf52820_s140_peripheral::board::softdevice::{
    ble_task, publish_read_value, SoftdeviceAdvertiser, SoftdeviceRadio,
};
use nrf52820_s140_peripheral::config::Config;
use nrf_softdevice::Softdevice;

static STATE: AppState = AppState::new();

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Starting nRF52820 S140 data peripheral");

    let config = Config::DEFAULT;

    // Configure interrupt priorities to avoid SoftDevice reserved levels (0, 1, 4)
    let mut nrf_config = embassy_nrf::config::Config::default();
    nrf_config.gpiote_interrupt_priority = interrupt::Priority::P2;
    nrf_config.time_interrupt_priority = interrupt::Priority::P2;
    let p = embassy_nrf::init(nrf_config);

    let mut buttons = DkButtons::new(p.P0_11, p.P0_12);
    let leds = DkLeds::new(p.P0_13, p.P0_14);
    let mut radio = SoftdeviceRadio::new(&config, &STATE);
    let advertiser = SoftdeviceAdvertiser::new(&config);

    let startup = ControlLoop::startup(&STATE, &config, &mut buttons, leds, &mut radio, advertiser);
    let mut control = match startup {
        Ok(control) => control,
        Err(e) => {
            error!("Startup failed: {}", e);
            defmt::panic!("Startup failed");
        }
    };

    let Some((sd, server)) = radio.take() else {
        defmt::panic!("SoftDevice not enabled after startup");
    };
    let value_handle = server.value_handle();

    // Spawn SoftDevice task (CRITICAL!)
    unwrap!(spawner.spawn(softdevice_task(sd)));
    unwrap!(spawner.spawn(ble_task(sd, server, &STATE)));
    unwrap!(spawner.spawn(button_task(buttons, &STATE, PressDetector::from_config(&config))));

    info!("System initialized, entering main loop");

    loop {
        let report = control.tick();
        if report.published.is_some() {
            publish_read_value(sd, value_handle, &STATE);
        }
        Timer::after(config.tick_period).await;
    }
}

#[embassy_executor::task]
async fn softdevice_task(sd: &'static Softdevice) -> ! {
    sd.run().await
}
