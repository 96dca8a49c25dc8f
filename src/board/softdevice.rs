//! nrf-softdevice bindings
//!
//! - `SoftdeviceRadio`: enables the S140 and registers the data service
//! - `SoftdeviceAdvertiser`: advertising set over `advertise_connectable`
//! - `DataServer`: GATT server forwarding writes to the shared channel
//! - `ble_task`: advertising / connection lifecycle, drives the tracker

use core::cell::RefCell;

use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::signal::Signal;
use heapless::Vec;
use nrf_softdevice::ble::gatt_server::builder::ServiceBuilder;
use nrf_softdevice::ble::gatt_server::characteristic::{Attribute, Metadata, Properties};
use nrf_softdevice::ble::gatt_server::{self, RegisterError, WriteOp};
use nrf_softdevice::ble::peripheral::{self, AdvertiseError, ConnectableAdvertisement};
use nrf_softdevice::ble::{Connection, Uuid};
use nrf_softdevice::{raw, Config as SdConfig, Softdevice};

use crate::app::AppState;
use crate::ble::advertising::{complete_name_ad, MAX_ADV_DATA_LEN};
use crate::ble::connection::{HCI_ADVERTISING_TIMEOUT, HCI_REMOTE_USER_TERMINATED};
use crate::ble::gatt::{char_properties, write_flags, ServiceDescriptor, READ_VALUE_LEN};
use crate::ble::stack::{AdvParams, AdvertisingStack, Radio};
use crate::config::Config;
use crate::core::error::{StackError, StackOp};

/// ATT MTU negotiated with the central
const ATT_MTU: u16 = 247;

/// Largest value a single write can carry (ATT MTU minus opcode and handle)
const MAX_WRITE_LEN: u16 = ATT_MTU - 3;

/// HCI status: Unspecified Error
const HCI_UNSPECIFIED_ERROR: u8 = 0x1F;

/// Only one advertising set is configured (`adv_set_count: 1`)
const ADV_SET_HANDLE: u8 = 0;

/// SoftDevice configuration: one peripheral link, one advertising set
pub fn softdevice_config() -> SdConfig {
    SdConfig {
        clock: Some(raw::nrf_clock_lf_cfg_t {
            source: raw::NRF_CLOCK_LF_SRC_RC as u8,
            rc_ctiv: 16,
            rc_temp_ctiv: 2,
            accuracy: raw::NRF_CLOCK_LF_ACCURACY_500_PPM as u8,
        }),
        conn_gap: Some(raw::ble_gap_conn_cfg_t {
            conn_count: 1,
            event_length: 24,
        }),
        conn_gatt: Some(raw::ble_gatt_conn_cfg_t { att_mtu: ATT_MTU }),
        gatts_attr_tab_size: Some(raw::ble_gatts_cfg_attr_tab_size_t {
            attr_tab_size: 1408,
        }),
        gap_role_count: Some(raw::ble_gap_cfg_role_count_t {
            adv_set_count: 1,
            periph_role_count: 1,
            central_role_count: 0,
            central_sec_count: 0,
            _bitfield_1: Default::default(),
        }),
        // Service and characteristic bases
        common_vs_uuid: Some(raw::ble_common_cfg_vs_uuid_t { vs_uuid_count: 2 }),
        ..Default::default()
    }
}

/// Radio bring-up: SoftDevice enable followed by GATT service registration
pub struct SoftdeviceRadio {
    descriptor: ServiceDescriptor,
    state: &'static AppState,
    enabled: Option<(&'static Softdevice, DataServer)>,
}

impl SoftdeviceRadio {
    pub fn new(config: &Config, state: &'static AppState) -> Self {
        Self {
            descriptor: ServiceDescriptor::new(config),
            state,
            enabled: None,
        }
    }

    /// Hand out the enabled SoftDevice and GATT server for task spawning
    pub fn take(&mut self) -> Option<(&'static Softdevice, DataServer)> {
        self.enabled.take()
    }
}

impl Radio for SoftdeviceRadio {
    fn enable(&mut self) -> Result<(), StackError> {
        if self.enabled.is_some() {
            return Ok(());
        }

        let sd = Softdevice::enable(&softdevice_config());
        info!("SoftDevice enabled successfully!");

        let server = DataServer::new(sd, &self.descriptor, self.state).map_err(|e| {
            error!("Failed to register data service: {:?}", defmt::Debug2Format(&e));
            StackError::new(StackOp::Enable, raw::NRF_ERROR_INTERNAL)
        })?;

        let sd: &'static Softdevice = sd;
        self.enabled = Some((sd, server));
        Ok(())
    }
}

/// GATT server events
#[derive(Debug, defmt::Format)]
pub enum DataEvent {
    /// The data characteristic was written
    Written { accepted: bool },
}

/// GATT server hosting the data service
pub struct DataServer {
    value_handle: u16,
    state: &'static AppState,
}

impl DataServer {
    pub fn new(
        sd: &mut Softdevice,
        descriptor: &ServiceDescriptor,
        state: &'static AppState,
    ) -> Result<Self, RegisterError> {
        let mut sb = ServiceBuilder::new(sd, Uuid::new_128(descriptor.service_uuid.as_le_bytes()))?;

        let initial = state.characteristic().read_value();
        let attr = Attribute::new(&initial[..]).variable_len(MAX_WRITE_LEN);
        let metadata = Metadata::new(properties(descriptor.properties));
        let handles = sb
            .add_characteristic(Uuid::new_128(descriptor.char_uuid.as_le_bytes()), attr, metadata)?
            .build();
        let service = sb.build();

        info!(
            "Data service registered: service handle {}, value handle {}",
            service.handle(),
            handles.value_handle
        );

        Ok(Self {
            value_handle: handles.value_handle,
            state,
        })
    }

    pub fn value_handle(&self) -> u16 {
        self.value_handle
    }
}

impl gatt_server::Server for DataServer {
    type Event = DataEvent;

    fn on_write(
        &self,
        _conn: &Connection,
        handle: u16,
        op: WriteOp,
        offset: usize,
        data: &[u8],
    ) -> Option<Self::Event> {
        if handle != self.value_handle {
            debug!("Write to unknown handle {}", handle);
            return None;
        }

        let flags = if matches!(op, WriteOp::Command) { write_flags::CMD } else { 0 };
        let result = self.state.characteristic().on_write(data, offset, flags);
        // The SoftDevice has already acknowledged the write; a rejection is
        // only logged and the bytes are dropped
        if let Err(e) = result {
            warn!("Write rejected: {} (ATT error {:#04x})", e, e.att_code());
        }

        Some(DataEvent::Written {
            accepted: result.is_ok(),
        })
    }
}

fn properties(bits: u8) -> Properties {
    let mut props = Properties::new();
    if bits & char_properties::READ != 0 {
        props = props.read();
    }
    if bits & char_properties::WRITE != 0 {
        props = props.write();
    }
    if bits & char_properties::WRITE_WITHOUT_RESPONSE != 0 {
        props = props.write_without_response();
    }
    props
}

/// Mirror the characteristic read value into the SoftDevice attribute table.
///
/// The SoftDevice serves reads (including long-read offsets) from the table,
/// and stores written bytes there too, so this runs after every write and
/// whenever the counter changes.
pub fn publish_read_value(sd: &Softdevice, value_handle: u16, state: &AppState) {
    let mut value = [0u8; READ_VALUE_LEN];
    match state.characteristic().on_read(&mut value, 0) {
        Ok(n) => {
            if let Err(e) = gatt_server::set_value(sd, value_handle, &value[..n]) {
                warn!("Failed to update read value: {:?}", defmt::Debug2Format(&e));
            }
        }
        Err(e) => warn!("Failed to read characteristic value: {}", e),
    }
}

type AdvData = Vec<u8, MAX_ADV_DATA_LEN>;

struct AdvSet {
    params: Option<AdvParams>,
    name: &'static str,
    data: AdvData,
}

impl AdvSet {
    const fn new() -> Self {
        Self {
            params: None,
            name: "",
            data: Vec::new(),
        }
    }

    /// Parameters, advertising data and scan response for one advertising run
    fn snapshot(&self) -> Option<(AdvParams, AdvData, AdvData)> {
        let params = self.params?;
        let scan_data = if params.use_name {
            complete_name_ad(self.name)
        } else {
            Vec::new()
        };
        Some((params, self.data.clone(), scan_data))
    }
}

/// Advertising set shared between the control loop and `ble_task`
static ADV_SET: Mutex<CriticalSectionRawMutex, RefCell<AdvSet>> =
    Mutex::new(RefCell::new(AdvSet::new()));

/// Start requests for `ble_task`
static ADV_START: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// Advertising data replaced while advertising
static ADV_DATA_CHANGED: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// Advertising set backed by `peripheral::advertise_connectable`
pub struct SoftdeviceAdvertiser {
    name: &'static str,
}

impl SoftdeviceAdvertiser {
    pub fn new(config: &Config) -> Self {
        Self {
            name: config.device_name,
        }
    }

    fn check_handle(handle: u8, op: StackOp) -> Result<(), StackError> {
        if handle != ADV_SET_HANDLE {
            return Err(StackError::new(op, raw::NRF_ERROR_INVALID_PARAM));
        }
        let created = ADV_SET.lock(|set| set.borrow().params.is_some());
        if !created {
            return Err(StackError::new(op, raw::NRF_ERROR_INVALID_STATE));
        }
        Ok(())
    }
}

impl AdvertisingStack for SoftdeviceAdvertiser {
    type Handle = u8;

    fn create(&mut self, params: &AdvParams) -> Result<u8, StackError> {
        if !params.connectable {
            return Err(StackError::new(StackOp::CreateSet, raw::NRF_ERROR_NOT_SUPPORTED));
        }

        ADV_SET.lock(|set| {
            let mut set = set.borrow_mut();
            if set.params.is_some() {
                return Err(StackError::new(StackOp::CreateSet, raw::NRF_ERROR_NO_MEM));
            }
            set.params = Some(*params);
            set.name = self.name;
            Ok(ADV_SET_HANDLE)
        })
    }

    fn set_data(&mut self, handle: u8, data: &[u8]) -> Result<(), StackError> {
        Self::check_handle(handle, StackOp::SetData)?;

        ADV_SET.lock(|set| {
            let mut set = set.borrow_mut();
            set.data.clear();
            set.data
                .extend_from_slice(data)
                .map_err(|_| StackError::new(StackOp::SetData, raw::NRF_ERROR_INVALID_LENGTH))
        })?;

        ADV_DATA_CHANGED.signal(());
        Ok(())
    }

    fn start(&mut self, handle: u8) -> Result<(), StackError> {
        Self::check_handle(handle, StackOp::Start)?;
        ADV_START.signal(());
        Ok(())
    }
}

fn advertise_error_code(err: &AdvertiseError) -> u8 {
    match err {
        AdvertiseError::Timeout => HCI_ADVERTISING_TIMEOUT,
        _ => HCI_UNSPECIFIED_ERROR,
    }
}

/// BLE task: advertises on request, runs the GATT server while connected and
/// reports the link lifecycle to the connection tracker
#[embassy_executor::task]
pub async fn ble_task(sd: &'static Softdevice, server: DataServer, state: &'static AppState) {
    info!("Starting BLE task...");

    loop {
        ADV_START.wait().await;

        let conn = loop {
            ADV_DATA_CHANGED.reset();
            let snapshot = ADV_SET.lock(|set| set.borrow().snapshot());
            let Some((params, adv_data, scan_data)) = snapshot else {
                break None;
            };

            let config = peripheral::Config {
                interval: u32::from(params.interval_min),
                ..Default::default()
            };
            let adv = ConnectableAdvertisement::ScannableUndirected {
                adv_data: &adv_data,
                scan_data: &scan_data,
            };

            debug!("Starting advertising...");
            let advertise = peripheral::advertise_connectable(sd, adv, &config);
            match select(advertise, ADV_DATA_CHANGED.wait()).await {
                Either::First(Ok(conn)) => break Some(conn),
                Either::First(Err(e)) => {
                    error!("BLE advertising failed: {:?}", defmt::Debug2Format(&e));
                    state.connection.on_connected(advertise_error_code(&e));
                    break None;
                }
                Either::Second(()) => debug!("Advertising data changed, restarting advertising"),
            }
        };

        let Some(conn) = conn else {
            continue;
        };

        state.connection.on_connected(0);
        publish_read_value(sd, server.value_handle(), state);

        // Returns when the connection gets disconnected
        let e = gatt_server::run(&conn, &server, |event| match event {
            DataEvent::Written { .. } => publish_read_value(sd, server.value_handle(), state),
        })
        .await;
        debug!("gatt_server run exited: {:?}", defmt::Debug2Format(&e));

        state.connection.on_disconnected(HCI_REMOTE_USER_TERMINATED);
    }
}
