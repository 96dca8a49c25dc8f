//! Common test utilities
//!
//! Host-side stand-ins for the board collaborators:
//! - `MockStack`: advertising set operations, recorded in order
//! - `MockRadio`, `MockButtons`: init outcomes and call order
//! - `MockLeds`: every LED request and every byte shown
//!
//! `critical-section` (feature `std`) provides the critical section
//! implementation behind `CriticalSectionRawMutex`.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::vec::Vec;

use nrf52820_s140_peripheral::app::peripherals::{Buttons, Led, Leds};
use nrf52820_s140_peripheral::ble::stack::{AdvParams, AdvertisingStack, Radio};
use nrf52820_s140_peripheral::core::error::{Device, PeripheralInitError, StackError, StackOp};

/// Startup step, in call order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Buttons,
    Leds,
    Radio,
    Create,
    SetData,
    Start,
}

/// Shared call log for checking startup ordering across mocks
pub type StepLog = Rc<RefCell<Vec<Step>>>;

pub fn step_log() -> StepLog {
    Rc::new(RefCell::new(Vec::new()))
}

/// Recorded advertising stack call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackCall {
    Create(AdvParams),
    SetData(u8, Vec<u8>),
    Start(u8),
}

#[derive(Default)]
pub struct MockStack {
    pub calls: Vec<StackCall>,
    pub fail_create: Option<u32>,
    pub fail_set_data: Option<u32>,
    pub fail_start: Option<u32>,
    /// `set_data` failure that can be toggled after the stack is handed over
    pub set_data_switch: Option<Rc<Cell<Option<u32>>>>,
    pub log: Option<StepLog>,
}

impl MockStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_log(log: &StepLog) -> Self {
        Self {
            log: Some(log.clone()),
            ..Self::default()
        }
    }

    /// Payloads passed to `set_data`, oldest first
    pub fn payloads(&self) -> Vec<Vec<u8>> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                StackCall::SetData(_, data) => Some(data.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn start_count(&self) -> usize {
        self.calls.iter().filter(|call| matches!(call, StackCall::Start(_))).count()
    }

    fn record(&self, step: Step) {
        if let Some(log) = &self.log {
            log.borrow_mut().push(step);
        }
    }
}

impl AdvertisingStack for MockStack {
    type Handle = u8;

    fn create(&mut self, params: &AdvParams) -> Result<u8, StackError> {
        self.record(Step::Create);
        if let Some(code) = self.fail_create {
            return Err(StackError::new(StackOp::CreateSet, code));
        }
        self.calls.push(StackCall::Create(*params));
        Ok(0)
    }

    fn set_data(&mut self, handle: u8, data: &[u8]) -> Result<(), StackError> {
        self.record(Step::SetData);
        let switched = self.set_data_switch.as_ref().and_then(|switch| switch.get());
        if let Some(code) = self.fail_set_data.or(switched) {
            return Err(StackError::new(StackOp::SetData, code));
        }
        self.calls.push(StackCall::SetData(handle, data.to_vec()));
        Ok(())
    }

    fn start(&mut self, handle: u8) -> Result<(), StackError> {
        self.record(Step::Start);
        if let Some(code) = self.fail_start {
            return Err(StackError::new(StackOp::Start, code));
        }
        self.calls.push(StackCall::Start(handle));
        Ok(())
    }
}

#[derive(Default)]
pub struct MockRadio {
    pub enabled: bool,
    pub fail: Option<u32>,
    pub log: Option<StepLog>,
}

impl MockRadio {
    pub fn with_log(log: &StepLog) -> Self {
        Self {
            log: Some(log.clone()),
            ..Self::default()
        }
    }
}

impl Radio for MockRadio {
    fn enable(&mut self) -> Result<(), StackError> {
        if let Some(log) = &self.log {
            log.borrow_mut().push(Step::Radio);
        }
        if let Some(code) = self.fail {
            return Err(StackError::new(StackOp::Enable, code));
        }
        self.enabled = true;
        Ok(())
    }
}

#[derive(Default)]
pub struct MockButtons {
    pub fail: Option<u32>,
    pub log: Option<StepLog>,
}

impl MockButtons {
    pub fn with_log(log: &StepLog) -> Self {
        Self {
            log: Some(log.clone()),
            ..Self::default()
        }
    }
}

impl Buttons for MockButtons {
    fn init(&mut self) -> Result<(), PeripheralInitError> {
        if let Some(log) = &self.log {
            log.borrow_mut().push(Step::Buttons);
        }
        match self.fail {
            Some(code) => Err(PeripheralInitError::new(Device::Buttons, code)),
            None => Ok(()),
        }
    }
}

#[derive(Default)]
pub struct MockLeds {
    pub sets: Vec<(Led, bool)>,
    /// Bytes handed over by the control loop, in drain order
    pub bytes: Vec<u8>,
    pub fail: Option<u32>,
    pub log: Option<StepLog>,
}

impl MockLeds {
    pub fn with_log(log: &StepLog) -> Self {
        Self {
            log: Some(log.clone()),
            ..Self::default()
        }
    }

    /// Requests made for one LED, oldest first
    pub fn history(&self, led: Led) -> Vec<bool> {
        self.sets.iter().filter(|(l, _)| *l == led).map(|(_, on)| *on).collect()
    }

    pub fn last(&self, led: Led) -> Option<bool> {
        self.history(led).last().copied()
    }
}

impl Leds for MockLeds {
    fn init(&mut self) -> Result<(), PeripheralInitError> {
        if let Some(log) = &self.log {
            log.borrow_mut().push(Step::Leds);
        }
        match self.fail {
            Some(code) => Err(PeripheralInitError::new(Device::Leds, code)),
            None => Ok(()),
        }
    }

    fn set(&mut self, led: Led, on: bool) {
        self.sets.push((led, on));
    }

    fn show_byte(&mut self, byte: u8) {
        self.bytes.push(byte);
        self.set(Led::Data, byte != 0);
    }
}
