//! Common test utilities and shared imports

// Allow unused imports and dead code since this is a shared module
// used across multiple test files - not all items are used in every test file
#[allow(unused_imports)]
pub use ecoflow_lib::constants::{COMMAND_CHAR_HANDLE, STATE_CHAR_HANDLE};
#[allow(unused_imports)]
pub use ecoflow_lib::{
    DecodedState, Delta2, EcoflowError, NotifyHandler, OutputCircuit, RemainingTime, StateConsumer, StateField,
    StateParser, StateValue, Transport,
};
use std::collections::HashMap;
use std::fmt;

/// Build a zeroed page of `len` bytes with the magic marker and type code set
#[allow(dead_code)]
pub fn page(code: u8, len: usize) -> Vec<u8> {
    let mut page = vec![0u8; len];
    page[..3].copy_from_slice(&[0xaa, 0x02, code]);
    page
}

#[allow(dead_code)]
pub fn status_page(charge_level: u8, outputs_on: bool, ac_input_w: u16) -> Vec<u8> {
    let mut p = page(0x85, 153);
    p[30] = charge_level;
    p[40] = outputs_on as u8;
    p[49] = outputs_on as u8;
    p[136] = outputs_on as u8;
    p[33..35].copy_from_slice(&ac_input_w.to_le_bytes());
    p
}

#[allow(dead_code)]
pub fn charge_rate_page(charge_speed_w: u16) -> Vec<u8> {
    let mut p = page(0x5e, 153);
    p[89..91].copy_from_slice(&charge_speed_w.to_le_bytes());
    p
}

#[allow(dead_code)]
pub fn settings_page(th_min: u8, th_max: u8, remaining_min: u16) -> Vec<u8> {
    let mut p = page(0x2e, 153);
    p[59] = th_min;
    p[28] = th_max;
    p[33..35].copy_from_slice(&remaining_min.to_le_bytes());
    p
}

#[derive(Debug)]
pub struct FakeError(pub &'static str);

impl fmt::Display for FakeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fake transport: {}", self.0)
    }
}

impl std::error::Error for FakeError {}

/// In-memory transport that records writes and lets tests push notifications
#[derive(Default)]
pub struct FakeTransport {
    pub connected: bool,
    pub writes: Vec<(u16, Vec<u8>)>,
    pub stopped: Vec<u16>,
    pub fail_writes: bool,
    handlers: HashMap<u16, NotifyHandler>,
}

#[allow(dead_code)]
impl FakeTransport {
    /// A transport that rejects every write
    pub fn failing() -> Self {
        Self {
            fail_writes: true,
            ..Default::default()
        }
    }

    /// Simulate a notification on `handle`; returns false if nobody is subscribed
    pub fn send(&mut self, handle: u16, data: &[u8]) -> bool {
        match self.handlers.get_mut(&handle) {
            Some(handler) => {
                handler(data);
                true
            }
            None => false,
        }
    }

    pub fn is_subscribed(&self, handle: u16) -> bool {
        self.handlers.contains_key(&handle)
    }

    pub fn last_write(&self) -> Option<&(u16, Vec<u8>)> {
        self.writes.last()
    }
}

impl Transport for FakeTransport {
    type Error = FakeError;

    async fn connect(&mut self) -> Result<(), FakeError> {
        self.connected = true;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), FakeError> {
        self.connected = false;
        Ok(())
    }

    async fn write_gatt_char(&mut self, handle: u16, data: &[u8]) -> Result<(), FakeError> {
        if self.fail_writes {
            return Err(FakeError("write rejected"));
        }
        self.writes.push((handle, data.to_vec()));
        Ok(())
    }

    async fn start_notify(&mut self, handle: u16, handler: NotifyHandler) -> Result<(), FakeError> {
        self.handlers.insert(handle, handler);
        Ok(())
    }

    async fn stop_notify(&mut self, handle: u16) -> Result<(), FakeError> {
        self.handlers.remove(&handle);
        self.stopped.push(handle);
        Ok(())
    }
}
