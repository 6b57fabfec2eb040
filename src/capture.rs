//! Offline transport that replays captured state notifications.
//!
//! A capture file holds one notification payload per line as hex. Blank lines
//! and lines starting with `#` are skipped; spaces and colons inside a payload
//! are ignored so sniffer output can be pasted as is.

use anyhow::{Context, Result};
use ecoflow_lib::constants::STATE_CHAR_HANDLE;
use ecoflow_lib::{NotifyHandler, Transport};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("capture transport is not connected")]
    NotConnected,
}

pub struct CaptureTransport {
    notifications: Vec<Vec<u8>>,
    handlers: HashMap<u16, NotifyHandler>,
    connected: bool,
}

impl CaptureTransport {
    pub async fn load(path: &Path) -> Result<Self> {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read capture file {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("Invalid capture file {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        let mut notifications = Vec::new();
        for (index, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let payload = decode_hex(line).with_context(|| format!("line {}", index + 1))?;
            notifications.push(payload);
        }
        debug!(count = notifications.len(), "loaded capture");

        Ok(Self {
            notifications,
            handlers: HashMap::new(),
            connected: false,
        })
    }

    pub fn len(&self) -> usize {
        self.notifications.len()
    }

    /// Deliver every captured payload to the state subscriber, in order.
    ///
    /// Returns the number of notifications delivered.
    pub fn play(&mut self) -> usize {
        let Some(handler) = self.handlers.get_mut(&STATE_CHAR_HANDLE) else {
            warn!("Nobody is subscribed to state notifications, nothing to replay");
            return 0;
        };
        for payload in &self.notifications {
            handler(payload.as_slice());
        }
        self.notifications.len()
    }
}

/// Decode a hex payload, ignoring spaces and colons between bytes.
pub fn decode_hex(text: &str) -> Result<Vec<u8>> {
    let cleaned: String = text.chars().filter(|c| !c.is_whitespace() && *c != ':').collect();
    hex::decode(&cleaned).with_context(|| format!("Invalid hex payload {text:?}"))
}

impl Transport for CaptureTransport {
    type Error = CaptureError;

    async fn connect(&mut self) -> Result<(), CaptureError> {
        self.connected = true;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), CaptureError> {
        self.connected = false;
        self.handlers.clear();
        Ok(())
    }

    async fn write_gatt_char(&mut self, handle: u16, data: &[u8]) -> Result<(), CaptureError> {
        if !self.connected {
            return Err(CaptureError::NotConnected);
        }
        info!(handle, data = %hex::encode(data), "write dropped by capture transport");
        Ok(())
    }

    async fn start_notify(&mut self, handle: u16, handler: NotifyHandler) -> Result<(), CaptureError> {
        if !self.connected {
            return Err(CaptureError::NotConnected);
        }
        self.handlers.insert(handle, handler);
        Ok(())
    }

    async fn stop_notify(&mut self, handle: u16) -> Result<(), CaptureError> {
        self.handlers.remove(&handle);
        Ok(())
    }
}
