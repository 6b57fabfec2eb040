use crate::circuit::{OutputCircuit, encode};
use crate::constants::{COMMAND_CHAR_HANDLE, STATE_CHAR_HANDLE};
use crate::error::{EcoflowError, Result};
use crate::parser::{StateConsumer, StateParser};
use tracing::{debug, info};

/// Callback invoked by a transport for every notification on a characteristic.
pub type NotifyHandler = Box<dyn FnMut(&[u8]) + Send + 'static>;

/// GATT client used to talk to the device.
///
/// Connection management, pairing and retries are the transport's business;
/// the codec only needs to write a characteristic and subscribe to one.
#[allow(async_fn_in_trait)]
pub trait Transport {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn connect(&mut self) -> std::result::Result<(), Self::Error>;

    async fn disconnect(&mut self) -> std::result::Result<(), Self::Error>;

    async fn write_gatt_char(&mut self, handle: u16, data: &[u8]) -> std::result::Result<(), Self::Error>;

    async fn start_notify(&mut self, handle: u16, handler: NotifyHandler) -> std::result::Result<(), Self::Error>;

    async fn stop_notify(&mut self, handle: u16) -> std::result::Result<(), Self::Error>;
}

fn transport_err<E: std::error::Error + Send + Sync + 'static>(err: E) -> EcoflowError {
    EcoflowError::Transport(Box::new(err))
}

/// EcoFlow Delta 2 power station.
pub struct Delta2<T: Transport> {
    transport: T,
}

impl<T: Transport> Delta2<T> {
    /// Wrap a transport without touching the connection.
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Connect the transport and return the device.
    ///
    /// Pair with [`Delta2::close`] to get the transport back once done.
    pub async fn open(transport: T) -> Result<Self> {
        let mut device = Self::new(transport);
        device.connect().await?;
        Ok(device)
    }

    /// Disconnect and hand the transport back.
    pub async fn close(mut self) -> Result<T> {
        self.disconnect().await?;
        Ok(self.transport)
    }

    pub async fn connect(&mut self) -> Result<()> {
        self.transport.connect().await.map_err(transport_err)?;
        info!("Connected to Delta 2");
        Ok(())
    }

    pub async fn disconnect(&mut self) -> Result<()> {
        self.transport.disconnect().await.map_err(transport_err)?;
        info!("Disconnected from Delta 2");
        Ok(())
    }

    /// Turn on a power output circuit
    pub async fn turn_on_circuit(&mut self, circuit: OutputCircuit) -> Result<()> {
        self.set_circuit(circuit, true).await
    }

    /// Turn off a power output circuit
    pub async fn turn_off_circuit(&mut self, circuit: OutputCircuit) -> Result<()> {
        self.set_circuit(circuit, false).await
    }

    pub async fn set_circuit(&mut self, circuit: OutputCircuit, on: bool) -> Result<()> {
        let packet = encode(circuit, on);
        debug!(%circuit, on, packet = %hex::encode(&packet), "writing circuit command");
        self.transport
            .write_gatt_char(COMMAND_CHAR_HANDLE, &packet)
            .await
            .map_err(transport_err)
    }

    /// Subscribe to state notifications and deliver decoded states to `consumer`.
    pub async fn start_state_stream(&mut self, consumer: StateConsumer) -> Result<()> {
        let mut parser = StateParser::new(consumer);
        let handler: NotifyHandler = Box::new(move |data: &[u8]| {
            parser.handle(data);
        });
        self.transport
            .start_notify(STATE_CHAR_HANDLE, handler)
            .await
            .map_err(transport_err)?;
        info!("State stream started");
        Ok(())
    }

    /// Unsubscribe from state notifications
    pub async fn stop_state_stream(&mut self) -> Result<()> {
        self.transport
            .stop_notify(STATE_CHAR_HANDLE)
            .await
            .map_err(transport_err)?;
        info!("State stream stopped");
        Ok(())
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_inner(self) -> T {
        self.transport
    }
}
