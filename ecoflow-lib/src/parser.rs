use crate::error::{EcoflowError, Result};
use crate::page::{decode_page, split_pages};
use crate::state::DecodedState;
use bytes::Bytes;
use futures_lite::future::Boxed;
use std::fmt;
use std::future::Future;
use tokio::runtime::Handle;
use tracing::trace;

pub type BlockingFn = Box<dyn FnMut(DecodedState) + Send>;
pub type SuspendingFn = Box<dyn FnMut(DecodedState) -> Boxed<()> + Send>;

/// Receiver of decoded states.
///
/// The execution mode is fixed when the consumer is created: a blocking
/// consumer runs inside [`StateParser::handle`], a suspending one is spawned
/// onto the runtime that was current at creation and never awaited.
pub enum StateConsumer {
    Blocking(BlockingFn),
    Suspending { callback: SuspendingFn, runtime: Handle },
}

impl StateConsumer {
    pub fn blocking<F>(callback: F) -> Self
    where
        F: FnMut(DecodedState) + Send + 'static,
    {
        StateConsumer::Blocking(Box::new(callback))
    }

    /// Must be called from within a tokio runtime.
    pub fn suspending<F, Fut>(mut callback: F) -> Result<Self>
    where
        F: FnMut(DecodedState) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let runtime = Handle::try_current().map_err(|_| EcoflowError::NoRuntime)?;
        Ok(StateConsumer::Suspending {
            callback: Box::new(move |state| Box::pin(callback(state))),
            runtime,
        })
    }

    pub fn is_suspending(&self) -> bool {
        matches!(self, StateConsumer::Suspending { .. })
    }

    fn deliver(&mut self, state: DecodedState) {
        match self {
            StateConsumer::Blocking(callback) => callback(state),
            StateConsumer::Suspending { callback, runtime } => {
                // Fire and forget: a slow consumer must not hold up the next notification.
                runtime.spawn(callback(state));
            }
        }
    }
}

impl fmt::Debug for StateConsumer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateConsumer::Blocking(_) => f.write_str("StateConsumer::Blocking"),
            StateConsumer::Suspending { .. } => f.write_str("StateConsumer::Suspending"),
        }
    }
}

/// Turns state notifications into [`DecodedState`]s for a consumer.
#[derive(Debug)]
pub struct StateParser {
    consumer: StateConsumer,
}

impl StateParser {
    pub fn new(consumer: StateConsumer) -> Self {
        Self { consumer }
    }

    /// Decode every page of one notification into a single state.
    ///
    /// Pages are merged in arrival order, so a field present in two pages
    /// takes the value of the later one.
    pub fn parse(data: &[u8]) -> DecodedState {
        let data = Bytes::copy_from_slice(data);
        let mut state = DecodedState::new();
        for page in split_pages(&data) {
            state.merge(decode_page(&page));
        }
        state
    }

    /// Handle one notification: decode it, hand the result to the consumer
    /// and return it.
    pub fn handle(&mut self, data: &[u8]) -> DecodedState {
        trace!(len = data.len(), data = %hex::encode(data), "state notification");
        let state = Self::parse(data);
        self.consumer.deliver(state.clone());
        state
    }
}
