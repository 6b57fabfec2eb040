pub mod circuit;
pub mod constants;
pub mod device;
pub mod error;
pub mod page;
pub mod parser;
pub mod state;


// Re-export the main types for easy access
pub use circuit::{OutputCircuit, encode};
pub use device::{Delta2, NotifyHandler, Transport};
pub use error::EcoflowError;
pub use page::{PageType, decode_page, split_pages};
pub use parser::{StateConsumer, StateParser};
pub use state::{DecodedState, RemainingTime, StateField, StateValue};
