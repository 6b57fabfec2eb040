use crate::circuit::OutputCircuit;
use num_enum::TryFromPrimitiveError;
use thiserror::Error;

/// The primary error type for the `ecoflow-lib` library.
#[derive(Error, Debug)]
pub enum EcoflowError {
    #[error("Invalid output circuit: {0}")]
    InvalidCircuit(String),

    #[error("Page {page_type:#04x} too short: expected at least {expected} bytes, got {actual}")]
    PageTooShort {
        page_type: u8,
        expected: usize,
        actual: usize,
    },

    #[error("Page fragment of {0} bytes has no type code")]
    MissingPageType(usize),

    #[error("Suspending state consumers need a running tokio runtime")]
    NoRuntime,

    #[error("Transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EcoflowError>;

impl From<TryFromPrimitiveError<OutputCircuit>> for EcoflowError {
    fn from(err: TryFromPrimitiveError<OutputCircuit>) -> Self {
        EcoflowError::InvalidCircuit(format!("unknown circuit code {}", err.number))
    }
}
