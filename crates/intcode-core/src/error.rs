//! Error types for parsing and executing Intcode programs.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Parse error at cell {index}: {token:?} ({reason})")]
    Parse {
        index: usize,
        token: String,
        reason: String,
    },

    /// The machine hit something it cannot execute. It must be restarted
    /// before it is run again.
    #[error("Invalid program at pc {pc}: {reason}")]
    InvalidProgram { pc: usize, reason: String },

    #[error("Address {address} is beyond the {limit}-cell memory limit")]
    AddressOutOfRange { address: usize, limit: usize },

    #[error("Output queue is empty")]
    EmptyOutput,

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    pub fn invalid_program(pc: usize, reason: impl Into<String>) -> Self {
        Error::InvalidProgram {
            pc,
            reason: reason.into(),
        }
    }

    /// True for faults raised by the machine itself, as opposed to caller
    /// misuse or ambient failures.
    pub fn is_machine_fault(&self) -> bool {
        matches!(self, Error::InvalidProgram { .. })
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
