//! Core types and utilities shared by every Intcode crate: the cell value
//! abstraction, the error taxonomy and configuration.

pub mod types;
pub mod config;
pub mod error;

pub use error::{Error, Result};
pub use types::*;
pub use config::*;
