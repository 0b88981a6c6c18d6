//! Execution engine for Intcode programs.
//!
//! This crate provides:
//! - Growable, copy-on-write memory shared with the program image
//! - The fetch-decode-execute loop with position, immediate and relative
//!   addressing
//! - Input/output queues that let callers suspend and resume a machine

pub mod memory;
pub mod interpreter;

pub use interpreter::{BigInterpreter, Interpreter, RunState, SmallInterpreter, Status};
pub use memory::Memory;
