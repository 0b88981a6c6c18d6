//! Cooperative scheduling of several machines.
//!
//! Machines are driven round-robin from a single thread: each one runs
//! until it blocks on input or halts, and its output is routed into the
//! input queues of the others.

pub mod pipeline;
pub mod network;

pub use network::{Network, NetworkReport, Packet};
pub use pipeline::Pipeline;
