//! Instruction encoding and program text for the Intcode machine.
//!
//! An instruction cell packs an opcode in its two low decimal digits and
//! one addressing mode digit per parameter above them. A program is the
//! comma-separated list of cells the machine is loaded with.

pub mod instruction;
pub mod program;

pub use instruction::{Instruction, Mode, Opcode};
pub use program::Program;
