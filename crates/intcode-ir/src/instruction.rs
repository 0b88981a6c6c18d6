//! Instruction set of the machine.

use intcode_core::{Error, Result, Word};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Divisors selecting the mode digit of parameters 1, 2 and 3.
const MODE_DIVISORS: [i32; 3] = [100, 1_000, 10_000];

/// Machine opcode, the instruction cell modulo 100
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Opcode {
    // Arithmetic
    Add,
    Multiply,

    // I/O
    Input,
    Output,

    // Control flow
    JumpIfTrue,
    JumpIfFalse,

    // Comparison
    LessThan,
    Equals,

    AdjustRelativeBase,
    Halt,
}

impl Opcode {
    pub const fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Opcode::Add),
            2 => Some(Opcode::Multiply),
            3 => Some(Opcode::Input),
            4 => Some(Opcode::Output),
            5 => Some(Opcode::JumpIfTrue),
            6 => Some(Opcode::JumpIfFalse),
            7 => Some(Opcode::LessThan),
            8 => Some(Opcode::Equals),
            9 => Some(Opcode::AdjustRelativeBase),
            99 => Some(Opcode::Halt),
            _ => None,
        }
    }

    pub const fn code(self) -> i64 {
        match self {
            Opcode::Add => 1,
            Opcode::Multiply => 2,
            Opcode::Input => 3,
            Opcode::Output => 4,
            Opcode::JumpIfTrue => 5,
            Opcode::JumpIfFalse => 6,
            Opcode::LessThan => 7,
            Opcode::Equals => 8,
            Opcode::AdjustRelativeBase => 9,
            Opcode::Halt => 99,
        }
    }

    /// Cells consumed by the instruction, opcode included
    pub const fn length(self) -> usize {
        match self {
            Opcode::Add | Opcode::Multiply | Opcode::LessThan | Opcode::Equals => 4,
            Opcode::Input | Opcode::Output | Opcode::AdjustRelativeBase => 2,
            Opcode::JumpIfTrue | Opcode::JumpIfFalse => 3,
            Opcode::Halt => 1,
        }
    }

    pub const fn num_params(self) -> usize {
        self.length() - 1
    }

    /// The 1-based parameter this opcode writes through, if any
    pub fn result_param(&self) -> Option<usize> {
        match self {
            Opcode::Add | Opcode::Multiply | Opcode::LessThan | Opcode::Equals => Some(3),
            Opcode::Input => Some(1),
            _ => None,
        }
    }

    pub fn mnemonic(&self) -> &'static str {
        match self {
            Opcode::Add => "add",
            Opcode::Multiply => "mul",
            Opcode::Input => "in",
            Opcode::Output => "out",
            Opcode::JumpIfTrue => "jnz",
            Opcode::JumpIfFalse => "jz",
            Opcode::LessThan => "lt",
            Opcode::Equals => "eq",
            Opcode::AdjustRelativeBase => "arb",
            Opcode::Halt => "halt",
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// Parameter addressing mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Mode {
    /// The parameter cell holds the operand's address
    #[default]
    Position,
    /// The parameter cell is the operand
    Immediate,
    /// The parameter cell holds an offset from the relative base
    Relative,
}

impl Mode {
    pub const fn from_digit(digit: i64) -> Option<Self> {
        match digit {
            0 => Some(Mode::Position),
            1 => Some(Mode::Immediate),
            2 => Some(Mode::Relative),
            _ => None,
        }
    }

    pub const fn digit(self) -> i64 {
        match self {
            Mode::Position => 0,
            Mode::Immediate => 1,
            Mode::Relative => 2,
        }
    }
}

/// A decoded instruction cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    pub opcode: Opcode,
    pub modes: [Mode; 3],
}

impl Instruction {
    pub fn new(opcode: Opcode) -> Self {
        Self {
            opcode,
            modes: [Mode::Position; 3],
        }
    }

    pub fn with_modes(mut self, modes: [Mode; 3]) -> Self {
        self.modes = modes;
        self
    }

    /// Decode the cell at `pc`.
    ///
    /// Only the mode digits of parameters the opcode actually has are
    /// inspected; digits above them are ignored.
    pub fn decode<W: Word>(cell: &W, pc: usize) -> Result<Self> {
        let code = (cell.clone() % W::from(100))
            .to_native()
            .ok_or_else(|| Error::invalid_program(pc, format!("undecodable cell {}", cell)))?;
        let opcode = Opcode::from_code(code)
            .ok_or_else(|| Error::invalid_program(pc, format!("unknown opcode {} in cell {}", code, cell)))?;

        let mut modes = [Mode::Position; 3];
        for (index, mode) in modes.iter_mut().enumerate().take(opcode.num_params()) {
            let digit = mode_digit(cell, index + 1);
            *mode = Mode::from_digit(digit).ok_or_else(|| {
                Error::invalid_program(
                    pc,
                    format!("unknown mode {} for parameter {} in cell {}", digit, index + 1, cell),
                )
            })?;
        }

        Ok(Self { opcode, modes })
    }

    /// Mode of the 1-based parameter `offset`
    pub fn mode(&self, offset: usize) -> Mode {
        self.modes[offset - 1]
    }

    /// Encode back to a plain instruction cell
    pub fn encode(&self) -> i64 {
        self.modes
            .iter()
            .zip(MODE_DIVISORS)
            .fold(self.opcode.code(), |cell, (mode, divisor)| {
                cell + mode.digit() * i64::from(divisor)
            })
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.opcode)?;
        for mode in &self.modes[..self.opcode.num_params()] {
            let marker = match mode {
                Mode::Position => "@",
                Mode::Immediate => "#",
                Mode::Relative => "~",
            };
            write!(f, " {}", marker)?;
        }
        Ok(())
    }
}

/// `(cell / 10^(offset+1)) % 10`, with truncating division.
fn mode_digit<W: Word>(cell: &W, offset: usize) -> i64 {
    let scaled = cell.clone() / W::from(MODE_DIVISORS[offset - 1]);
    // A remainder of 10 is always in -9..=9.
    (scaled % W::from(10)).to_native().unwrap_or_default()
}
