//! The Intcode machine.

use crate::memory::Memory;
use intcode_core::{Error, Result, Word};
use intcode_ir::{Instruction, Mode, Opcode, Program};
use num_bigint::BigInt;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::path::Path;
use tracing::{debug, trace, warn};

/// Why `run` returned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RunState {
    /// A halt instruction was executed
    Completed,
    /// An input instruction found the input queue empty. The program counter
    /// still points at it, so pushing input and running again resumes there.
    Blocked,
}

/// Lifecycle of a machine between `start` calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    Ready,
    Blocked,
    Halted,
    Faulted,
}

/// A stored-program machine with growable memory and FIFO input/output.
///
/// A new machine is already started: memory holds the program, the program
/// counter and relative base are zero and both queues are empty. Cloning
/// forks the whole state; memory is copied lazily on the first write.
#[derive(Debug, Clone)]
pub struct Interpreter<W = i64> {
    program: Program<W>,
    memory: Memory<W>,
    pc: usize,
    relative_base: i64,
    inputs: VecDeque<W>,
    outputs: VecDeque<W>,
    status: Status,
}

/// 32-bit cells
pub type SmallInterpreter = Interpreter<i32>;
/// Arbitrary-precision cells
pub type BigInterpreter = Interpreter<BigInt>;

impl<W: Word> Interpreter<W> {
    pub fn new(program: Program<W>) -> Self {
        let memory = Memory::from_shared(program.shared());
        Self {
            program,
            memory,
            pc: 0,
            relative_base: 0,
            inputs: VecDeque::new(),
            outputs: VecDeque::new(),
            status: Status::Ready,
        }
    }

    /// Parse program text and build a machine for it
    pub fn load(text: &str) -> Result<Self> {
        Ok(Self::new(Program::parse(text)?))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(Program::from_file(path)?))
    }

    /// Reset memory, program counter, relative base and both queues
    pub fn start(&mut self) {
        self.memory.reset(self.program.shared());
        self.pc = 0;
        self.relative_base = 0;
        self.inputs.clear();
        self.outputs.clear();
        self.status = Status::Ready;
        debug!("Machine started with {} cells", self.program.len());
    }

    /// A started copy of the same program, ignoring this machine's state
    pub fn fresh(&self) -> Self {
        Self::new(self.program.clone())
    }

    /// Write a cell directly, outside normal execution. Fails only for
    /// addresses past the memory limit.
    pub fn poke(&mut self, address: usize, value: W) -> Result<()> {
        self.memory.write(address, value)
    }

    /// Read a cell without extending memory. Cells past the end read as zero.
    pub fn peek(&self, address: usize) -> W {
        self.memory.get(address).cloned().unwrap_or_else(W::zero)
    }

    pub fn input(&mut self, value: W) {
        self.inputs.push_back(value);
    }

    pub fn input_all(&mut self, values: impl IntoIterator<Item = W>) {
        self.inputs.extend(values);
    }

    /// Queue the character codes of `text`
    pub fn input_text(&mut self, text: &str) {
        self.inputs.extend(text.chars().map(W::from_char));
    }

    /// Queue the character codes of `line` followed by a newline
    pub fn input_line(&mut self, line: &str) {
        self.input_text(line);
        self.inputs.push_back(W::from_char('\n'));
    }

    /// Pop the oldest output value
    pub fn output(&mut self) -> Result<W> {
        self.outputs.pop_front().ok_or(Error::EmptyOutput)
    }

    pub fn has_output(&self) -> bool {
        !self.outputs.is_empty()
    }

    /// Pop output up to the next newline as text, skipping blank lines.
    ///
    /// A value that is not an ASCII character ends the line and stays
    /// queued. Returns `None` when no text is available.
    pub fn output_line(&mut self) -> Option<String> {
        let mut line = String::new();
        while let Some(front) = self.outputs.front() {
            let Some(c) = front.to_char().filter(char::is_ascii) else {
                break;
            };
            self.outputs.pop_front();
            if c != '\n' {
                line.push(c);
            } else if !line.is_empty() {
                break;
            }
        }
        if line.is_empty() {
            None
        } else {
            Some(line)
        }
    }

    pub fn drain_output(&mut self) -> Vec<W> {
        self.outputs.drain(..).collect()
    }

    pub fn skip_output(&mut self) {
        self.outputs.clear();
    }

    pub fn pending_input(&self) -> usize {
        self.inputs.len()
    }

    pub fn pending_output(&self) -> usize {
        self.outputs.len()
    }

    pub fn program(&self) -> &Program<W> {
        &self.program
    }

    pub fn memory(&self) -> &Memory<W> {
        &self.memory
    }

    pub fn memory_len(&self) -> usize {
        self.memory.len()
    }

    pub fn pc(&self) -> usize {
        self.pc
    }

    pub fn relative_base(&self) -> i64 {
        self.relative_base
    }

    pub fn status(&self) -> Status {
        self.status
    }

    /// Execute until the program halts or needs input.
    ///
    /// Faults leave the machine unusable until the next `start`.
    pub fn run(&mut self) -> Result<RunState> {
        let mut executed: u64 = 0;
        loop {
            if let Some(state) = self.step()? {
                debug!(
                    pc = self.pc,
                    executed,
                    outputs = self.outputs.len(),
                    "Run stopped: {:?}",
                    state
                );
                return Ok(state);
            }
            executed += 1;
        }
    }

    /// Execute a single instruction. `None` means execution can continue.
    pub fn step(&mut self) -> Result<Option<RunState>> {
        match self.status {
            Status::Halted => {
                return Err(Error::InvalidState(
                    "machine has halted; call start() before running it again".to_string(),
                ))
            }
            Status::Faulted => {
                return Err(Error::InvalidState(
                    "machine faulted; call start() before running it again".to_string(),
                ))
            }
            Status::Ready | Status::Blocked => {}
        }

        match self.execute() {
            Ok(outcome) => {
                self.status = match outcome {
                    Some(RunState::Completed) => Status::Halted,
                    Some(RunState::Blocked) => Status::Blocked,
                    None => Status::Ready,
                };
                Ok(outcome)
            }
            Err(err) => {
                warn!("Machine fault: {}", err);
                self.status = Status::Faulted;
                Err(err)
            }
        }
    }

    fn execute(&mut self) -> Result<Option<RunState>> {
        let pc = self.pc;
        if pc >= self.memory.len() {
            return Err(Error::invalid_program(
                pc,
                format!("program counter past end of memory ({} cells)", self.memory.len()),
            ));
        }

        let cell = self.cell(pc)?;
        let inst = Instruction::decode(&cell, pc)?;
        trace!(pc, relative_base = self.relative_base, "{}", inst);

        match inst.opcode {
            Opcode::Add => {
                let (a, b) = self.fetch_pair(&inst)?;
                let sum = a
                    .checked_add(&b)
                    .ok_or_else(|| overflow(pc, "addition", &a, &b))?;
                self.store(&inst, sum)?;
            }
            Opcode::Multiply => {
                let (a, b) = self.fetch_pair(&inst)?;
                let product = a
                    .checked_mul(&b)
                    .ok_or_else(|| overflow(pc, "multiplication", &a, &b))?;
                self.store(&inst, product)?;
            }
            Opcode::Input => {
                let Some(value) = self.inputs.pop_front() else {
                    return Ok(Some(RunState::Blocked));
                };
                self.store(&inst, value)?;
            }
            Opcode::Output => {
                let value = self.fetch(&inst, 1)?;
                self.outputs.push_back(value);
            }
            Opcode::JumpIfTrue | Opcode::JumpIfFalse => {
                let condition = self.fetch(&inst, 1)?;
                let target = self.fetch(&inst, 2)?;
                let taken = match inst.opcode {
                    Opcode::JumpIfTrue => !condition.is_zero(),
                    _ => condition.is_zero(),
                };
                if taken {
                    self.pc = target.to_address().ok_or_else(|| {
                        Error::invalid_program(pc, format!("jump target {} is not an address", target))
                    })?;
                    return Ok(None);
                }
            }
            Opcode::LessThan => {
                let (a, b) = self.fetch_pair(&inst)?;
                self.store(&inst, W::from_bool(a < b))?;
            }
            Opcode::Equals => {
                let (a, b) = self.fetch_pair(&inst)?;
                self.store(&inst, W::from_bool(a == b))?;
            }
            Opcode::AdjustRelativeBase => {
                let delta = self.fetch(&inst, 1)?;
                self.relative_base = delta
                    .to_native()
                    .and_then(|delta| self.relative_base.checked_add(delta))
                    .ok_or_else(|| {
                        Error::invalid_program(
                            pc,
                            format!("relative base {} cannot move by {}", self.relative_base, delta),
                        )
                    })?;
            }
            Opcode::Halt => return Ok(Some(RunState::Completed)),
        }

        self.pc += inst.opcode.length();
        Ok(None)
    }

    /// Absolute address of the 1-based parameter `offset`
    fn resolve(&mut self, inst: &Instruction, offset: usize) -> Result<usize> {
        let slot = self.pc + offset;
        let address = match inst.mode(offset) {
            Mode::Immediate => slot,
            Mode::Position => {
                let value = self.cell(slot)?;
                value.to_address().ok_or_else(|| {
                    Error::invalid_program(self.pc, format!("{} is not an address", value))
                })?
            }
            Mode::Relative => {
                let value = self.cell(slot)?;
                value
                    .to_native()
                    .and_then(|delta| self.relative_base.checked_add(delta))
                    .and_then(|absolute| usize::try_from(absolute).ok())
                    .ok_or_else(|| {
                        Error::invalid_program(
                            self.pc,
                            format!(
                                "relative offset {} from base {} is not an address",
                                value, self.relative_base
                            ),
                        )
                    })?
            }
        };
        let pc = self.pc;
        self.memory
            .ensure(address)
            .map_err(|err| Error::invalid_program(pc, err.to_string()))?;
        Ok(address)
    }

    /// Read a cell, faulting at the current instruction past the memory limit
    fn cell(&mut self, address: usize) -> Result<W> {
        let pc = self.pc;
        self.memory
            .read(address)
            .map_err(|err| Error::invalid_program(pc, err.to_string()))
    }

    fn fetch(&mut self, inst: &Instruction, offset: usize) -> Result<W> {
        let address = self.resolve(inst, offset)?;
        self.cell(address)
    }

    fn fetch_pair(&mut self, inst: &Instruction) -> Result<(W, W)> {
        Ok((self.fetch(inst, 1)?, self.fetch(inst, 2)?))
    }

    /// Write through the opcode's result parameter
    fn store(&mut self, inst: &Instruction, value: W) -> Result<()> {
        let offset = inst.opcode.result_param().ok_or_else(|| {
            Error::invalid_program(self.pc, format!("{} has no result parameter", inst.opcode))
        })?;
        let address = self.resolve(inst, offset)?;
        self.memory.write(address, value)
    }
}

fn overflow<W: Word>(pc: usize, operation: &str, a: &W, b: &W) -> Error {
    Error::invalid_program(
        pc,
        format!("{} of {} and {} overflows {}", operation, a, b, W::KIND),
    )
}

impl<W: Word> std::str::FromStr for Interpreter<W> {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::load(s)
    }
}

impl<W: Word> fmt::Display for Interpreter<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "input: {} output: {} memory: {} pc: {} status: {:?}",
            self.inputs.len(),
            self.outputs.len(),
            self.memory.len(),
            self.pc,
            self.status
        )
    }
}
