//! The stack machine that runs compiled [`Bytecode`].
//!
//! State is an instruction pointer and an operand stack. Each step executes
//! the instruction under the pointer and moves to the next one unless a jump
//! redirects it; the run ends when the pointer walks off the end of the
//! program, and its result is whatever is on top of the stack.
use core::fmt;

use tracing::{debug, instrument, trace};

use crate::{
    compiler::bytecode::{Bytecode, Instruction, Slot, Target},
    runtime::fuel::Fuel,
    Integer,
};

// Compiled code never triggers any of these; they exist for hand-built programs.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MachineError {
    #[error("operand stack underflow at instruction {at}")]
    StackUnderflow { at: usize },
    #[error("slot {slot} is outside a stack of height {height} at instruction {at}")]
    SlotOutOfRange {
        at: usize,
        slot: Slot,
        height: usize,
    },
    #[error("instruction {at} targets {target}, past the end of a program of length {len}")]
    TargetOutOfRange {
        at: usize,
        target: Target,
        len: usize,
    },
    #[error("program finished with an empty stack")]
    EmptyResult,
}

/// What a single step did, along with the values it touched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Executed {
    Load { value: Integer },
    /// `x` was popped first
    Add { x: Integer, y: Integer },
    Copy { slot: Slot, value: Integer },
    Drop { slot: Slot, value: Integer },
    Branch { target: Target, test: Integer },
    Jump { target: Target },
}

impl Executed {
    /// Whether this step moved the pointer somewhere other than the next instruction
    pub fn redirected(&self) -> bool {
        match self {
            Self::Branch { test, .. } => *test != 0,
            Self::Jump { .. } => true,
            _ => false,
        }
    }
}

impl fmt::Display for Executed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Load { value } => write!(f, "load: {value}"),
            Self::Add { x, y } => write!(f, "add: {x}, {y}"),
            Self::Copy { slot, value } => write!(f, "copy: [{slot}] = {value}"),
            Self::Drop { slot, value } => write!(f, "drop: [{slot}] = {value}"),
            Self::Branch { target, test } => write!(f, "branch: [{target}] = {test}"),
            Self::Jump { target } => write!(f, "jump: [{target}]"),
        }
    }
}

/// Gets told about every step a [`Machine`] executes.
///
/// Observers only watch; nothing they do can change a result.
pub trait Observer {
    fn observe(&mut self, at: usize, executed: &Executed);
}

impl<F> Observer for F
where
    F: FnMut(usize, &Executed),
{
    fn observe(&mut self, at: usize, executed: &Executed) {
        self(at, executed)
    }
}

/// Watches nothing
impl Observer for () {
    fn observe(&mut self, _: usize, _: &Executed) {}
}

#[derive(Debug, Clone)]
pub struct Machine<'p> {
    program: &'p Bytecode,
    pointer: usize,
    stack: Vec<Integer>,
}

/// Runs `program` to completion on a fresh stack.
#[instrument(skip_all, fields(instructions = program.len()))]
pub fn execute(program: &Bytecode) -> Result<Integer, MachineError> {
    Machine::new(program).run(&mut ())
}

impl<'p> Machine<'p> {
    pub fn new(program: &'p Bytecode) -> Self {
        Self {
            program,
            pointer: 0,
            stack: Vec::new(),
        }
    }

    pub fn pointer(&self) -> usize {
        self.pointer
    }

    pub fn stack(&self) -> &[Integer] {
        &self.stack
    }

    pub fn is_finished(&self) -> bool {
        self.pointer >= self.program.len()
    }

    fn pop(&mut self, at: usize) -> Result<Integer, MachineError> {
        self.stack.pop().ok_or(MachineError::StackUnderflow { at })
    }

    fn read(&self, at: usize, slot: Slot) -> Result<Integer, MachineError> {
        self.stack
            .get(slot)
            .copied()
            .ok_or(MachineError::SlotOutOfRange {
                at,
                slot,
                height: self.stack.len(),
            })
    }

    fn check_target(&self, at: usize, target: Target) -> Result<Target, MachineError> {
        // landing exactly on the end is how a program finishes
        if target > self.program.len() {
            Err(MachineError::TargetOutOfRange {
                at,
                target,
                len: self.program.len(),
            })
        } else {
            Ok(target)
        }
    }

    /// Executes the instruction under the pointer.
    ///
    /// Returns `None` once the program has finished.
    pub fn step(&mut self) -> Result<Option<(usize, Executed)>, MachineError> {
        let at = self.pointer;
        let Some(instruction) = self.program.get(at) else {
            return Ok(None);
        };

        let mut next = at + 1;
        let executed = match instruction {
            Instruction::LoadLiteral(value) => {
                self.stack.push(value);
                Executed::Load { value }
            }
            Instruction::Add => {
                let x = self.pop(at)?;
                let y = self.pop(at)?;
                self.stack.push(x.wrapping_add(y));
                Executed::Add { x, y }
            }
            Instruction::Copy(slot) => {
                let value = self.read(at, slot)?;
                self.stack.push(value);
                Executed::Copy { slot, value }
            }
            Instruction::Drop(slot) => {
                let value = self.read(at, slot)?;
                // everything above the slot moves down by one
                self.stack.remove(slot);
                Executed::Drop { slot, value }
            }
            Instruction::Branch(target) => {
                let target = self.check_target(at, target)?;
                let test = self.pop(at)?;
                if test != 0 {
                    next = target;
                }
                Executed::Branch { target, test }
            }
            Instruction::Jump(target) => {
                next = self.check_target(at, target)?;
                Executed::Jump { target }
            }
        };

        trace!(at, %executed, height = self.stack.len(), "step");
        self.pointer = next;
        Ok(Some((at, executed)))
    }

    /// Runs until the program finishes, reporting every step to `observer`.
    pub fn run(&mut self, observer: &mut impl Observer) -> Result<Integer, MachineError> {
        let mut steps = 0usize;
        while let Some((at, executed)) = self.step()? {
            observer.observe(at, &executed);
            steps += 1;
        }
        debug!(steps, height = self.stack.len(), "finished");
        self.result()
    }

    /// Like [`Self::run`], but spends one unit of `fuel` per step.
    ///
    /// Returns `Ok(None)` when the fuel runs out or is interrupted before the
    /// program finishes; calling again after a refill picks up where it stopped.
    pub fn run_with_fuel(
        &mut self,
        fuel: &mut Fuel,
        observer: &mut impl Observer,
    ) -> Result<Option<Integer>, MachineError> {
        while !self.is_finished() {
            if !fuel.burn() {
                debug!(pointer = self.pointer, "suspended");
                return Ok(None);
            }
            if let Some((at, executed)) = self.step()? {
                observer.observe(at, &executed);
            }
        }
        self.result().map(Some)
    }

    /// The value on top of the stack
    pub fn result(&self) -> Result<Integer, MachineError> {
        self.stack.last().copied().ok_or(MachineError::EmptyResult)
    }
}
